//! End-to-end run: crawl, load, deliver
//!
//! Each stage runs to completion before the next starts. The first failing
//! stage ends the run; there is no partial success.

use crate::config::RuntimeConfig;
use crate::crawler::{remove_stale_artifacts, CrawlOutput, CrawlRunner};
use crate::records::load_crawl_result;
use crate::webhook::{DeliveryReport, WebhookClient};
use crate::RelayError;
use std::fmt;

/// Stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Config,
    Crawl,
    Load,
    Deliver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Crawl => "crawl",
            Stage::Load => "load",
            Stage::Deliver => "deliver",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub crawl: CrawlOutput,

    /// Number of records loaded from the crawl output
    pub records: usize,

    /// `None` when an empty result was skipped by configuration
    pub delivery: Option<DeliveryReport>,
}

/// Runs one complete crawl-and-deliver cycle
///
/// # Arguments
///
/// * `config` - The resolved runtime configuration
///
/// # Returns
///
/// * `Ok(RunSummary)` - The records were delivered (or an empty result was skipped)
/// * `Err(RelayError)` - The first stage that failed; see [`RelayError::stage`]
pub async fn run_pipeline(config: &RuntimeConfig) -> Result<RunSummary, RelayError> {
    tracing::info!("Starting eSIM device crawling process");
    if config.debug {
        tracing::info!("Running in DEBUG mode");
    }

    let output_path = config.output_path();

    if config.files.cleanup_before_run {
        remove_stale_artifacts(&[&output_path, &config.rendered_page_path()]);
    }

    let crawl = CrawlRunner::from_config(config).run().await?;

    let result = load_crawl_result(&output_path)?;
    let records = result.len();

    if result.is_empty() && config.webhook.skip_empty {
        tracing::warn!("No records to deliver, skipping webhook (skip-empty is set)");
        return Ok(RunSummary {
            crawl,
            records,
            delivery: None,
        });
    }

    let client = WebhookClient::from_config(&config.webhook)?;
    let report = client.deliver(&result).await?;

    tracing::info!(
        "Process completed successfully: {} records delivered in {} attempt(s)",
        records,
        report.attempts.len()
    );

    Ok(RunSummary {
        crawl,
        records,
        delivery: Some(report),
    })
}
