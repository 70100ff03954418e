//! esim-relay main entry point
//!
//! This is the command-line interface for the crawl-and-forward relay.

use anyhow::Context;
use clap::{Parser, Subcommand};
use esim_relay::config::{compute_config_hash, load_config, RuntimeConfig};
use esim_relay::pipeline::{run_pipeline, Stage};
use esim_relay::server::{serve, DEFAULT_BIND_ADDR};
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// esim-relay: crawl a device compatibility list and forward it to a webhook
///
/// Runs the configured scraping subprocess, loads the records it writes, and
/// POSTs them as a JSON array to the webhook endpoint, retrying on failure.
/// Settings come from an optional TOML file and the WEBHOOK_URL,
/// WEBHOOK_TIMEOUT, WEBHOOK_RETRIES, SCRAPY_TIMEOUT, LOG_LEVEL and DEBUG
/// environment variables.
#[derive(Parser, Debug)]
#[command(name = "esim-relay")]
#[command(version)]
#[command(about = "Crawl a device compatibility list and forward it to a webhook", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one crawl and deliver the result (default)
    Run {
        /// Show the resolved configuration without crawling
        #[arg(long)]
        dry_run: bool,
    },

    /// Serve the HTTP trigger endpoint
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR", default_value = DEFAULT_BIND_ADDR)]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // No file logging without a valid config; report on the console only
            if let Err(log_err) =
                setup_logging(&RuntimeConfig::default(), cli.verbose, cli.quiet, false)
            {
                eprintln!("Failed to initialize logging: {:#}", log_err);
                eprintln!("Failed to load configuration: {}", e);
                return ExitCode::FAILURE;
            }
            tracing::error!("Failed to load configuration: {}", e);
            tracing::error!("Run failed at {} stage", Stage::Config);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = setup_logging(&config, cli.verbose, cli.quiet, config.logging.file) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = &cli.config {
        match compute_config_hash(path) {
            Ok(hash) => tracing::info!(
                "Configuration loaded from {} (hash: {})",
                path.display(),
                hash
            ),
            Err(e) => tracing::warn!("Could not hash configuration file: {}", e),
        }
    }

    match cli.command.unwrap_or(Command::Run { dry_run: false }) {
        Command::Run { dry_run: true } => {
            handle_dry_run(&config);
            ExitCode::SUCCESS
        }
        Command::Run { dry_run: false } => handle_run(&config).await,
        Command::Serve { bind } => match serve(config, bind).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Trigger server failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

/// Installs the console and log-file subscribers
fn setup_logging(
    config: &RuntimeConfig,
    verbose: u8,
    quiet: bool,
    to_file: bool,
) -> anyhow::Result<()> {
    let directive = config
        .logging
        .filter_directive(verbose, quiet, config.debug);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{}'", directive))?;

    let console_layer = config
        .logging
        .console
        .then(|| fmt::layer().with_target(false).with_thread_ids(false));

    let file_layer = if to_file {
        let path = config.log_file_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// Handles `run --dry-run`: prints the resolved configuration
fn handle_dry_run(config: &RuntimeConfig) {
    println!("=== esim-relay Dry Run ===\n");

    println!("Crawler:");
    println!(
        "  Command: {} {}",
        config.crawler.program,
        config.crawler.args.join(" ")
    );
    println!("  Working dir: {}", config.crawler.working_dir.display());
    println!("  Timeout: {}s", config.crawler.timeout_secs);

    println!("\nWebhook:");
    println!("  URL: {}", config.webhook.url);
    println!("  Timeout: {}s per attempt", config.webhook.timeout_secs);
    println!(
        "  Retries: {} (up to {} attempts)",
        config.webhook.retries,
        config.webhook.retries + 1
    );
    println!(
        "  Backoff: {}ms doubling, capped at {}ms",
        config.webhook.backoff_base_ms, config.webhook.backoff_max_ms
    );
    println!("  Skip empty results: {}", config.webhook.skip_empty);

    println!("\nFiles:");
    println!("  Output: {}", config.output_path().display());
    println!("  Rendered page: {}", config.rendered_page_path().display());
    println!("  Log file: {}", config.log_file_path().display());
    println!("  Cleanup before run: {}", config.files.cleanup_before_run);

    println!("\nLogging level: {}", config.logging.level);
    println!("Debug mode: {}", config.debug);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl-and-deliver run
async fn handle_run(config: &RuntimeConfig) -> ExitCode {
    match run_pipeline(config).await {
        Ok(summary) => {
            match &summary.delivery {
                Some(report) => tracing::info!(
                    "Run succeeded: {} records, webhook answered HTTP {}",
                    summary.records,
                    report.status
                ),
                None => tracing::info!("Run succeeded: no records delivered"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            if e.stage() == Stage::Deliver {
                tracing::error!(
                    "Run failed at {} stage; records remain in {} for manual recovery",
                    e.stage(),
                    config.output_path().display()
                );
            } else {
                tracing::error!("Run failed at {} stage", e.stage());
            }
            ExitCode::FAILURE
        }
    }
}
