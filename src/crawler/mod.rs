//! Crawl subprocess management
//!
//! This module contains everything that touches the external scraping
//! framework:
//! - Launching the crawl subprocess with a wall-clock timeout
//! - Capturing its exit status and output streams
//! - Removing stale artifacts left over from a previous run

mod cleanup;
mod runner;

pub use cleanup::remove_stale_artifacts;
pub use runner::{CrawlCommand, CrawlOutput, CrawlRunner};

use std::time::Duration;
use thiserror::Error;

/// Errors reported by the crawl stage
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Failed to start crawler '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Crawler timed out after {timeout:?} and was terminated")]
    TimedOut { timeout: Duration },

    #[error("Crawler exited with {}: {stderr}", exit_code_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error("IO error while supervising crawler: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (killed by signal)".to_string(),
    }
}
