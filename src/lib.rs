//! esim-relay: a crawl-and-forward relay for device compatibility lists
//!
//! This crate runs an external scraping subprocess, loads the device records it
//! writes to disk, and forwards them to a webhook with bounded retries.

pub mod config;
pub mod crawler;
pub mod pipeline;
pub mod records;
pub mod server;
pub mod webhook;

use thiserror::Error;

pub use crawler::CrawlError;
pub use records::LoadError;
pub use webhook::DeliveryError;

/// Main error type for esim-relay operations
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Result load failed: {0}")]
    ResultLoad(#[from] LoadError),

    #[error("Webhook delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl RelayError {
    /// The pipeline stage this error terminated
    pub fn stage(&self) -> pipeline::Stage {
        match self {
            RelayError::Config(_) => pipeline::Stage::Config,
            RelayError::Crawl(_) => pipeline::Stage::Crawl,
            RelayError::ResultLoad(_) => pipeline::Stage::Load,
            RelayError::Delivery(_) => pipeline::Stage::Deliver,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for environment variable {var}: '{value}'")]
    InvalidEnv { var: String, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for esim-relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use pipeline::{run_pipeline, RunSummary, Stage};
pub use records::CrawlResult;
