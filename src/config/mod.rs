//! Configuration module for esim-relay
//!
//! Settings come from built-in defaults, an optional TOML file, and a fixed set
//! of environment variables, in increasing order of precedence. The resolved
//! [`RuntimeConfig`] is validated once and passed by reference from then on.
//!
//! # Example
//!
//! ```no_run
//! use esim_relay::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Some(Path::new("relay.toml"))).unwrap();
//! println!("Retries: {}", config.webhook.retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlerConfig, FilesConfig, LoggingConfig, RuntimeConfig, WebhookConfig, DEFAULT_SPIDER_NAME,
    DEFAULT_USER_AGENT, DEFAULT_WEBHOOK_URL,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_from, ENV_CRAWL_TIMEOUT,
    ENV_DEBUG, ENV_LOG_LEVEL, ENV_WEBHOOK_RETRIES, ENV_WEBHOOK_TIMEOUT, ENV_WEBHOOK_URL,
};
pub use validation::{validate, MAX_RETRIES};
