use crate::config::types::{CrawlerConfig, FilesConfig, LoggingConfig, RuntimeConfig, WebhookConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on configured webhook retries
pub const MAX_RETRIES: u32 = 10;

const LOG_LEVELS: &str = "trace, debug, info, warn (warning), error (critical)";

/// Validates the entire configuration
pub fn validate(config: &RuntimeConfig) -> Result<(), ConfigError> {
    validate_webhook_config(&config.webhook)?;
    validate_crawler_config(&config.crawler)?;
    validate_files_config(&config.files)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates webhook delivery configuration
fn validate_webhook_config(config: &WebhookConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid webhook url '{}': {}", config.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Webhook url '{}' must use http or https",
            config.url
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "webhook timeout must be greater than 0 seconds".to_string(),
        ));
    }

    if config.retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "webhook retries must be at most {}, got {}",
            MAX_RETRIES, config.retries
        )));
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms ({}) cannot exceed backoff-max-ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "webhook user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl subprocess configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.program.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler program cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "crawler timeout must be greater than 0 seconds".to_string(),
        ));
    }

    Ok(())
}

fn validate_files_config(config: &FilesConfig) -> Result<(), ConfigError> {
    if config.output.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if config.log_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "log-file path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<(), ConfigError> {
    if config.tracing_level().is_none() {
        return Err(ConfigError::Validation(format!(
            "log level must be one of {}, got '{}'",
            LOG_LEVELS, config.level
        )));
    }

    Ok(())
}
