use crate::config::types::RuntimeConfig;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

pub const ENV_WEBHOOK_URL: &str = "WEBHOOK_URL";
pub const ENV_WEBHOOK_TIMEOUT: &str = "WEBHOOK_TIMEOUT";
pub const ENV_WEBHOOK_RETRIES: &str = "WEBHOOK_RETRIES";
pub const ENV_CRAWL_TIMEOUT: &str = "SCRAPY_TIMEOUT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_DEBUG: &str = "DEBUG";

/// Loads the runtime configuration from an optional file and the process environment
///
/// Defaults are overlaid by the TOML file (when given), then by environment
/// variables. The result is validated before it is returned.
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(RuntimeConfig)` - Successfully resolved and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use esim_relay::config::load_config;
///
/// let config = load_config(None).unwrap();
/// println!("Delivering to {}", config.webhook.url);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    load_config_from(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`] but with an injectable environment lookup
pub fn load_config_from<F>(path: Option<&Path>, env: F) -> Result<RuntimeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RuntimeConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate(&config)?;

    Ok(config)
}

/// Overlays the supported environment variables onto a configuration
///
/// Unset variables leave the current value untouched. Values that fail to
/// parse are reported rather than ignored.
pub fn apply_env_overrides<F>(config: &mut RuntimeConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_WEBHOOK_URL) {
        config.webhook.url = url;
    }

    if let Some(timeout) = parse_env(&env, ENV_WEBHOOK_TIMEOUT)? {
        config.webhook.timeout_secs = timeout;
    }

    if let Some(retries) = parse_env(&env, ENV_WEBHOOK_RETRIES)? {
        config.webhook.retries = retries;
    }

    if let Some(timeout) = parse_env(&env, ENV_CRAWL_TIMEOUT)? {
        config.crawler.timeout_secs = timeout;
    }

    if let Some(level) = env(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }

    // Anything other than "true" (any case) disables debug mode
    if let Some(debug) = env(ENV_DEBUG) {
        config.debug = debug.trim().eq_ignore_ascii_case("true");
    }

    Ok(())
}

fn parse_env<F, T>(env: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match env(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
        None => Ok(None),
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that runs can be matched to the exact config they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
