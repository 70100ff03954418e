use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_WEBHOOK_URL: &str = "https://n8n.gohub.cloud/webhook/eSIM_compatible";
pub const DEFAULT_USER_AGENT: &str = "eSIM-Crawler/1.0";
pub const DEFAULT_SPIDER_NAME: &str = "yesim_devices";

/// Immutable runtime configuration, resolved once at startup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Enables debug-level logging and extra diagnostics
    pub debug: bool,
    pub webhook: WebhookConfig,
    pub crawler: CrawlerConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    /// Resolves a configured path against the crawler's working directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.crawler.working_dir.join(path)
        }
    }

    /// Where the crawl subprocess writes its records
    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.files.output)
    }

    /// Where the crawl subprocess writes its rendered-page debug artifact
    pub fn rendered_page_path(&self) -> PathBuf {
        self.resolve_path(&self.files.rendered_page)
    }

    /// Append-mode log file location
    pub fn log_file_path(&self) -> PathBuf {
        self.resolve_path(&self.files.log_file)
    }
}

/// Webhook delivery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    /// Endpoint receiving the scraped records
    pub url: String,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    pub retries: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on any single backoff delay (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Skip delivery entirely when the crawl produced zero records
    #[serde(rename = "skip-empty")]
    pub skip_empty: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBHOOK_URL.to_string(),
            timeout_secs: 30,
            retries: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            skip_empty: false,
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Crawl subprocess configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Executable to launch (looked up on PATH when not a path)
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Directory the subprocess runs in; relative file paths resolve here
    #[serde(rename = "working-dir")]
    pub working_dir: PathBuf,

    /// Wall-clock limit for the subprocess (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            program: "scrapy".to_string(),
            args: vec!["crawl".to_string(), DEFAULT_SPIDER_NAME.to_string()],
            working_dir: PathBuf::from("."),
            timeout_secs: 300,
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// On-disk artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// JSON records written by the crawl subprocess
    pub output: PathBuf,

    /// Rendered HTML debug dump written by the crawl subprocess
    #[serde(rename = "rendered-page")]
    pub rendered_page: PathBuf,

    #[serde(rename = "log-file")]
    pub log_file: PathBuf,

    /// Delete stale output artifacts before crawling
    #[serde(rename = "cleanup-before-run")]
    pub cleanup_before_run: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("yesim_devices.json"),
            rendered_page: PathBuf::from("rendered_page.html"),
            log_file: PathBuf::from("esim_crawler.log"),
            cleanup_before_run: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error (case-insensitive); `warning`
    /// and `critical` are accepted as aliases for warn and error
    pub level: String,

    /// Write log lines to stdout
    pub console: bool,

    /// Append log lines to the log file
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console: true,
            file: true,
        }
    }
}

impl LoggingConfig {
    /// Maps the configured level onto a tracing level name
    ///
    /// Returns `None` for an unrecognized level.
    pub fn tracing_level(&self) -> Option<&'static str> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" | "warning" => Some("warn"),
            "error" | "critical" => Some("error"),
            _ => None,
        }
    }

    /// Builds the tracing filter directive for this crate
    ///
    /// `-q` wins over everything, `-v` raises the configured level one step per
    /// flag, and debug mode raises it to at least `debug`.
    pub fn filter_directive(&self, verbose: u8, quiet: bool, debug: bool) -> String {
        if quiet {
            return "error".to_string();
        }

        const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
        let mut index = self
            .tracing_level()
            .and_then(|configured| LEVELS.iter().position(|level| *level == configured))
            .unwrap_or(2);

        if debug {
            index = index.max(3);
        }
        index = (index + verbose as usize).min(LEVELS.len() - 1);

        format!("esim_relay={},warn", LEVELS[index])
    }
}
