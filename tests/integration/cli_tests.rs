//! Runs the compiled binary and inspects its exit status and log file

use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELAY_ENV_VARS: [&str; 6] = [
    "WEBHOOK_URL",
    "WEBHOOK_TIMEOUT",
    "WEBHOOK_RETRIES",
    "SCRAPY_TIMEOUT",
    "LOG_LEVEL",
    "DEBUG",
];

/// Writes a config file whose crawler runs `script` with `sh -c` inside `dir`
fn write_config(dir: &Path, webhook_url: &str, script: &str) -> PathBuf {
    let config = format!(
        r#"
[webhook]
url = "{webhook_url}"
timeout-secs = 5
retries = 3
backoff-base-ms = 1
backoff-max-ms = 5

[crawler]
program = "sh"
args = ["-c", {script:?}]
working-dir = {dir:?}
timeout-secs = 30

[logging]
level = "info"
console = false
file = true
"#,
        webhook_url = webhook_url,
        script = script,
        dir = dir.display().to_string(),
    );

    let path = dir.join("relay.toml");
    std::fs::write(&path, config).unwrap();
    path
}

async fn run_relay(config: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_esim-relay"));
    command.arg("--config").arg(config).arg("run");
    for var in RELAY_ENV_VARS {
        command.env_remove(var);
    }
    command.output().await.expect("Failed to launch esim-relay")
}

fn read_log(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("esim_crawler.log")).expect("Log file missing")
}

fn count_lines(log: &str, needle: &str) -> usize {
    log.lines().filter(|line| line.contains(needle)).count()
}

#[tokio::test]
async fn test_successful_run_exits_zero_and_appends_log() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/eSIM_compatible"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &format!("{}/webhook/eSIM_compatible", mock_server.uri()),
        r#"printf '%s' '[{"device":"iPhone 14","esim":true}]' > yesim_devices.json"#,
    );

    let first = run_relay(&config).await;
    assert!(first.status.success(), "first run failed: {:?}", first);

    let log = read_log(dir.path());
    assert_eq!(count_lines(&log, "attempt 1/4"), 1);
    assert_eq!(count_lines(&log, "attempt 2/4"), 0);
    assert!(!log.contains("\x1b["), "log file should not contain ANSI codes");

    let second = run_relay(&config).await;
    assert!(second.status.success(), "second run failed: {:?}", second);

    let log = read_log(dir.path());
    assert_eq!(count_lines(&log, "attempt 1/4"), 2);
    assert_eq!(count_lines(&log, "Starting eSIM device crawling process"), 2);
}

#[tokio::test]
async fn test_crawl_failure_exits_non_zero_and_names_stage() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &mock_server.uri(),
        "echo 'spider crashed' >&2; exit 1",
    );

    let output = run_relay(&config).await;
    assert!(!output.status.success());

    let log = read_log(dir.path());
    assert!(log.contains("spider crashed"));
    assert_eq!(count_lines(&log, "Run failed at crawl stage"), 1);
    assert_eq!(count_lines(&log, "Sending data to webhook"), 0);
}

#[tokio::test]
async fn test_exhausted_delivery_exits_non_zero() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        &mock_server.uri(),
        r#"printf '%s' '[{"device":"Pixel 8"}]' > yesim_devices.json"#,
    );

    let output = run_relay(&config).await;
    assert!(!output.status.success());

    let log = read_log(dir.path());
    assert_eq!(count_lines(&log, "Sending data to webhook"), 4);
    assert_eq!(count_lines(&log, "Run failed at deliver stage"), 1);
}

#[tokio::test]
async fn test_invalid_config_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("relay.toml");
    std::fs::write(&config, "[webhook]\nretries = \"many\"\n").unwrap();

    let output = run_relay(&config).await;
    assert!(!output.status.success());
}
