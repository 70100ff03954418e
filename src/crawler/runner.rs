//! Crawl subprocess runner
//!
//! The child process is owned by [`CrawlRunner::run`] for its whole lifetime.
//! It is spawned with `kill_on_drop`, so the process is terminated on every
//! exit path, including cancellation of the future driving the run. The
//! timeout path kills and reaps it explicitly.

use crate::config::RuntimeConfig;
use crate::crawler::CrawlError;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// How long to wait for the output pipes to drain once the child has exited
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// The program invocation that performs the actual scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CrawlCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Renders the invocation for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a successful crawl left behind
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs the crawl subprocess under a wall-clock timeout
#[derive(Debug, Clone)]
pub struct CrawlRunner {
    command: CrawlCommand,
    timeout: Duration,
}

impl CrawlRunner {
    pub fn new(command: CrawlCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    /// Builds a runner from the `[crawler]` section of the configuration
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let command = CrawlCommand {
            program: config.crawler.program.clone(),
            args: config.crawler.args.clone(),
            working_dir: config.crawler.working_dir.clone(),
        };
        Self::new(command, config.crawler.timeout())
    }

    pub fn command(&self) -> &CrawlCommand {
        &self.command
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Launches the crawl and waits for it to finish
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutput)` - The subprocess exited with status 0
    /// * `Err(CrawlError::Spawn)` - The program could not be started
    /// * `Err(CrawlError::TimedOut)` - The timeout elapsed; the process was killed
    /// * `Err(CrawlError::Failed)` - Non-zero exit, with captured stderr
    pub async fn run(&self) -> Result<CrawlOutput, CrawlError> {
        tracing::info!(
            "Starting crawl: {} (timeout {:?})",
            self.command.display(),
            self.timeout
        );
        let started = Instant::now();

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CrawlError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child never blocks on a full pipe
        let stdout_task = child.stdout.take().map(spawn_reader);
        let stderr_task = child.stderr.take().map(spawn_reader);

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                tracing::error!(
                    "Crawl timed out after {:?}, terminating pid {:?}",
                    self.timeout,
                    child.id()
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed-out crawler: {}", e);
                }
                abort_reader(stdout_task);
                abort_reader(stderr_task);
                return Err(CrawlError::TimedOut {
                    timeout: self.timeout,
                });
            }
        };

        let stdout = collect_reader(stdout_task).await;
        let stderr = collect_reader(stderr_task).await;
        let elapsed = started.elapsed();

        finish(status, stdout, stderr, elapsed)
    }
}

fn finish(
    status: ExitStatus,
    stdout: String,
    stderr: String,
    elapsed: Duration,
) -> Result<CrawlOutput, CrawlError> {
    if !stdout.is_empty() {
        tracing::debug!("Crawler stdout:\n{}", stdout.trim_end());
    }

    if status.success() {
        tracing::info!("Crawl completed successfully in {:.1?}", elapsed);
        Ok(CrawlOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            elapsed,
        })
    } else {
        tracing::error!("Crawl failed with status {}", status);
        tracing::error!("Crawler stderr: {}", stderr.trim_end());
        Err(CrawlError::Failed {
            code: status.code(),
            stderr,
        })
    }
}

fn spawn_reader<R>(mut stream: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf).await {
            tracing::warn!("Failed to read crawler output: {}", e);
        }
        buf
    })
}

async fn collect_reader(task: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(mut task) = task else {
        return String::new();
    };

    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Err(e)) => {
            tracing::warn!("Crawler output reader failed: {}", e);
            String::new()
        }
        Err(_) => {
            // A grandchild is still holding the pipe open
            task.abort();
            String::new()
        }
    }
}

fn abort_reader(task: Option<JoinHandle<Vec<u8>>>) {
    if let Some(task) = task {
        task.abort();
    }
}
