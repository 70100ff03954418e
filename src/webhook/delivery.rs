//! Webhook delivery with bounded retries
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 2xx | Done, return the response |
//! | Other HTTP status | Retry after backoff |
//! | Timeout / connection error | Retry after backoff |
//! | Retries exhausted | Terminal `DeliveryError::Exhausted` |
//!
//! With `retries = R` at most `R + 1` requests are sent. Attempts are strictly
//! sequential: an attempt's outcome is known before the next one is scheduled.

use crate::config::WebhookConfig;
use crate::records::CrawlResult;
use crate::webhook::backoff::Backoff;
use crate::webhook::DeliveryError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{Duration, Instant};

/// Longest response body excerpt kept in attempt records
const BODY_EXCERPT_LIMIT: usize = 512;

/// Result of a single POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The endpoint answered with a 2xx status
    Delivered { status: u16 },

    /// The endpoint answered with a non-2xx status
    Rejected { status: u16, body: String },

    /// No usable response (timeout, connection refused, TLS, ...)
    Failed { error: String },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Delivered { .. })
    }

    /// HTTP status, when the endpoint answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            AttemptOutcome::Delivered { status } | AttemptOutcome::Rejected { status, .. } => {
                Some(*status)
            }
            AttemptOutcome::Failed { .. } => None,
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Delivered { status } => write!(f, "delivered (HTTP {})", status),
            AttemptOutcome::Rejected { status, body } if body.is_empty() => {
                write!(f, "rejected (HTTP {})", status)
            }
            AttemptOutcome::Rejected { status, body } => {
                write!(f, "rejected (HTTP {}): {}", status, body)
            }
            AttemptOutcome::Failed { error } => write!(f, "request failed: {}", error),
        }
    }
}

/// Log entry for one delivery attempt
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    /// 1-based attempt number
    pub number: u32,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,
}

/// Successful delivery summary
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    /// Every attempt made, the last one being the successful one
    pub attempts: Vec<DeliveryAttempt>,

    /// Status of the successful response
    pub status: u16,

    /// Body of the successful response
    pub response_body: String,

    /// Hex SHA-256 of the payload that was sent
    pub payload_digest: String,
}

/// Posts crawl results to a webhook endpoint
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
    retries: u32,
    backoff: Backoff,
}

impl WebhookClient {
    /// Builds a client with the given per-attempt timeout and user agent
    ///
    /// Defaults to 3 retries and [`Backoff::default`].
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            client,
            url: url.into(),
            retries: 3,
            backoff: Backoff::default(),
        })
    }

    /// Builds a client from the `[webhook]` section of the configuration
    pub fn from_config(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        Ok(Self::new(&config.url, config.timeout(), &config.user_agent)?
            .with_retries(config.retries)
            .with_backoff(Backoff::from_config(config)))
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Total number of requests this client will make before giving up
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delivers the crawl result as a JSON array body
    ///
    /// # Returns
    ///
    /// * `Ok(DeliveryReport)` - Some attempt got a 2xx response
    /// * `Err(DeliveryError::Exhausted)` - Every attempt failed; carries the attempt log
    pub async fn deliver(&self, result: &CrawlResult) -> Result<DeliveryReport, DeliveryError> {
        let payload = serde_json::to_vec(result)?;
        let payload_digest = hex::encode(Sha256::digest(&payload));
        tracing::info!(
            "Delivering {} records ({} bytes, sha256 {}) to {}",
            result.len(),
            payload.len(),
            payload_digest,
            self.url
        );

        let max_attempts = self.max_attempts();
        let mut attempts = Vec::new();

        for number in 1..=max_attempts {
            tracing::info!(
                "Sending data to webhook (attempt {}/{})",
                number,
                max_attempts
            );

            let started = Instant::now();
            let (outcome, response_body) = self.attempt(&payload).await;
            let elapsed = started.elapsed();

            let attempt = DeliveryAttempt {
                number,
                outcome,
                elapsed,
            };

            if let AttemptOutcome::Delivered { status } = attempt.outcome {
                tracing::info!(
                    "Webhook accepted payload with HTTP {} in {:.1?}",
                    status,
                    elapsed
                );
                tracing::debug!("Webhook response: {}", response_body);
                attempts.push(attempt);
                return Ok(DeliveryReport {
                    attempts,
                    status,
                    response_body,
                    payload_digest,
                });
            }

            tracing::warn!(
                "Attempt {}/{} {} after {:.1?}",
                number,
                max_attempts,
                attempt.outcome,
                elapsed
            );
            attempts.push(attempt);

            if number < max_attempts {
                let delay = self.backoff.delay_after(number);
                tracing::debug!("Retrying webhook delivery in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!("All {} webhook attempts failed", max_attempts);
        Err(DeliveryError::Exhausted { attempts })
    }

    /// Sends one POST; returns the outcome and the response body
    async fn attempt(&self, payload: &[u8]) -> (AttemptOutcome, String) {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let body = match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::debug!("Failed to read webhook response body: {}", e);
                        String::new()
                    }
                };

                if status.is_success() {
                    (
                        AttemptOutcome::Delivered {
                            status: status.as_u16(),
                        },
                        body,
                    )
                } else {
                    let outcome = AttemptOutcome::Rejected {
                        status: status.as_u16(),
                        body: excerpt(&body),
                    };
                    (outcome, body)
                }
            }
            Err(e) => {
                let error = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                (AttemptOutcome::Failed { error }, String::new())
            }
        }
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(BODY_EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
