//! Webhook delivery
//!
//! This module forwards crawl results to the configured endpoint:
//! - JSON serialization of the records
//! - HTTP POST with a per-attempt timeout
//! - Bounded retries with capped exponential backoff

mod backoff;
mod delivery;

pub use backoff::Backoff;
pub use delivery::{AttemptOutcome, DeliveryAttempt, DeliveryReport, WebhookClient};

use thiserror::Error;

/// Errors reported by the delivery stage
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Gave up after {} attempts, last outcome: {}", .attempts.len(), last_outcome(.attempts))]
    Exhausted { attempts: Vec<DeliveryAttempt> },
}

impl DeliveryError {
    /// Attempts made before giving up (empty when no request was sent)
    pub fn attempts(&self) -> &[DeliveryAttempt] {
        match self {
            DeliveryError::Exhausted { attempts } => attempts,
            _ => &[],
        }
    }
}

fn last_outcome(attempts: &[DeliveryAttempt]) -> String {
    attempts
        .last()
        .map(|attempt| attempt.outcome.to_string())
        .unwrap_or_else(|| "none".to_string())
}
