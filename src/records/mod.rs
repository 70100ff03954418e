//! Scraped device records
//!
//! The crawl subprocess writes its records to a JSON file. This module loads
//! that file into a [`CrawlResult`] without imposing any schema on the records
//! beyond "JSON object".

mod loader;

pub use loader::{load_crawl_result, parse_crawl_result};

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// One scraped device entry (name, model identifiers, compatibility flags, ...)
pub type DeviceRecord = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur while loading crawl output
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Crawl output not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid crawl output in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Ordered device records produced by a single crawl
///
/// Serializes as a plain JSON array, which is exactly the webhook body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CrawlResult {
    records: Vec<DeviceRecord>,
}

impl CrawlResult {
    pub fn new(records: Vec<DeviceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<DeviceRecord> {
        self.records
    }
}

impl From<Vec<DeviceRecord>> for CrawlResult {
    fn from(records: Vec<DeviceRecord>) -> Self {
        Self::new(records)
    }
}
