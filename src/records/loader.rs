use crate::records::{CrawlResult, DeviceRecord, LoadError};
use serde_json::{Deserializer, Value};
use std::io::ErrorKind;
use std::path::Path;

/// Reads and parses the crawl output file
///
/// # Arguments
///
/// * `path` - Location the crawl subprocess wrote its records to
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Parsed records; may be empty
/// * `Err(LoadError::NotFound)` - The file does not exist
/// * `Err(LoadError::Parse)` - The content is not a JSON array, object, or JSON Lines stream of objects
pub fn load_crawl_result(path: &Path) -> Result<CrawlResult, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let content = String::from_utf8(bytes).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: format!("output is not valid UTF-8: {}", e.utf8_error()),
    })?;

    let result = parse_crawl_result(&content).map_err(|message| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    if result.is_empty() {
        tracing::warn!("Crawl output {} contains no records", path.display());
    } else {
        tracing::info!("Loaded {} records from {}", result.len(), path.display());
    }

    Ok(result)
}

/// Parses crawl output text into records
///
/// Accepts a single JSON array of objects, a single object, or a stream of
/// concatenated (possibly pretty-printed) objects. A malformed stream falls
/// back to line-by-line parsing where bad lines are skipped. Whitespace-only
/// input is an empty result.
pub fn parse_crawl_result(content: &str) -> Result<CrawlResult, String> {
    if content.trim().is_empty() {
        return Ok(CrawlResult::default());
    }

    let mut values = Vec::new();
    for value in Deserializer::from_str(content).into_iter::<Value>() {
        match value {
            Ok(value) => values.push(value),
            Err(e) => {
                tracing::info!(
                    "Output is not a clean JSON document ({}), trying JSON Lines",
                    e
                );
                return parse_json_lines(content, &e);
            }
        }
    }

    let values = match <[Value; 1]>::try_from(values) {
        Ok([Value::Array(items)]) => items,
        Ok([single]) => vec![single],
        Err(values) => values,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            into_record(value).map_err(|kind| format!("record {} is {}", index, kind))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CrawlResult::new)
}

fn parse_json_lines(
    content: &str,
    stream_error: &serde_json::Error,
) -> Result<CrawlResult, String> {
    let mut records = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<Value>(line)
            .map_err(|e| e.to_string())
            .and_then(|value| into_record(value).map_err(|kind| format!("line is {}", kind)));

        match parsed {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping invalid JSON on line {}: {}", line_num + 1, e),
        }
    }

    if records.is_empty() {
        return Err(format!("no valid JSON objects found ({})", stream_error));
    }

    Ok(CrawlResult::new(records))
}

fn into_record(value: Value) -> Result<DeviceRecord, &'static str> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err("an array, expected an object"),
        Value::String(_) => Err("a string, expected an object"),
        Value::Number(_) => Err("a number, expected an object"),
        Value::Bool(_) => Err("a boolean, expected an object"),
        Value::Null => Err("null, expected an object"),
    }
}
