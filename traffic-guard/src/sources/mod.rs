//! Traffic log sources.
//!
//! A source produces Arrow record batches; it does not interpret them.
//! Column resolution and cell parsing happen afterwards in
//! [`TrafficTable::from_batches`](crate::table::TrafficTable::from_batches),
//! so every source feeds the same schema-resolution contract.

use crate::prelude::*;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

mod csv;
mod memory;

pub use csv::{CsvOptions, CsvSource};
pub use memory::MemorySource;

/// Something traffic records can be loaded from.
///
/// # Examples
///
/// ```rust,no_run
/// use traffic_guard::sources::{CsvSource, TrafficSource};
///
/// # async fn example() -> traffic_guard::error::Result<()> {
/// let source = CsvSource::new("logs/edge-*.csv");
/// let batches = source.load().await?;
/// println!("{} batches from {}", batches.len(), source.description());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TrafficSource: Debug + Send + Sync {
    /// Reads the whole source.
    ///
    /// A source that cannot be opened or read returns
    /// [`GuardError::SourceUnavailable`]. A readable source with no rows is
    /// not an error here; the pipeline decides what an empty table means.
    async fn load(&self) -> Result<Vec<RecordBatch>>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands glob patterns into file paths.
///
/// Plain paths are passed through after checking that they name a file.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if !is_glob(pattern) {
            if !Path::new(pattern).is_file() {
                return Err(GuardError::source_unavailable(
                    "file",
                    format!("file not found: {pattern}"),
                ));
            }
            paths.push(pattern.clone());
            continue;
        }

        let matches = glob::glob(pattern).map_err(|e| {
            GuardError::config_invalid(format!("invalid glob pattern '{pattern}': {e}"))
        })?;
        for entry in matches {
            let path = entry.map_err(|e| {
                GuardError::source_unavailable_with_source(
                    "file",
                    format!("cannot read match of '{pattern}'"),
                    Box::new(e),
                )
            })?;
            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(GuardError::source_unavailable(
            "file",
            "no files found matching glob patterns",
        ));
    }

    Ok(paths)
}
