//! Descriptive summary of a traffic table.
//!
//! The summary is computed independently of the risk rules, from the same
//! read-only [`TrafficTable`] snapshot. It covers:
//!
//! - row and column counts, with per-column null tallies;
//! - numeric descriptions for columns whose cells are all numbers;
//! - the number of exact duplicate rows;
//! - a request-size histogram and the busiest client countries;
//! - hourly request counts.
//!
//! ```rust
//! use traffic_guard::config::SummaryConfig;
//! use traffic_guard::schema::AliasTable;
//! use traffic_guard::stats::summarize;
//! use traffic_guard::table::TrafficTable;
//!
//! let table = TrafficTable::from_rows(
//!     &["ClientIP", "bytes"],
//!     vec![vec![Some("1.1.1.1"), Some("10")], vec![Some("1.1.1.1"), Some("10")]],
//!     &AliasTable::default(),
//! );
//! let stats = summarize(&table, &SummaryConfig::default());
//! assert_eq!(stats.duplicate_rows, 1);
//! ```

pub mod describe;
pub mod distribution;
pub mod temporal;

pub use describe::{percentile_linear, NumericSummary};
pub use distribution::{top_values, CategoryCount, Histogram, HistogramBucket};
pub use temporal::{hourly_counts, HourlyBucket, TemporalSummary};

use crate::config::SummaryConfig;
use crate::schema::{ResolvedSchema, SemanticField};
use crate::table::parse::parse_number;
use crate::table::{FieldValue, RawColumn, TrafficTable};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// A value that may not have been computable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Computed<T> {
    /// The value was computed.
    Available(T),
    /// The value could not be computed.
    Skipped {
        /// Why it was skipped
        reason: String,
    },
}

impl<T> Computed<T> {
    /// The computed value, if there is one.
    pub fn value(&self) -> Option<&T> {
        match self {
            Computed::Available(value) => Some(value),
            Computed::Skipped { .. } => None,
        }
    }

    /// The skip reason, if the value was skipped.
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Computed::Available(_) => None,
            Computed::Skipped { reason } => Some(reason),
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Computed::Skipped {
            reason: reason.into(),
        }
    }
}

/// Statistics for one source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name
    pub name: String,
    /// Non-empty cells
    pub non_null: usize,
    /// Empty cells
    pub null: usize,
    /// Present when every non-empty cell is a number
    pub numeric: Option<NumericSummary>,
}

impl ColumnSummary {
    fn from_column(column: &RawColumn) -> Self {
        let present: Vec<&str> = column.values.iter().filter_map(|v| v.as_deref()).collect();
        let numbers: Option<Vec<f64>> = present.iter().map(|v| parse_number(v)).collect();

        Self {
            name: column.name.clone(),
            non_null: present.len(),
            null: column.values.len() - present.len(),
            numeric: numbers.and_then(|values| NumericSummary::from_values(&values)),
        }
    }
}

/// Descriptive statistics for one table snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of records
    pub row_count: usize,
    /// Number of source columns
    pub column_count: usize,
    /// Per-column statistics, in source order
    pub columns: Vec<ColumnSummary>,
    /// Rows that exactly repeat an earlier row
    pub duplicate_rows: usize,
    /// Semantic fields with no matching column
    pub unavailable_fields: Vec<SemanticField>,
    /// Distribution of request sizes
    pub request_bytes: Computed<Histogram>,
    /// Most frequent client countries
    pub top_countries: Computed<Vec<CategoryCount>>,
    /// Requests per hour
    pub temporal: TemporalSummary,
}

impl SummaryStats {
    /// Looks up a column summary by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Total number of empty cells across all columns.
    pub fn total_nulls(&self) -> usize {
        self.columns.iter().map(|c| c.null).sum()
    }
}

/// How one cell takes part in duplicate detection.
#[derive(PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Raw(Option<&'a str>),
    Text(&'a FieldValue<String>),
    Count(&'a FieldValue<u64>),
    Time(&'a FieldValue<DateTime<FixedOffset>>),
}

fn cell_key<'a>(
    table: &'a TrafficTable,
    field: Option<SemanticField>,
    column: usize,
    row: usize,
) -> CellKey<'a> {
    let record = &table.records()[row];
    match field {
        Some(SemanticField::ClientIp) => CellKey::Text(&record.client_ip),
        Some(SemanticField::Country) => CellKey::Text(&record.country),
        Some(SemanticField::RequestBytes) => CellKey::Count(&record.request_bytes),
        Some(SemanticField::RequestCount) => CellKey::Count(&record.request_count),
        Some(SemanticField::Timestamp) => CellKey::Time(&record.timestamp),
        None => CellKey::Raw(table.columns()[column].values[row].as_deref()),
    }
}

/// Counts rows whose cells all equal an earlier row's cells.
///
/// Columns bound to a semantic field compare their parsed values, so
/// `"100"` and `"100.0"` are the same size and two timestamps naming the
/// same instant are the same time. Other columns compare their text.
/// Empty cells compare equal to each other. With one exact pair among
/// otherwise unique rows the count is 1: the repeat, not both originals.
pub fn duplicate_rows(table: &TrafficTable) -> usize {
    let fields: Vec<Option<SemanticField>> = (0..table.column_count())
        .map(|index| {
            SemanticField::ALL.into_iter().find(|field| {
                table
                    .schema()
                    .column(*field)
                    .is_some_and(|resolved| resolved.index == index)
            })
        })
        .collect();

    let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(table.row_count());
    (0..table.row_count())
        .filter(|&row| {
            let key = fields
                .iter()
                .enumerate()
                .map(|(column, field)| cell_key(table, *field, column, row))
                .collect();
            !seen.insert(key)
        })
        .count()
}

fn request_bytes_histogram(table: &TrafficTable, bins: usize) -> Computed<Histogram> {
    if !table.is_available(SemanticField::RequestBytes) {
        return Computed::skipped(ResolvedSchema::unavailable_reason(
            SemanticField::RequestBytes,
        ));
    }
    let values: Vec<f64> = table
        .records()
        .iter()
        .filter_map(|r| r.request_bytes.value().map(|&b| b as f64))
        .collect();
    match Histogram::equal_width(&values, bins) {
        Some(histogram) => Computed::Available(histogram),
        None => Computed::skipped("no valid request_bytes values"),
    }
}

fn country_distribution(table: &TrafficTable, limit: usize) -> Computed<Vec<CategoryCount>> {
    if !table.is_available(SemanticField::Country) {
        return Computed::skipped(ResolvedSchema::unavailable_reason(SemanticField::Country));
    }
    let countries = table
        .records()
        .iter()
        .filter_map(|r| r.country.value().map(String::as_str));
    let top = top_values(countries, limit);
    if top.is_empty() {
        Computed::skipped("no valid country values")
    } else {
        Computed::Available(top)
    }
}

/// Computes the descriptive summary of `table`.
#[instrument(skip_all, fields(table.rows = table.row_count(), table.columns = table.column_count()))]
pub fn summarize(table: &TrafficTable, config: &SummaryConfig) -> SummaryStats {
    let columns: Vec<ColumnSummary> = table
        .columns()
        .iter()
        .map(ColumnSummary::from_column)
        .collect();
    let duplicate_rows = duplicate_rows(table);
    let temporal = hourly_counts(table, config.max_hourly_buckets);

    debug!(
        summary.duplicates = duplicate_rows,
        summary.temporal = temporal.has_data(),
        "Computed summary statistics"
    );

    SummaryStats {
        row_count: table.row_count(),
        column_count: table.column_count(),
        columns,
        duplicate_rows,
        unavailable_fields: table.schema().unavailable(),
        request_bytes: request_bytes_histogram(table, config.histogram_bins),
        top_countries: country_distribution(table, config.top_countries),
        temporal,
    }
}
