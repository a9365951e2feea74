//! The immutable, schema-resolved traffic table shared by every stage.
//!
//! A [`TrafficTable`] keeps two views of the same snapshot:
//!
//! - the raw text cells of every source column, used by the summary
//!   aggregator for per-column statistics and duplicate detection;
//! - one typed [`TrafficRecord`] per row, used by the risk rules.
//!
//! Both views are built once at load time and never mutated afterwards.
//! Consumers that need a different ordering (for example, chronological
//! bucketing) work on their own copies.

pub mod parse;

use crate::prelude::*;
use crate::schema::{resolve, AliasTable, ResolvedSchema, SemanticField};
use arrow::array::AsArray;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A typed cell of a resolved field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FieldValue<T> {
    /// The source cell was empty.
    Null,
    /// The source cell held text that could not be parsed.
    Invalid(String),
    /// The parsed value.
    Value(T),
}

impl<T> FieldValue<T> {
    /// The parsed value, if there is one.
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// True for [`FieldValue::Invalid`].
    pub fn is_invalid(&self) -> bool {
        matches!(self, FieldValue::Invalid(_))
    }

    fn parse(raw: Option<&str>, parser: impl Fn(&str) -> Option<T>) -> Self {
        match raw {
            None => FieldValue::Null,
            Some(text) => match parser(text) {
                Some(value) => FieldValue::Value(value),
                None => FieldValue::Invalid(text.to_string()),
            },
        }
    }
}

/// One logged request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Zero-based position of the row in the source
    pub row: usize,
    /// Requesting client address
    pub client_ip: FieldValue<String>,
    /// Request payload size
    pub request_bytes: FieldValue<u64>,
    /// Client country
    pub country: FieldValue<String>,
    /// Request start time with the offset written in the source
    pub timestamp: FieldValue<DateTime<FixedOffset>>,
    /// Number of requests this row stands for, when pre-aggregated
    pub request_count: FieldValue<u64>,
}

impl TrafficRecord {
    /// The client address, when present.
    pub fn client_ip(&self) -> Option<&str> {
        self.client_ip.value().map(String::as_str)
    }
}

/// The raw text cells of one source column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name (whitespace trimmed)
    pub name: String,
    /// Cell text per row; empty cells are `None`
    pub values: Vec<Option<String>>,
}

impl RawColumn {
    /// Number of non-null cells.
    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        self.values.len() - self.non_null_count()
    }
}

/// An ordered, immutable sequence of traffic records sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficTable {
    columns: Vec<RawColumn>,
    schema: ResolvedSchema,
    records: Vec<TrafficRecord>,
    row_count: usize,
}

impl TrafficTable {
    /// Builds a table from Arrow record batches.
    ///
    /// Every column is cast to text with Arrow's cast kernel so that values
    /// are interpreted by this crate's parsers rather than by whatever type
    /// inference produced the batches.
    pub fn from_batches(batches: &[RecordBatch], aliases: &AliasTable) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Ok(Self::from_raw_columns(Vec::new(), aliases));
        };

        let schema = first.schema();
        let mut columns: Vec<RawColumn> = schema
            .fields()
            .iter()
            .map(|field| RawColumn {
                name: field.name().trim().to_string(),
                values: Vec::new(),
            })
            .collect();

        for batch in batches {
            if batch.num_columns() != columns.len() {
                return Err(GuardError::Internal(format!(
                    "record batch has {} columns, expected {}",
                    batch.num_columns(),
                    columns.len()
                )));
            }
            for (column, array) in columns.iter_mut().zip(batch.columns()) {
                let text = arrow::compute::cast(array, &DataType::Utf8)?;
                let strings = text.as_string::<i32>();
                column.values.extend(strings.iter().map(|cell| {
                    cell.filter(|s| !s.is_empty()).map(str::to_string)
                }));
            }
        }

        Ok(Self::from_raw_columns(columns, aliases))
    }

    /// Builds a table from row-major text cells.
    ///
    /// Convenient for callers that already hold parsed CSV rows. Rows shorter
    /// than the header are padded with nulls; extra cells are ignored.
    pub fn from_rows<S, R, C>(header: &[S], rows: R, aliases: &AliasTable) -> Self
    where
        S: AsRef<str>,
        R: IntoIterator<Item = Vec<Option<C>>>,
        C: Into<String>,
    {
        let mut columns: Vec<RawColumn> = header
            .iter()
            .map(|name| RawColumn {
                name: name.as_ref().trim().to_string(),
                values: Vec::new(),
            })
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                let cell = cells
                    .next()
                    .flatten()
                    .map(|c| -> String { c.into() })
                    .filter(|s| !s.is_empty());
                column.values.push(cell);
            }
        }

        Self::from_raw_columns(columns, aliases)
    }

    fn from_raw_columns(columns: Vec<RawColumn>, aliases: &AliasTable) -> Self {
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let schema = resolve(&names, aliases);
        let row_count = columns.first().map_or(0, |c| c.values.len());

        let cell = |field: SemanticField, row: usize| -> Option<&str> {
            schema
                .column(field)
                .and_then(|resolved| columns[resolved.index].values[row].as_deref())
        };

        let records = (0..row_count)
            .map(|row| TrafficRecord {
                row,
                client_ip: FieldValue::parse(cell(SemanticField::ClientIp, row), |s| {
                    Some(s.trim().to_string()).filter(|s| !s.is_empty())
                }),
                request_bytes: FieldValue::parse(
                    cell(SemanticField::RequestBytes, row),
                    parse::parse_byte_count,
                ),
                country: FieldValue::parse(cell(SemanticField::Country, row), |s| {
                    Some(s.trim().to_string()).filter(|s| !s.is_empty())
                }),
                timestamp: FieldValue::parse(
                    cell(SemanticField::Timestamp, row),
                    parse::parse_timestamp,
                ),
                request_count: FieldValue::parse(
                    cell(SemanticField::RequestCount, row),
                    parse::parse_byte_count,
                ),
            })
            .collect();

        debug!(
            table.rows = row_count,
            table.columns = columns.len(),
            schema.unavailable = ?schema.unavailable(),
            "Resolved traffic table"
        );

        Self {
            columns,
            schema,
            records,
            row_count,
        }
    }

    /// Number of records.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// True when the table has no records.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Number of source columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The resolved schema.
    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    /// True when `field` resolved to a source column.
    pub fn is_available(&self, field: SemanticField) -> bool {
        self.schema.is_available(field)
    }

    /// Typed records in source order.
    pub fn records(&self) -> &[TrafficRecord] {
        &self.records
    }

    /// Raw text columns in source order.
    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }
}
