//! Hourly request counts.
//!
//! Buckets are built from a sorted copy of the parsed timestamps. The table
//! itself is never reordered.
//!
//! Buckets are UTC hours, so one instant written with different offsets
//! lands in the same bucket. The after-hours rule reads the local hour
//! instead.

use crate::schema::{ResolvedSchema, SemanticField};
use crate::table::{FieldValue, TrafficTable};
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requests that started within one clock hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyBucket {
    /// Start of the hour, in UTC
    pub hour: NaiveDateTime,
    /// Number of requests in the hour
    pub count: u64,
}

/// Time-bucketed view of the table.
///
/// [`NoTemporalData`](TemporalSummary::NoTemporalData) and an
/// [`Hourly`](TemporalSummary::Hourly) series of zeros mean different things:
/// the first says no timestamp could be read at all, the second says the
/// timestamps were read and the period was quiet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TemporalSummary {
    /// The timestamp field did not resolve to any column.
    Unavailable {
        /// Why the series could not be built
        reason: String,
    },
    /// The column exists but no cell parsed as a timestamp.
    NoTemporalData {
        /// Cells holding unparseable text
        invalid: usize,
        /// Empty cells
        missing: usize,
    },
    /// Counts per hour, oldest first.
    Hourly {
        /// Hour buckets in chronological order
        buckets: Vec<HourlyBucket>,
        /// Cells holding unparseable text
        invalid: usize,
        /// Empty cells
        missing: usize,
        /// True when every hour between the first and last is present
        gap_filled: bool,
    },
}

impl TemporalSummary {
    /// True when an hourly series was produced.
    pub fn has_data(&self) -> bool {
        matches!(self, TemporalSummary::Hourly { .. })
    }

    /// The hourly buckets, if any were produced.
    pub fn buckets(&self) -> Option<&[HourlyBucket]> {
        match self {
            TemporalSummary::Hourly { buckets, .. } => Some(buckets),
            _ => None,
        }
    }
}

fn hour_start(ts: &NaiveDateTime) -> Option<NaiveDateTime> {
    ts.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

/// Counts requests per hour.
///
/// The series is zero-filled from the first to the last observed hour when
/// that span fits within `max_buckets`; longer spans keep only non-empty hours.
pub fn hourly_counts(table: &TrafficTable, max_buckets: usize) -> TemporalSummary {
    if !table.is_available(SemanticField::Timestamp) {
        return TemporalSummary::Unavailable {
            reason: ResolvedSchema::unavailable_reason(SemanticField::Timestamp),
        };
    }

    let mut counts: BTreeMap<NaiveDateTime, u64> = BTreeMap::new();
    let mut invalid = 0;
    let mut missing = 0;
    for record in table.records() {
        match &record.timestamp {
            FieldValue::Value(ts) => {
                if let Some(hour) = hour_start(&ts.naive_utc()) {
                    *counts.entry(hour).or_insert(0) += 1;
                }
            }
            FieldValue::Invalid(_) => invalid += 1,
            FieldValue::Null => missing += 1,
        }
    }

    let (Some(first), Some(last)) = (
        counts.keys().next().copied(),
        counts.keys().next_back().copied(),
    ) else {
        return TemporalSummary::NoTemporalData { invalid, missing };
    };

    let span = usize::try_from((last - first).num_hours()).unwrap_or(usize::MAX);
    let gap_filled = span < max_buckets;

    let buckets = if gap_filled {
        let mut buckets = Vec::with_capacity(span + 1);
        let mut cursor = first;
        while cursor <= last {
            buckets.push(HourlyBucket {
                hour: cursor,
                count: counts.get(&cursor).copied().unwrap_or(0),
            });
            cursor += Duration::hours(1);
        }
        buckets
    } else {
        counts
            .into_iter()
            .map(|(hour, count)| HourlyBucket { hour, count })
            .collect()
    };

    TemporalSummary::Hourly {
        buckets,
        invalid,
        missing,
        gap_filled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AliasTable;

    fn table(timestamps: &[Option<&str>]) -> TrafficTable {
        let rows = timestamps.iter().map(|ts| vec![Some("1.1.1.1"), *ts]);
        TrafficTable::from_rows(&["ClientIP", "timestamp"], rows, &AliasTable::default())
    }

    #[test]
    fn test_hourly_counts_are_zero_filled() {
        let t = table(&[
            Some("2024-01-01 10:15:00"),
            Some("2024-01-01 10:45:00"),
            Some("2024-01-01 13:00:00"),
            Some("nonsense"),
            None,
        ]);

        let TemporalSummary::Hourly {
            buckets,
            invalid,
            missing,
            gap_filled,
        } = hourly_counts(&t, 1000)
        else {
            panic!("expected hourly series");
        };

        let counts: Vec<u64> = buckets.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 0, 0, 1]);
        assert_eq!(buckets[0].hour.hour(), 10);
        assert_eq!(invalid, 1);
        assert_eq!(missing, 1);
        assert!(gap_filled);
    }

    #[test]
    fn test_mixed_offsets_share_a_utc_bucket() {
        let t = table(&[
            Some("2024-01-01T10:30:00Z"),
            Some("2024-01-01T12:40:00+02:00"),
            Some("2024-01-01 10:05:00"),
        ]);

        let buckets = hourly_counts(&t, 1000);
        let buckets = buckets.buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].hour.hour(), 10);
        assert_eq!(buckets[0].count, 3);
    }

    #[test]
    fn test_all_invalid_is_no_temporal_data() {
        let t = table(&[Some("bad"), Some("worse"), None]);
        assert_eq!(
            hourly_counts(&t, 1000),
            TemporalSummary::NoTemporalData {
                invalid: 2,
                missing: 1
            }
        );
    }

    #[test]
    fn test_missing_column_is_unavailable() {
        let t = TrafficTable::from_rows(
            &["ClientIP"],
            vec![vec![Some("1.1.1.1")]],
            &AliasTable::default(),
        );
        assert_eq!(
            hourly_counts(&t, 1000),
            TemporalSummary::Unavailable {
                reason: "timestamp field unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_long_span_keeps_only_observed_hours() {
        let t = table(&[Some("2020-01-01 00:00:00"), Some("2024-01-01 00:00:00")]);
        let summary = hourly_counts(&t, 24);
        let TemporalSummary::Hourly {
            buckets, gap_filled, ..
        } = summary
        else {
            panic!("expected hourly series");
        };
        assert_eq!(buckets.len(), 2);
        assert!(!gap_filled);
    }

    #[test]
    fn test_table_order_is_untouched() {
        let t = table(&[Some("2024-01-01 12:00:00"), Some("2024-01-01 09:00:00")]);
        let before = t.clone();
        let _ = hourly_counts(&t, 1000);
        assert_eq!(t, before);
        assert_eq!(t.records()[0].row, 0);
    }
}
