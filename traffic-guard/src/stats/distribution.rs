//! Value distributions: equal-width histograms and top-N categories.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a single bucket in a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Lower bound of the bucket (inclusive).
    pub lower_bound: f64,
    /// Upper bound of the bucket (exclusive, except for the last bucket).
    pub upper_bound: f64,
    /// Count of values in this bucket.
    pub count: u64,
}

impl HistogramBucket {
    /// Creates a new histogram bucket.
    pub fn new(lower_bound: f64, upper_bound: f64, count: u64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            count,
        }
    }

    /// Returns the width of the bucket.
    pub fn width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// An equal-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Buckets in ascending order
    pub buckets: Vec<HistogramBucket>,
    /// Total number of values
    pub total_count: u64,
}

impl Histogram {
    /// Buckets `values` into `bins` equal-width buckets spanning min..=max.
    ///
    /// When every value is identical a single zero-width bucket holds them
    /// all. Returns `None` when `values` is empty or `bins` is zero.
    pub fn equal_width(values: &[f64], bins: usize) -> Option<Self> {
        if values.is_empty() || bins == 0 {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if min == max {
            return Some(Self {
                buckets: vec![HistogramBucket::new(min, max, values.len() as u64)],
                total_count: values.len() as u64,
            });
        }

        let width = (max - min) / bins as f64;
        let mut counts = vec![0u64; bins];
        for value in values {
            let index = (((value - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        let buckets = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let lower = min + width * i as f64;
                let upper = if i == bins - 1 { max } else { min + width * (i + 1) as f64 };
                HistogramBucket::new(lower, upper, count)
            })
            .collect();

        Some(Self {
            buckets,
            total_count: values.len() as u64,
        })
    }
}

/// A category and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// The category value
    pub value: String,
    /// Number of occurrences
    pub count: u64,
}

/// Counts occurrences and returns the `limit` most frequent values.
///
/// Ordering is by descending count, then ascending value, so equal counts
/// always come out in the same order.
pub fn top_values<'a, I>(values: I, limit: usize) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(value, count)| CategoryCount {
            value: value.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_width_histogram() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 10.0];
        let histogram = Histogram::equal_width(&values, 5).unwrap();

        assert_eq!(histogram.buckets.len(), 5);
        assert_eq!(histogram.total_count, 6);
        assert_eq!(histogram.buckets[0], HistogramBucket::new(0.0, 2.0, 2));
        assert_eq!(histogram.buckets[1].count, 2);
        // the maximum lands in the last, inclusive bucket
        assert_eq!(histogram.buckets[4], HistogramBucket::new(8.0, 10.0, 1));
        let total: u64 = histogram.buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_constant_values_single_bucket() {
        let histogram = Histogram::equal_width(&[5.0, 5.0, 5.0], 10).unwrap();
        assert_eq!(histogram.buckets, vec![HistogramBucket::new(5.0, 5.0, 3)]);
        assert_eq!(histogram.buckets[0].width(), 0.0);
    }

    #[test]
    fn test_empty_histogram() {
        assert!(Histogram::equal_width(&[], 10).is_none());
    }

    #[test]
    fn test_top_values_ordering() {
        let values = ["US", "DE", "US", "FR", "DE", "US", "AT"];
        let top = top_values(values, 3);
        assert_eq!(
            top,
            vec![
                CategoryCount { value: "US".into(), count: 3 },
                CategoryCount { value: "DE".into(), count: 2 },
                CategoryCount { value: "AT".into(), count: 1 },
            ]
        );
    }
}
