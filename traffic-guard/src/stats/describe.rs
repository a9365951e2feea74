//! Descriptive statistics for numeric columns.

use serde::{Deserialize, Serialize};

/// Linear-interpolated percentile of an ascending-sorted slice.
///
/// Uses the standard definition: `index = p * (n - 1)`, interpolating
/// between the order statistics at `floor(index)` and `ceil(index)`.
/// Returns `None` for an empty slice or a `p` outside `[0, 1]`.
pub fn percentile_linear(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    let fraction = index - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Sorts a copy of `values` ascending.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolated percentile of integer values.
///
/// The cutoff is kept as its two neighbouring order statistics and the
/// interpolation fraction, so that [`is_exceeded_by`](Self::is_exceeded_by)
/// compares integers exactly even where `f64` cannot represent them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegerPercentile {
    lower: u64,
    upper: u64,
    fraction: f64,
}

impl IntegerPercentile {
    /// Percentile `p` of an ascending-sorted slice, using the same
    /// definition as [`percentile_linear`].
    pub fn of_sorted(sorted: &[u64], p: f64) -> Option<Self> {
        if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
            return None;
        }
        let index = p * (sorted.len() - 1) as f64;
        let lower = index.floor() as usize;
        let upper = index.ceil() as usize;
        Some(Self {
            lower: sorted[lower],
            upper: sorted[upper],
            fraction: index - lower as f64,
        })
    }

    /// The cutoff as a float, for reporting.
    pub fn value(&self) -> f64 {
        self.lower as f64 + (self.upper - self.lower) as f64 * self.fraction
    }

    /// True when `value` is strictly above the cutoff.
    pub fn is_exceeded_by(&self, value: u64) -> bool {
        if value <= self.lower {
            return false;
        }
        // fraction < 1, so the cutoff is below `upper` whenever lower < upper
        if value >= self.upper {
            return true;
        }
        (value - self.lower) as f64 > (self.upper - self.lower) as f64 * self.fraction
    }
}

/// The classic count/mean/std/min/quartiles/max summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Number of numeric cells
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1); absent with fewer than two values
    pub std: Option<f64>,
    /// Smallest value
    pub min: f64,
    /// 25th percentile
    pub q25: f64,
    /// Median
    pub median: f64,
    /// 75th percentile
    pub q75: f64,
    /// Largest value
    pub max: f64,
}

impl NumericSummary {
    /// Summarizes `values`, or returns `None` when there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted_copy(values);
        let count = sorted.len();
        if count == 0 {
            return None;
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let sum_sq: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (sum_sq / (count - 1) as f64).sqrt()
        });

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            q25: percentile_linear(&sorted, 0.25)?,
            median: percentile_linear(&sorted, 0.5)?,
            q75: percentile_linear(&sorted, 0.75)?,
            max: sorted[count - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_reference_values() {
        let values: Vec<f64> = (1..=10).map(|v| (v * 10) as f64).collect();
        // index = 0.95 * 9 = 8.55 -> 90 + 0.55 * 10
        let p95 = percentile_linear(&values, 0.95).unwrap();
        assert!((p95 - 95.5).abs() < 1e-9);
        assert_eq!(percentile_linear(&values, 0.0), Some(10.0));
        assert_eq!(percentile_linear(&values, 1.0), Some(100.0));
        assert_eq!(percentile_linear(&values, 0.5), Some(55.0));
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile_linear(&[], 0.5), None);
        assert_eq!(percentile_linear(&[7.0], 0.95), Some(7.0));
        assert_eq!(percentile_linear(&[1.0, 2.0], 1.5), None);
    }

    #[test]
    fn test_integer_percentile_matches_float_definition() {
        let values: Vec<u64> = (1..=10).map(|v| v * 10).collect();
        let p95 = IntegerPercentile::of_sorted(&values, 0.95).unwrap();
        assert!((p95.value() - 95.5).abs() < 1e-9);
        assert!(!p95.is_exceeded_by(95));
        assert!(p95.is_exceeded_by(96));
        assert!(!p95.is_exceeded_by(90));
        assert!(p95.is_exceeded_by(100));

        let p50 = IntegerPercentile::of_sorted(&[1, 5, 9], 0.5).unwrap();
        assert_eq!(p50.value(), 5.0);
        assert!(!p50.is_exceeded_by(5));
        assert!(p50.is_exceeded_by(6));

        assert_eq!(IntegerPercentile::of_sorted(&[], 0.5), None);
        assert_eq!(IntegerPercentile::of_sorted(&[1, 2], 1.5), None);
    }

    #[test]
    fn test_integer_percentile_is_exact_above_f64_precision() {
        let base = 1u64 << 53;
        let sorted = [base, base + 1];
        let p95 = IntegerPercentile::of_sorted(&sorted, 0.95).unwrap();

        // the float cutoff rounds down to 2^53, but base + 1 is still above it
        assert!(p95.is_exceeded_by(base + 1));
        assert!(!p95.is_exceeded_by(base));

        let wide = IntegerPercentile::of_sorted(&[base, base + 10], 0.5).unwrap();
        assert!(!wide.is_exceeded_by(base + 5));
        assert!(wide.is_exceeded_by(base + 6));
    }

    #[test]
    fn test_numeric_summary() {
        let summary = NumericSummary::from_values(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.q25, 1.75);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q75, 3.25);
        let std = summary.std.unwrap();
        assert!((std - 1.2909944487358056).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let summary = NumericSummary::from_values(&[5.0]).unwrap();
        assert_eq!(summary.std, None);
        assert!(NumericSummary::from_values(&[]).is_none());
    }
}
