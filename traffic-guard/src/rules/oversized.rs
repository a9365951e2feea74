//! Flags requests larger than a percentile of all request sizes.

use super::RiskRule;
use crate::config::RiskConfig;
use crate::report::{Finding, FindingKind, RuleEvaluation, RuleOutcome, Subject, Threshold};
use crate::schema::SemanticField;
use crate::stats::describe::IntegerPercentile;
use crate::table::{FieldValue, TrafficTable};

/// Skip reason when fewer than two sizes are known.
pub const INSUFFICIENT_DATA: &str = "insufficient data for percentile";

fn invalid_percentile(percentile: f64) -> String {
    format!("oversized_percentile must be strictly between 0 and 1, got {percentile}")
}

/// Computes the `oversized_percentile` of all non-null request sizes and
/// flags every request strictly above it.
///
/// The cutoff is linearly interpolated, so it may fall between two observed
/// sizes. Sizes are compared against it as integers. Findings keep source
/// row order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OversizedRequestRule;

impl RiskRule for OversizedRequestRule {
    fn kind(&self) -> FindingKind {
        FindingKind::OversizedRequest
    }

    fn required_field(&self) -> SemanticField {
        SemanticField::RequestBytes
    }

    fn evaluate_available(&self, table: &TrafficTable, config: &RiskConfig) -> RuleOutcome {
        let percentile = config.oversized_percentile;
        if !(percentile > 0.0 && percentile < 1.0) {
            return RuleOutcome::skipped(invalid_percentile(percentile));
        }

        let (mut invalid, mut missing) = (0, 0);
        let mut sizes: Vec<(usize, u64)> = Vec::new();
        for record in table.records() {
            match record.request_bytes {
                FieldValue::Value(bytes) => sizes.push((record.row, bytes)),
                FieldValue::Invalid(_) => invalid += 1,
                FieldValue::Null => missing += 1,
            }
        }

        if sizes.len() < 2 {
            return RuleOutcome::skipped(INSUFFICIENT_DATA);
        }

        let mut sorted: Vec<u64> = sizes.iter().map(|&(_, bytes)| bytes).collect();
        sorted.sort_unstable();
        let Some(threshold) = IntegerPercentile::of_sorted(&sorted, percentile) else {
            return RuleOutcome::skipped(INSUFFICIENT_DATA);
        };
        let cutoff = threshold.value();

        let records = table.records();
        let findings = sizes
            .iter()
            .filter(|&&(_, bytes)| threshold.is_exceeded_by(bytes))
            .map(|&(row, bytes)| Finding {
                kind: FindingKind::OversizedRequest,
                subject: Subject::Record {
                    row,
                    client_ip: records[row].client_ip().map(str::to_string),
                },
                measured_value: bytes as f64,
                threshold_used: cutoff,
            })
            .collect();

        RuleOutcome::Evaluated(RuleEvaluation {
            threshold: Threshold::Bytes { percentile, cutoff },
            evaluated: sizes.len(),
            invalid,
            missing,
            findings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AliasTable;

    fn sizes(values: &[Option<&str>]) -> TrafficTable {
        let rows = values.iter().map(|v| vec![Some("1.1.1.1"), *v]);
        TrafficTable::from_rows(&["ClientIP", "ClientRequestBytes"], rows, &AliasTable::default())
    }

    #[test]
    fn test_reference_percentile_cutoff() {
        let values: Vec<String> = (1..=10).map(|v| (v * 10).to_string()).collect();
        let cells: Vec<Option<&str>> = values.iter().map(|v| Some(v.as_str())).collect();
        let outcome = OversizedRequestRule.evaluate(&sizes(&cells), &RiskConfig::default());

        let RuleOutcome::Evaluated(evaluation) = outcome else {
            panic!("rule should run");
        };
        let Threshold::Bytes { cutoff, .. } = evaluation.threshold else {
            panic!("expected a byte threshold");
        };
        assert!((cutoff - 95.5).abs() < 1e-9);

        // only 100 is above 95.5
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].measured_value, 100.0);
        assert_eq!(
            evaluation.findings[0].subject,
            Subject::Record {
                row: 9,
                client_ip: Some("1.1.1.1".to_string())
            }
        );
    }

    #[test]
    fn test_value_equal_to_cutoff_is_not_flagged() {
        // all equal: cutoff equals every value
        let table = sizes(&[Some("50"), Some("50"), Some("50")]);
        let outcome = OversizedRequestRule.evaluate(&table, &RiskConfig::default());
        assert!(outcome.findings().is_empty());
        assert!(!outcome.is_skipped());
    }

    #[test]
    fn test_insufficient_data() {
        let table = sizes(&[Some("10"), None, Some("junk")]);
        assert_eq!(
            OversizedRequestRule.evaluate(&table, &RiskConfig::default()),
            RuleOutcome::skipped(INSUFFICIENT_DATA)
        );
    }

    #[test]
    fn test_sizes_beyond_f64_precision_are_compared_exactly() {
        let table = sizes(&[Some("9007199254740992"), Some("9007199254740993")]);
        let RuleOutcome::Evaluated(evaluation) =
            OversizedRequestRule.evaluate(&table, &RiskConfig::default())
        else {
            panic!("rule should run");
        };
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(
            evaluation.findings[0].subject,
            Subject::Record {
                row: 1,
                client_ip: Some("1.1.1.1".to_string())
            }
        );
    }

    #[test]
    fn test_out_of_range_percentile_names_the_cause() {
        let table = sizes(&[Some("10"), Some("20"), Some("30")]);
        let mut config = RiskConfig::default();
        config.oversized_percentile = 1.5;

        let outcome = OversizedRequestRule.evaluate(&table, &config);
        assert_eq!(
            outcome,
            RuleOutcome::skipped("oversized_percentile must be strictly between 0 and 1, got 1.5")
        );
    }

    #[test]
    fn test_invalid_and_missing_are_excluded() {
        let table = sizes(&[Some("10"), Some("20"), None, Some("-5"), Some("1000")]);
        let RuleOutcome::Evaluated(evaluation) =
            OversizedRequestRule.evaluate(&table, &RiskConfig::default())
        else {
            panic!("rule should run");
        };
        assert_eq!(evaluation.evaluated, 3);
        assert_eq!(evaluation.invalid, 1);
        assert_eq!(evaluation.missing, 1);
        assert_eq!(evaluation.findings.len(), 1);
        assert_eq!(evaluation.findings[0].measured_value, 1000.0);
    }
}
