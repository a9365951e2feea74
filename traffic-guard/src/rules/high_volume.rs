//! Flags client addresses with more requests than a static threshold.

use super::RiskRule;
use crate::config::RiskConfig;
use crate::report::{Finding, FindingKind, RuleEvaluation, RuleOutcome, Subject, Threshold};
use crate::schema::SemanticField;
use crate::table::{FieldValue, TrafficTable};
use std::collections::HashMap;

/// Groups requests by client address and flags every address whose count
/// is strictly greater than `suspicious_ip_threshold`.
///
/// When the table carries a `request_count` column each row contributes its
/// count instead of 1; rows whose count is empty or unparseable are left out
/// and tallied. Findings are ordered by descending count, then address.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighVolumeIpRule;

impl RiskRule for HighVolumeIpRule {
    fn kind(&self) -> FindingKind {
        FindingKind::HighVolumeIP
    }

    fn required_field(&self) -> SemanticField {
        SemanticField::ClientIp
    }

    fn evaluate_available(&self, table: &TrafficTable, config: &RiskConfig) -> RuleOutcome {
        let weighted = table.is_available(SemanticField::RequestCount);
        let threshold = config.suspicious_ip_threshold;

        let mut counts: HashMap<&str, u64> = HashMap::new();
        let (mut evaluated, mut invalid, mut missing) = (0, 0, 0);

        for record in table.records() {
            let ip = match &record.client_ip {
                FieldValue::Value(ip) => ip.as_str(),
                FieldValue::Invalid(_) => {
                    invalid += 1;
                    continue;
                }
                FieldValue::Null => {
                    missing += 1;
                    continue;
                }
            };
            let weight = if weighted {
                match record.request_count {
                    FieldValue::Value(n) => n,
                    FieldValue::Invalid(_) => {
                        invalid += 1;
                        continue;
                    }
                    FieldValue::Null => {
                        missing += 1;
                        continue;
                    }
                }
            } else {
                1
            };
            evaluated += 1;
            let count = counts.entry(ip).or_insert(0);
            *count = count.saturating_add(weight);
        }

        let mut flagged: Vec<(&str, u64)> = counts
            .into_iter()
            .filter(|&(_, count)| count > threshold)
            .collect();
        flagged.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let findings = flagged
            .into_iter()
            .map(|(ip, count)| Finding {
                kind: FindingKind::HighVolumeIP,
                subject: Subject::Ip(ip.to_string()),
                measured_value: count as f64,
                threshold_used: threshold as f64,
            })
            .collect();

        RuleOutcome::Evaluated(RuleEvaluation {
            threshold: Threshold::Count(threshold),
            evaluated,
            invalid,
            missing,
            findings,
        })
    }
}
