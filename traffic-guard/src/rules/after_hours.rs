//! Flags requests that started outside business hours.

use super::RiskRule;
use crate::config::RiskConfig;
use crate::report::{Finding, FindingKind, RuleEvaluation, RuleOutcome, Subject, Threshold};
use crate::schema::SemanticField;
use crate::table::{FieldValue, TrafficTable};
use chrono::Timelike;

/// Flags every request whose hour of day is before `start_hour` or after
/// `end_hour`.
///
/// Both boundary hours are normal: with the default window 08:00 and 18:59
/// pass, 07:59 and 19:00 are flagged. Rows with unparseable timestamps are
/// left out of the evaluation and tallied as invalid.
#[derive(Debug, Clone, Copy, Default)]
pub struct AfterHoursRule;

impl RiskRule for AfterHoursRule {
    fn kind(&self) -> FindingKind {
        FindingKind::AfterHours
    }

    fn required_field(&self) -> SemanticField {
        SemanticField::Timestamp
    }

    fn evaluate_available(&self, table: &TrafficTable, config: &RiskConfig) -> RuleOutcome {
        let hours = config.business_hours;
        let (mut evaluated, mut invalid, mut missing) = (0, 0, 0);
        let mut findings = Vec::new();

        for record in table.records() {
            let ts = match &record.timestamp {
                FieldValue::Value(ts) => ts,
                FieldValue::Invalid(_) => {
                    invalid += 1;
                    continue;
                }
                FieldValue::Null => {
                    missing += 1;
                    continue;
                }
            };
            evaluated += 1;

            let hour = ts.hour();
            if let Some(bound) = hours.violated_bound(hour) {
                findings.push(Finding {
                    kind: FindingKind::AfterHours,
                    subject: Subject::Record {
                        row: record.row,
                        client_ip: record.client_ip().map(str::to_string),
                    },
                    measured_value: f64::from(hour),
                    threshold_used: f64::from(bound),
                });
            }
        }

        RuleOutcome::Evaluated(RuleEvaluation {
            threshold: Threshold::Window(hours),
            evaluated,
            invalid,
            missing,
            findings,
        })
    }
}
