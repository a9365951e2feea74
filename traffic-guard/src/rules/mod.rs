//! Risk rules and the engine that runs them.
//!
//! Each rule is a pure function of a read-only [`TrafficTable`] and a
//! [`RiskConfig`]. A rule whose required field did not resolve reports
//! [`RuleOutcome::Skipped`]; a missing column is never a pipeline failure.
//!
//! Rules cannot observe one another. The engine assembles their outcomes
//! in a fixed order (HighVolumeIP, OversizedRequest, AfterHours) that does
//! not depend on evaluation order.
//!
//! ```rust
//! use traffic_guard::config::RiskConfig;
//! use traffic_guard::logging::LogConfig;
//! use traffic_guard::report::FindingKind;
//! use traffic_guard::rules::RiskEngine;
//! use traffic_guard::schema::AliasTable;
//! use traffic_guard::table::TrafficTable;
//!
//! let rows = (0..3).map(|_| vec![Some("10.0.0.1")]);
//! let table = TrafficTable::from_rows(&["ClientIP"], rows, &AliasTable::default());
//! let config = RiskConfig::default().with_suspicious_ip_threshold(2);
//!
//! let report = RiskEngine::standard().score(&table, &config, &LogConfig::default());
//! assert_eq!(report.blocklist(), vec!["10.0.0.1".to_string()]);
//! assert!(report.skip_reason(FindingKind::AfterHours).is_some());
//! ```

pub mod after_hours;
pub mod high_volume;
pub mod oversized;

pub use after_hours::AfterHoursRule;
pub use high_volume::HighVolumeIpRule;
pub use oversized::OversizedRequestRule;

use crate::config::RiskConfig;
use crate::log_rule;
use crate::logging::LogConfig;
use crate::report::{FindingKind, RiskReport, RuleOutcome, RuleReport};
use crate::schema::{ResolvedSchema, SemanticField};
use crate::table::TrafficTable;
use std::fmt::Debug;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// A detection rule.
pub trait RiskRule: Debug + Send + Sync {
    /// The kind of finding this rule produces.
    fn kind(&self) -> FindingKind;

    /// The semantic field the rule cannot run without.
    fn required_field(&self) -> SemanticField;

    /// Evaluates the rule against a table whose required field resolved.
    fn evaluate_available(&self, table: &TrafficTable, config: &RiskConfig) -> RuleOutcome;

    /// Evaluates the rule, skipping it when its required field is unavailable.
    fn evaluate(&self, table: &TrafficTable, config: &RiskConfig) -> RuleOutcome {
        let field = self.required_field();
        if !table.is_available(field) {
            return RuleOutcome::skipped(ResolvedSchema::unavailable_reason(field));
        }
        self.evaluate_available(table, config)
    }
}

/// Runs a fixed sequence of rules and merges their outcomes.
#[derive(Debug)]
pub struct RiskEngine {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RiskEngine {
    /// The three standard rules in report order.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                Box::new(HighVolumeIpRule),
                Box::new(OversizedRequestRule),
                Box::new(AfterHoursRule),
            ],
        }
    }

    /// The rules this engine runs, in report order.
    pub fn rules(&self) -> &[Box<dyn RiskRule>] {
        &self.rules
    }

    /// Evaluates every rule against the same table snapshot.
    #[instrument(skip_all, fields(table.rows = table.row_count(), rules.count = self.rules.len()))]
    pub fn score(&self, table: &TrafficTable, config: &RiskConfig, log: &LogConfig) -> RiskReport {
        let start = Instant::now();

        let rules: Vec<RuleReport> = self
            .rules
            .iter()
            .map(|rule| {
                let kind = rule.kind();
                let outcome = rule.evaluate(table, config);
                match &outcome {
                    RuleOutcome::Skipped { reason } => {
                        warn!(rule.kind = %kind, rule.reason = %reason, "Rule skipped");
                    }
                    RuleOutcome::Evaluated(evaluation) => {
                        log_rule!(
                            log,
                            rule.kind = %kind,
                            rule.threshold = %evaluation.threshold,
                            rule.evaluated = evaluation.evaluated,
                            rule.invalid = evaluation.invalid,
                            rule.missing = evaluation.missing,
                            rule.findings = evaluation.findings.len(),
                            "Rule evaluated"
                        );
                    }
                }
                RuleReport { kind, outcome }
            })
            .collect();

        let report = RiskReport { rules };
        info!(
            risk.findings = report.total_findings(),
            risk.blocklist = report.blocklist().len(),
            risk.duration_ms = start.elapsed().as_millis() as u64,
            "Risk scoring completed"
        );
        report
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AliasTable;

    #[test]
    fn test_standard_rule_order() {
        let kinds: Vec<FindingKind> = RiskEngine::standard().rules().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, FindingKind::ALL.to_vec());
    }

    #[test]
    fn test_every_rule_is_reported_even_when_skipped() {
        let table = TrafficTable::from_rows(
            &["unrelated"],
            vec![vec![Some("x")]],
            &AliasTable::default(),
        );
        let report = RiskEngine::standard().score(&table, &RiskConfig::default(), &LogConfig::default());

        assert_eq!(report.rules.len(), 3);
        assert_eq!(
            report.skip_reason(FindingKind::HighVolumeIP),
            Some("client_ip field unavailable")
        );
        assert_eq!(
            report.skip_reason(FindingKind::OversizedRequest),
            Some("request_bytes field unavailable")
        );
        assert_eq!(
            report.skip_reason(FindingKind::AfterHours),
            Some("timestamp field unavailable")
        );
    }

    #[test]
    fn test_scoring_does_not_mutate_the_table() {
        let table = TrafficTable::from_rows(
            &["ClientIP", "bytes", "timestamp"],
            vec![
                vec![Some("1.1.1.1"), Some("10"), Some("2024-01-01 23:00:00")],
                vec![Some("2.2.2.2"), Some("999"), Some("2024-01-01 03:00:00")],
            ],
            &AliasTable::default(),
        );
        let before = table.clone();
        let _ = RiskEngine::standard().score(&table, &RiskConfig::default(), &LogConfig::verbose());
        assert_eq!(table, before);
    }
}
