//! Findings and the risk report assembled from them.

use crate::config::BusinessHours;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of anomaly a rule detects.
///
/// The declaration order is the order in which rules run and in which
/// their outcomes appear in a [`RiskReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingKind {
    /// A client sent more requests than the configured threshold.
    HighVolumeIP,
    /// A request was larger than the configured percentile of request sizes.
    OversizedRequest,
    /// A request started outside business hours.
    AfterHours,
}

impl FindingKind {
    /// All kinds, in report order.
    pub const ALL: [FindingKind; 3] = [
        FindingKind::HighVolumeIP,
        FindingKind::OversizedRequest,
        FindingKind::AfterHours,
    ];

    /// Returns the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::HighVolumeIP => "HighVolumeIP",
            FindingKind::OversizedRequest => "OversizedRequest",
            FindingKind::AfterHours => "AfterHours",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How far a finding is past its threshold.
///
/// Levels are ordered: Critical > High > Medium > Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Just past the threshold
    Low = 0,
    /// Clearly past the threshold
    Medium = 1,
    /// Far past the threshold
    High = 2,
    /// An order of magnitude past the threshold
    Critical = 3,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Checks if this severity is at least as high as another.
    ///
    /// ```rust
    /// use traffic_guard::report::Severity;
    ///
    /// assert!(Severity::Critical.is_at_least(Severity::High));
    /// assert!(!Severity::Low.is_at_least(Severity::Medium));
    /// ```
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }

    fn from_ratio(measured: f64, threshold: f64) -> Self {
        if threshold <= 0.0 {
            return if measured > 0.0 {
                Severity::Critical
            } else {
                Severity::Low
            };
        }
        match measured / threshold {
            r if r >= 10.0 => Severity::Critical,
            r if r >= 3.0 => Severity::High,
            r if r >= 1.5 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    fn from_hour_distance(distance: f64) -> Self {
        match distance {
            d if d >= 6.0 => Severity::High,
            d if d >= 3.0 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a finding is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A client address
    Ip(String),
    /// A single request row
    Record {
        /// Zero-based row in the source
        row: usize,
        /// The row's client address, if it had one
        client_ip: Option<String>,
    },
}

impl Subject {
    /// The client address this subject refers to, if known.
    pub fn ip(&self) -> Option<&str> {
        match self {
            Subject::Ip(ip) => Some(ip),
            Subject::Record { client_ip, .. } => client_ip.as_deref(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Ip(ip) => write!(f, "{ip}"),
            Subject::Record {
                row,
                client_ip: Some(ip),
            } => write!(f, "row {row} ({ip})"),
            Subject::Record {
                row,
                client_ip: None,
            } => write!(f, "row {row}"),
        }
    }
}

/// One flagged anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// The rule that produced it
    pub kind: FindingKind,
    /// What was flagged
    pub subject: Subject,
    /// The value the rule measured (request count, bytes, or hour of day)
    pub measured_value: f64,
    /// The threshold the value was compared against
    pub threshold_used: f64,
}

impl Finding {
    /// Derives the severity from how far the measurement is past the threshold.
    ///
    /// Volume and size findings use the ratio `measured / threshold`.
    /// After-hours findings use the distance in hours from the violated
    /// business-hour bound.
    pub fn severity(&self) -> Severity {
        match self.kind {
            FindingKind::HighVolumeIP | FindingKind::OversizedRequest => {
                Severity::from_ratio(self.measured_value, self.threshold_used)
            }
            FindingKind::AfterHours => {
                Severity::from_hour_distance((self.measured_value - self.threshold_used).abs())
            }
        }
    }
}

/// The cutoff a rule applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    /// A request count; values strictly above it are flagged
    Count(u64),
    /// A request size derived from a percentile; values strictly above it are flagged
    Bytes {
        /// The percentile in (0, 1)
        percentile: f64,
        /// The computed cutoff
        cutoff: f64,
    },
    /// The business-hour window; hours outside it are flagged
    Window(BusinessHours),
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Count(count) => write!(f, "> {count} requests"),
            Threshold::Bytes { percentile, cutoff } => {
                write!(f, "> {cutoff:.2} bytes (p{})", percentile * 100.0)
            }
            Threshold::Window(hours) => write!(f, "outside {hours}h"),
        }
    }
}

/// What an evaluated rule looked at and what it found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Cutoff applied
    pub threshold: Threshold,
    /// Rows that took part in the evaluation
    pub evaluated: usize,
    /// Rows excluded because a required cell did not parse
    pub invalid: usize,
    /// Rows excluded because a required cell was empty
    pub missing: usize,
    /// Findings, in the rule's deterministic order
    pub findings: Vec<Finding>,
}

/// Result of running one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleOutcome {
    /// The rule ran.
    Evaluated(RuleEvaluation),
    /// The rule could not run; this is not a failure of the pipeline.
    Skipped {
        /// Why the rule did not run
        reason: String,
    },
}

impl RuleOutcome {
    /// Creates a skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        RuleOutcome::Skipped {
            reason: reason.into(),
        }
    }

    /// Returns true if the rule was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, RuleOutcome::Skipped { .. })
    }

    /// The findings; empty when skipped.
    pub fn findings(&self) -> &[Finding] {
        match self {
            RuleOutcome::Evaluated(evaluation) => &evaluation.findings,
            RuleOutcome::Skipped { .. } => &[],
        }
    }
}

/// One rule's outcome, attributed to its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleReport {
    /// The rule
    pub kind: FindingKind,
    /// What happened
    pub outcome: RuleOutcome,
}

/// Findings and skip reasons of every rule, in fixed rule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// One entry per rule
    pub rules: Vec<RuleReport>,
}

impl RiskReport {
    /// The outcome of the rule of `kind`, if it ran.
    pub fn outcome(&self, kind: FindingKind) -> Option<&RuleOutcome> {
        self.rules
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| &r.outcome)
    }

    /// Findings of one rule.
    pub fn findings(&self, kind: FindingKind) -> &[Finding] {
        self.outcome(kind)
            .map(RuleOutcome::findings)
            .unwrap_or(&[])
    }

    /// Every finding, in rule order.
    pub fn all_findings(&self) -> impl Iterator<Item = &Finding> {
        self.rules.iter().flat_map(|r| r.outcome.findings())
    }

    /// Total number of findings.
    pub fn total_findings(&self) -> usize {
        self.all_findings().count()
    }

    /// Why the rule of `kind` was skipped, if it was.
    pub fn skip_reason(&self, kind: FindingKind) -> Option<&str> {
        match self.outcome(kind)? {
            RuleOutcome::Skipped { reason } => Some(reason),
            RuleOutcome::Evaluated(_) => None,
        }
    }

    /// Client addresses flagged for volume, in report order.
    ///
    /// This is the list handed to a downstream blocking step.
    pub fn blocklist(&self) -> Vec<String> {
        self.findings(FindingKind::HighVolumeIP)
            .iter()
            .filter_map(|f| match &f.subject {
                Subject::Ip(ip) => Some(ip.clone()),
                Subject::Record { .. } => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(kind: FindingKind, measured: f64, threshold: f64) -> Finding {
        Finding {
            kind,
            subject: Subject::Ip("1.2.3.4".to_string()),
            measured_value: measured,
            threshold_used: threshold,
        }
    }

    #[test]
    fn test_ratio_severity() {
        let cases = [
            (101.0, Severity::Low),
            (150.0, Severity::Medium),
            (300.0, Severity::High),
            (1000.0, Severity::Critical),
        ];
        for (measured, expected) in cases {
            assert_eq!(
                finding(FindingKind::HighVolumeIP, measured, 100.0).severity(),
                expected,
                "measured {measured}"
            );
        }
        assert_eq!(
            finding(FindingKind::OversizedRequest, 5.0, 0.0).severity(),
            Severity::Critical
        );
    }

    #[test]
    fn test_after_hours_severity() {
        assert_eq!(finding(FindingKind::AfterHours, 19.0, 18.0).severity(), Severity::Low);
        assert_eq!(finding(FindingKind::AfterHours, 21.0, 18.0).severity(), Severity::Medium);
        assert_eq!(finding(FindingKind::AfterHours, 2.0, 8.0).severity(), Severity::High);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Medium.is_at_least(Severity::Low));
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }

    #[test]
    fn test_report_accessors() {
        let report = RiskReport {
            rules: vec![
                RuleReport {
                    kind: FindingKind::HighVolumeIP,
                    outcome: RuleOutcome::Evaluated(RuleEvaluation {
                        threshold: Threshold::Count(100),
                        evaluated: 155,
                        invalid: 0,
                        missing: 0,
                        findings: vec![finding(FindingKind::HighVolumeIP, 150.0, 100.0)],
                    }),
                },
                RuleReport {
                    kind: FindingKind::OversizedRequest,
                    outcome: RuleOutcome::skipped("request_bytes field unavailable"),
                },
            ],
        };

        assert_eq!(report.blocklist(), vec!["1.2.3.4".to_string()]);
        assert_eq!(report.total_findings(), 1);
        assert_eq!(
            report.skip_reason(FindingKind::OversizedRequest),
            Some("request_bytes field unavailable")
        );
        assert_eq!(report.skip_reason(FindingKind::HighVolumeIP), None);
        assert!(report.findings(FindingKind::AfterHours).is_empty());
    }

    #[test]
    fn test_threshold_display() {
        assert_eq!(Threshold::Count(100).to_string(), "> 100 requests");
        assert_eq!(
            Threshold::Window(BusinessHours::new(8, 18)).to_string(),
            "outside 8-18h"
        );
    }

    #[test]
    fn test_subject_display() {
        assert_eq!(Subject::Ip("9.9.9.9".into()).to_string(), "9.9.9.9");
        let record = Subject::Record {
            row: 3,
            client_ip: Some("9.9.9.9".into()),
        };
        assert_eq!(record.to_string(), "row 3 (9.9.9.9)");
        assert_eq!(record.ip(), Some("9.9.9.9"));
    }
}
