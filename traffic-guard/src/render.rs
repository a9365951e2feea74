//! Report rendering.
//!
//! A renderer turns one [`AnalysisOutput`] into a document. Renderers only
//! read the output; they never recompute findings or statistics.
//!
//! # Examples
//!
//! ```rust
//! use traffic_guard::render::{JsonRenderer, MarkdownRenderer, RenderConfig, ReportRenderer};
//!
//! let json = JsonRenderer::new().with_pretty(false);
//! assert_eq!(json.file_extension(), "json");
//!
//! let markdown = MarkdownRenderer::with_config(RenderConfig::minimal());
//! assert_eq!(markdown.file_extension(), "md");
//! ```

use crate::pipeline::AnalysisOutput;
use crate::prelude::*;
use crate::report::{Finding, FindingKind, RuleOutcome, Severity, Threshold};
use crate::stats::{Computed, SummaryStats, TemporalSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Debug, Write};

/// Options shared by the renderers.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Include per-column statistics
    pub include_columns: bool,
    /// Include histograms, country counts and hourly activity
    pub include_distributions: bool,
    /// Largest number of findings listed per rule; `None` lists all
    pub max_findings: Option<usize>,
    /// Include the run timestamp
    pub include_timestamps: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            include_columns: true,
            include_distributions: true,
            max_findings: None,
            include_timestamps: true,
        }
    }
}

impl RenderConfig {
    /// Only counts and findings, without timestamps.
    pub fn minimal() -> Self {
        Self {
            include_columns: false,
            include_distributions: false,
            max_findings: Some(20),
            include_timestamps: false,
        }
    }

    /// Everything.
    pub fn detailed() -> Self {
        Self::default()
    }

    /// Sets the maximum number of findings listed per rule.
    pub fn with_max_findings(mut self, max: usize) -> Self {
        self.max_findings = Some(max);
        self
    }

    /// Sets whether to include the run timestamp.
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    fn limit<'a>(&self, findings: &'a [Finding]) -> &'a [Finding] {
        match self.max_findings {
            Some(max) => &findings[..max.min(findings.len())],
            None => findings,
        }
    }
}

/// Turns an analysis into a document.
pub trait ReportRenderer: Debug + Send + Sync {
    /// Renders `output`.
    fn render(&self, output: &AnalysisOutput) -> Result<String>;

    /// File extension of the rendered document, without the dot.
    fn file_extension(&self) -> &'static str;
}

#[derive(Serialize)]
struct JsonFinding<'a> {
    #[serde(flatten)]
    finding: &'a Finding,
    severity: Severity,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum JsonOutcome<'a> {
    Evaluated {
        threshold: &'a Threshold,
        evaluated: usize,
        invalid: usize,
        missing: usize,
        findings: Vec<JsonFinding<'a>>,
    },
    Skipped {
        reason: &'a str,
    },
}

#[derive(Serialize)]
struct JsonRule<'a> {
    kind: FindingKind,
    #[serde(flatten)]
    outcome: JsonOutcome<'a>,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    run_at: Option<&'a DateTime<Utc>>,
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a SummaryStats>,
    rules: Vec<JsonRule<'a>>,
    blocklist: Vec<String>,
}

/// Renders the analysis as JSON.
///
/// Every finding is listed with its derived severity next to the rule
/// outcome it belongs to.
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    config: RenderConfig,
    pretty: bool,
}

impl JsonRenderer {
    /// Creates a JSON renderer with the default configuration.
    pub fn new() -> Self {
        Self {
            config: RenderConfig::default(),
            pretty: true,
        }
    }

    /// Creates a JSON renderer with the given configuration.
    pub fn with_config(config: RenderConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, output: &AnalysisOutput) -> Result<String> {
        let config = &self.config;
        let rules = output
            .risk
            .rules
            .iter()
            .map(|rule| JsonRule {
                kind: rule.kind,
                outcome: match &rule.outcome {
                    RuleOutcome::Evaluated(evaluation) => JsonOutcome::Evaluated {
                        threshold: &evaluation.threshold,
                        evaluated: evaluation.evaluated,
                        invalid: evaluation.invalid,
                        missing: evaluation.missing,
                        findings: config
                            .limit(&evaluation.findings)
                            .iter()
                            .map(|finding| JsonFinding {
                                finding,
                                severity: finding.severity(),
                            })
                            .collect(),
                    },
                    RuleOutcome::Skipped { reason } => JsonOutcome::Skipped { reason },
                },
            })
            .collect();

        let document = JsonDocument {
            run_at: config.include_timestamps.then_some(&output.run_at),
            source: &output.source,
            summary: (config.include_columns || config.include_distributions)
                .then_some(&output.summary),
            rules,
            blocklist: output.risk.blocklist(),
        };

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        rendered.map_err(|e| GuardError::Serialization(format!("failed to render JSON: {e}")))
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}

/// Renders the analysis as a Markdown report.
///
/// Sections: data summary, missing values, duplicates, distributions,
/// hourly activity, risk analysis and the blocklist.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    config: RenderConfig,
}

impl MarkdownRenderer {
    /// Creates a Markdown renderer with the given configuration.
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    fn write_document(&self, out: &mut String, output: &AnalysisOutput) -> fmt::Result {
        self.write_summary(out, output)?;
        if self.config.include_distributions {
            self.write_distributions(out, &output.summary)?;
        }
        self.write_risk(out, output)
    }

    fn write_summary(&self, out: &mut String, output: &AnalysisOutput) -> fmt::Result {
        let summary = &output.summary;
        writeln!(out, "# Traffic Analysis Report")?;
        writeln!(out)?;
        writeln!(out, "- Source: {}", output.source)?;
        if self.config.include_timestamps {
            writeln!(out, "- Run at: {}", output.run_at.to_rfc3339())?;
        }
        writeln!(out)?;

        writeln!(out, "## Data Summary")?;
        writeln!(out)?;
        writeln!(out, "- Rows: {}", summary.row_count)?;
        writeln!(out, "- Columns: {}", summary.column_count)?;
        if !summary.unavailable_fields.is_empty() {
            let names: Vec<&str> = summary.unavailable_fields.iter().map(|f| f.as_str()).collect();
            writeln!(out, "- Unavailable fields: {}", names.join(", "))?;
        }
        writeln!(out)?;

        if self.config.include_columns {
            writeln!(out, "## Missing Values")?;
            writeln!(out)?;
            writeln!(out, "| Column | Non-null | Null | Mean | Min | Median | Max |")?;
            writeln!(out, "|---|---:|---:|---:|---:|---:|---:|")?;
            for column in &summary.columns {
                match &column.numeric {
                    Some(n) => writeln!(
                        out,
                        "| {} | {} | {} | {:.2} | {} | {} | {} |",
                        column.name, column.non_null, column.null, n.mean, n.min, n.median, n.max
                    )?,
                    None => writeln!(
                        out,
                        "| {} | {} | {} | | | | |",
                        column.name, column.non_null, column.null
                    )?,
                }
            }
            writeln!(out)?;
        }

        writeln!(out, "## Duplicates")?;
        writeln!(out)?;
        writeln!(out, "- Duplicate rows: {}", summary.duplicate_rows)?;
        writeln!(out)?;
        Ok(())
    }

    fn write_distributions(&self, out: &mut String, summary: &SummaryStats) -> fmt::Result {
        writeln!(out, "## Distributions")?;
        writeln!(out)?;

        writeln!(out, "### Request Size")?;
        writeln!(out)?;
        match &summary.request_bytes {
            Computed::Available(histogram) => {
                writeln!(out, "| Bytes | Requests |")?;
                writeln!(out, "|---|---:|")?;
                for bucket in histogram.buckets.iter().filter(|b| b.count > 0) {
                    writeln!(
                        out,
                        "| {:.0} - {:.0} | {} |",
                        bucket.lower_bound, bucket.upper_bound, bucket.count
                    )?;
                }
            }
            Computed::Skipped { reason } => writeln!(out, "_Skipped: {reason}_")?,
        }
        writeln!(out)?;

        writeln!(out, "### Top Countries")?;
        writeln!(out)?;
        match &summary.top_countries {
            Computed::Available(countries) => {
                writeln!(out, "| Country | Requests |")?;
                writeln!(out, "|---|---:|")?;
                for country in countries {
                    writeln!(out, "| {} | {} |", country.value, country.count)?;
                }
            }
            Computed::Skipped { reason } => writeln!(out, "_Skipped: {reason}_")?,
        }
        writeln!(out)?;

        writeln!(out, "## Hourly Activity")?;
        writeln!(out)?;
        match &summary.temporal {
            TemporalSummary::Unavailable { reason } => writeln!(out, "_Skipped: {reason}_")?,
            TemporalSummary::NoTemporalData { invalid, missing } => writeln!(
                out,
                "_No temporal data: {invalid} invalid and {missing} missing timestamps_"
            )?,
            TemporalSummary::Hourly {
                buckets,
                invalid,
                missing,
                ..
            } => {
                writeln!(out, "| Hour | Requests |")?;
                writeln!(out, "|---|---:|")?;
                for bucket in buckets {
                    writeln!(out, "| {} | {} |", bucket.hour.format("%Y-%m-%d %H:00"), bucket.count)?;
                }
                if invalid + missing > 0 {
                    writeln!(out)?;
                    writeln!(out, "{invalid} invalid and {missing} missing timestamps excluded.")?;
                }
            }
        }
        writeln!(out)?;
        Ok(())
    }

    fn write_risk(&self, out: &mut String, output: &AnalysisOutput) -> fmt::Result {
        writeln!(out, "## Risk Analysis")?;
        writeln!(out)?;
        writeln!(out, "Total findings: {}", output.risk.total_findings())?;
        writeln!(out)?;

        for rule in &output.risk.rules {
            writeln!(out, "### {}", rule.kind)?;
            writeln!(out)?;
            let evaluation = match &rule.outcome {
                RuleOutcome::Skipped { reason } => {
                    writeln!(out, "_Skipped: {reason}_")?;
                    writeln!(out)?;
                    continue;
                }
                RuleOutcome::Evaluated(evaluation) => evaluation,
            };

            writeln!(out, "- Threshold: {}", evaluation.threshold)?;
            writeln!(
                out,
                "- Evaluated: {} (invalid: {}, missing: {})",
                evaluation.evaluated, evaluation.invalid, evaluation.missing
            )?;
            writeln!(out, "- Findings: {}", evaluation.findings.len())?;
            writeln!(out)?;

            let shown = self.config.limit(&evaluation.findings);
            if shown.is_empty() {
                continue;
            }
            let unit = match evaluation.threshold {
                Threshold::Count(_) => "Requests",
                Threshold::Bytes { .. } => "Bytes",
                Threshold::Window(_) => "Hour",
            };
            writeln!(out, "| Subject | {unit} | Severity |")?;
            writeln!(out, "|---|---:|---|")?;
            for finding in shown {
                writeln!(
                    out,
                    "| {} | {} | {} |",
                    finding.subject,
                    finding.measured_value,
                    finding.severity()
                )?;
            }
            if shown.len() < evaluation.findings.len() {
                writeln!(out)?;
                writeln!(
                    out,
                    "... and {} more",
                    evaluation.findings.len() - shown.len()
                )?;
            }
            writeln!(out)?;
        }

        let blocklist = output.risk.blocklist();
        writeln!(out, "## Blocklist")?;
        writeln!(out)?;
        if blocklist.is_empty() {
            writeln!(out, "No addresses flagged for blocking.")?;
        } else {
            for ip in blocklist {
                writeln!(out, "- {ip}")?;
            }
        }
        Ok(())
    }
}

impl ReportRenderer for MarkdownRenderer {
    fn render(&self, output: &AnalysisOutput) -> Result<String> {
        let mut out = String::new();
        self.write_document(&mut out, output)
            .map_err(|e| GuardError::Internal(format!("failed to render Markdown: {e}")))?;
        Ok(out)
    }

    fn file_extension(&self) -> &'static str {
        "md"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RiskConfig, SummaryConfig};
    use crate::logging::LogConfig;
    use crate::rules::RiskEngine;
    use crate::schema::AliasTable;
    use crate::stats::summarize;
    use crate::table::TrafficTable;

    fn output() -> AnalysisOutput {
        let mut rows = vec![vec![Some("1.2.3.4"), Some("100"), Some("2024-01-01 02:00:00")]; 4];
        rows.push(vec![Some("5.6.7.8"), Some("9000"), Some("2024-01-01 12:00:00")]);
        let table = TrafficTable::from_rows(
            &["ClientIP", "bytes", "timestamp"],
            rows,
            &AliasTable::default(),
        );
        let risk = RiskConfig::default().with_suspicious_ip_threshold(3);
        AnalysisOutput {
            run_at: Utc::now(),
            source: "fixture".to_string(),
            summary: summarize(&table, &SummaryConfig::default()),
            risk: RiskEngine::standard().score(&table, &risk, &LogConfig::default()),
        }
    }

    #[test]
    fn test_json_includes_severity_and_blocklist() {
        let rendered = JsonRenderer::new().render(&output()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["blocklist"], serde_json::json!(["1.2.3.4"]));
        let volume = &value["rules"][0];
        assert_eq!(volume["kind"], "HighVolumeIP");
        assert_eq!(volume["status"], "evaluated");
        assert_eq!(volume["findings"][0]["severity"], "low");
        assert_eq!(volume["findings"][0]["measured_value"], 4.0);
        assert_eq!(volume["findings"][0]["subject"]["ip"], "1.2.3.4");
        assert!(value.get("run_at").is_some());
    }

    #[test]
    fn test_json_without_timestamps_is_deterministic() {
        let renderer = JsonRenderer::with_config(RenderConfig::default().with_timestamps(false));
        let a = renderer.render(&output()).unwrap();
        let b = renderer.render(&output()).unwrap();
        assert_eq!(a, b);
        assert!(!a.contains("run_at"));
    }

    #[test]
    fn test_markdown_sections() {
        let rendered = MarkdownRenderer::default().render(&output()).unwrap();
        for heading in [
            "# Traffic Analysis Report",
            "## Data Summary",
            "## Missing Values",
            "## Duplicates",
            "## Distributions",
            "## Hourly Activity",
            "## Risk Analysis",
            "### HighVolumeIP",
            "### OversizedRequest",
            "### AfterHours",
            "## Blocklist",
        ] {
            assert!(rendered.contains(heading), "missing {heading}");
        }
        assert!(rendered.contains("- Duplicate rows: 3"));
        assert!(rendered.contains("- 1.2.3.4"));
    }

    #[test]
    fn test_markdown_shows_skip_reasons() {
        let table = TrafficTable::from_rows(
            &["ClientIP"],
            vec![vec![Some("1.1.1.1")]],
            &AliasTable::default(),
        );
        let output = AnalysisOutput {
            run_at: Utc::now(),
            source: "fixture".to_string(),
            summary: summarize(&table, &SummaryConfig::default()),
            risk: RiskEngine::standard().score(&table, &RiskConfig::default(), &LogConfig::default()),
        };
        let rendered = MarkdownRenderer::with_config(RenderConfig::minimal())
            .render(&output)
            .unwrap();
        assert!(rendered.contains("_Skipped: request_bytes field unavailable_"));
        assert!(rendered.contains("_Skipped: timestamp field unavailable_"));
        assert!(!rendered.contains("## Distributions"));
        assert!(!rendered.contains("Run at"));
    }
}
