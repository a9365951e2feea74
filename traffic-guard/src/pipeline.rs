//! Run orchestration: load, aggregate, score, render.
//!
//! A [`Pipeline`] moves through a linear sequence of states:
//!
//! ```text
//! Idle -> Loaded -> Aggregated -> Scored -> Rendered -> Done
//! ```
//!
//! Any transition may instead end in [`PipelineState::Failed`], which names
//! the stage that could not be reached and why. Nothing runs after a failure
//! and no transition is retried.
//!
//! The summary and the risk report are both computed from the same loaded
//! [`TrafficTable`], which no stage mutates.
//!
//! # Examples
//!
//! ```rust,no_run
//! use traffic_guard::pipeline::{Pipeline, PipelineConfig};
//! use traffic_guard::render::MarkdownRenderer;
//! use traffic_guard::sources::CsvSource;
//!
//! # async fn example() -> traffic_guard::error::Result<()> {
//! let mut pipeline = Pipeline::new(PipelineConfig::default())?;
//! let run = pipeline
//!     .run(&CsvSource::new("logs/traffic.csv"), &MarkdownRenderer::default())
//!     .await?;
//!
//! println!("{}", run.document);
//! for ip in run.output.risk.blocklist() {
//!     println!("block {ip}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::{RiskConfig, SummaryConfig};
use crate::log_data_op;
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use crate::render::ReportRenderer;
use crate::report::RiskReport;
use crate::rules::RiskEngine;
use crate::schema::AliasTable;
use crate::sources::TrafficSource;
use crate::stats::{summarize, SummaryStats};
use crate::table::TrafficTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// A stage of the pipeline, named after the state it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Reading the source into a table
    Loaded,
    /// Computing the descriptive summary
    Aggregated,
    /// Running the risk rules
    Scored,
    /// Producing the document
    Rendered,
}

impl Stage {
    /// Returns the string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loaded => "Loaded",
            Stage::Aggregated => "Aggregated",
            Stage::Scored => "Scored",
            Stage::Rendered => "Rendered",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a pipeline is in its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet
    Idle,
    /// The source was read into a non-empty table
    Loaded,
    /// The summary was computed
    Aggregated,
    /// The risk rules ran
    Scored,
    /// The document was rendered
    Rendered,
    /// The run completed
    Done,
    /// A stage could not be reached
    Failed {
        /// The stage that failed
        stage: Stage,
        /// The causing condition
        cause: String,
    },
}

impl PipelineState {
    /// Returns true if the run failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineState::Failed { .. })
    }
}

/// Everything a run is configured with, built once up front.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Rule thresholds
    pub risk: RiskConfig,
    /// Summary options
    pub summary: SummaryConfig,
    /// Column aliases used to resolve the schema
    pub aliases: AliasTable,
    /// Logging verbosity
    pub log: LogConfig,
}

impl PipelineConfig {
    /// Sets the rule thresholds.
    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    /// Sets the summary options.
    pub fn with_summary(mut self, summary: SummaryConfig) -> Self {
        self.summary = summary;
        self
    }

    /// Sets the alias table.
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Sets the logging verbosity.
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Rejects configurations no run could use.
    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        self.summary.validate()
    }
}

/// The value handed to a renderer.
///
/// Equality ignores `run_at`, so two runs over identical input compare
/// equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// When the run started
    pub run_at: DateTime<Utc>,
    /// Description of the analyzed source
    pub source: String,
    /// Descriptive statistics
    pub summary: SummaryStats,
    /// Findings and skip reasons
    pub risk: RiskReport,
}

impl AnalysisOutput {
    /// The part of the output that is a pure function of the input.
    pub fn comparable(&self) -> (&SummaryStats, &RiskReport) {
        (&self.summary, &self.risk)
    }
}

impl PartialEq for AnalysisOutput {
    fn eq(&self, other: &Self) -> bool {
        self.comparable() == other.comparable()
    }
}

/// A completed run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The analysis that was rendered
    pub output: AnalysisOutput,
    /// The rendered document
    pub document: String,
    /// File extension of the document, without the dot
    pub extension: &'static str,
}

/// Drives one run at a time through the pipeline stages.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    engine: RiskEngine,
    state: PipelineState,
}

impl Pipeline {
    /// Validates `config` and creates an idle pipeline.
    ///
    /// Invalid configuration is rejected here, before any stage can run.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine: RiskEngine::standard(),
            state: PipelineState::Idle,
        })
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The state reached by the most recent run.
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Runs every stage and renders the result.
    #[instrument(skip_all, fields(source = %source.description()))]
    pub async fn run(
        &mut self,
        source: &dyn TrafficSource,
        renderer: &dyn ReportRenderer,
    ) -> Result<PipelineRun> {
        let start = Instant::now();
        let output = self.analyze(source).await?;

        let document = match renderer.render(&output) {
            Ok(document) => document,
            Err(e) => return Err(self.fail(Stage::Rendered, e)),
        };
        self.state = PipelineState::Rendered;
        debug!(render.format = renderer.file_extension(), "Rendered analysis output");

        self.state = PipelineState::Done;

        info!(
            pipeline.duration_ms = start.elapsed().as_millis() as u64,
            render.bytes = document.len(),
            render.format = renderer.file_extension(),
            "Pipeline run completed"
        );

        Ok(PipelineRun {
            output,
            document,
            extension: renderer.file_extension(),
        })
    }

    /// Runs load, aggregate and score without rendering.
    pub async fn analyze(&mut self, source: &dyn TrafficSource) -> Result<AnalysisOutput> {
        self.state = PipelineState::Idle;
        let run_at = Utc::now();
        let description = source.description();

        let table = match self.load(source).await {
            Ok(table) => table,
            Err(e) => return Err(self.fail(Stage::Loaded, e)),
        };
        self.state = PipelineState::Loaded;

        let summary = summarize(&table, &self.config.summary);
        self.state = PipelineState::Aggregated;

        let risk = self
            .engine
            .score(&table, &self.config.risk, &self.config.log);
        self.state = PipelineState::Scored;

        Ok(AnalysisOutput {
            run_at,
            source: description,
            summary,
            risk,
        })
    }

    async fn load(&self, source: &dyn TrafficSource) -> Result<TrafficTable> {
        let batches = source.load().await?;
        let table = TrafficTable::from_batches(&batches, &self.config.aliases)?;
        if table.is_empty() {
            return Err(GuardError::source_empty(source.description()));
        }

        log_data_op!(
            self.config.log,
            table.rows = table.row_count(),
            table.columns = table.column_count(),
            schema.unavailable = ?table.schema().unavailable(),
            "Loaded traffic table"
        );
        Ok(table)
    }

    fn fail(&mut self, stage: Stage, cause: GuardError) -> GuardError {
        let message = cause.to_string();
        error!(
            pipeline.stage = %stage,
            error = %truncate_field(&message, self.config.log.max_field_length),
            "Pipeline stage failed"
        );
        self.state = PipelineState::Failed {
            stage,
            cause: message,
        };
        GuardError::stage_failed(stage, cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Loaded.to_string(), "Loaded");
        assert_eq!(Stage::Rendered.to_string(), "Rendered");
    }

    #[test]
    fn test_invalid_config_rejected_before_any_stage() {
        let config = PipelineConfig::default()
            .with_risk(RiskConfig::default().with_oversized_percentile(1.5));
        let err = Pipeline::new(config).unwrap_err();
        assert!(err.is_config_invalid());
        assert_eq!(err.failed_stage(), None);
    }

    #[test]
    fn test_new_pipeline_is_idle() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        assert_eq!(pipeline.state(), &PipelineState::Idle);
        assert!(!pipeline.state().is_failed());
    }
}
