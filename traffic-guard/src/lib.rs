//! # traffic-guard - risk scoring for network-traffic logs
//!
//! traffic-guard loads tabular traffic logs (CDN edge exports, proxy logs,
//! pre-aggregated per-IP counts), flags anomalous clients, and produces a
//! descriptive summary of the data, all from one read-only snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use traffic_guard::pipeline::{Pipeline, PipelineConfig};
//! use traffic_guard::render::JsonRenderer;
//! use traffic_guard::report::FindingKind;
//! use traffic_guard::sources::CsvSource;
//!
//! # async fn example() -> traffic_guard::error::Result<()> {
//! let mut pipeline = Pipeline::new(PipelineConfig::default())?;
//! let run = pipeline
//!     .run(&CsvSource::new("logs/cloudflare.csv"), &JsonRenderer::new())
//!     .await?;
//!
//! for finding in run.output.risk.findings(FindingKind::HighVolumeIP) {
//!     println!("{} sent {} requests ({})", finding.subject, finding.measured_value, finding.severity());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Rules
//!
//! | Rule | Flags | Needs |
//! |---|---|---|
//! | `HighVolumeIP` | addresses with more than `suspicious_ip_threshold` requests | client address |
//! | `OversizedRequest` | requests above the `oversized_percentile` of request sizes | request bytes |
//! | `AfterHours` | requests before `start_hour` or after `end_hour` | timestamp |
//!
//! A rule whose column is missing is reported as skipped with a reason; it
//! never fails the run. Cells that fail to parse are excluded and counted.
//!
//! ## Architecture
//!
//! - **`schema`**: resolves source column names to semantic fields via an alias table
//! - **`table`**: the immutable, typed traffic table
//! - **`sources`**: CSV (via DataFusion) and in-memory sources
//! - **`rules`**: the risk rules and the engine that runs them
//! - **`stats`**: the descriptive summary
//! - **`pipeline`**: the load, aggregate, score, render state machine
//! - **`render`**: JSON and Markdown renderers
//! - **`blocklist`**: the hand-off file for a blocking step

pub mod blocklist;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod prelude;
pub mod render;
pub mod report;
pub mod rules;
pub mod schema;
pub mod sources;
pub mod stats;
pub mod table;
