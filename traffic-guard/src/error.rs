//! Error types for the traffic-guard pipeline.
//!
//! Only fatal conditions are represented here. Degraded capabilities (a
//! semantic field with no matching column, a cell that fails to parse) are
//! carried as values inside [`RiskReport`](crate::report::RiskReport) and
//! [`SummaryStats`](crate::stats::SummaryStats) instead.

use crate::pipeline::Stage;
use thiserror::Error;

/// The main error type for traffic-guard.
#[derive(Error, Debug)]
pub enum GuardError {
    /// The input could not be opened or read.
    #[error("source unavailable: {message}")]
    SourceUnavailable {
        /// Type of source (e.g., "CSV", "memory")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The input was readable but held zero records.
    #[error("source empty: {description} contains no records")]
    SourceEmpty {
        /// Human-readable description of the source
        description: String,
    },

    /// Configuration rejected before any stage ran.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A pipeline stage failed; wraps the causing condition.
    #[error("{stage} failed: {cause}")]
    StageFailed {
        /// The stage that could not be reached
        stage: Stage,
        /// The causing condition
        #[source]
        cause: Box<GuardError>,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from serialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GuardError>`.
pub type Result<T> = std::result::Result<T, GuardError>;

impl GuardError {
    /// Creates a new source-unavailable error.
    pub fn source_unavailable(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new source-unavailable error with an underlying cause.
    pub fn source_unavailable_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::SourceUnavailable {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new source-empty error.
    pub fn source_empty(description: impl Into<String>) -> Self {
        Self::SourceEmpty {
            description: description.into(),
        }
    }

    /// Creates a new invalid-configuration error.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid(message.into())
    }

    /// Wraps an error as the failure of `stage`.
    pub fn stage_failed(stage: Stage, cause: GuardError) -> Self {
        Self::StageFailed {
            stage,
            cause: Box::new(cause),
        }
    }

    /// Returns the innermost cause, unwrapping stage failures.
    pub fn root_cause(&self) -> &GuardError {
        match self {
            Self::StageFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Returns the stage this error is attributed to, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// True when there was nothing to analyze.
    pub fn is_source_empty(&self) -> bool {
        matches!(self.root_cause(), Self::SourceEmpty { .. })
    }

    /// True when the input could not be analyzed at all.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self.root_cause(), Self::SourceUnavailable { .. })
    }

    /// True for configuration rejections.
    pub fn is_config_invalid(&self) -> bool {
        matches!(self.root_cause(), Self::ConfigInvalid(_))
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
            other => GuardError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                GuardError::Internal(inner) => GuardError::Internal(format!("{msg}: {inner}")),
                other => GuardError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
