//! Prelude for commonly used types and traits in traffic-guard.

pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::logging::LogConfig;
