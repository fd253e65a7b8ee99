//! Error types for the SHPIA context analyzer

use thiserror::Error;

/// Errors that can occur while aggregating or analyzing sensor logs
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Failed to parse sensor payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("Invalid time window: {0} minutes (expected 1..=60)")]
    InvalidTimeWindow(u32),

    #[error("Number of {role} labels ({actual}) doesn't match number of {role}s ({expected})")]
    LabelCountMismatch {
        role: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate {role} label: {label}")]
    DuplicateLabel { role: &'static str, label: String },

    #[error("Invalid activity rules: {0}")]
    InvalidRules(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzeError {
    /// Whether the caller is expected to log and continue instead of aborting
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalyzeError::MalformedTimestamp(_)
                | AnalyzeError::LabelCountMismatch { .. }
                | AnalyzeError::DuplicateLabel { .. }
        )
    }
}
