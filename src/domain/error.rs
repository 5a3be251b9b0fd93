//! Domain error types.

use std::fmt;

/// The kind of dataset a lookup was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Ticker,
    TradeLog,
    Returns,
    Benchmark,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatasetKind::Ticker => "ticker",
            DatasetKind::TradeLog => "trade log",
            DatasetKind::Returns => "return series",
            DatasetKind::Benchmark => "benchmark",
        };
        f.write_str(name)
    }
}

/// Top-level error type for slopefilter.
#[derive(Debug, thiserror::Error)]
pub enum SlopeFilterError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: DatasetKind, name: String },

    #[error("failed to parse {source_name}: {reason}")]
    DataParse { source_name: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid branch {branch}: {reason}")]
    InvalidBranch { branch: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SlopeFilterError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SlopeFilterError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn missing(section: &str, key: &str) -> Self {
        SlopeFilterError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SlopeFilterError::NotFound { .. })
    }

    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            SlopeFilterError::Io(_) => 1,
            SlopeFilterError::ConfigParse { .. }
            | SlopeFilterError::ConfigMissing { .. }
            | SlopeFilterError::ConfigInvalid { .. } => 2,
            SlopeFilterError::DataParse { .. } => 3,
            SlopeFilterError::InvalidBranch { .. } => 4,
            SlopeFilterError::NotFound { .. } => 5,
            SlopeFilterError::Report { .. } => 6,
        }
    }
}

impl From<&SlopeFilterError> for std::process::ExitCode {
    fn from(err: &SlopeFilterError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
