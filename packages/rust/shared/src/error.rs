//! Error types for LeadSift.
//!
//! Library crates use [`LeadSiftError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all LeadSift operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadSiftError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The input could not be tabulated with the detected separator.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Required columns are absent from the loaded table.
    #[error("missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// Blacklist or category source unreachable or malformed.
    #[error("reference data error: {0}")]
    ReferenceData(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input or pipeline settings.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadSiftError>;

/// Coarse classification of an error, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input did not satisfy a column contract or a setting was invalid.
    Validation,
    /// Input could not be parsed.
    Parse,
    /// Anything else (I/O, reference data, config).
    Other,
}

impl LeadSiftError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a reference data error from any displayable message.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::ReferenceData(msg.into())
    }

    /// Create a missing-columns error from the absent column names.
    pub fn missing_columns<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingColumns {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Which user-facing category this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingColumns { .. } | Self::Validation { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Config { .. } | Self::ReferenceData(_) | Self::Io { .. } => ErrorKind::Other,
        }
    }
}
