//! User-facing outcome of a pipeline run.

use std::path::PathBuf;

use serde::Serialize;

use leadsift_shared::{ErrorKind, LeadSiftError, Result};

/// What the front end reports once a run is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Signal {
    Success { paths: Vec<PathBuf> },
    /// Missing columns or otherwise invalid input.
    ValidationFailure { message: String },
    /// The input could not be split into consistent rows.
    ParseFailure { message: String },
    Failure { message: String },
}

impl Signal {
    /// Classify a finished run.
    pub fn from_result<T>(result: &Result<T>, paths: impl FnOnce(&T) -> Vec<PathBuf>) -> Self {
        match result {
            Ok(value) => Self::Success {
                paths: paths(value),
            },
            Err(err) => Self::from(err),
        }
    }

    /// Process exit code: 0 success, 2 validation, 3 parse, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success { .. } => 0,
            Self::ValidationFailure { .. } => 2,
            Self::ParseFailure { .. } => 3,
            Self::Failure { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Human-readable one-liner.
    pub fn message(&self) -> String {
        match self {
            Self::Success { paths } => {
                let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                format!("saved: {}", list.join(", "))
            }
            Self::ValidationFailure { message } => format!("invalid input: {message}"),
            Self::ParseFailure { message } => {
                format!("could not parse the file (check its separator): {message}")
            }
            Self::Failure { message } => format!("error: {message}"),
        }
    }
}

impl From<&LeadSiftError> for Signal {
    fn from(err: &LeadSiftError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::ValidationFailure { message },
            ErrorKind::Parse => Self::ParseFailure { message },
            ErrorKind::Other => Self::Failure { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_signals_and_exit_codes() {
        let missing = Signal::from(&LeadSiftError::missing_columns(["title", "cid"]));
        assert_eq!(missing.exit_code(), 2);
        assert!(missing.message().contains("title, cid"));

        let parse = Signal::from(&LeadSiftError::parse("line 3: expected 4 fields, saw 6"));
        assert!(matches!(parse, Signal::ParseFailure { .. }));
        assert_eq!(parse.exit_code(), 3);

        let other = Signal::from(&LeadSiftError::reference("HTTP 404"));
        assert_eq!(other.exit_code(), 1);
    }

    #[test]
    fn success_lists_paths() {
        let result: Result<Vec<PathBuf>> = Ok(vec![PathBuf::from("/tmp/a_CLEAN.csv")]);
        let signal = Signal::from_result(&result, |paths| paths.clone());
        assert!(signal.is_success());
        assert_eq!(signal.exit_code(), 0);
        assert_eq!(signal.message(), "saved: /tmp/a_CLEAN.csv");
    }

    #[test]
    fn serializes_with_status_tag() {
        let json = serde_json::to_string(&Signal::Failure {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"failure","message":"boom"}"#);
    }
}
