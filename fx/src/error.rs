//! FX engine error types.

use kurs_common::Anchor;
use thiserror::Error;

/// Errors that can occur while acquiring rates.
///
/// None of these reach the UI shell: every variant is recovered by falling
/// back to the next source and finally to the backup rates.
#[derive(Debug, Error)]
pub enum FxError {
    /// Source unreachable, transport timeout, or non-success HTTP status.
    #[error("Network error from {source_name}: {message}")]
    Network {
        source_name: &'static str,
        message: String,
    },

    /// Malformed or missing JSON fields.
    #[error("Parse error from {source_name}: {message}")]
    Parse {
        source_name: &'static str,
        message: String,
    },

    /// Too few of the required currencies in an otherwise valid response.
    #[error("{source_name} returned {found} of {required} required currencies ({anchor})")]
    InsufficientData {
        source_name: &'static str,
        anchor: Anchor,
        found: usize,
        required: usize,
    },

    /// The attempt hit its hard deadline before the source answered.
    #[error("{source_name} timed out after {after_ms}ms")]
    Timeout {
        source_name: &'static str,
        after_ms: u64,
    },
}

/// The three-way failure taxonomy exposed in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxErrorKind {
    NetworkFailure,
    ParseFailure,
    InsufficientData,
}

impl FxError {
    /// Create a network error.
    pub fn network(source_name: &'static str, message: impl Into<String>) -> Self {
        FxError::Network {
            source_name,
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(source_name: &'static str, message: impl Into<String>) -> Self {
        FxError::Parse {
            source_name,
            message: message.into(),
        }
    }

    /// Classify the error. Timeouts count as network failures.
    pub fn kind(&self) -> FxErrorKind {
        match self {
            FxError::Network { .. } | FxError::Timeout { .. } => FxErrorKind::NetworkFailure,
            FxError::Parse { .. } => FxErrorKind::ParseFailure,
            FxError::InsufficientData { .. } => FxErrorKind::InsufficientData,
        }
    }

    /// Name of the source that failed.
    pub fn source_name(&self) -> &'static str {
        match self {
            FxError::Network { source_name, .. }
            | FxError::Parse { source_name, .. }
            | FxError::InsufficientData { source_name, .. }
            | FxError::Timeout { source_name, .. } => source_name,
        }
    }

    /// Whether this error came from the hard attempt deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FxError::Timeout { .. })
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(FxError::network("cbr", "refused").kind(), FxErrorKind::NetworkFailure);
        assert_eq!(
            FxError::Timeout { source_name: "cbr", after_ms: 8000 }.kind(),
            FxErrorKind::NetworkFailure
        );
        assert_eq!(FxError::parse("open-er", "eof").kind(), FxErrorKind::ParseFailure);

        let err = FxError::InsufficientData {
            source_name: "cbr",
            anchor: Anchor::Rub,
            found: 2,
            required: 3,
        };
        assert_eq!(err.kind(), FxErrorKind::InsufficientData);
        assert_eq!(err.source_name(), "cbr");
        assert_eq!(err.to_string(), "cbr returned 2 of 3 required currencies (RUB-anchored)");
    }
}
