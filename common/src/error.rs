//! Error types shared across Kurs crates.

use thiserror::Error;

/// Main error type for Kurs operations outside the rate-fetch path.
#[derive(Error, Debug)]
pub enum KursError {
    /// Currency code is not part of the catalog.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Shared snapshot storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KursError {
    /// Get error code for logs and the UI shell.
    pub fn error_code(&self) -> &'static str {
        match self {
            KursError::UnknownCurrency(_) => "UNKNOWN_CURRENCY",
            KursError::Storage(_) => "STORAGE_ERROR",
            KursError::Serialization(_) => "SERIALIZATION_ERROR",
            KursError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<std::io::Error> for KursError {
    fn from(err: std::io::Error) -> Self {
        KursError::Storage(err.to_string())
    }
}

/// Result type alias for Kurs operations.
pub type KursResult<T> = std::result::Result<T, KursError>;
