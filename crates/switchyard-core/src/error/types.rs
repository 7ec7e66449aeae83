//! Core error type

use thiserror::Error;

/// Result type alias for Switchyard operations
pub type SwitchyardResult<T> = Result<T, SwitchyardError>;

/// Main error type for Switchyard
///
/// Cloneable so a single failure can be both recorded (history, logs) and
/// surfaced to the stream consumer.
#[derive(Error, Debug, Clone)]
pub enum SwitchyardError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// A backend reference could not be resolved to a configuration
    #[error("Failed to resolve backend '{backend_id}': {message}")]
    Resolve { backend_id: String, message: String },

    /// Failure reported by a backend handle (network, provider, protocol)
    #[error("Backend error: {message}")]
    Backend {
        message: String,
        backend_id: Option<String>,
        status_code: Option<u16>,
        error_code: Option<String>,
    },

    /// No configured backend can currently serve requests
    #[error("{message}")]
    Unavailable { message: String },

    /// Durable store read/write failures
    #[error("Storage error: {message}")]
    Storage { message: String, key: Option<String> },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Generic error
    #[error("Error: {message}")]
    Other { message: String },
}

impl SwitchyardError {
    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "SWITCHYARD_CONFIG",
            Self::Resolve { .. } => "SWITCHYARD_RESOLVE",
            Self::Backend { .. } => "SWITCHYARD_BACKEND",
            Self::Unavailable { .. } => "SWITCHYARD_UNAVAILABLE",
            Self::Storage { .. } => "SWITCHYARD_STORAGE",
            Self::Json { .. } => "SWITCHYARD_JSON",
            Self::Io { .. } => "SWITCHYARD_IO",
            Self::Other { .. } => "SWITCHYARD_OTHER",
        }
    }

    /// Whether the router may fail over to another backend after this error
    pub fn is_retryable(&self) -> bool {
        super::classify_failure(self).is_retryable()
    }

    /// Whether this is the "every backend exhausted" error
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
