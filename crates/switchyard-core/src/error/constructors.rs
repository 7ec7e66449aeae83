//! Constructor methods for SwitchyardError

use super::types::SwitchyardError;

/// Message surfaced when no backend can take a request.
pub(crate) const ALL_UNAVAILABLE_MESSAGE: &str =
    "All configured backends are unavailable or over limits";

impl SwitchyardError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create a new resolution error
    pub fn resolve(backend_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolve {
            backend_id: backend_id.into(),
            message: message.into(),
        }
    }

    /// Create a new backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            backend_id: None,
            status_code: None,
            error_code: None,
        }
    }

    /// Create a backend error carrying an HTTP status code
    pub fn backend_with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Backend {
            message: message.into(),
            backend_id: None,
            status_code: Some(status_code),
            error_code: None,
        }
    }

    /// Create a backend error carrying a provider error code
    pub fn backend_with_code(message: impl Into<String>, error_code: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            backend_id: None,
            status_code: None,
            error_code: Some(error_code.into()),
        }
    }

    /// Create the "all backends unavailable" error
    pub fn unavailable() -> Self {
        Self::Unavailable {
            message: ALL_UNAVAILABLE_MESSAGE.to_string(),
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            key: None,
        }
    }

    /// Create a storage error for a specific key
    pub fn storage_with_key(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Create a new JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
        }
    }

    /// Create an IO error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Attach the id of the backend that produced this error.
    ///
    /// Only backend errors carry a backend id; other variants are returned
    /// unchanged.
    pub fn with_backend_id(self, id: impl Into<String>) -> Self {
        match self {
            Self::Backend {
                message,
                status_code,
                error_code,
                ..
            } => Self::Backend {
                message,
                backend_id: Some(id.into()),
                status_code,
                error_code,
            },
            other => other,
        }
    }
}
