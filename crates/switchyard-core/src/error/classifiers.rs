//! Failure classification used by the router's failover policy

use super::types::SwitchyardError;

/// How a failed backend attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429 class: the backend is throttling this credential
    RateLimited,
    /// HTTP 503 class: the provider is temporarily overloaded
    Overloaded,
    /// Anything else (auth, malformed request, protocol errors, ...)
    Fatal,
}

impl FailureClass {
    /// Whether the router should fail over and retry on another backend
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Overloaded)
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Overloaded => write!(f, "overloaded"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

const RATE_LIMIT_PATTERNS: &[&str] = &["429", "rate limit", "rate_limit", "too many requests"];

const OVERLOAD_PATTERNS: &[&str] = &["503", "overloaded", "service unavailable"];

/// Classify an error into a [`FailureClass`].
///
/// Structured signals win over text: the HTTP status code is checked first,
/// then the provider error code, and only then the message body.
pub fn classify_failure(error: &SwitchyardError) -> FailureClass {
    match error {
        SwitchyardError::Backend {
            message,
            status_code,
            error_code,
            ..
        } => {
            if let Some(class) = status_code.and_then(classify_status) {
                return class;
            }
            if let Some(class) = error_code.as_deref().and_then(classify_code) {
                return class;
            }
            classify_message(message)
        }
        SwitchyardError::Other { message } => classify_message(message),
        _ => FailureClass::Fatal,
    }
}

fn classify_status(status: u16) -> Option<FailureClass> {
    match status {
        429 => Some(FailureClass::RateLimited),
        503 => Some(FailureClass::Overloaded),
        _ => None,
    }
}

fn classify_code(code: &str) -> Option<FailureClass> {
    let code = code.trim().to_lowercase();
    match code.as_str() {
        "429" | "rate_limit_error" | "rate_limit_exceeded" => Some(FailureClass::RateLimited),
        "503" | "overloaded_error" => Some(FailureClass::Overloaded),
        _ => None,
    }
}

fn classify_message(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        FailureClass::RateLimited
    } else if OVERLOAD_PATTERNS.iter().any(|p| lower.contains(p)) {
        FailureClass::Overloaded
    } else {
        FailureClass::Fatal
    }
}
