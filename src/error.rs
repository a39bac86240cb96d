//! Error types and handling for Elpris
//!
//! The fetch pipeline surfaces four failure kinds to its caller (transport,
//! upstream status, malformed body, cancellation). The remaining variants cover
//! configuration, clock and I/O problems around it.

use thiserror::Error;

/// Result type alias for Elpris operations
pub type Result<T> = std::result::Result<T, ElprisError>;

/// Main error type for Elpris
#[derive(Debug, Error)]
pub enum ElprisError {
    /// The request never completed (connect, TLS, reset, ...)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The request completed with a non-success status
    #[error("Upstream error: HTTP {status}")]
    Upstream { status: u16 },

    /// Success status, but the body was not a list of price points
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Cooperative abort before the request completed
    #[error("Request cancelled")]
    Cancelled,

    /// The timezone offset for "now" could not be resolved
    #[error("Clock unavailable: {message}")]
    ClockUnavailable { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// HTTP server errors
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl ElprisError {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        ElprisError::Transport {
            message: message.into(),
        }
    }

    /// Create a new upstream status error
    pub fn upstream(status: u16) -> Self {
        ElprisError::Upstream { status }
    }

    /// Create a new malformed response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        ElprisError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create a new clock error
    pub fn clock<S: Into<String>>(message: S) -> Self {
        ElprisError::ClockUnavailable {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ElprisError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ElprisError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        ElprisError::Io {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        ElprisError::Web {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ElprisError::Cancelled)
    }
}

impl From<std::io::Error> for ElprisError {
    fn from(err: std::io::Error) -> Self {
        ElprisError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ElprisError {
    fn from(err: serde_yaml::Error) -> Self {
        ElprisError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ElprisError {
    fn from(err: serde_json::Error) -> Self {
        ElprisError::Serialization {
            message: err.to_string(),
        }
    }
}

// Body decoding is classified as MalformedResponse where it happens; anything
// reaching this conversion failed on the wire.
impl From<reqwest::Error> for ElprisError {
    fn from(err: reqwest::Error) -> Self {
        ElprisError::transport(err.to_string())
    }
}
