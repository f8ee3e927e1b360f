//! Error handling for the multipart upload client
//!
//! This module defines the error types used throughout the library and
//! the mapping from HTTP status codes to error kinds.

use crate::upload::types::UploadPhase;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;

/// Error types that can occur while uploading a file
#[derive(Error, Debug)]
pub enum UploadError {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The remote service rejected the credentials
    #[error("Authentication failed during {phase}: {message}")]
    Auth { phase: UploadPhase, message: String },

    /// The destination team or folder does not exist
    #[error("Not found during {phase}: {message}")]
    NotFound { phase: UploadPhase, message: String },

    /// The server response was malformed or incomplete
    #[error("Protocol error during {phase}: {message}")]
    Protocol { phase: UploadPhase, message: String },

    /// Transport failure, timeout, or non-success status
    #[error("Network error during {phase}: {message}")]
    Network { phase: UploadPhase, message: String },

    /// The server reported missing or out-of-order parts
    #[error("Conflict during {phase}: {message}")]
    Conflict { phase: UploadPhase, message: String },

    /// Invalid parameter
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        UploadError::Config {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth(phase: UploadPhase, message: impl Into<String>) -> Self {
        UploadError::Auth {
            phase,
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(phase: UploadPhase, message: impl Into<String>) -> Self {
        UploadError::NotFound {
            phase,
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(phase: UploadPhase, message: impl Into<String>) -> Self {
        UploadError::Protocol {
            phase,
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(phase: UploadPhase, message: impl Into<String>) -> Self {
        UploadError::Network {
            phase,
            message: message.into(),
        }
    }

    /// Create a new conflict error
    pub fn conflict(phase: UploadPhase, message: impl Into<String>) -> Self {
        UploadError::Conflict {
            phase,
            message: message.into(),
        }
    }

    /// Create a new invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        UploadError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Classify a transport-level failure from the HTTP client
    pub fn from_transport(phase: UploadPhase, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UploadError::network(phase, format!("request timed out: {}", err))
        } else {
            UploadError::network(phase, err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    ///
    /// `409 Conflict` is only meaningful when finalizing; in any other phase it
    /// is treated like any other unexpected status.
    pub fn from_status(phase: UploadPhase, status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("server returned {}", status)
        } else {
            format!("server returned {}: {}", status, body)
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::auth(phase, message),
            StatusCode::NOT_FOUND => UploadError::not_found(phase, message),
            StatusCode::CONFLICT if phase == UploadPhase::Finalize => {
                UploadError::conflict(phase, message)
            }
            _ => UploadError::network(phase, message),
        }
    }

    /// The phase this error originated from, if it came from a remote call
    pub fn phase(&self) -> Option<UploadPhase> {
        match self {
            UploadError::Auth { phase, .. }
            | UploadError::NotFound { phase, .. }
            | UploadError::Protocol { phase, .. }
            | UploadError::Network { phase, .. }
            | UploadError::Conflict { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether the failed operation may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = UploadError::config_error("missing token");
        assert!(matches!(err, UploadError::Config { .. }));

        let err = UploadError::protocol(UploadPhase::Initialize, "missing fileId");
        assert!(matches!(err, UploadError::Protocol { .. }));
        assert_eq!(err.phase(), Some(UploadPhase::Initialize));
    }

    #[test]
    fn test_error_display() {
        let err = UploadError::config_error("Missing AUTHENTICATION_TOKEN");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing AUTHENTICATION_TOKEN"
        );

        let err = UploadError::network(UploadPhase::TransmitPart, "connection reset");
        assert_eq!(
            err.to_string(),
            "Network error during transmit part: connection reset"
        );
    }

    #[test]
    fn test_status_classification() {
        let err = UploadError::from_status(UploadPhase::Initialize, StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, UploadError::Auth { .. }));

        let err = UploadError::from_status(UploadPhase::Initialize, StatusCode::FORBIDDEN, "");
        assert!(matches!(err, UploadError::Auth { .. }));

        let err = UploadError::from_status(UploadPhase::PartDestination, StatusCode::NOT_FOUND, "");
        assert!(matches!(err, UploadError::NotFound { .. }));

        let err = UploadError::from_status(UploadPhase::Finalize, StatusCode::CONFLICT, "part 2");
        assert!(matches!(err, UploadError::Conflict { .. }));

        let err = UploadError::from_status(UploadPhase::Initialize, StatusCode::CONFLICT, "");
        assert!(matches!(err, UploadError::Network { .. }));

        let err = UploadError::from_status(
            UploadPhase::TransmitPart,
            StatusCode::INTERNAL_SERVER_ERROR,
            "",
        );
        assert!(matches!(err, UploadError::Network { .. }));
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(UploadError::network(UploadPhase::TransmitPart, "reset").is_retryable());
        assert!(!UploadError::protocol(UploadPhase::Finalize, "bad body").is_retryable());
        assert!(!UploadError::auth(UploadPhase::Initialize, "denied").is_retryable());
        assert!(!UploadError::config_error("missing").is_retryable());
    }
}
