//! Shared error types for the AeroWx engine.
//!
//! Crate-local errors (field decoding, upstream calls, persistence,
//! publishing) live next to the code that raises them; this module holds
//! the pieces every crate needs.

use thiserror::Error;

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    /// Whether the same call may succeed on the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed(_) | NetworkError::Timeout => true,
            NetworkError::ServerError { status, .. } => *status >= 500 || *status == 429,
            NetworkError::InvalidResponse(_) => false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failures() {
        assert!(NetworkError::Timeout.is_transient());
        assert!(NetworkError::ConnectionFailed("refused".into()).is_transient());
        assert!(NetworkError::ServerError { status: 503, message: "unavailable".into() }
            .is_transient());
        assert!(!NetworkError::ServerError { status: 400, message: "bad ids".into() }
            .is_transient());
        assert!(!NetworkError::InvalidResponse("html".into()).is_transient());
    }

    #[test]
    fn test_messages() {
        let err = NetworkError::ServerError { status: 502, message: "bad gateway".into() };
        assert_eq!(err.to_string(), "Server error: 502 - bad gateway");
        let err = ConfigError::Invalid("Unknown timezone: Mars/Base".into());
        assert_eq!(err.to_string(), "Invalid configuration: Unknown timezone: Mars/Base");
    }
}
