//! Sync-specific error types.

use std::path::PathBuf;

use aerowx_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// A failed upstream call. The airport keeps its previous record.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Network(#[from] NetworkError),

    #[error("Upstream returned an unreadable body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl UpstreamError {
    /// Whether the next cycle may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_transient(),
            Self::Body(_) => false,
        }
    }
}

/// The cache document could not be written. The in-memory cache stays
/// authoritative.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Cache write task failed: {0}")]
    Background(String),
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_messages() {
        let err = UpstreamError::Network(NetworkError::ServerError {
            status: 502,
            message: "bad gateway".into(),
        });
        assert_eq!(err.to_string(), "Upstream request failed: Server error: 502 - bad gateway");
        assert!(err.is_transient());
        assert!(UpstreamError::Network(NetworkError::Timeout).is_transient());
        assert!(!UpstreamError::Body("<html>".into()).is_transient());
    }

    #[test]
    fn test_persistence_message_names_path() {
        let err = PersistenceError::io(
            std::path::Path::new("/ro/cache.json"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/ro/cache.json"));
    }
}
