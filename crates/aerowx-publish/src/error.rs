//! Publish-specific error types.

use aerowx_core::{NetworkError, ReqwestErrorExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Sink unreachable: {0}")]
    Unreachable(String),

    #[error("Rejected by sink: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("No credentials for the platform API")]
    MissingToken,

    #[error("Transport error: {0}")]
    Transport(NetworkError),

    #[error("Payload error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PublishError {
    /// Whether the other sink is worth trying after this failure.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::Serialize(_))
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        match err.into_network_error() {
            NetworkError::ConnectionFailed(msg) => Self::Unreachable(msg),
            NetworkError::Timeout => Self::Unreachable("request timed out".into()),
            other => Self::Transport(other),
        }
    }
}

impl From<rumqttc::ClientError> for PublishError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Unreachable(err.to_string())
    }
}
