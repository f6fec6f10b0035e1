//! Error types shared by the transport boundary.

use thiserror::Error;

/// Errors raised by a transport while receiving updates or sending replies.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be delivered.
    #[error("request failed: {0}")]
    Request(String),

    /// The platform rejected the call.
    #[error("api error ({code}): {description}")]
    Api {
        /// Platform error code.
        code: i64,
        /// Human-readable description returned by the platform.
        description: String,
    },

    /// The response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The transport has been shut down.
    #[error("transport is not connected")]
    NotConnected,
}

impl TransportError {
    /// Creates a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
