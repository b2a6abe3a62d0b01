//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding, encoding or validating messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not valid JSON or does not match the expected shape
    /// (missing field, malformed id, malformed date, ...).
    #[error("malformed payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// A message could not be rendered to JSON.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload parsed but violates a protocol rule.
    #[error("invalid payload: {0}")]
    Invalid(String),
}

impl ProtocolError {
    /// Creates an invalid payload error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Returns true if the error was caused by the client's payload.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Invalid(_))
    }
}
