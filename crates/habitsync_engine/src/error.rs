//! Error types for the sync engine.

use habitsync_protocol::ProtocolError;
use habitsync_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconciling or collecting changes.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The store failed; the batch was rolled back.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The request was rejected before anything was applied.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl EngineError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true if the caller can fix the error by changing the request.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<ProtocolError> for EngineError {
    fn from(err: ProtocolError) -> Self {
        Self::Validation(err.to_string())
    }
}
