//! Error types for the sync endpoint.

use habitsync_engine::EngineError;
use habitsync_protocol::ProtocolError;
use habitsync_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a sync call.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The credential was missing, malformed, forged or expired.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The request was rejected before anything was applied.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No route for the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store failed; the batch was rolled back.
    #[error("storage error: {0}")]
    Storage(#[source] StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::AuthenticationFailed(_) => 401,
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::Storage(_) | ServerError::Internal(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::AuthenticationFailed(_)
                | ServerError::InvalidRequest(_)
                | ServerError::NotFound(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Storage(_) | ServerError::Internal(_))
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => ServerError::InvalidRequest(msg),
            EngineError::Store(e) => ServerError::Storage(e),
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        if err.is_client_error() {
            ServerError::InvalidRequest(err.to_string())
        } else {
            ServerError::Internal(err.to_string())
        }
    }
}
