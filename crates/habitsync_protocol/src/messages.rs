//! Request and response bodies for the sync call.

use crate::changes::ChangeSet;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// A combined push-and-pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Cursor returned by the previous successful call. `None` on first sync.
    #[serde(default)]
    pub last_pulled_at: Option<i64>,
    /// Local changes to apply.
    #[serde(default)]
    pub changes: ChangeSet,
}

impl SyncRequest {
    /// Creates a request carrying `changes` since `cursor`.
    pub fn new(cursor: i64, changes: ChangeSet) -> Self {
        Self {
            last_pulled_at: Some(cursor),
            changes,
        }
    }

    /// Creates a read-only request.
    pub fn pull(cursor: i64) -> Self {
        Self::new(cursor, ChangeSet::new())
    }

    /// The effective cursor; a missing cursor means "from the beginning".
    pub fn cursor(&self) -> i64 {
        self.last_pulled_at.unwrap_or(0)
    }

    /// Checks cursor sign and change-set validity.
    ///
    /// Limits that depend on server state (horizon, batch size) are checked
    /// by the server.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Invalid`] on the first violation.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.cursor() < 0 {
            return Err(ProtocolError::invalid(format!(
                "last_pulled_at must not be negative (got {})",
                self.cursor()
            )));
        }
        self.changes.validate()
    }

    /// Decodes and validates a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Decode`] for malformed JSON and
    /// [`ProtocolError::Invalid`] for rule violations.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
        request.validate()?;
        Ok(request)
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }
}

/// Body of the read-only pull route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Cursor returned by the previous successful call.
    #[serde(default)]
    pub last_pulled_at: Option<i64>,
}

impl PullRequest {
    /// Decodes and validates a JSON body.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or a negative cursor.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(bytes).map_err(ProtocolError::Decode)?;
        SyncRequest::from(request.clone()).validate()?;
        Ok(request)
    }
}

impl From<PullRequest> for SyncRequest {
    fn from(pull: PullRequest) -> Self {
        Self {
            last_pulled_at: pull.last_pulled_at,
            changes: ChangeSet::new(),
        }
    }
}

/// Everything that changed since the request cursor, plus the next cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Changes made by any device. `created` lists are always empty.
    pub changes: ChangeSet,
    /// Cursor to send as `last_pulled_at` next time.
    pub timestamp: i64,
}

impl SyncResponse {
    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }
}
