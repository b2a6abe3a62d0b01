//! Main sync server.

use crate::auth::Authenticator;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use habitsync_protocol::{PullRequest, SyncRequest, SyncResponse};
use habitsync_store::EntityStore;
use std::sync::Arc;
use uuid::Uuid;

/// Route of the combined push-and-pull call.
pub const SYNC_PATH: &str = "/api/v1/sync";

/// Route of the read-only pull call.
pub const PULL_PATH: &str = "/api/v1/sync/pull";

/// Status and JSON body produced by [`SyncServer::handle_post`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// JSON body: a `SyncResponse` on success, `{"error": ...}` otherwise.
    pub body: Vec<u8>,
}

impl HttpReply {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    fn error(err: &ServerError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Self {
            status: err.status_code(),
            body: body.to_string().into_bytes(),
        }
    }
}

/// The sync server.
///
/// Wraps a [`RequestHandler`] with credential resolution and JSON routing.
/// It owns no sockets; an HTTP host forwards `POST` bodies to
/// [`handle_post`](Self::handle_post) and writes the reply back.
///
/// # Example
///
/// ```
/// use habitsync_server::{ServerConfig, StaticAuthenticator, SyncServer, SYNC_PATH};
/// use habitsync_store::EntityStore;
/// use std::sync::Arc;
/// use uuid::Uuid;
///
/// let store = Arc::new(EntityStore::open_in_memory().unwrap());
/// let auth = StaticAuthenticator::new().with_token("dev-token", Uuid::new_v4());
/// let server = SyncServer::new(store, ServerConfig::default(), Arc::new(auth));
///
/// let reply = server.handle_post(SYNC_PATH, Some("Bearer dev-token"), b"{}");
/// assert_eq!(reply.status, 200);
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    authenticator: Arc<dyn Authenticator>,
}

impl SyncServer {
    /// Creates a server over `store`.
    pub fn new(
        store: Arc<EntityStore>,
        config: ServerConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            handler: RequestHandler::new(store, config),
            authenticator,
        }
    }

    /// Resolves an `Authorization` header value to a user id.
    ///
    /// The `Bearer` scheme is optional and matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AuthenticationFailed`] if the header is missing
    /// or the credential is rejected.
    pub fn authenticate(&self, authorization: Option<&str>) -> ServerResult<Uuid> {
        let credential = authorization
            .map(|value| value.trim())
            .map(strip_bearer)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ServerError::AuthenticationFailed("missing credential".into()))?;

        let result = if self.handler.config().require_auth {
            self.authenticator.authenticate(credential)
        } else {
            Uuid::parse_str(credential).map_err(|_| {
                ServerError::AuthenticationFailed("credential is not a user id".into())
            })
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "authentication failed");
        }
        result
    }

    /// Authenticates, then applies and collects.
    ///
    /// # Errors
    ///
    /// Authentication, validation and storage failures, as
    /// [`ServerError`].
    pub fn sync(
        &self,
        authorization: Option<&str>,
        request: SyncRequest,
    ) -> ServerResult<SyncResponse> {
        let user = self.authenticate(authorization)?;
        self.handler.handle_sync(user, request)
    }

    /// A sync with no local changes. Read-only and safe to retry.
    ///
    /// # Errors
    ///
    /// Authentication and validation failures, as [`ServerError`].
    pub fn pull(
        &self,
        authorization: Option<&str>,
        last_pulled_at: Option<i64>,
    ) -> ServerResult<SyncResponse> {
        self.sync(authorization, SyncRequest::from(PullRequest { last_pulled_at }))
    }

    /// Routes a JSON `POST` body.
    ///
    /// An empty body is read as `{}`. Errors become a status code and an
    /// `{"error": ...}` body; this never fails.
    pub fn handle_post(&self, path: &str, authorization: Option<&str>, body: &[u8]) -> HttpReply {
        let body = if body.is_empty() { b"{}".as_slice() } else { body };
        let result = match path {
            SYNC_PATH => self.dispatch(authorization, || SyncRequest::decode(body)),
            PULL_PATH => self.dispatch(authorization, || {
                PullRequest::decode(body).map(SyncRequest::from)
            }),
            _ => Err(ServerError::NotFound(path.to_string())),
        };

        match result.and_then(|response| response.encode().map_err(ServerError::from)) {
            Ok(bytes) => HttpReply::ok(bytes),
            Err(e) => {
                if e.is_server_error() {
                    tracing::error!(path, error = %e, "sync request failed");
                } else {
                    tracing::debug!(path, error = %e, "sync request rejected");
                }
                HttpReply::error(&e)
            }
        }
    }

    fn dispatch<F>(&self, authorization: Option<&str>, decode: F) -> ServerResult<SyncResponse>
    where
        F: FnOnce() -> habitsync_protocol::ProtocolResult<SyncRequest>,
    {
        let user = self.authenticate(authorization)?;
        let request = decode()?;
        self.handler.handle_sync(user, request)
    }

    /// The underlying handler.
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// The store behind this server.
    pub fn store(&self) -> &Arc<EntityStore> {
        self.handler.store()
    }
}

impl std::fmt::Debug for SyncServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

fn strip_bearer(value: &str) -> &str {
    match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}
