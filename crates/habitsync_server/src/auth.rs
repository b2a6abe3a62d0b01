//! Authentication support for the sync endpoint.
//!
//! An [`Authenticator`] turns a bearer credential into the user id every
//! engine call runs as. Two implementations ship:
//!
//! - [`TokenAuthenticator`]: HMAC-SHA256 signed tokens with expiry
//! - [`StaticAuthenticator`]: a fixed token table for tests and development
//!
//! ## Token Format
//!
//! Tokens are composed of:
//! - 16 bytes: user_id
//! - 8 bytes: issued-at (Unix millis, big-endian)
//! - 32 bytes: HMAC-SHA256 signature over the first 24 bytes
//!
//! Total: 56 bytes, base64url-encoded (no padding) for transport.

use crate::error::{ServerError, ServerResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const PAYLOAD_LEN: usize = 24;
const TOKEN_LEN: usize = PAYLOAD_LEN + 32;

/// Resolves a bearer credential to a user id.
pub trait Authenticator: Send + Sync {
    /// Returns the user the credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AuthenticationFailed`] if the credential is not
    /// acceptable.
    fn authenticate(&self, credential: &str) -> ServerResult<Uuid>;
}

/// Verifies (and mints) HMAC-signed bearer tokens.
#[derive(Clone)]
pub struct TokenAuthenticator {
    secret: Vec<u8>,
    expiry: Duration,
}

impl TokenAuthenticator {
    /// Creates an authenticator signing with `secret`; tokens stay valid for
    /// `expiry` after issue.
    pub fn new(secret: impl Into<Vec<u8>>, expiry: Duration) -> Self {
        Self {
            secret: secret.into(),
            expiry,
        }
    }

    /// Token lifetime.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Mints a token for `user`, issued now.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the signing key is unusable.
    pub fn issue(&self, user: Uuid) -> ServerResult<String> {
        self.issue_at(user, now_millis())
    }

    /// Mints a token for `user` as if issued at `issued_at_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Internal`] if the signing key is unusable.
    pub fn issue_at(&self, user: Uuid, issued_at_ms: u64) -> ServerResult<String> {
        let mut token = Vec::with_capacity(TOKEN_LEN);
        token.extend_from_slice(user.as_bytes());
        token.extend_from_slice(&issued_at_ms.to_be_bytes());
        let signature = self.mac()?.chain_update(&token).finalize().into_bytes();
        token.extend_from_slice(&signature);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    /// Verifies `token` against the clock reading `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AuthenticationFailed`] if the token is
    /// malformed, carries a bad signature or has expired.
    pub fn verify_at(&self, token: &str, now_ms: u64) -> ServerResult<Uuid> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ServerError::AuthenticationFailed("token is not base64url".into()))?;
        if raw.len() != TOKEN_LEN {
            return Err(ServerError::AuthenticationFailed(
                "invalid token length".into(),
            ));
        }

        let (payload, signature) = raw.split_at(PAYLOAD_LEN);
        self.mac()?
            .chain_update(payload)
            .verify_slice(signature)
            .map_err(|_| ServerError::AuthenticationFailed("invalid signature".into()))?;

        let (user, issued_at) = payload.split_at(16);
        let user = Uuid::from_slice(user)
            .map_err(|_| ServerError::AuthenticationFailed("invalid user id".into()))?;
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(issued_at);
        let issued_at = u64::from_be_bytes(stamp);

        let expiry_ms = u64::try_from(self.expiry.as_millis()).unwrap_or(u64::MAX);
        if now_ms > issued_at.saturating_add(expiry_ms) {
            return Err(ServerError::AuthenticationFailed("token expired".into()));
        }

        Ok(user)
    }

    fn mac(&self) -> ServerResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServerError::Internal(format!("signing key rejected: {e}")))
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate(&self, credential: &str) -> ServerResult<Uuid> {
        self.verify_at(credential, now_millis())
    }
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Fixed token table. Useful for testing.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: RwLock<HashMap<String, Uuid>>,
}

impl StaticAuthenticator {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token, builder style.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>, user: Uuid) -> Self {
        self.grant(token, user);
        self
    }

    /// Adds or replaces a token.
    pub fn grant(&self, token: impl Into<String>, user: Uuid) {
        self.tokens.write().insert(token.into(), user);
    }

    /// Removes a token.
    pub fn revoke(&self, token: &str) {
        self.tokens.write().remove(token);
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, credential: &str) -> ServerResult<Uuid> {
        self.tokens
            .read()
            .get(credential)
            .copied()
            .ok_or_else(|| ServerError::AuthenticationFailed("unknown token".into()))
    }
}

fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
