//! # habitsync Server
//!
//! The sync endpoint for habitsync.
//!
//! This crate provides:
//! - [`SyncServer`]: credential resolution and JSON routing for
//!   `POST /api/v1/sync` and `POST /api/v1/sync/pull`
//! - [`RequestHandler`]: the authenticated apply-then-collect call
//! - Authentication via the [`Authenticator`] trait (HMAC-SHA256 tokens or a
//!   static table)
//!
//! # Protocol
//!
//! One combined call per round trip:
//! 1. Client sends `{ last_pulled_at, changes }` with a bearer token
//! 2. Server applies `changes` atomically as the token's user
//! 3. Server returns everything that user has not seen since
//!    `last_pulled_at`, including what was just pushed, and a new cursor
//!
//! A pull is the same call with no changes.
//!
//! # Authentication
//!
//! ```rust
//! use habitsync_server::TokenAuthenticator;
//! use std::time::Duration;
//! use uuid::Uuid;
//!
//! let auth = TokenAuthenticator::new(b"my-secure-secret".to_vec(), Duration::from_secs(3600));
//! let user = Uuid::new_v4();
//! let token = auth.issue(user).unwrap();
//! assert_eq!(auth.verify_at(&token, 0).unwrap(), user);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod server;

pub use auth::{Authenticator, StaticAuthenticator, TokenAuthenticator};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use server::{HttpReply, SyncServer, PULL_PATH, SYNC_PATH};
