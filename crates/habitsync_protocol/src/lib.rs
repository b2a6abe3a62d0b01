//! # habitsync Protocol
//!
//! Sync wire types and JSON codecs for habitsync.
//!
//! This crate provides:
//! - [`Habit`] and [`Log`] wire records
//! - [`LogValue`], the opaque tagged value carried by a log
//! - [`ChangeSet`] with per-family `created` / `updated` / `deleted` lists
//! - [`SyncRequest`] / [`SyncResponse`] for the combined sync call
//! - Shape validation shared by every entry point
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Wire contract
//!
//! A single combined contract is supported: the client sends its local
//! changes together with the cursor of its last successful call and
//! receives everything that changed since that cursor plus a new one.
//! A pull is the same call with an empty change set.
//!
//! ```rust
//! use habitsync_protocol::SyncRequest;
//!
//! let request = SyncRequest::decode(br#"{"last_pulled_at": null}"#).unwrap();
//! assert_eq!(request.cursor(), 0);
//! assert!(request.changes.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changes;
mod entity;
mod error;
mod messages;

pub use changes::{ChangeSet, EntityChanges};
pub use entity::{Habit, Log, LogValue};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{PullRequest, SyncRequest, SyncResponse};
