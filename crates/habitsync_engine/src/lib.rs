//! # habitsync Engine
//!
//! Server-side reconciliation for habitsync.
//!
//! This crate provides:
//! - [`Reconciler`]: applies a client change set atomically, enforcing
//!   ownership, last-writer-wins and sticky tombstones
//! - [`ChangeCollector`]: answers "what changed for this user since cursor T"
//!   together with the next cursor
//!
//! ## Key Invariants
//!
//! - The server stamps all time; client timestamps are ignored
//! - A record's owner never changes, and foreign records are never touched
//! - Deleted records are never resurrected
//! - A change set is applied completely or not at all
//! - A cursor returned by the collector never hides a later commit

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collector;
mod error;
mod reconciler;

pub use collector::ChangeCollector;
pub use error::{EngineError, EngineResult};
pub use reconciler::{ApplyReport, FamilyReport, Reconciler};

use habitsync_store::EntityStore;

/// Checks a client cursor against the store's watermark horizon.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] if the cursor is negative or lies
/// beyond any cursor the server could have issued.
pub fn validate_cursor(store: &EntityStore, cursor: i64) -> EngineResult<()> {
    if cursor < 0 {
        return Err(EngineError::validation(format!(
            "last_pulled_at must not be negative (got {cursor})"
        )));
    }
    let horizon = store.horizon();
    if cursor > horizon {
        return Err(EngineError::validation(format!(
            "last_pulled_at {cursor} is ahead of the server ({horizon})"
        )));
    }
    Ok(())
}
