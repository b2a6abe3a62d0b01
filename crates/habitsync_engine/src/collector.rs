//! Collecting changes for a pull.

use crate::error::EngineResult;
use crate::validate_cursor;
use habitsync_protocol::{ChangeSet, EntityChanges, SyncResponse};
use habitsync_store::{EntityStore, Row};
use std::sync::Arc;
use uuid::Uuid;

/// Answers "what changed for this user since cursor T".
///
/// Live rows land in `updated` and tombstoned rows in `deleted`; `created` is
/// never filled, since clients treat both lists as upserts. The returned
/// timestamp is issued inside the same snapshot as the query.
#[derive(Debug, Clone)]
pub struct ChangeCollector {
    store: Arc<EntityStore>,
}

impl ChangeCollector {
    /// Creates a collector over `store`.
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Returns every record owned by `user` written after `cursor`, ordered
    /// by `(updated_at, id)`, and the cursor for the next pull.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`](crate::EngineError::Validation)
    /// if the cursor is negative or ahead of the server.
    pub fn collect(&self, user: Uuid, cursor: i64) -> EngineResult<SyncResponse> {
        validate_cursor(&self.store, cursor)?;

        let (changes, timestamp) = self.store.snapshot(|view| {
            let mut changes = ChangeSet::new();
            split(
                view.habits_changed_since(&user, cursor),
                &mut changes.habits,
                |h| h.to_wire(),
            );
            split(
                view.logs_changed_since(&user, cursor),
                &mut changes.logs,
                |l| l.to_wire(),
            );
            changes
        });

        tracing::debug!(
            user = %user,
            cursor,
            timestamp,
            habits = changes.habits.len(),
            logs = changes.logs.len(),
            "collected changes"
        );

        Ok(SyncResponse { changes, timestamp })
    }

    /// The store this collector reads from.
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

fn split<'a, R, T, I, F>(rows: I, out: &mut EntityChanges<T>, to_wire: F)
where
    R: Row + 'a,
    I: Iterator<Item = &'a R>,
    F: Fn(&R) -> T,
{
    for row in rows {
        if row.is_deleted() {
            out.deleted.push(row.id().to_string());
        } else {
            out.updated.push(to_wire(row));
        }
    }
}
