//! Store fixtures and entity builders.
//!
//! Every fixture runs on a [`ManualClock`] starting at [`START_TIME`], so
//! stamps and cursors are deterministic unless a test moves the clock.

use crate::flaky::FlakyBackend;
use chrono::NaiveDate;
use habitsync_protocol::{ChangeSet, Habit, Log, LogValue};
use habitsync_store::{EntityStore, FileJournal, ManualClock, StoreConfig, JOURNAL_FILE};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Clock reading every fixture starts at.
pub const START_TIME: i64 = 1_700_000_000;

enum Backing {
    Memory(FlakyBackend),
    File(TempDir),
}

/// A store with a manual clock and automatic cleanup.
pub struct TestStore {
    /// The store, shareable with engines and servers.
    pub store: Arc<EntityStore>,
    /// The clock the store stamps with.
    pub clock: Arc<ManualClock>,
    backing: Backing,
}

impl TestStore {
    /// Creates a store over a [`FlakyBackend`].
    pub fn memory() -> Self {
        let clock = Arc::new(ManualClock::new(START_TIME));
        let journal = FlakyBackend::new();
        let store = open_memory(&journal, &clock);
        Self {
            store,
            clock,
            backing: Backing::Memory(journal),
        }
    }

    /// Creates a store journaling to a file in a temporary directory.
    pub fn file() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(START_TIME));
        let store = open_file(dir.path(), &clock);
        Self {
            store,
            clock,
            backing: Backing::File(dir),
        }
    }

    /// Closes and reopens the store, replaying its journal.
    ///
    /// Panics if another handle to the store is still alive.
    pub fn reopen(self) -> Self {
        let Self {
            store,
            clock,
            backing,
        } = self;
        drop(
            Arc::try_unwrap(store).expect("store still shared; drop other handles before reopen"),
        );
        let store = match &backing {
            Backing::Memory(journal) => open_memory(journal, &clock),
            Backing::File(dir) => open_file(dir.path(), &clock),
        };
        Self {
            store,
            clock,
            backing,
        }
    }

    /// The failure-injecting journal, for memory fixtures.
    pub fn journal(&self) -> Option<&FlakyBackend> {
        match &self.backing {
            Backing::Memory(journal) => Some(journal),
            Backing::File(_) => None,
        }
    }

    /// Data directory, for file fixtures.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::File(dir) => Some(dir.path()),
        }
    }

    /// Moves the clock forward.
    pub fn tick(&self, secs: i64) {
        self.clock.advance(secs);
    }
}

impl std::ops::Deref for TestStore {
    type Target = EntityStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

fn open_memory(journal: &FlakyBackend, clock: &Arc<ManualClock>) -> Arc<EntityStore> {
    let store = EntityStore::open_with_backend(
        Box::new(journal.clone()),
        StoreConfig::default(),
        clock.clone(),
    )
    .expect("Failed to open in-memory store");
    Arc::new(store)
}

fn open_file(dir: &Path, clock: &Arc<ManualClock>) -> Arc<EntityStore> {
    let journal =
        FileJournal::open(&dir.join(JOURNAL_FILE), true).expect("Failed to open journal file");
    let store =
        EntityStore::open_with_backend(Box::new(journal), StoreConfig::default(), clock.clone())
            .expect("Failed to open file store");
    Arc::new(store)
}

/// A habit with a fresh id and category.
pub fn habit(title: &str) -> Habit {
    Habit::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        title,
        json!({"type": "daily", "days": [1, 2, 3, 4, 5]}),
    )
}

/// A log against `habit_id` on 2024-01-15.
pub fn log_for(habit_id: Uuid, value: LogValue) -> Log {
    Log::new(Uuid::new_v4(), habit_id, day(2024, 1, 15)).with_value(value)
}

/// Shorthand for a calendar date.
pub fn day(year: i32, month: u32, date: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, date).expect("Invalid date")
}

/// A change set upserting `habits` through the `updated` list.
pub fn upsert_habits(habits: impl IntoIterator<Item = Habit>) -> ChangeSet {
    let mut changes = ChangeSet::new();
    changes.habits.updated.extend(habits);
    changes
}

/// A change set deleting the habits named by `ids`.
pub fn delete_habits<I, S>(ids: I) -> ChangeSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut changes = ChangeSet::new();
    changes.habits.deleted.extend(ids.into_iter().map(Into::into));
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitsync_store::StoreResult;

    fn put(fixture: &TestStore, title: &str) -> Uuid {
        let wire = habit(title);
        let id = wire.id;
        fixture
            .write(0, |txn| -> StoreResult<()> {
                txn.put_habit(habitsync_store::HabitRecord::from_wire(Uuid::new_v4(), &wire));
                Ok(())
            })
            .unwrap();
        id
    }

    #[test]
    fn memory_fixture_survives_reopen() {
        let fixture = TestStore::memory();
        let id = put(&fixture, "Jog");
        assert!(!fixture.journal().unwrap().is_empty());

        let fixture = fixture.reopen();
        let (found, _) = fixture.snapshot(|view| view.habit(&id).is_some());
        assert!(found);
    }

    #[test]
    fn file_fixture_survives_reopen() {
        let fixture = TestStore::file();
        assert!(fixture.path().unwrap().exists());
        let id = put(&fixture, "Jog");

        let fixture = fixture.reopen();
        let (found, _) = fixture.snapshot(|view| view.habit(&id).is_some());
        assert!(found);
    }

    #[test]
    fn builders() {
        let h = habit("Read");
        assert!(h.validate().is_ok());
        let l = log_for(h.id, LogValue::Boolean(true));
        assert_eq!(l.habit_id, h.id);

        let changes = delete_habits(["a", "b"]);
        assert_eq!(changes.habits.deleted.len(), 2);
        assert_eq!(upsert_habits([h]).item_count(), 1);
    }
}
