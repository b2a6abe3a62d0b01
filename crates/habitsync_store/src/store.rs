//! The entity store.

use crate::backend::{FileJournal, JournalBackend, MemoryJournal};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::journal::{self, JournalBatch, JournalWriter};
use crate::record::{HabitRecord, LogRecord};
use crate::stats::{FamilyStats, StoreStats};
use crate::table::Tables;
use crate::txn::WriteTxn;
use crate::watermark::{Clock, SystemClock, Watermark};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// File name of the journal inside a data directory.
pub const JOURNAL_FILE: &str = "journal.hsj";

/// Identifies a committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Journal sequence of the batch.
    pub sequence: u64,
    /// Server time assigned to every row in the batch.
    pub stamp: i64,
}

/// Durable, indexed storage for habits and logs.
///
/// # Transactions
///
/// Writers are serialized by the journal mutex. A write stages row images,
/// then under the exclusive table lock it takes a stamp from the
/// [`Watermark`], appends one journal batch and only then publishes the rows.
/// A failure at any point publishes nothing.
///
/// Readers use [`EntityStore::snapshot`], which runs under the shared table
/// lock and therefore never sees a partial batch.
///
/// # Example
///
/// ```rust
/// use habitsync_store::{EntityStore, HabitRecord, StoreResult};
/// use habitsync_protocol::Habit;
/// use uuid::Uuid;
///
/// let store = EntityStore::open_in_memory().unwrap();
/// let owner = Uuid::new_v4();
/// let habit = Habit::new(Uuid::new_v4(), Uuid::new_v4(), "Jog", serde_json::json!({}));
///
/// let ((), commit) = store
///     .write(0, |txn| -> StoreResult<()> {
///         txn.put_habit(HabitRecord::from_wire(owner, &habit));
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(commit.unwrap().sequence, 1);
///
/// let (titles, cursor) = store.snapshot(|view| {
///     view.habits_changed_since(&owner, 0)
///         .map(|h| h.title.clone())
///         .collect::<Vec<_>>()
/// });
/// assert_eq!(titles, vec!["Jog"]);
/// assert!(cursor >= commit.unwrap().stamp);
/// ```
pub struct EntityStore {
    config: StoreConfig,
    journal: Mutex<JournalWriter>,
    tables: RwLock<Tables>,
    watermark: Watermark,
}

impl EntityStore {
    /// Opens the store in `dir`, replaying its journal.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Locked`] if another handle has the journal open
    /// - a corruption error if the journal is damaged before its tail
    pub fn open(dir: &Path, config: StoreConfig) -> StoreResult<Self> {
        let journal = FileJournal::open(&dir.join(JOURNAL_FILE), config.create_if_missing)?;
        Self::open_with_backend(Box::new(journal), config, Arc::new(SystemClock))
    }

    /// Opens an ephemeral store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with_backend(
            Box::new(MemoryJournal::new()),
            StoreConfig::default(),
            Arc::new(SystemClock),
        )
    }

    /// Opens a store on any backend with any clock.
    ///
    /// The journal is replayed into the tables. A torn tail is truncated away.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal is corrupted or the backend fails.
    pub fn open_with_backend(
        mut backend: Box<dyn JournalBackend>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let mut tables = Tables::default();
        let mut batches = 0u64;
        let mut last = (0u64, 0i64);

        let end = journal::scan(backend.as_ref(), |_, batch| {
            tables.apply(&batch.rows);
            batches += 1;
            last = (batch.sequence, batch.stamp);
            Ok(())
        })?;

        if end.torn_bytes > 0 {
            tracing::warn!(
                torn_bytes = end.torn_bytes,
                offset = end.valid_len,
                "dropping torn journal tail"
            );
            backend.truncate(end.valid_len)?;
        }

        let watermark = Watermark::new(clock);
        watermark.recover(last.1);

        tracing::info!(
            batches,
            sequence = last.0,
            stamp = last.1,
            habits = tables.habits.len(),
            logs = tables.logs.len(),
            "journal recovered"
        );

        Ok(Self {
            config,
            journal: Mutex::new(JournalWriter::new(backend, last.0)),
            tables: RwLock::new(tables),
            watermark,
        })
    }

    /// Runs a write transaction and commits whatever it staged.
    ///
    /// `floor` is the cursor the writer holds; the commit stamp lands
    /// strictly above it. If the closure stages nothing, nothing is written
    /// and no [`CommitInfo`] is returned.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a [`StoreError`] converted into `E` if
    /// the journal append fails. In both cases nothing is published.
    pub fn write<T, E, F>(&self, floor: i64, f: F) -> Result<(T, Option<CommitInfo>), E>
    where
        F: FnOnce(&mut WriteTxn<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut journal = self.journal.lock();

        let committed = self.tables.read();
        let mut txn = WriteTxn::new(&committed);
        let value = f(&mut txn)?;
        if txn.is_empty() {
            return Ok((value, None));
        }
        let staged = txn.into_staged();
        drop(committed);

        // The journal mutex is still held, so no other writer ran in between.
        let mut tables = self.tables.write();
        let stamp = self.watermark.next_stamp(floor);
        let batch = JournalBatch {
            sequence: journal.next_sequence(),
            stamp,
            rows: staged.stamp(stamp),
        };

        if let Err(e) = journal.append(&batch, self.config.sync_on_commit) {
            tracing::warn!(
                sequence = batch.sequence,
                error = %e,
                "journal append failed; batch discarded"
            );
            return Err(e.into());
        }

        tables.apply(&batch.rows);
        self.watermark.advance(stamp);
        drop(tables);

        tracing::debug!(
            sequence = batch.sequence,
            stamp,
            rows = batch.rows.len(),
            "committed batch"
        );

        Ok((
            value,
            Some(CommitInfo {
                sequence: batch.sequence,
                stamp,
            }),
        ))
    }

    /// Runs `f` against a consistent view of the tables.
    ///
    /// Returns the closure's result and a cursor issued inside the same
    /// critical section: every row `f` could see has `updated_at <= cursor`
    /// and every later commit will have `updated_at > cursor`.
    pub fn snapshot<T, F>(&self, f: F) -> (T, i64)
    where
        F: FnOnce(&StoreView<'_>) -> T,
    {
        let tables = self.tables.read();
        let value = f(&StoreView { tables: &tables });
        let cursor = self.watermark.issue_cursor();
        (value, cursor)
    }

    /// Largest cursor a client can legitimately present.
    pub fn horizon(&self) -> i64 {
        self.watermark.horizon()
    }

    /// Current counts and journal position.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal size cannot be read.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let journal = self.journal.lock();
        let tables = self.tables.read();
        Ok(StoreStats {
            habits: FamilyStats {
                live: tables.habits.live_count(),
                tombstoned: tables.habits.tombstone_count(),
            },
            logs: FamilyStats {
                live: tables.logs.live_count(),
                tombstoned: tables.logs.tombstone_count(),
            },
            last_sequence: journal.next_sequence() - 1,
            last_stamp: self.watermark.last_stamp(),
            journal_bytes: journal.size()?,
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityStore")
            .field("config", &self.config)
            .field("watermark", &self.watermark)
            .finish_non_exhaustive()
    }
}

/// Read-only access to committed rows inside [`EntityStore::snapshot`].
#[derive(Debug)]
pub struct StoreView<'a> {
    tables: &'a Tables,
}

impl<'a> StoreView<'a> {
    /// Looks up a habit by id.
    pub fn habit(&self, id: &Uuid) -> Option<&'a HabitRecord> {
        self.tables.habits.get(id)
    }

    /// Looks up a log by id.
    pub fn log(&self, id: &Uuid) -> Option<&'a LogRecord> {
        self.tables.logs.get(id)
    }

    /// Habits owned by `owner` written after `cursor`, ordered by
    /// `(updated_at, id)`.
    pub fn habits_changed_since(
        &self,
        owner: &Uuid,
        cursor: i64,
    ) -> impl Iterator<Item = &'a HabitRecord> + 'a {
        let tables: &'a Tables = self.tables;
        tables.habits.changed_since(owner, cursor)
    }

    /// Logs owned by `owner` written after `cursor`, ordered by
    /// `(updated_at, id)`.
    pub fn logs_changed_since(
        &self,
        owner: &Uuid,
        cursor: i64,
    ) -> impl Iterator<Item = &'a LogRecord> + 'a {
        let tables: &'a Tables = self.tables;
        tables.logs.changed_since(owner, cursor)
    }
}
