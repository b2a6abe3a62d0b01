//! In-memory tables with a per-owner change index.

use crate::record::{HabitRecord, LogRecord, Row, RowImage};
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use uuid::Uuid;

/// Rows of one family keyed by id, plus an `(updated_at, id)` index per owner.
///
/// The index turns "changed since T for user U" into a range scan.
#[derive(Debug)]
pub struct Table<R: Row> {
    rows: HashMap<Uuid, R>,
    by_owner: HashMap<Uuid, BTreeSet<(i64, Uuid)>>,
}

impl<R: Row> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            by_owner: HashMap::new(),
        }
    }
}

impl<R: Row> Table<R> {
    /// Looks up a row by id.
    pub fn get(&self, id: &Uuid) -> Option<&R> {
        self.rows.get(id)
    }

    /// Inserts or replaces a row, keeping the index in step.
    pub fn put(&mut self, row: R) {
        let id = row.id();
        if let Some(old) = self.rows.get(&id) {
            if let Some(index) = self.by_owner.get_mut(&old.owner()) {
                index.remove(&(old.updated_at(), id));
            }
        }
        self.by_owner
            .entry(row.owner())
            .or_default()
            .insert((row.updated_at(), id));
        self.rows.insert(id, row);
    }

    /// Rows owned by `owner` with `updated_at > cursor`, oldest first.
    pub fn changed_since(&self, owner: &Uuid, cursor: i64) -> impl Iterator<Item = &R> + '_ {
        let lower = Bound::Excluded((cursor, Uuid::from_u128(u128::MAX)));
        self.by_owner
            .get(owner)
            .into_iter()
            .flat_map(move |index| index.range((lower, Bound::Unbounded)))
            .filter_map(move |(_, id)| self.rows.get(id))
    }

    /// Number of rows without a tombstone.
    pub fn live_count(&self) -> usize {
        self.rows.values().filter(|r| !r.is_deleted()).count()
    }

    /// Number of tombstoned rows.
    pub fn tombstone_count(&self) -> usize {
        self.rows.values().filter(|r| r.is_deleted()).count()
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Both families.
#[derive(Debug, Default)]
pub struct Tables {
    /// Habit rows.
    pub habits: Table<HabitRecord>,
    /// Log rows.
    pub logs: Table<LogRecord>,
}

impl Tables {
    /// Publishes the row images of one committed batch.
    pub(crate) fn apply(&mut self, rows: &[RowImage]) {
        for row in rows {
            match row {
                RowImage::Habit(r) => self.habits.put(r.clone()),
                RowImage::Log(r) => self.logs.put(r.clone()),
            }
        }
    }
}
