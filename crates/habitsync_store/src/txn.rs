//! Write transactions.
//!
//! A [`WriteTxn`] stages full row images on top of the committed tables.
//! Nothing is visible to readers until [`crate::EntityStore::write`] commits
//! the staged rows as one journal batch.

use crate::record::{HabitRecord, LogRecord, Row, RowImage};
use crate::table::{Table, Tables};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug)]
struct Staged<R> {
    row: R,
    created: bool,
    tombstone: bool,
}

/// Staged rows of one family layered over the committed table.
#[derive(Debug)]
struct Overlay<'a, R: Row> {
    committed: &'a Table<R>,
    staged: HashMap<Uuid, Staged<R>>,
    order: Vec<Uuid>,
}

impl<'a, R: Row> Overlay<'a, R> {
    fn new(committed: &'a Table<R>) -> Self {
        Self {
            committed,
            staged: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn get(&self, id: &Uuid) -> Option<&R> {
        match self.staged.get(id) {
            Some(staged) => Some(&staged.row),
            None => self.committed.get(id),
        }
    }

    fn stage(&mut self, row: R, tombstone: bool) {
        let id = row.id();
        let (created, tombstone) = match self.staged.get(&id) {
            Some(prev) => (prev.created, prev.tombstone || tombstone),
            None => {
                self.order.push(id);
                (self.committed.get(&id).is_none(), tombstone)
            }
        };
        self.staged.insert(
            id,
            Staged {
                row,
                created,
                tombstone,
            },
        );
    }

    fn tombstone(&mut self, id: &Uuid) -> bool {
        match self.get(id).cloned() {
            Some(row) => {
                self.stage(row, true);
                true
            }
            None => false,
        }
    }

    fn into_staged(mut self) -> Vec<Staged<R>> {
        self.order
            .iter()
            .filter_map(|id| self.staged.remove(id))
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// A write transaction over both families.
///
/// Reads see this transaction's own staged writes. Timestamps on staged rows
/// are placeholders until commit assigns the batch stamp.
#[derive(Debug)]
pub struct WriteTxn<'a> {
    habits: Overlay<'a, HabitRecord>,
    logs: Overlay<'a, LogRecord>,
}

impl<'a> WriteTxn<'a> {
    pub(crate) fn new(tables: &'a Tables) -> Self {
        Self {
            habits: Overlay::new(&tables.habits),
            logs: Overlay::new(&tables.logs),
        }
    }

    /// Looks up a habit, staged or committed.
    pub fn habit(&self, id: &Uuid) -> Option<&HabitRecord> {
        self.habits.get(id)
    }

    /// Stages a full habit image.
    ///
    /// `created_at` is assigned at commit if the habit did not exist before
    /// this transaction; otherwise the image's own `created_at` is kept.
    pub fn put_habit(&mut self, record: HabitRecord) {
        self.habits.stage(record, false);
    }

    /// Stages a tombstone for a visible habit. Returns false if unknown.
    pub fn tombstone_habit(&mut self, id: &Uuid) -> bool {
        self.habits.tombstone(id)
    }

    /// Looks up a log, staged or committed.
    pub fn log(&self, id: &Uuid) -> Option<&LogRecord> {
        self.logs.get(id)
    }

    /// Stages a full log image.
    pub fn put_log(&mut self, record: LogRecord) {
        self.logs.stage(record, false);
    }

    /// Stages a tombstone for a visible log. Returns false if unknown.
    pub fn tombstone_log(&mut self, id: &Uuid) -> bool {
        self.logs.tombstone(id)
    }

    /// Number of distinct rows staged.
    pub fn staged_count(&self) -> usize {
        self.habits.len() + self.logs.len()
    }

    /// Returns true if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged_count() == 0
    }

    /// Detaches the staged rows from the committed tables.
    pub(crate) fn into_staged(self) -> StagedRows {
        StagedRows {
            habits: self.habits.into_staged(),
            logs: self.logs.into_staged(),
        }
    }
}

/// Staged rows waiting for their commit stamp.
#[derive(Debug)]
pub(crate) struct StagedRows {
    habits: Vec<Staged<HabitRecord>>,
    logs: Vec<Staged<LogRecord>>,
}

impl StagedRows {
    /// Stamps every row and returns the images in staging order, habits first.
    pub(crate) fn stamp(self, stamp: i64) -> Vec<RowImage> {
        fn finish<R: Row>(mut staged: Staged<R>, stamp: i64) -> R {
            staged
                .row
                .apply_stamp(stamp, staged.created, staged.tombstone);
            staged.row
        }

        let mut rows: Vec<RowImage> = self
            .habits
            .into_iter()
            .map(|s| RowImage::Habit(finish(s, stamp)))
            .collect();
        rows.extend(
            self.logs
                .into_iter()
                .map(|s| RowImage::Log(finish(s, stamp))),
        );
        rows
    }
}
