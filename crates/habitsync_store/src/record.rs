//! Stored row images.
//!
//! Records carry server timestamps as whole seconds since the epoch. They are
//! converted to the wire representation only when leaving the store.

use chrono::{DateTime, NaiveDate, Utc};
use habitsync_protocol::{Habit, Log, LogValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common accessors the tables and the write path need from a row.
pub trait Row: Clone {
    /// Primary key.
    fn id(&self) -> Uuid;

    /// Owning user.
    fn owner(&self) -> Uuid;

    /// Stamp of the last write.
    fn updated_at(&self) -> i64;

    /// Tombstone stamp, if deleted.
    fn deleted_at(&self) -> Option<i64>;

    /// Assigns server time at commit.
    ///
    /// `updated_at` always becomes `stamp`. `created_at` does too when the row
    /// is new, and `deleted_at` when the row is being tombstoned.
    fn apply_stamp(&mut self, stamp: i64, created: bool, tombstone: bool);

    /// Returns true if the row carries a tombstone.
    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// A stored habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    /// Primary key.
    pub id: Uuid,
    /// Owning user. Never changes after creation.
    pub user_id: Uuid,
    /// Category reference.
    pub category_id: Uuid,
    /// Display title.
    pub title: String,
    /// Opaque frequency descriptor.
    pub frequency_json: serde_json::Value,
    /// Creation stamp.
    pub created_at: i64,
    /// Last write stamp.
    pub updated_at: i64,
    /// Tombstone stamp.
    pub deleted_at: Option<i64>,
}

impl HabitRecord {
    /// Builds an unstamped record owned by `owner` from a wire habit.
    ///
    /// The payload's own `user_id` and timestamps are discarded.
    pub fn from_wire(owner: Uuid, habit: &Habit) -> Self {
        Self {
            id: habit.id,
            user_id: owner,
            category_id: habit.category_id,
            title: habit.title.clone(),
            frequency_json: habit.frequency_json.clone(),
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    /// Renders the record for the wire.
    pub fn to_wire(&self) -> Habit {
        Habit {
            id: self.id,
            user_id: Some(self.user_id),
            category_id: self.category_id,
            title: self.title.clone(),
            frequency_json: self.frequency_json.clone(),
            created_at: Some(to_datetime(self.created_at)),
            updated_at: Some(to_datetime(self.updated_at)),
            deleted_at: self.deleted_at.map(to_datetime),
        }
    }
}

impl Row for HabitRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.user_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn apply_stamp(&mut self, stamp: i64, created: bool, tombstone: bool) {
        if created {
            self.created_at = stamp;
        }
        if tombstone {
            self.deleted_at = Some(stamp);
        }
        self.updated_at = stamp;
    }
}

/// A stored habit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Primary key.
    pub id: Uuid,
    /// Owning habit.
    pub habit_id: Uuid,
    /// Owning user. Never changes after creation.
    pub user_id: Uuid,
    /// Calendar day.
    pub date: NaiveDate,
    /// Optional note.
    pub text: Option<String>,
    /// Value payload.
    pub value: LogValue,
    /// Creation stamp.
    pub created_at: i64,
    /// Last write stamp.
    pub updated_at: i64,
    /// Tombstone stamp.
    pub deleted_at: Option<i64>,
}

impl LogRecord {
    /// Builds an unstamped record owned by `owner` from a wire log.
    pub fn from_wire(owner: Uuid, log: &Log) -> Self {
        Self {
            id: log.id,
            habit_id: log.habit_id,
            user_id: owner,
            date: log.date,
            text: log.text.clone(),
            value: log.value.clone(),
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    /// Renders the record for the wire.
    pub fn to_wire(&self) -> Log {
        Log {
            id: self.id,
            habit_id: self.habit_id,
            user_id: Some(self.user_id),
            date: self.date,
            text: self.text.clone(),
            value: self.value.clone(),
            created_at: Some(to_datetime(self.created_at)),
            updated_at: Some(to_datetime(self.updated_at)),
            deleted_at: self.deleted_at.map(to_datetime),
        }
    }
}

impl Row for LogRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Uuid {
        self.user_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<i64> {
        self.deleted_at
    }

    fn apply_stamp(&mut self, stamp: i64, created: bool, tombstone: bool) {
        if created {
            self.created_at = stamp;
        }
        if tombstone {
            self.deleted_at = Some(stamp);
        }
        self.updated_at = stamp;
    }
}

/// One row image inside a journal batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowImage {
    /// Full habit image after the write.
    Habit(HabitRecord),
    /// Full log image after the write.
    Log(LogRecord),
}

impl RowImage {
    /// Primary key of the row.
    pub fn id(&self) -> Uuid {
        match self {
            RowImage::Habit(r) => r.id,
            RowImage::Log(r) => r.id,
        }
    }

    /// Family name, for display.
    pub fn family(&self) -> &'static str {
        match self {
            RowImage::Habit(_) => "habit",
            RowImage::Log(_) => "log",
        }
    }
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
