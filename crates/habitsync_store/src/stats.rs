//! Store statistics.

use serde::Serialize;
use std::fmt;

/// Row counts for one entity family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FamilyStats {
    /// Rows without a tombstone.
    pub live: usize,
    /// Tombstoned rows.
    pub tombstoned: usize,
}

impl FamilyStats {
    /// All rows, live or not.
    pub fn total(&self) -> usize {
        self.live + self.tombstoned
    }
}

/// Point-in-time statistics for an [`crate::EntityStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Habit counts.
    pub habits: FamilyStats,
    /// Log counts.
    pub logs: FamilyStats,
    /// Sequence of the last committed batch (0 if none).
    pub last_sequence: u64,
    /// Stamp of the last committed batch (0 if none).
    pub last_stamp: i64,
    /// Journal size in bytes.
    pub journal_bytes: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "habits:        {} live, {} tombstoned",
            self.habits.live, self.habits.tombstoned
        )?;
        writeln!(
            f,
            "logs:          {} live, {} tombstoned",
            self.logs.live, self.logs.tombstoned
        )?;
        writeln!(f, "last sequence: {}", self.last_sequence)?;
        writeln!(f, "last stamp:    {}", self.last_stamp)?;
        write!(f, "journal bytes: {}", self.journal_bytes)
    }
}
