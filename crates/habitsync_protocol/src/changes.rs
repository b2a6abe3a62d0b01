//! Change sets exchanged in both directions of a sync.

use crate::entity::{Habit, Log};
use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};

/// Changes to one entity family.
///
/// Every list may be omitted on input. `created` and `updated` are both
/// treated as upserts; `deleted` holds raw ids so that ids which are not
/// UUID-shaped can be skipped instead of failing the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChanges<T> {
    /// Records the client created.
    #[serde(default = "Vec::new")]
    pub created: Vec<T>,
    /// Records the client updated.
    #[serde(default = "Vec::new")]
    pub updated: Vec<T>,
    /// Ids the client deleted.
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl<T> Default for EntityChanges<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> EntityChanges<T> {
    /// Iterates over every upsert, `created` first.
    pub fn upserts(&self) -> impl Iterator<Item = &T> {
        self.created.iter().chain(self.updated.iter())
    }

    /// Total number of items across the three lists.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Returns true if all three lists are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Changes to both entity families.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Habit changes.
    #[serde(default)]
    pub habits: EntityChanges<Habit>,
    /// Log changes.
    #[serde(default)]
    pub logs: EntityChanges<Log>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of items across both families.
    pub fn item_count(&self) -> usize {
        self.habits.len() + self.logs.len()
    }

    /// Returns true if there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    /// Validates every habit upsert.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn validate(&self) -> ProtocolResult<()> {
        self.habits.upserts().try_for_each(Habit::validate)
    }
}
