//! Applying client change sets.

use crate::error::EngineResult;
use crate::validate_cursor;
use habitsync_protocol::{ChangeSet, Habit, Log};
use habitsync_store::{EntityStore, HabitRecord, LogRecord, WriteTxn};
use std::sync::Arc;
use uuid::Uuid;

/// Per-family outcome of an apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyReport {
    /// Upserts written.
    pub upserted: usize,
    /// Upserts dropped because the id belongs to another user.
    pub skipped_foreign: usize,
    /// Records tombstoned.
    pub tombstoned: usize,
    /// Delete ids that were unknown, foreign or not UUID-shaped.
    pub deletes_ignored: usize,
}

/// Outcome of [`Reconciler::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Habit counts.
    pub habits: FamilyReport,
    /// Log counts.
    pub logs: FamilyReport,
    /// Journal sequence of the commit, if anything was written.
    pub sequence: Option<u64>,
    /// Stamp of the commit, if anything was written.
    pub stamp: Option<i64>,
}

impl ApplyReport {
    /// Returns true if the apply produced a commit.
    pub fn committed(&self) -> bool {
        self.sequence.is_some()
    }
}

/// Applies client change sets to the store.
///
/// Every `created` or `updated` item is an upsert: insert, or overwrite the
/// mutable fields if the id exists. Retrying a change set therefore rewrites
/// the same values. The whole set commits as one batch, in this order:
///
/// 1. habit upserts
/// 2. habit deletes
/// 3. log upserts
/// 4. log deletes
///
/// Ownership is never taken from the payload. An upsert whose id already
/// belongs to someone else is skipped, and so is a delete of a record the
/// caller does not own.
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: Arc<EntityStore>,
}

impl Reconciler {
    /// Creates a reconciler over `store`.
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Applies `changes` on behalf of `user`, who last synced at `cursor`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Validation`](crate::EngineError::Validation) if the cursor or change set is invalid;
    ///   nothing is applied
    /// - [`EngineError::Store`](crate::EngineError::Store) if the commit fails; nothing is applied
    pub fn apply(&self, user: Uuid, changes: &ChangeSet, cursor: i64) -> EngineResult<ApplyReport> {
        validate_cursor(&self.store, cursor)?;
        changes.validate()?;

        let (mut report, commit) = self.store.write(cursor, |txn| -> EngineResult<ApplyReport> {
            let mut report = ApplyReport::default();
            for habit in changes.habits.upserts() {
                upsert_habit(txn, user, habit, &mut report.habits);
            }
            for raw in &changes.habits.deleted {
                delete_habit(txn, user, raw, &mut report.habits);
            }
            for log in changes.logs.upserts() {
                upsert_log(txn, user, log, &mut report.logs);
            }
            for raw in &changes.logs.deleted {
                delete_log(txn, user, raw, &mut report.logs);
            }
            Ok(report)
        })?;

        if let Some(commit) = commit {
            report.sequence = Some(commit.sequence);
            report.stamp = Some(commit.stamp);
        }

        tracing::info!(
            user = %user,
            sequence = report.sequence,
            stamp = report.stamp,
            habits_upserted = report.habits.upserted,
            habits_tombstoned = report.habits.tombstoned,
            logs_upserted = report.logs.upserted,
            logs_tombstoned = report.logs.tombstoned,
            skipped_foreign = report.habits.skipped_foreign + report.logs.skipped_foreign,
            "applied change set"
        );

        Ok(report)
    }

    /// The store this reconciler writes to.
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

fn upsert_habit(txn: &mut WriteTxn<'_>, user: Uuid, habit: &Habit, report: &mut FamilyReport) {
    let prior = txn
        .habit(&habit.id)
        .map(|h| (h.user_id, h.created_at, h.deleted_at));

    let mut record = HabitRecord::from_wire(user, habit);
    if let Some((owner, created_at, deleted_at)) = prior {
        if owner != user {
            tracing::debug!(user = %user, id = %habit.id, "skipping upsert of foreign habit");
            report.skipped_foreign += 1;
            return;
        }
        record.created_at = created_at;
        record.deleted_at = deleted_at;
    }
    txn.put_habit(record);
    report.upserted += 1;
}

fn delete_habit(txn: &mut WriteTxn<'_>, user: Uuid, raw: &str, report: &mut FamilyReport) {
    let owned = parse_id(raw)
        .filter(|id| txn.habit(id).is_some_and(|h| h.user_id == user));
    match owned {
        Some(id) => {
            txn.tombstone_habit(&id);
            report.tombstoned += 1;
        }
        None => report.deletes_ignored += 1,
    }
}

fn upsert_log(txn: &mut WriteTxn<'_>, user: Uuid, log: &Log, report: &mut FamilyReport) {
    let prior = txn
        .log(&log.id)
        .map(|l| (l.user_id, l.created_at, l.deleted_at));

    let mut record = LogRecord::from_wire(user, log);
    if let Some((owner, created_at, deleted_at)) = prior {
        if owner != user {
            tracing::debug!(user = %user, id = %log.id, "skipping upsert of foreign log");
            report.skipped_foreign += 1;
            return;
        }
        record.created_at = created_at;
        record.deleted_at = deleted_at;
    }
    txn.put_log(record);
    report.upserted += 1;
}

fn delete_log(txn: &mut WriteTxn<'_>, user: Uuid, raw: &str, report: &mut FamilyReport) {
    let owned = parse_id(raw).filter(|id| txn.log(id).is_some_and(|l| l.user_id == user));
    match owned {
        Some(id) => {
            txn.tombstone_log(&id);
            report.tombstoned += 1;
        }
        None => report.deletes_ignored += 1,
    }
}

// Delete lists are opaque strings; anything that is not a UUID cannot name
// a stored record.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;
    use chrono::NaiveDate;
    use habitsync_protocol::LogValue;
    use habitsync_store::{ManualClock, MemoryJournal, StoreConfig};
    use serde_json::json;

    fn store() -> Arc<EntityStore> {
        Arc::new(
            EntityStore::open_with_backend(
                Box::new(MemoryJournal::new()),
                StoreConfig::default(),
                Arc::new(ManualClock::new(10_000)),
            )
            .unwrap(),
        )
    }

    fn habit(title: &str) -> Habit {
        Habit::new(Uuid::new_v4(), Uuid::new_v4(), title, json!({"days": [1, 2]}))
    }

    fn stored_habit(store: &EntityStore, id: Uuid) -> Option<HabitRecord> {
        store.snapshot(|view| view.habit(&id).cloned()).0
    }

    #[test]
    fn upsert_inserts_then_overwrites() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();
        let mut jog = habit("Jog");

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        let first = reconciler.apply(user, &changes, 0).unwrap();
        assert_eq!(first.habits.upserted, 1);
        assert_eq!(first.sequence, Some(1));

        jog.title = "Run".into();
        let mut changes = ChangeSet::new();
        changes.habits.updated.push(jog.clone());
        let second = reconciler.apply(user, &changes, 0).unwrap();

        let row = stored_habit(reconciler.store(), jog.id).unwrap();
        assert_eq!(row.title, "Run");
        assert_eq!(row.created_at, first.stamp.unwrap());
        assert_eq!(row.updated_at, second.stamp.unwrap());
    }

    #[test]
    fn owner_comes_from_caller() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();
        let mut jog = habit("Jog");
        jog.user_id = Some(Uuid::new_v4());

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        reconciler.apply(user, &changes, 0).unwrap();

        assert_eq!(stored_habit(reconciler.store(), jog.id).unwrap().user_id, user);
    }

    #[test]
    fn foreign_upsert_is_skipped() {
        let reconciler = Reconciler::new(store());
        let alice = Uuid::new_v4();
        let mallory = Uuid::new_v4();
        let jog = habit("Jog");

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        reconciler.apply(alice, &changes, 0).unwrap();

        let mut hijack = jog.clone();
        hijack.title = "pwned".into();
        let mut changes = ChangeSet::new();
        changes.habits.updated.push(hijack);
        let report = reconciler.apply(mallory, &changes, 0).unwrap();

        assert_eq!(report.habits.skipped_foreign, 1);
        assert!(!report.committed());
        let row = stored_habit(reconciler.store(), jog.id).unwrap();
        assert_eq!(row.title, "Jog");
        assert_eq!(row.user_id, alice);
    }

    #[test]
    fn delete_ignores_unknown_foreign_and_malformed() {
        let reconciler = Reconciler::new(store());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let jog = habit("Jog");

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        reconciler.apply(alice, &changes, 0).unwrap();

        let mut changes = ChangeSet::new();
        changes.habits.deleted = vec![
            "non-existent-id".into(),
            Uuid::new_v4().to_string(),
            jog.id.to_string(),
        ];
        let report = reconciler.apply(bob, &changes, 0).unwrap();

        assert_eq!(report.habits.deletes_ignored, 3);
        assert_eq!(report.habits.tombstoned, 0);
        assert!(!report.committed());
        assert!(stored_habit(reconciler.store(), jog.id)
            .unwrap()
            .deleted_at
            .is_none());
    }

    #[test]
    fn tombstone_is_sticky() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();
        let jog = habit("Jog");

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        reconciler.apply(user, &changes, 0).unwrap();

        let mut changes = ChangeSet::new();
        changes.habits.deleted.push(jog.id.to_string());
        let deleted = reconciler.apply(user, &changes, 0).unwrap();
        assert_eq!(deleted.habits.tombstoned, 1);

        let mut revived = jog.clone();
        revived.title = "Jog again".into();
        let mut changes = ChangeSet::new();
        changes.habits.updated.push(revived);
        let update = reconciler.apply(user, &changes, 0).unwrap();

        let row = stored_habit(reconciler.store(), jog.id).unwrap();
        assert_eq!(row.title, "Jog again");
        assert_eq!(row.deleted_at, deleted.stamp);
        assert_eq!(row.updated_at, update.stamp.unwrap());
    }

    #[test]
    fn create_and_delete_in_one_batch() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();
        let jog = habit("Jog");

        let mut changes = ChangeSet::new();
        changes.habits.created.push(jog.clone());
        changes.habits.deleted.push(jog.id.to_string());
        let report = reconciler.apply(user, &changes, 0).unwrap();

        let row = stored_habit(reconciler.store(), jog.id).unwrap();
        assert_eq!(row.deleted_at, report.stamp);
        assert_eq!(row.created_at, report.stamp.unwrap());
    }

    #[test]
    fn logs_follow_the_same_rules() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let log = Log::new(Uuid::new_v4(), Uuid::new_v4(), date)
            .with_value(LogValue::from(3i64))
            .with_text("3 km");

        let mut changes = ChangeSet::new();
        changes.logs.created.push(log.clone());
        changes.logs.deleted.push("junk".into());
        let report = reconciler.apply(user, &changes, 0).unwrap();
        assert_eq!(report.logs.upserted, 1);
        assert_eq!(report.logs.deletes_ignored, 1);

        let (row, _) = reconciler
            .store()
            .snapshot(|view| view.log(&log.id).cloned());
        let row = row.unwrap();
        assert_eq!(row.user_id, user);
        assert_eq!(row.value, LogValue::from(3i64));
        assert_eq!(row.text.as_deref(), Some("3 km"));
    }

    #[test]
    fn empty_change_set_commits_nothing() {
        let reconciler = Reconciler::new(store());
        let report = reconciler.apply(Uuid::new_v4(), &ChangeSet::new(), 0).unwrap();
        assert_eq!(report, ApplyReport::default());
        assert_eq!(reconciler.store().stats().unwrap().last_sequence, 0);
    }

    #[test]
    fn invalid_input_rejected_before_commit() {
        let reconciler = Reconciler::new(store());
        let user = Uuid::new_v4();

        let err = reconciler.apply(user, &ChangeSet::new(), -1).unwrap_err();
        assert!(err.is_validation());

        let err = reconciler
            .apply(user, &ChangeSet::new(), 99_999_999)
            .unwrap_err();
        assert!(err.is_validation());

        let mut changes = ChangeSet::new();
        changes.habits.created.push(habit("ok"));
        changes
            .habits
            .created
            .push(Habit::new(Uuid::new_v4(), Uuid::new_v4(), "bad", json!(7)));
        let err = reconciler.apply(user, &changes, 0).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(reconciler.store().stats().unwrap().habits.total(), 0);
    }
}
