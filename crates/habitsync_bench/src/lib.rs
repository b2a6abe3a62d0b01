//! Benchmark utilities.

#![warn(missing_docs)]

use chrono::NaiveDate;
use habitsync_protocol::{ChangeSet, Habit, Log, LogValue};
use serde_json::json;
use uuid::Uuid;

/// Generate `count` habits with fresh ids.
pub fn generate_habits(count: usize) -> Vec<Habit> {
    (0..count)
        .map(|i| {
            Habit::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                format!("habit {i}"),
                json!({"type": "weekly", "days": [1, 3, 5]}),
            )
        })
        .collect()
}

/// Generate a change set of `habits` habits with `logs_per_habit` logs each.
pub fn generate_changes(habits: usize, logs_per_habit: usize) -> ChangeSet {
    let habits = generate_habits(habits);
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default();
    let mut changes = ChangeSet::new();
    for habit in &habits {
        for n in 0..logs_per_habit {
            changes.logs.created.push(
                Log::new(Uuid::new_v4(), habit.id, date).with_value(LogValue::from(n as u64)),
            );
        }
    }
    changes.habits.created = habits;
    changes
}
