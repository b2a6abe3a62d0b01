//! Property-based test generators using proptest.
//!
//! Everything generated here passes wire validation, so a property can feed
//! it straight into the reconciler.

use chrono::NaiveDate;
use habitsync_protocol::{ChangeSet, EntityChanges, Habit, Log, LogValue};
use proptest::prelude::*;
use serde_json::json;
use uuid::Uuid;

/// Strategy for generating ids.
pub fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Strategy for generating habit titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex")
}

/// Strategy for generating frequency descriptors (always JSON objects).
pub fn frequency_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(json!({"type": "daily"})),
        prop::collection::btree_set(1u8..=7, 1..=3)
            .prop_map(|days| json!({"type": "weekly", "days": days})),
        (1u32..10).prop_map(|n| json!({"type": "every", "n": n})),
    ]
}

/// Strategy for generating habits.
pub fn habit_strategy() -> impl Strategy<Value = Habit> {
    (
        uuid_strategy(),
        uuid_strategy(),
        title_strategy(),
        frequency_strategy(),
    )
        .prop_map(|(id, category, title, frequency)| Habit::new(id, category, title, frequency))
}

/// Strategy for generating log values.
///
/// Numbers are kept finite so they survive a JSON round trip.
pub fn log_value_strategy() -> impl Strategy<Value = LogValue> {
    prop_oneof![
        Just(LogValue::Absent),
        any::<bool>().prop_map(LogValue::Boolean),
        (-1_000_000i64..1_000_000).prop_map(LogValue::from),
        (-1_000_000i32..1_000_000)
            .prop_filter_map("finite", |n| LogValue::from_f64(f64::from(n) / 4.0)),
        "[a-z ]{0,16}".prop_map(LogValue::Text),
    ]
}

/// Strategy for generating calendar dates.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day 1-28 always exists"))
}

/// Strategy for generating logs against `habit_id`.
pub fn log_strategy(habit_id: Uuid) -> impl Strategy<Value = Log> {
    (
        uuid_strategy(),
        date_strategy(),
        log_value_strategy(),
        prop::option::of("[a-z ]{1,16}"),
    )
        .prop_map(move |(id, date, value, text)| {
            let log = Log::new(id, habit_id, date).with_value(value);
            match text {
                Some(text) => log.with_text(text),
                None => log,
            }
        })
}

/// Strategy for generating delete lists: ids from `known`, fresh ids and
/// strings that are not UUIDs at all.
pub fn deleted_strategy(known: Vec<Uuid>) -> impl Strategy<Value = Vec<String>> {
    let id = if known.is_empty() {
        uuid_strategy().boxed()
    } else {
        prop_oneof![prop::sample::select(known), uuid_strategy()].boxed()
    };
    prop::collection::vec(
        prop_oneof![
            3 => id.prop_map(|id| id.to_string()),
            1 => "[a-z-]{0,12}",
        ],
        0..4,
    )
}

/// Strategy for generating a valid change set.
///
/// Logs point at the generated habits, and deletes may name them.
pub fn change_set_strategy() -> impl Strategy<Value = ChangeSet> {
    prop::collection::vec(habit_strategy(), 0..6)
        .prop_flat_map(|habits| {
            let ids: Vec<Uuid> = habits.iter().map(|h| h.id).collect();
            let parent = ids.first().copied().unwrap_or_else(Uuid::nil);
            let split = 0..=habits.len();
            (
                Just(habits),
                split,
                deleted_strategy(ids),
                prop::collection::vec(log_strategy(parent), 0..6),
            )
        })
        .prop_map(|(mut habits, split, deleted, logs)| {
            let updated = habits.split_off(split);
            ChangeSet {
                habits: EntityChanges {
                    created: habits,
                    updated,
                    deleted,
                },
                logs: EntityChanges {
                    created: logs,
                    updated: Vec::new(),
                    deleted: Vec::new(),
                },
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_change_sets_validate(changes in change_set_strategy()) {
            prop_assert!(changes.validate().is_ok());
        }

        #[test]
        fn generated_logs_survive_json(log in uuid_strategy().prop_flat_map(log_strategy)) {
            let bytes = serde_json::to_vec(&log).unwrap();
            let back: Log = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(back, log);
        }
    }
}
