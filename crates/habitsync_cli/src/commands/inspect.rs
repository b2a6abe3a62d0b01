//! Inspect command implementation.

use habitsync_store::{EntityStore, StoreConfig, StoreStats};
use std::path::Path;

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stats = collect(path)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&stats)?),
        _ => {
            println!("Store at {}", path.display());
            println!();
            println!("{stats}");
        }
    }
    Ok(())
}

/// Opens an existing store and reads its statistics.
pub fn collect(path: &Path) -> Result<StoreStats, Box<dyn std::error::Error>> {
    let config = StoreConfig::new().create_if_missing(false);
    let store = EntityStore::open(path, config)?;
    Ok(store.stats()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitsync_protocol::Habit;
    use habitsync_store::{HabitRecord, StoreResult};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn counts_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = EntityStore::open(dir.path(), StoreConfig::default()).unwrap();
            let wire = Habit::new(Uuid::new_v4(), Uuid::new_v4(), "Jog", json!({}));
            store
                .write(0, |txn| -> StoreResult<()> {
                    txn.put_habit(HabitRecord::from_wire(Uuid::new_v4(), &wire));
                    Ok(())
                })
                .unwrap();
        }

        let stats = collect(dir.path()).unwrap();
        assert_eq!(stats.habits.live, 1);
        assert_eq!(stats.last_sequence, 1);
    }

    #[test]
    fn missing_store() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect(&dir.path().join("absent")).is_err());
    }
}
