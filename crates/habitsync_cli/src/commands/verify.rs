//! Verify command implementation.

use habitsync_store::{verify_journal, FileJournal, VerifyReport, JOURNAL_FILE};
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying journal at {}", path.join(JOURNAL_FILE).display());
    println!();

    let report = check(path)?;
    print_report(&report);

    println!();
    if report.is_ok() {
        println!("✓ Journal verification passed");
        Ok(())
    } else {
        println!("✗ Journal verification failed");
        Err("Verification failed".into())
    }
}

/// Scans the journal in `path` without replaying it.
pub fn check(path: &Path) -> Result<VerifyReport, Box<dyn std::error::Error>> {
    let journal = FileJournal::open(&path.join(JOURNAL_FILE), false)?;
    Ok(verify_journal(&journal)?)
}

fn print_report(report: &VerifyReport) {
    println!("  Frames:        {}", report.frames);
    println!("  Rows:          {}", report.rows);
    println!("  Last sequence: {}", report.last_sequence);
    println!("  Last stamp:    {}", report.last_stamp);
    println!(
        "  Valid bytes:   {} of {}",
        report.valid_bytes, report.total_bytes
    );
    if report.torn_bytes > 0 {
        println!(
            "  Torn tail:     {} bytes (dropped on next open)",
            report.torn_bytes
        );
    }
    if let Some(problem) = &report.problem {
        println!("  Problem:       {problem}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitsync_store::{EntityStore, StoreConfig};

    #[test]
    fn empty_store_verifies() {
        let dir = tempfile::tempdir().unwrap();
        drop(EntityStore::open(dir.path(), StoreConfig::default()).unwrap());

        let report = check(dir.path()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.frames, 0);
    }

    #[test]
    fn garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(JOURNAL_FILE), b"definitely not a journal").unwrap();

        let report = check(dir.path()).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.valid_bytes, 0);
    }
}
