//! Dump journal command implementation.

use chrono::{DateTime, SecondsFormat};
use habitsync_store::{scan, FileJournal, JournalBackend, Row, RowImage, JOURNAL_FILE};
use serde::Serialize;
use std::path::Path;

/// Committed batch representation for output.
#[derive(Debug, Serialize)]
pub struct BatchInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Commit sequence.
    pub sequence: u64,
    /// Commit stamp (seconds).
    pub stamp: i64,
    /// Commit stamp as RFC 3339.
    pub time: String,
    /// Rows written by the batch.
    pub rows: Vec<RowInfo>,
}

/// One row image in a batch.
#[derive(Debug, Serialize)]
pub struct RowInfo {
    /// `habit` or `log`.
    pub family: &'static str,
    /// Row id.
    pub id: String,
    /// Owning user.
    pub owner: String,
    /// Whether the row is a tombstone.
    pub deleted: bool,
}

impl From<&RowImage> for RowInfo {
    fn from(row: &RowImage) -> Self {
        let (owner, deleted) = match row {
            RowImage::Habit(h) => (h.owner(), h.is_deleted()),
            RowImage::Log(l) => (l.owner(), l.is_deleted()),
        };
        Self {
            family: row.family(),
            id: row.id().to_string(),
            owner: owner.to_string(),
            deleted,
        }
    }
}

/// Runs the dump-journal command.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let journal_path = path.join(JOURNAL_FILE);
    if !journal_path.exists() {
        return Err("Journal file not found".into());
    }

    let journal = FileJournal::open(&journal_path, false)?;
    let batches = read_batches(&journal, limit)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&batches)?),
        _ => print_text_output(&batches),
    }
    Ok(())
}

/// Reads up to `limit` batches from the start of the journal.
pub fn read_batches(
    journal: &dyn JournalBackend,
    limit: Option<usize>,
) -> Result<Vec<BatchInfo>, Box<dyn std::error::Error>> {
    let max = limit.unwrap_or(usize::MAX);
    let mut batches = Vec::new();
    scan(journal, |offset, batch| {
        if batches.len() < max {
            batches.push(BatchInfo {
                offset,
                sequence: batch.sequence,
                stamp: batch.stamp,
                time: render_stamp(batch.stamp),
                rows: batch.rows.iter().map(RowInfo::from).collect(),
            });
        }
        Ok(())
    })?;
    Ok(batches)
}

fn render_stamp(stamp: i64) -> String {
    DateTime::from_timestamp(stamp, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| stamp.to_string())
}

fn print_text_output(batches: &[BatchInfo]) {
    println!("{} batch(es)", batches.len());
    for batch in batches {
        println!();
        println!(
            "#{} @ {} ({}), offset {}",
            batch.sequence, batch.time, batch.stamp, batch.offset
        );
        for row in &batch.rows {
            let marker = if row.deleted { " [deleted]" } else { "" };
            println!("  {:<5} {} owner {}{}", row.family, row.id, row.owner, marker);
        }
    }
}
