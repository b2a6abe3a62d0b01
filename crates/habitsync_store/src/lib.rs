//! # habitsync Store
//!
//! Durable entity storage and the watermark tracker for habitsync.
//!
//! This crate provides:
//! - [`EntityStore`]: habits and logs in indexed in-memory tables, backed by
//!   an append-only journal of checksummed batches
//! - [`WriteTxn`]: all-or-nothing write transactions
//! - [`Watermark`]: commit stamps and sync cursors
//! - [`JournalBackend`] with [`MemoryJournal`] and [`FileJournal`]
//! - [`verify_journal`] for offline integrity checks
//!
//! ## Layout on disk
//!
//! ```text
//! <data dir>/
//! └─ journal.hsj     # append-only batch journal (exclusively locked)
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod journal;
mod record;
mod stats;
mod store;
mod table;
mod txn;
mod watermark;

pub use backend::{FileJournal, JournalBackend, MemoryJournal};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use journal::{
    encode_frame, read_batches, scan, verify_journal, JournalBatch, ScanEnd, VerifyReport,
    JOURNAL_MAGIC, JOURNAL_VERSION,
};
pub use record::{HabitRecord, LogRecord, Row, RowImage};
pub use stats::{FamilyStats, StoreStats};
pub use store::{CommitInfo, EntityStore, StoreView, JOURNAL_FILE};
pub use txn::WriteTxn;
pub use watermark::{Clock, ManualClock, SystemClock, Watermark};
