//! Watermark tracker: commit stamps and sync cursors.
//!
//! A hybrid logical clock over whole seconds. Wall-clock time drives the
//! stamps, but a stamp never falls at or below a cursor that has already
//! been handed out, so a client holding cursor `C` is guaranteed to see
//! every commit made after `C` was issued.
//!
//! Both halves rely on the store's table lock:
//!
//! - [`Watermark::next_stamp`] / [`Watermark::advance`] run under the
//!   exclusive lock, at commit.
//! - [`Watermark::issue_cursor`] runs under the shared lock, inside a
//!   snapshot.
//!
//! Every row visible to a snapshot therefore has `updated_at <= cursor`, and
//! every later commit gets `updated_at > cursor`.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of wall-clock seconds.
pub trait Clock: Send + Sync {
    /// Current time in whole seconds since the epoch.
    fn now(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Sets the current time.
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Tracks the last commit stamp and the highest cursor issued.
pub struct Watermark {
    clock: Arc<dyn Clock>,
    last_stamp: AtomicI64,
    issued: AtomicI64,
}

impl Watermark {
    /// Creates a tracker with nothing committed and nothing issued.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_stamp: AtomicI64::new(0),
            issued: AtomicI64::new(0),
        }
    }

    /// Restores state after journal replay.
    ///
    /// Cursors issued before a restart are unknown, so everything up to the
    /// current time is treated as issued.
    pub fn recover(&self, last_stamp: i64) {
        self.last_stamp.store(last_stamp, Ordering::SeqCst);
        self.issued
            .store(last_stamp.max(self.clock.now()), Ordering::SeqCst);
    }

    /// Computes the stamp for the next commit.
    ///
    /// The result is above every issued cursor and above `floor`, the
    /// cursor the writer itself is holding.
    pub fn next_stamp(&self, floor: i64) -> i64 {
        let issued = self.issued.load(Ordering::SeqCst);
        self.clock
            .now()
            .max(self.last_stamp.load(Ordering::SeqCst))
            .max(issued.saturating_add(1))
            .max(floor.saturating_add(1))
    }

    /// Records a stamp once its batch is durable and published.
    pub fn advance(&self, stamp: i64) {
        self.last_stamp.fetch_max(stamp, Ordering::SeqCst);
    }

    /// Issues a cursor covering everything committed so far.
    pub fn issue_cursor(&self) -> i64 {
        let cursor = self
            .clock
            .now()
            .max(self.last_stamp.load(Ordering::SeqCst));
        self.issued.fetch_max(cursor, Ordering::SeqCst);
        cursor
    }

    /// Largest cursor a client can legitimately hold.
    pub fn horizon(&self) -> i64 {
        self.clock.now().max(self.issued.load(Ordering::SeqCst))
    }

    /// Stamp of the last published commit.
    pub fn last_stamp(&self) -> i64 {
        self.last_stamp.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watermark")
            .field("last_stamp", &self.last_stamp.load(Ordering::SeqCst))
            .field("issued", &self.issued.load(Ordering::SeqCst))
            .finish()
    }
}
