//! A journal backend with injectable failures.

use habitsync_store::{JournalBackend, MemoryJournal, StoreError, StoreResult};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory journal that can be told to fail.
///
/// Clones share the same bytes and switches, so a test can keep one handle
/// while the store owns another. A failing append writes half of the frame
/// before erroring, which is what a crash mid-write leaves behind.
#[derive(Debug, Clone, Default)]
pub struct FlakyBackend {
    data: Arc<Mutex<Vec<u8>>>,
    fail_appends: Arc<AtomicBool>,
    fail_syncs: Arc<AtomicBool>,
}

impl FlakyBackend {
    /// Creates an empty, healthy backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following append fail (or succeed again).
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Makes every following sync fail (or succeed again).
    pub fn fail_syncs(&self, fail: bool) {
        self.fail_syncs.store(fail, Ordering::SeqCst);
    }

    /// Copy of the journal bytes.
    pub fn bytes(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// Current journal length.
    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends raw bytes, bypassing failure injection.
    pub fn append_raw(&self, bytes: &[u8]) {
        self.data.lock().extend_from_slice(bytes);
    }
}

impl JournalBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        MemoryJournal::from_bytes(self.bytes()).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<u64> {
        let mut bytes = self.data.lock();
        let offset = bytes.len() as u64;
        if self.fail_appends.load(Ordering::SeqCst) {
            bytes.extend_from_slice(&data[..data.len() / 2]);
            return Err(StoreError::Io(io::Error::other("injected append failure")));
        }
        bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn sync(&mut self) -> StoreResult<()> {
        if self.fail_syncs.load(Ordering::SeqCst) {
            return Err(StoreError::Io(io::Error::other("injected sync failure")));
        }
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.len() as u64)
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.data.lock().truncate(len as usize);
        Ok(())
    }
}
