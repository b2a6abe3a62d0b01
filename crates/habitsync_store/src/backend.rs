//! Journal backends.
//!
//! Backends are opaque append-only byte stores. They know nothing about
//! frames or batches; [`crate::journal`] owns the format.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An append-only byte store holding the journal.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - after `sync` returns, appended data survives process termination
pub trait JournalBackend: Send {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range extends past the current size.
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>>;

    /// Appends data, returning the offset it was written at.
    fn append(&mut self, data: &[u8]) -> StoreResult<u64>;

    /// Makes all appended data durable.
    fn sync(&mut self) -> StoreResult<()>;

    /// Current size in bytes.
    fn size(&self) -> StoreResult<u64>;

    /// Discards everything at or after `len`.
    fn truncate(&mut self, len: u64) -> StoreResult<()>;
}

fn read_past_end(offset: u64, len: usize, size: u64) -> StoreError {
    StoreError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read past end of journal: offset {offset}, len {len}, size {size}"),
    ))
}

/// A journal held in memory. Lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    data: Vec<u8>,
}

impl MemoryJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a journal pre-filled with `data`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw journal content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl JournalBackend for MemoryJournal {
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        let size = self.data.len() as u64;
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(read_past_end(offset, len, size));
        }
        Ok(self.data[offset as usize..end as usize].to_vec())
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<u64> {
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(data);
        Ok(offset)
    }

    fn sync(&mut self) -> StoreResult<()> {
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.data.len() as u64)
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        self.data.truncate(len as usize);
        Ok(())
    }
}

/// A journal in a single file, held under an exclusive advisory lock.
///
/// A second `FileJournal` on the same path, in this process or another,
/// fails with [`StoreError::Locked`] until the first one is dropped.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileJournal {
    /// Opens the journal at `path`, creating it when allowed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] with `NotFound` if the file is missing and
    ///   `create_if_missing` is false
    /// - [`StoreError::Locked`] if another handle holds the lock
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if !create_if_missing {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("journal does not exist: {}", path.display()),
                )));
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create_if_missing)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JournalBackend for FileJournal {
    fn read_at(&self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        let end = offset.saturating_add(len as u64);
        if end > self.size {
            return Err(read_past_end(offset, len, self.size));
        }
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StoreResult<u64> {
        let offset = self.size;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.size += data.len() as u64;
        Ok(offset)
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, len: u64) -> StoreResult<()> {
        if len > self.size {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot truncate journal of {} bytes to {len}", self.size),
            )));
        }
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.size = len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_append_and_read() {
        let mut journal = MemoryJournal::new();
        assert_eq!(journal.append(b"hello").unwrap(), 0);
        assert_eq!(journal.append(b" world").unwrap(), 5);
        assert_eq!(journal.size().unwrap(), 11);
        assert_eq!(journal.read_at(6, 5).unwrap(), b"world");
        assert!(journal.read_at(8, 10).is_err());
    }

    #[test]
    fn memory_truncate() {
        let mut journal = MemoryJournal::from_bytes(b"abcdef".to_vec());
        journal.truncate(3).unwrap();
        assert_eq!(journal.as_bytes(), b"abc");
    }

    #[test]
    fn file_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.hsj");
        {
            let mut journal = FileJournal::open(&path, true).unwrap();
            journal.append(b"persistent").unwrap();
            journal.sync().unwrap();
        }
        let journal = FileJournal::open(&path, false).unwrap();
        assert_eq!(journal.size().unwrap(), 10);
        assert_eq!(journal.read_at(0, 10).unwrap(), b"persistent");
    }

    #[test]
    fn file_missing_without_create() {
        let dir = tempdir().unwrap();
        let err = FileJournal::open(&dir.path().join("absent.hsj"), false).unwrap_err();
        assert!(matches!(err, StoreError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn file_exclusive_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.hsj");
        let first = FileJournal::open(&path, true).unwrap();

        assert!(matches!(
            FileJournal::open(&path, true),
            Err(StoreError::Locked)
        ));

        drop(first);
        assert!(FileJournal::open(&path, true).is_ok());
    }

    #[test]
    fn file_truncate() {
        let dir = tempdir().unwrap();
        let mut journal = FileJournal::open(&dir.path().join("j.hsj"), true).unwrap();
        journal.append(b"0123456789").unwrap();
        journal.truncate(4).unwrap();
        assert_eq!(journal.size().unwrap(), 4);
        assert_eq!(journal.append(b"xy").unwrap(), 4);
        assert_eq!(journal.read_at(0, 6).unwrap(), b"0123xy");
        assert!(journal.truncate(100).is_err());
    }
}
