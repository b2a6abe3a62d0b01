//! Journal framing, replay and verification.
//!
//! Each committed transaction is one frame:
//!
//! ```text
//! ┌────────┬─────────┬─────────┬────────────┬───────────────┬────────┐
//! │ "HSJ1" │ version │ length  │ header CRC │ CBOR payload  │ CRC32  │
//! │ 4      │ u16 LE  │ u32 LE  │ u32 LE     │ length bytes  │ u32 LE │
//! └────────┴─────────┴─────────┴────────────┴───────────────┴────────┘
//! ```
//!
//! The header CRC covers magic, version and length. The trailing CRC covers
//! header and payload. The payload is a [`JournalBatch`].
//!
//! While scanning:
//! - an incomplete header, or a verified header whose frame runs past the
//!   end, is a torn tail and marks the end
//! - bad magic, unknown version, a header checksum mismatch or a frame
//!   checksum mismatch is corruption
//! - sequences must increase by one from frame to frame
//!
//! The length is trusted only once the header CRC matches, so a damaged
//! length in an earlier frame can never pass for a torn tail.

use crate::backend::JournalBackend;
use crate::error::{StoreError, StoreResult};
use crate::record::RowImage;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"HSJ1";

/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_FIELDS: usize = 10;

/// Header fields plus their CRC.
const HEADER_SIZE: usize = HEADER_FIELDS + 4;

const CRC_SIZE: usize = 4;

/// Row images written by one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalBatch {
    /// Commit sequence, starting at 1.
    pub sequence: u64,
    /// Commit stamp shared by every row in the batch.
    pub stamp: i64,
    /// Full row images after the write.
    pub rows: Vec<RowImage>,
}

/// Encodes a batch into a complete frame.
///
/// # Errors
///
/// Returns [`StoreError::Codec`] if the batch cannot be serialized or is
/// larger than a frame can describe.
pub fn encode_frame(batch: &JournalBatch) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(batch, &mut payload).map_err(|e| StoreError::Codec(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        StoreError::Codec(format!("batch of {} bytes exceeds frame limit", payload.len()))
    })?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    frame.extend_from_slice(&JOURNAL_MAGIC);
    frame.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    let header_crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&header_crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Appends frames and rolls back partial writes.
pub(crate) struct JournalWriter {
    backend: Box<dyn JournalBackend>,
    next_sequence: u64,
    poisoned: bool,
}

impl JournalWriter {
    pub(crate) fn new(backend: Box<dyn JournalBackend>, last_sequence: u64) -> Self {
        Self {
            backend,
            next_sequence: last_sequence + 1,
            poisoned: false,
        }
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub(crate) fn size(&self) -> StoreResult<u64> {
        self.backend.size()
    }

    /// Appends one batch. On failure the journal is cut back to its previous
    /// length so a later open never replays the failed batch.
    pub(crate) fn append(&mut self, batch: &JournalBatch, sync: bool) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::aborted(
                "journal could not be rolled back after a failed write; reopen the store",
            ));
        }

        let frame = encode_frame(batch)?;
        let start = self.backend.size()?;
        let mut result = self.backend.append(&frame).map(|_| ());
        if result.is_ok() && sync {
            result = self.backend.sync();
        }

        if let Err(e) = result {
            if let Err(rollback) = self.backend.truncate(start) {
                tracing::error!(
                    error = %rollback,
                    offset = start,
                    "failed to roll back journal; refusing further writes"
                );
                self.poisoned = true;
            }
            return Err(e);
        }

        self.next_sequence = batch.sequence + 1;
        Ok(())
    }
}

/// Where a scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanEnd {
    /// Bytes covered by complete, valid frames.
    pub valid_len: u64,
    /// Bytes after the last valid frame.
    pub torn_bytes: u64,
}

/// Walks every frame, handing each decoded batch and its offset to `visit`.
///
/// # Errors
///
/// Returns the first corruption found, or any error from `visit`.
pub fn scan<F>(backend: &dyn JournalBackend, mut visit: F) -> StoreResult<ScanEnd>
where
    F: FnMut(u64, JournalBatch) -> StoreResult<()>,
{
    let size = backend.size()?;
    let mut offset = 0u64;
    let mut previous: Option<u64> = None;

    while offset < size {
        let remaining = size - offset;
        if remaining < HEADER_SIZE as u64 {
            break;
        }

        let header = backend.read_at(offset, HEADER_SIZE)?;
        if header[0..4] != JOURNAL_MAGIC {
            return Err(StoreError::corrupted(offset, "invalid magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != JOURNAL_VERSION {
            return Err(StoreError::corrupted(
                offset,
                format!("unsupported frame version {version}"),
            ));
        }
        let expected = u32::from_le_bytes([header[10], header[11], header[12], header[13]]);
        let actual = crc32fast::hash(&header[..HEADER_FIELDS]);
        if expected != actual {
            return Err(StoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }
        let len = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;

        let frame_len = (HEADER_SIZE + len + CRC_SIZE) as u64;
        if remaining < frame_len {
            break;
        }

        let body = backend.read_at(offset + HEADER_SIZE as u64, len + CRC_SIZE)?;
        let (payload, crc_bytes) = body.split_at(len);
        let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(payload);
        let actual = hasher.finalize();
        if expected != actual {
            return Err(StoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let batch: JournalBatch = ciborium::from_reader(payload)
            .map_err(|e| StoreError::corrupted(offset, format!("undecodable batch: {e}")))?;

        if let Some(prev) = previous {
            if batch.sequence != prev + 1 {
                return Err(StoreError::corrupted(
                    offset,
                    format!("sequence {} follows {prev}", batch.sequence),
                ));
            }
        }
        previous = Some(batch.sequence);

        visit(offset, batch)?;
        offset += frame_len;
    }

    Ok(ScanEnd {
        valid_len: offset,
        torn_bytes: size - offset,
    })
}

/// Reads every committed batch.
///
/// # Errors
///
/// Fails on corruption. A torn tail is not an error.
pub fn read_batches(backend: &dyn JournalBackend) -> StoreResult<Vec<JournalBatch>> {
    let mut batches = Vec::new();
    scan(backend, |_, batch| {
        batches.push(batch);
        Ok(())
    })?;
    Ok(batches)
}

/// Result of [`verify_journal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Valid frames found.
    pub frames: u64,
    /// Rows across all valid frames.
    pub rows: u64,
    /// Total journal size.
    pub total_bytes: u64,
    /// Bytes covered by valid frames.
    pub valid_bytes: u64,
    /// Incomplete bytes at the end, dropped on next open.
    pub torn_bytes: u64,
    /// Sequence of the last valid frame.
    pub last_sequence: u64,
    /// Stamp of the last valid frame.
    pub last_stamp: i64,
    /// First problem found, if any.
    pub problem: Option<String>,
}

impl VerifyReport {
    /// Returns true if no corruption was found. A torn tail is tolerated.
    pub fn is_ok(&self) -> bool {
        self.problem.is_none()
    }
}

/// Checks magic, version, checksum and decodability of every frame.
///
/// Corruption is reported in [`VerifyReport::problem`] rather than returned.
///
/// # Errors
///
/// Returns an error only if the backend itself fails.
pub fn verify_journal(backend: &dyn JournalBackend) -> StoreResult<VerifyReport> {
    let mut report = VerifyReport {
        total_bytes: backend.size()?,
        ..VerifyReport::default()
    };

    let result = scan(backend, |_, batch| {
        report.frames += 1;
        report.rows += batch.rows.len() as u64;
        report.last_sequence = batch.sequence;
        report.last_stamp = batch.stamp;
        Ok(())
    });

    match result {
        Ok(end) => {
            report.valid_bytes = end.valid_len;
            report.torn_bytes = end.torn_bytes;
        }
        Err(e) if e.is_corruption() => {
            if let StoreError::Corrupted { offset, .. } | StoreError::ChecksumMismatch { offset, .. } =
                &e
            {
                report.valid_bytes = *offset;
            }
            report.problem = Some(e.to_string());
        }
        Err(e) => return Err(e),
    }
    Ok(report)
}
