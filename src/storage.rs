// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pluggable Entry Persistence
//!
//! The chain calls its sink BEFORE an entry becomes visible in memory, so a
//! failed write never leaves a ghost entry behind.
//!
//! # File Format (`FileSink`)
//! ```text
//! [Header: 16 bytes][Record][Record][Record]...
//! ```
//!
//! Header:
//! - magic: b"QRDL"
//! - version: u32 (1)
//! - reserved: u64 (0)
//!
//! Record:
//! - len: u32 LE (body length)
//! - crc: u32 LE (CRC32 of body)
//! - body: bincode-encoded entry, data held as canonical JSON text

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::canonical::canonical_payload;
use crate::chain::LogEntry;
use crate::error::{StorageError, StorageResult};
use crate::types::Payload;

const MAGIC: [u8; 4] = *b"QRDL";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;
const RECORD_PREFIX_LEN: usize = 8;

/// Destination for committed chain entries.
pub trait EntrySink: Send + Sync {
    /// Durably record `entry`. Only returns `Ok` once the write is complete.
    fn persist(&mut self, entry: &LogEntry) -> StorageResult<()>;

    /// Number of entries this sink holds.
    fn persisted_count(&self) -> u64;
}

/// Keeps nothing beyond a counter; the chain's own memory is the log.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    count: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntrySink for MemorySink {
    fn persist(&mut self, _entry: &LogEntry) -> StorageResult<()> {
        self.count += 1;
        Ok(())
    }

    fn persisted_count(&self) -> u64 {
        self.count
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    data: String,
    timestamp: String,
    previous_hash: String,
    entry_hash: String,
}

impl StoredEntry {
    fn from_entry(entry: &LogEntry) -> StorageResult<Self> {
        let data = String::from_utf8(canonical_payload(entry.data()))
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self {
            data,
            timestamp: entry.timestamp().to_string(),
            previous_hash: entry.previous_hash().to_string(),
            entry_hash: entry.entry_hash().to_string(),
        })
    }

    fn into_entry(self) -> StorageResult<LogEntry> {
        let data: Payload = serde_json::from_str(&self.data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(LogEntry::from_parts(
            data,
            self.timestamp,
            self.previous_hash,
            self.entry_hash,
        ))
    }
}

fn header_bytes() -> [u8; HEADER_LEN] {
    let mut bytes = [0u8; HEADER_LEN];
    bytes[0..4].copy_from_slice(&MAGIC);
    bytes[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes[8..16].copy_from_slice(&0u64.to_le_bytes());
    bytes
}

fn validate_header(bytes: &[u8]) -> StorageResult<()> {
    if bytes.len() < HEADER_LEN || bytes[0..4] != MAGIC {
        return Err(StorageError::InvalidHeader);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    if u32::from_le_bytes(version) != FORMAT_VERSION {
        return Err(StorageError::InvalidHeader);
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

/// Append-only, fsync'd file log.
///
/// `committed_len` is the file length after the last record the chain
/// accepted. Anything past it is a torn write and is cut off before the next
/// append, so a failed `persist` never leaves bytes a reader would see.
pub struct FileSink {
    path: PathBuf,
    file: File,
    committed_len: u64,
    record_count: u64,
}

impl FileSink {
    /// Open or create a log file.
    ///
    /// An existing file is fully validated (header, framing, checksums) before
    /// any new record may be appended to it.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let existing_len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let record_count = if existing_len > 0 {
            Self::read_entries(&path)?.len() as u64
        } else {
            0
        };

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        let committed_len = if existing_len == 0 {
            file.write_all(&header_bytes())?;
            file.sync_all()?;
            HEADER_LEN as u64
        } else {
            existing_len
        };

        tracing::debug!("File sink opened at {:?} with {} records", path, record_count);

        Ok(Self {
            path,
            file,
            committed_len,
            record_count,
        })
    }

    fn encode_frame(entry: &LogEntry) -> StorageResult<Vec<u8>> {
        let stored = StoredEntry::from_entry(entry)?;
        let body = bincode::serde::encode_to_vec(&stored, bincode::config::standard())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let len = u32::try_from(body.len())
            .map_err(|_| StorageError::Serialization("record too large".to_string()))?;

        let mut frame = Vec::with_capacity(RECORD_PREFIX_LEN + body.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Cut the file back to the last committed record.
    fn discard_torn_tail(&mut self) -> StorageResult<()> {
        if self.file.metadata()?.len() != self.committed_len {
            tracing::warn!("Discarding torn tail of {:?} at offset {}", self.path, self.committed_len);
            self.file.set_len(self.committed_len)?;
            self.file.sync_all()?;
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> StorageResult<()> {
        self.file.write_all(frame)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Load every entry of a log file, in order.
    pub fn read_entries(path: impl AsRef<Path>) -> StorageResult<Vec<LogEntry>> {
        let bytes = std::fs::read(path.as_ref())?;
        validate_header(&bytes)?;

        let mut entries = Vec::new();
        let mut offset = HEADER_LEN;

        while offset < bytes.len() {
            if bytes.len() - offset < RECORD_PREFIX_LEN {
                return Err(StorageError::Truncated(offset as u64));
            }
            let len = read_u32(&bytes[offset..]) as usize;
            let expected = read_u32(&bytes[offset + 4..]);
            let body_start = offset + RECORD_PREFIX_LEN;
            let body_end = body_start
                .checked_add(len)
                .filter(|end| *end <= bytes.len())
                .ok_or(StorageError::Truncated(offset as u64))?;

            let body = &bytes[body_start..body_end];
            let found = crc32fast::hash(body);
            if found != expected {
                return Err(StorageError::ChecksumMismatch {
                    record: entries.len() as u64,
                    expected,
                    found,
                });
            }

            let (stored, _): (StoredEntry, usize) =
                bincode::serde::decode_from_slice(body, bincode::config::standard())
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
            entries.push(stored.into_entry()?);

            offset = body_end;
        }

        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntrySink for FileSink {
    fn persist(&mut self, entry: &LogEntry) -> StorageResult<()> {
        let frame = Self::encode_frame(entry)?;
        self.discard_torn_tail()?;

        if let Err(e) = self.write_frame(&frame) {
            if let Err(cleanup) = self.discard_torn_tail() {
                tracing::error!("Could not discard torn record in {:?}: {}", self.path, cleanup);
            }
            return Err(e);
        }

        self.committed_len += frame.len() as u64;
        self.record_count += 1;
        Ok(())
    }

    fn persisted_count(&self) -> u64 {
        self.record_count
    }
}
