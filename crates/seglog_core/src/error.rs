//! Error types for the segment storage engine.

use std::io;
use thiserror::Error;

/// Result type for log storage operations.
pub type LogResult<T> = Result<T, LogError>;

/// Errors that can occur in segment storage operations.
#[derive(Debug, Error)]
pub enum LogError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] seglog_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The requested offset is not present in this segment.
    #[error("offset {offset} not found in segment [{base}, {next})")]
    OffsetNotFound {
        /// The absolute offset that was requested.
        offset: u64,
        /// The segment's base offset.
        base: u64,
        /// The segment's next offset (exclusive upper bound).
        next: u64,
    },

    /// An index lookup addressed a slot beyond the written entries.
    #[error("index entry {slot} out of range ({entries} entries)")]
    EntryOutOfRange {
        /// The requested entry slot.
        slot: u32,
        /// The number of entries actually written.
        entries: u32,
    },

    /// The index has no room for another entry.
    ///
    /// Callers are expected to check capacity via `is_maxed` before
    /// writing; hitting this error indicates a logic error upstream.
    #[error("index full: capacity {capacity} bytes")]
    IndexFull {
        /// The index's configured capacity in bytes.
        capacity: u64,
    },

    /// Checksum mismatch detected while decoding a record.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },

    /// Stored bytes are corrupted or truncated.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// The store or index has been closed.
    #[error("storage is closed")]
    Closed,
}

impl LogError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}
