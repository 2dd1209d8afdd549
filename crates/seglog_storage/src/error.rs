//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Attempted a positional write outside the allocated region.
    #[error("write beyond allocated region: offset {offset}, len {len}, size {size}")]
    WriteOutOfBounds {
        /// The requested write offset.
        offset: u64,
        /// The requested write length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Another instance holds the exclusive lock on the backing file.
    #[error("backing file is locked by another instance: {path:?}")]
    Locked {
        /// Path to the locked file.
        path: PathBuf,
    },

    /// The storage is corrupted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}
