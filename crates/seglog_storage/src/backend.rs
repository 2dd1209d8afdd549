//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend for seglog.
///
/// Storage backends are **opaque byte stores**. They provide simple
/// operations for reading, appending, positionally overwriting, and
/// flushing bytes. The engine owns all file format interpretation -
/// backends do not understand record frames, index entries, or segments.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `write_at` only touches bytes inside the already-allocated region
/// - `flush` ensures all pending writes reach the underlying store
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The offset is beyond the current size
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Writes data at a fixed offset inside the allocated region.
    ///
    /// Used for fixed-width structures that cursor through a
    /// pre-allocated region (see [`StorageBackend::reserve`]). The write
    /// must fall entirely within the current size.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The write would extend beyond the current size
    /// - An I/O error occurs
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Flushes all pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush` - it ensures that
    /// file metadata (size, timestamps) is also durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to the given size.
    ///
    /// Removes all data after the specified offset. Used to compact a
    /// pre-allocated region down to its used length on close.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The truncation fails
    /// - `new_size` is greater than the current size
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Grows the storage to at least `capacity` bytes, zero-filling.
    ///
    /// A no-op when the storage is already at least that large. Used to
    /// pre-allocate a fixed-capacity region up front so that fixed-width
    /// positional writes never grow the backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation fails.
    fn reserve(&mut self, capacity: u64) -> StorageResult<()>;
}
