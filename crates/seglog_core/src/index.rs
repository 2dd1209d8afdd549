//! Offset index over a pre-allocated fixed-width entry file.

use crate::error::{LogError, LogResult};
use parking_lot::Mutex;
use seglog_storage::StorageBackend;

/// Width of the relative-offset field in an entry.
const REL_OFFSET_WIDTH: usize = 4;

/// Width of one index entry in bytes:
/// `| relative offset (4, BE) | store position (8, BE) |`.
pub const ENTRY_WIDTH: u64 = 12;

/// An index lookup query.
///
/// Replaces a signed "-1 means last" sentinel with the two queries the
/// index actually supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The n-th entry, 0-based from the start of the index.
    At(u32),
    /// The last written entry.
    Last,
}

/// Maps a segment-relative offset to a byte position in the store.
///
/// The backing region is grown to its full configured capacity at open
/// so every write is a fixed-offset positional write; on close the
/// region is truncated back down to the bytes actually used, leaving a
/// compact file on disk. Entries are appended in strictly increasing
/// relative-offset order: entry `i` refers to the `i`-th record appended
/// to this segment's store.
///
/// # Concurrency
///
/// All operations share one exclusive lock, so a write can never race
/// the capacity check or a concurrent read of a half-written entry.
pub struct Index {
    inner: Mutex<IndexInner>,
}

struct IndexInner {
    backend: Box<dyn StorageBackend>,
    size: u64,
    max_bytes: u64,
    closed: bool,
}

impl IndexInner {
    fn ensure_open(&self) -> LogResult<()> {
        if self.closed {
            return Err(LogError::Closed);
        }
        Ok(())
    }

    fn entries(&self) -> u32 {
        (self.size / ENTRY_WIDTH) as u32
    }
}

impl Index {
    /// Creates an index over the given backend, pre-allocating
    /// `max_index_bytes` of backing capacity.
    ///
    /// The used size is recovered from the backend's pre-existing
    /// length, supporting restart from disk: a file closed gracefully
    /// holds exactly the used bytes. A torn trailing partial entry
    /// (crash mid-write) is discarded. A process that died before the
    /// close-time truncation leaves the file padded to full capacity;
    /// reopening such a file treats the padding as used entries, so the
    /// external log manager must repair or rebuild it - the same
    /// contract as the original pre-allocating design.
    ///
    /// # Errors
    ///
    /// Returns a corruption error if the existing file is larger than
    /// `max_index_bytes`, or a storage error if truncation or
    /// pre-allocation fails.
    pub fn new(mut backend: Box<dyn StorageBackend>, max_index_bytes: u64) -> LogResult<Self> {
        let existing = backend.size()?;
        if existing > max_index_bytes {
            return Err(LogError::corruption(format!(
                "existing index ({existing} bytes) exceeds configured capacity ({max_index_bytes} bytes)"
            )));
        }

        let used = existing - existing % ENTRY_WIDTH;
        if used < existing {
            backend.truncate(used)?;
        }
        backend.reserve(max_index_bytes)?;

        Ok(Self {
            inner: Mutex::new(IndexInner {
                backend,
                size: used,
                max_bytes: max_index_bytes,
                closed: false,
            }),
        })
    }

    /// Appends one entry mapping `relative_offset` to `position`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::IndexFull`] when the entry would exceed the
    /// pre-allocated capacity - callers check [`Index::is_maxed`] first,
    /// so hitting this indicates a logic error upstream. Storage errors
    /// are propagated unmodified.
    pub fn write(&self, relative_offset: u32, position: u64) -> LogResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        if inner.size + ENTRY_WIDTH > inner.max_bytes {
            return Err(LogError::IndexFull {
                capacity: inner.max_bytes,
            });
        }

        let mut entry = [0u8; ENTRY_WIDTH as usize];
        entry[..REL_OFFSET_WIDTH].copy_from_slice(&relative_offset.to_be_bytes());
        entry[REL_OFFSET_WIDTH..].copy_from_slice(&position.to_be_bytes());

        let at = inner.size;
        inner.backend.write_at(at, &entry)?;
        inner.size += ENTRY_WIDTH;

        Ok(())
    }

    /// Reads the entry addressed by `lookup`.
    ///
    /// Returns the `(relative_offset, position)` pair stored in the
    /// entry.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::EntryOutOfRange`] when `Lookup::At` addresses
    /// a slot at or beyond the written entries, or when `Lookup::Last`
    /// is asked of an empty index.
    pub fn read(&self, lookup: Lookup) -> LogResult<(u32, u64)> {
        let inner = self.inner.lock();
        inner.ensure_open()?;

        let entries = inner.entries();
        let slot = match lookup {
            Lookup::At(n) => {
                if n >= entries {
                    return Err(LogError::EntryOutOfRange { slot: n, entries });
                }
                n
            }
            Lookup::Last => {
                if entries == 0 {
                    return Err(LogError::EntryOutOfRange { slot: 0, entries });
                }
                entries - 1
            }
        };

        let data = inner
            .backend
            .read_at(u64::from(slot) * ENTRY_WIDTH, ENTRY_WIDTH as usize)?;

        let relative_offset = u32::from_be_bytes(
            data[..REL_OFFSET_WIDTH]
                .try_into()
                .map_err(|_| LogError::corruption("short index entry"))?,
        );
        let position = u64::from_be_bytes(
            data[REL_OFFSET_WIDTH..]
                .try_into()
                .map_err(|_| LogError::corruption("short index entry"))?,
        );

        Ok((relative_offset, position))
    }

    /// Returns true when the next write would exceed the pre-allocated
    /// capacity.
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        let inner = self.inner.lock();
        inner.size + ENTRY_WIDTH > inner.max_bytes
    }

    /// Returns the bytes actually used by written entries.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Flushes pending backend writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is closed or the flush fails.
    pub fn flush(&self) -> LogResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.backend.flush()?;
        Ok(())
    }

    /// Truncates the backing region down to the used bytes, syncs, and
    /// marks the index closed.
    ///
    /// The pre-allocated tail is discarded so the file on disk is never
    /// left padded to full capacity after a graceful shutdown. Closing
    /// an already-closed index is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if truncation or the final sync fails.
    pub fn close(&self) -> LogResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        let used = inner.size;
        inner.backend.truncate(used)?;
        inner.backend.sync()?;
        inner.closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Index")
            .field("size", &inner.size)
            .field("max_bytes", &inner.max_bytes)
            .field("closed", &inner.closed)
            .finish()
    }
}
