//! Append-only record store.

use crate::error::{LogError, LogResult};
use parking_lot::Mutex;
use seglog_storage::StorageBackend;

/// Width of the big-endian length header preceding every frame.
const LEN_WIDTH: usize = 8;

/// Appended bytes are buffered up to this many bytes before being handed
/// to the backend, coalescing small appends into fewer I/O calls.
const FLUSH_THRESHOLD: usize = 8 * 1024;

/// An append-only store of length-prefixed record frames.
///
/// The store owns its backend exclusively and writes frames
/// back-to-back from offset 0: `| length (8, BE) | payload (N) |`.
/// Its size counter doubles as the position where the next append will
/// land, and counts buffered bytes that have not yet reached the
/// backend - pending appends reserve their byte range up front.
///
/// # Concurrency
///
/// Every operation takes the same exclusive lock around the backend,
/// buffer, and size counter. Appends and reads never interleave their
/// accounting within one store; distinct stores are fully independent.
pub struct Store {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    backend: Box<dyn StorageBackend>,
    buf: Vec<u8>,
    size: u64,
    closed: bool,
}

impl StoreInner {
    fn ensure_open(&self) -> LogResult<()> {
        if self.closed {
            return Err(LogError::Closed);
        }
        Ok(())
    }

    /// Hands buffered bytes to the backend.
    ///
    /// A failed backend write is fatal for this store: the size counter
    /// already covers the buffered range and no rollback is attempted.
    fn flush_buf(&mut self) -> LogResult<()> {
        if !self.buf.is_empty() {
            self.backend.append(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Store {
    /// Creates a store over the given backend.
    ///
    /// The size counter is initialized from the backend's current
    /// length, so reopening an existing store file resumes where the
    /// previous process left off.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be determined.
    pub fn new(backend: Box<dyn StorageBackend>) -> LogResult<Self> {
        let size = backend.size()?;
        Ok(Self {
            inner: Mutex::new(StoreInner {
                backend,
                buf: Vec::with_capacity(FLUSH_THRESHOLD),
                size,
                closed: false,
            }),
        })
    }

    /// Appends a payload as one frame.
    ///
    /// Returns `(bytes_written, position)`: the total frame width
    /// (header plus payload) and the byte offset at which the frame's
    /// header begins.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the backend write
    /// fails. A backend failure leaves this store unusable; restart
    /// recovery through the index is the contract for trailing bytes of
    /// uncertain state.
    pub fn append(&self, payload: &[u8]) -> LogResult<(u64, u64)> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        let position = inner.size;
        let written = (LEN_WIDTH + payload.len()) as u64;

        inner.buf.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        inner.buf.extend_from_slice(payload);
        inner.size += written;

        if inner.buf.len() >= FLUSH_THRESHOLD {
            inner.flush_buf()?;
        }

        Ok((written, position))
    }

    /// Reads the frame payload stored at `position`.
    ///
    /// Buffered appends are flushed first, so a read always sees every
    /// prior append from this process, synced or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed, `position` is out of
    /// range, or the header/payload cannot be fully read.
    pub fn read(&self, position: u64) -> LogResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.flush_buf()?;

        let header = inner.backend.read_at(position, LEN_WIDTH)?;
        let len = u64::from_be_bytes(
            header[..]
                .try_into()
                .map_err(|_| LogError::corruption("short frame header"))?,
        );

        let payload = inner.backend.read_at(position + LEN_WIDTH as u64, len as usize)?;
        Ok(payload)
    }

    /// Reads raw bytes at `offset` into `buf`, bypassing frame framing.
    ///
    /// Returns the number of bytes read, clamped to the bytes available.
    /// This is the low-level escape hatch for bulk and streaming reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the backend read fails.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> LogResult<usize> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.flush_buf()?;

        let available = inner.size.saturating_sub(offset);
        let n = (buf.len() as u64).min(available) as usize;
        if n == 0 {
            return Ok(0);
        }

        let data = inner.backend.read_at(offset, n)?;
        buf[..n].copy_from_slice(&data);
        Ok(n)
    }

    /// Flushes buffered appends to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the write fails.
    pub fn flush(&self) -> LogResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.flush_buf()?;
        inner.backend.flush()?;
        Ok(())
    }

    /// Flushes and syncs all data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the sync fails.
    pub fn sync(&self) -> LogResult<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        inner.flush_buf()?;
        inner.backend.sync()?;
        Ok(())
    }

    /// Returns the store's size in bytes, buffered appends included.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Flushes and syncs outstanding writes, then marks the store
    /// closed. Subsequent operations fail with [`LogError::Closed`].
    /// Closing an already-closed store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or sync fails.
    pub fn close(&self) -> LogResult<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.flush_buf()?;
        inner.backend.sync()?;
        inner.closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Store")
            .field("size", &inner.size)
            .field("buffered", &inner.buf.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
