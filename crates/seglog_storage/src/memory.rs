//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// This backend stores all data in memory and is suitable for unit
/// tests and crash simulation. [`InMemoryBackend::with_data`] lets tests
/// construct a backend holding arbitrary pre-existing bytes, e.g. a
/// store with a torn trailing frame.
///
/// # Example
///
/// ```rust
/// use seglog_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let offset = backend.append(b"test data").unwrap();
/// assert_eq!(offset, 0);
/// assert_eq!(backend.size().unwrap(), 9);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of all data in the backend.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset_usize..end].to_vec())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(new_data.len());

        if end > data.len() {
            return Err(StorageError::WriteOutOfBounds {
                offset,
                len: new_data.len(),
                size,
            });
        }

        data[offset_usize..end].copy_from_slice(new_data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();

        if new_size > data.len() as u64 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "cannot truncate to size {} which is greater than current size {}",
                    new_size,
                    data.len()
                ),
            )));
        }

        data.truncate(new_size as usize);
        Ok(())
    }

    fn reserve(&mut self, capacity: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        if capacity as usize > data.len() {
            data.resize(capacity as usize, 0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_append_and_read() {
        let mut backend = InMemoryBackend::new();

        let offset = backend.append(b"hello").unwrap();
        assert_eq!(offset, 0);

        let offset = backend.append(b" world").unwrap();
        assert_eq!(offset, 5);

        let data = backend.read_at(0, 11).unwrap();
        assert_eq!(&data, b"hello world");
    }

    #[test]
    fn memory_read_past_end_fails() {
        let backend = InMemoryBackend::new();
        let result = backend.read_at(0, 1);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn memory_with_data() {
        let backend = InMemoryBackend::with_data(vec![1, 2, 3]);
        assert_eq!(backend.size().unwrap(), 3);
        assert_eq!(backend.read_at(0, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn memory_write_at() {
        let mut backend = InMemoryBackend::new();
        backend.reserve(12).unwrap();

        backend.write_at(4, b"abcd").unwrap();
        assert_eq!(&backend.read_at(4, 4).unwrap(), b"abcd");
        assert_eq!(backend.read_at(0, 4).unwrap(), vec![0; 4]);
    }

    #[test]
    fn memory_write_at_out_of_bounds_fails() {
        let mut backend = InMemoryBackend::new();
        backend.reserve(4).unwrap();

        let result = backend.write_at(2, b"abcd");
        assert!(matches!(result, Err(StorageError::WriteOutOfBounds { .. })));
    }

    #[test]
    fn memory_reserve_and_truncate() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"ab").unwrap();
        backend.reserve(10).unwrap();
        assert_eq!(backend.size().unwrap(), 10);

        backend.truncate(2).unwrap();
        assert_eq!(backend.size().unwrap(), 2);
        assert_eq!(&backend.data(), b"ab");
    }

    #[test]
    fn memory_truncate_beyond_size_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"ab").unwrap();
        assert!(backend.truncate(5).is_err());
    }
}
