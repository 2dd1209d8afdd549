//! Segment: one store and one index bound at a base offset.

use crate::config::SegmentConfig;
use crate::error::{LogError, LogResult};
use crate::index::{Index, Lookup};
use crate::record::Record;
use crate::store::Store;
use seglog_storage::FileBackend;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of the recovery step performed when a segment is opened.
///
/// Recovery never trusts the store's size alone: the authoritative
/// state is the index's last entry. A store frame with no index entry
/// (crash between the two writes of an append) is orphaned and invisible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// The index was empty; offset allocation starts at the base offset.
    Fresh,
    /// The index held entries; allocation resumes after the last one.
    Resumed {
        /// The recovered next offset to assign.
        next_offset: u64,
    },
}

/// A bounded, contiguous range of logical offsets backed by one store
/// file and one index file.
///
/// A segment covers the absolute offset range `[base_offset,
/// next_offset)` and owns both backing files exclusively. It allocates
/// the next offset on append and reports via [`Segment::is_maxed`] when
/// either file has reached its configured capacity - the signal the
/// external log manager uses to roll to a new segment. The segment
/// itself never refuses an append; directing writes elsewhere is the
/// manager's job.
///
/// Appending takes `&mut self`: single-writer is enforced by ownership
/// rather than an extra lock on top of the store's and index's own.
#[derive(Debug)]
pub struct Segment {
    store: Store,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: SegmentConfig,
    store_path: PathBuf,
    index_path: PathBuf,
    recovery: Recovery,
}

impl Segment {
    /// Opens or creates the segment rooted at `base_offset` inside `dir`.
    ///
    /// The backing files are named `<base_offset>.store` and
    /// `<base_offset>.index`. The next offset to assign is recovered
    /// from the index's last entry, so a restart resumes allocation
    /// without replaying the store.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened or created, if
    /// another instance holds a backing file's lock, or if index/store
    /// construction fails.
    pub fn open(dir: &Path, base_offset: u64, config: SegmentConfig) -> LogResult<Self> {
        let store_path = dir.join(format!("{base_offset}.store"));
        let index_path = dir.join(format!("{base_offset}.index"));

        let store = Store::new(Box::new(FileBackend::open_with_create_dirs(&store_path)?))?;
        let index = Index::new(
            Box::new(FileBackend::open_with_create_dirs(&index_path)?),
            config.max_index_bytes,
        )?;

        let recovery = match index.read(Lookup::Last) {
            Ok((relative, _)) => Recovery::Resumed {
                next_offset: base_offset + u64::from(relative) + 1,
            },
            Err(LogError::EntryOutOfRange { .. }) => Recovery::Fresh,
            Err(e) => return Err(e),
        };
        let next_offset = match recovery {
            Recovery::Fresh => base_offset,
            Recovery::Resumed { next_offset } => next_offset,
        };

        debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config,
            store_path,
            index_path,
            recovery,
        })
    }

    /// Appends a record, stamping it with the next offset.
    ///
    /// The record is stamped, encoded, written to the store, and then
    /// indexed at its segment-relative offset. Returns the assigned
    /// absolute offset.
    ///
    /// # Errors
    ///
    /// Any failing step leaves in-process state inconsistent but
    /// recoverable: no rollback is performed, and the next open derives
    /// `next_offset` from the index, orphaning a store frame whose index
    /// write never happened.
    pub fn append(&mut self, record: &mut Record) -> LogResult<u64> {
        let offset = self.next_offset;
        let relative = u32::try_from(offset - self.base_offset).map_err(|_| {
            LogError::IndexFull {
                capacity: self.config.max_index_bytes,
            }
        })?;

        record.offset = offset;
        let encoded = record.encode();

        let (_, position) = self.store.append(&encoded)?;
        self.index.write(relative, position)?;
        self.next_offset += 1;

        Ok(offset)
    }

    /// Reads the record stored at the given absolute offset.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OffsetNotFound`] when `offset` falls outside
    /// `[base_offset, next_offset)`, or a corruption error if the stored
    /// bytes fail to decode.
    pub fn read(&self, offset: u64) -> LogResult<Record> {
        let not_found = || LogError::OffsetNotFound {
            offset,
            base: self.base_offset,
            next: self.next_offset,
        };

        let relative = offset
            .checked_sub(self.base_offset)
            .and_then(|r| u32::try_from(r).ok())
            .ok_or_else(not_found)?;

        let (_, position) = self.index.read(Lookup::At(relative)).map_err(|e| match e {
            LogError::EntryOutOfRange { .. } => not_found(),
            other => other,
        })?;

        let bytes = self.store.read(position)?;
        Record::decode(&bytes)
    }

    /// Returns true when either backing file has reached its configured
    /// capacity and the log manager should roll to a new segment.
    #[must_use]
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes
            || self.index.size() >= self.config.max_index_bytes
            || self.index.is_maxed()
    }

    /// Returns the first offset this segment may hold.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Returns the next offset that will be assigned.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Returns the recovery outcome observed when this segment opened.
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        self.recovery
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Returns the path of the index file.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Closes the index and the store.
    ///
    /// Both closes are attempted even if the first fails; the first
    /// failure is the one reported. The backing files are preserved.
    ///
    /// # Errors
    ///
    /// Returns the first close failure.
    pub fn close(self) -> LogResult<()> {
        let index_result = self.index.close();
        let store_result = self.store.close();
        index_result.and(store_result)
    }

    /// Closes the segment, then deletes both backing files.
    ///
    /// Used by the external log manager during segment garbage
    /// collection.
    ///
    /// # Errors
    ///
    /// Returns the first close failure, or the error from deleting
    /// either file.
    pub fn remove(self) -> LogResult<()> {
        debug!(base_offset = self.base_offset, "removing segment");

        let store_path = self.store_path.clone();
        let index_path = self.index_path.clone();

        let index_result = self.index.close();
        let store_result = self.store.close();
        index_result.and(store_result)?;

        fs::remove_file(&index_path)?;
        fs::remove_file(&store_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn small_config() -> SegmentConfig {
        SegmentConfig::new().max_store_bytes(1024).max_index_bytes(1024)
    }

    #[test]
    fn append_and_read_scenario() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 0, small_config()).unwrap();

        let mut hello = Record::new(b"hello".to_vec());
        assert_eq!(segment.append(&mut hello).unwrap(), 0);
        assert_eq!(hello.offset, 0);

        let mut world = Record::new(b"world".to_vec());
        assert_eq!(segment.append(&mut world).unwrap(), 1);

        assert_eq!(segment.read(0).unwrap().value, b"hello");
        assert_eq!(segment.read(1).unwrap().value, b"world");

        let result = segment.read(2);
        assert!(matches!(result, Err(LogError::OffsetNotFound { .. })));
    }

    #[test]
    fn offsets_are_monotonic_from_base() {
        let dir = tempdir().unwrap();
        let base = 16;
        let mut segment = Segment::open(dir.path(), base, small_config()).unwrap();

        for i in 0..10 {
            let mut record = Record::new(vec![i as u8]);
            assert_eq!(segment.append(&mut record).unwrap(), base + i);
        }
        assert_eq!(segment.next_offset(), base + 10);
    }

    #[test]
    fn roundtrip_preserves_value_and_stamps_offset() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 5, small_config()).unwrap();

        let mut record = Record::new(b"payload".to_vec());
        let offset = segment.append(&mut record).unwrap();

        let read_back = segment.read(offset).unwrap();
        assert_eq!(read_back, record);
        assert_eq!(read_back.offset, 5);
    }

    #[test]
    fn read_below_base_fails_without_underflow() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 10, small_config()).unwrap();
        segment.append(&mut Record::new(b"x".to_vec())).unwrap();

        assert!(matches!(
            segment.read(3),
            Err(LogError::OffsetNotFound { offset: 3, .. })
        ));
        assert!(matches!(
            segment.read(9),
            Err(LogError::OffsetNotFound { .. })
        ));
    }

    #[test]
    fn fresh_segment_recovery() {
        let dir = tempdir().unwrap();
        let segment = Segment::open(dir.path(), 7, small_config()).unwrap();

        assert_eq!(segment.recovery(), Recovery::Fresh);
        assert_eq!(segment.next_offset(), 7);
        assert_eq!(segment.base_offset(), 7);
    }

    #[test]
    fn restart_resumes_offset_allocation() {
        let dir = tempdir().unwrap();
        let base = 0;

        {
            let mut segment = Segment::open(dir.path(), base, small_config()).unwrap();
            for value in [&b"one"[..], b"two", b"three"] {
                segment.append(&mut Record::new(value.to_vec())).unwrap();
            }
            segment.close().unwrap();
        }

        let mut segment = Segment::open(dir.path(), base, small_config()).unwrap();
        assert_eq!(segment.recovery(), Recovery::Resumed { next_offset: 3 });
        assert_eq!(segment.next_offset(), 3);

        assert_eq!(segment.read(0).unwrap().value, b"one");
        assert_eq!(segment.read(1).unwrap().value, b"two");
        assert_eq!(segment.read(2).unwrap().value, b"three");

        let mut record = Record::new(b"four".to_vec());
        assert_eq!(segment.append(&mut record).unwrap(), 3);
    }

    #[test]
    fn orphaned_store_frame_is_invisible_after_restart() {
        let dir = tempdir().unwrap();
        let store_path;

        {
            let mut segment = Segment::open(dir.path(), 0, small_config()).unwrap();
            segment.append(&mut Record::new(b"indexed".to_vec())).unwrap();
            store_path = segment.store_path().to_path_buf();
            segment.close().unwrap();
        }

        // A frame written to the store whose index write never happened.
        {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&store_path)
                .unwrap();
            let orphan = Record::new(b"orphan".to_vec()).encode();
            file.write_all(&(orphan.len() as u64).to_be_bytes()).unwrap();
            file.write_all(&orphan).unwrap();
        }

        let segment = Segment::open(dir.path(), 0, small_config()).unwrap();
        assert_eq!(segment.recovery(), Recovery::Resumed { next_offset: 1 });
        assert_eq!(segment.read(0).unwrap().value, b"indexed");
        assert!(matches!(
            segment.read(1),
            Err(LogError::OffsetNotFound { .. })
        ));
    }

    #[test]
    fn maxed_by_store_bytes() {
        let dir = tempdir().unwrap();
        // A 5-byte value encodes to 17 record bytes and a 25-byte frame.
        let config = SegmentConfig::new()
            .max_store_bytes(3 * 25)
            .max_index_bytes(1024);
        let mut segment = Segment::open(dir.path(), 0, config).unwrap();

        segment.append(&mut Record::new(b"aaaaa".to_vec())).unwrap();
        segment.append(&mut Record::new(b"bbbbb".to_vec())).unwrap();
        assert!(!segment.is_maxed());

        segment.append(&mut Record::new(b"ccccc".to_vec())).unwrap();
        assert!(segment.is_maxed());
    }

    #[test]
    fn maxed_by_index_capacity() {
        let dir = tempdir().unwrap();
        let config = SegmentConfig::new()
            .max_store_bytes(1024 * 1024)
            .max_index_bytes(3 * crate::index::ENTRY_WIDTH);
        let mut segment = Segment::open(dir.path(), 0, config).unwrap();

        for i in 0..2 {
            segment.append(&mut Record::new(vec![i])).unwrap();
        }
        assert!(!segment.is_maxed());

        segment.append(&mut Record::new(vec![2])).unwrap();
        assert!(segment.is_maxed());
    }

    #[test]
    fn close_compacts_index_file() {
        let dir = tempdir().unwrap();
        let config = small_config();
        let index_path;

        {
            let mut segment = Segment::open(dir.path(), 0, config).unwrap();
            index_path = segment.index_path().to_path_buf();
            for i in 0..4u8 {
                segment.append(&mut Record::new(vec![i])).unwrap();
            }
            assert_eq!(
                std::fs::metadata(&index_path).unwrap().len(),
                config.max_index_bytes
            );
            segment.close().unwrap();
        }

        assert_eq!(
            std::fs::metadata(&index_path).unwrap().len(),
            4 * crate::index::ENTRY_WIDTH
        );
    }

    #[test]
    fn remove_deletes_backing_files() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), 0, small_config()).unwrap();
        segment.append(&mut Record::new(b"gone".to_vec())).unwrap();

        let store_path = segment.store_path().to_path_buf();
        let index_path = segment.index_path().to_path_buf();
        assert!(store_path.exists());
        assert!(index_path.exists());

        segment.remove().unwrap();
        assert!(!store_path.exists());
        assert!(!index_path.exists());
    }

    #[test]
    fn double_open_is_rejected() {
        let dir = tempdir().unwrap();
        let _first = Segment::open(dir.path(), 0, small_config()).unwrap();

        let second = Segment::open(dir.path(), 0, small_config());
        assert!(matches!(second, Err(LogError::Storage(_))));
    }
}
