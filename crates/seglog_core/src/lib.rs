//! # Seglog Core
//!
//! Segment storage engine for seglog.
//!
//! This crate implements the durable record store underlying a
//! distributed commit log. Callers append opaque binary records and read
//! them back by a monotonically increasing logical offset. Three
//! components compose bottom-up:
//!
//! - [`Store`] - append-only file of length-prefixed record frames;
//!   tracks total byte size and supports positional reads
//! - [`Index`] - fixed-width file mapping a segment-relative offset to a
//!   byte position in the store; pre-allocated and bounded
//! - [`Segment`] - binds one store and one index at a `base_offset`,
//!   allocates offsets on append, and reports when either file has
//!   reached its configured capacity
//!
//! Higher layers (a log manager owning an ordered collection of
//! segments, replication, a network server) sit on top of [`Segment`]
//! and are out of scope for this crate.
//!
//! ## Example
//!
//! ```no_run
//! use seglog_core::{Record, Segment, SegmentConfig};
//! use std::path::Path;
//!
//! let config = SegmentConfig::default();
//! let mut segment = Segment::open(Path::new("/var/lib/seglog"), 0, config).unwrap();
//!
//! let mut record = Record::new(b"hello".to_vec());
//! let offset = segment.append(&mut record).unwrap();
//! let read_back = segment.read(offset).unwrap();
//! assert_eq!(read_back.value, b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod index;
mod record;
mod segment;
mod store;

pub use config::SegmentConfig;
pub use error::{LogError, LogResult};
pub use index::{Index, Lookup, ENTRY_WIDTH};
pub use record::Record;
pub use segment::{Recovery, Segment};
pub use store::Store;
