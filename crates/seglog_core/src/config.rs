//! Segment configuration.

/// Configuration for a single segment.
///
/// The external log manager hands one of these to every segment it
/// creates; the values bound how large a segment's backing files may
/// grow before the manager rolls to a new segment.
#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig {
    /// Maximum store file size in bytes before the segment reports maxed.
    pub max_store_bytes: u64,

    /// Maximum index file size in bytes; also bounds index pre-allocation.
    pub max_index_bytes: u64,

    /// Base offset for the very first segment of a log.
    pub initial_offset: u64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_store_bytes: 64 * 1024 * 1024, // 64 MB
            max_index_bytes: 10 * 1024 * 1024, // 10 MB
            initial_offset: 0,
        }
    }
}

impl SegmentConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum store file size.
    #[must_use]
    pub const fn max_store_bytes(mut self, size: u64) -> Self {
        self.max_store_bytes = size;
        self
    }

    /// Sets the maximum index file size.
    #[must_use]
    pub const fn max_index_bytes(mut self, size: u64) -> Self {
        self.max_index_bytes = size;
        self
    }

    /// Sets the base offset for the first segment of a log.
    #[must_use]
    pub const fn initial_offset(mut self, offset: u64) -> Self {
        self.initial_offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SegmentConfig::default();
        assert_eq!(config.max_store_bytes, 64 * 1024 * 1024);
        assert_eq!(config.max_index_bytes, 10 * 1024 * 1024);
        assert_eq!(config.initial_offset, 0);
    }

    #[test]
    fn builder_pattern() {
        let config = SegmentConfig::new()
            .max_store_bytes(1024)
            .max_index_bytes(512)
            .initial_offset(100);

        assert_eq!(config.max_store_bytes, 1024);
        assert_eq!(config.max_index_bytes, 512);
        assert_eq!(config.initial_offset, 100);
    }
}
