//! Pool sizing and instrumentation settings

use serde::{Deserialize, Serialize};

/// Buffer pool configuration
///
/// All fields have defaults, so a JSON document only needs to name what
/// it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    /// Total bytes in the heap region, bookkeeping included
    pub size: usize,
    /// Maximum number of concurrent allocations
    pub max_blocks: usize,
    /// Maintain the statistics record
    pub stats: bool,
    /// Report releases of blocks that are not live
    pub double_free_detection: bool,
    /// Length of the recently-allocated-sizes ring (0 disables it)
    pub window_size: usize,
}

impl BufferPoolConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self {
            size: 8192,
            max_blocks: 64,
            stats: true,
            double_free_detection: true,
            window_size: 8,
        }
    }

    /// Sets the heap size in bytes
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Sets the maximum number of live blocks
    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = max_blocks;
        self
    }

    /// Enables or disables statistics
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats = enabled;
        self
    }

    /// Enables or disables double-free reporting
    pub fn with_double_free_detection(mut self, enabled: bool) -> Self {
        self.double_free_detection = enabled;
        self
    }

    /// Sets the recent-sizes window length
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BufferPoolConfig::default();
        assert_eq!(config.size, 8192);
        assert_eq!(config.max_blocks, 64);
        assert!(config.stats);
        assert!(config.double_free_detection);
        assert_eq!(config.window_size, 8);
    }

    #[test]
    fn test_builder() {
        let config = BufferPoolConfig::new()
            .with_size(512)
            .with_max_blocks(4)
            .with_stats(false)
            .with_double_free_detection(false)
            .with_window_size(0);
        assert_eq!(config.size, 512);
        assert_eq!(config.max_blocks, 4);
        assert!(!config.stats);
        assert!(!config.double_free_detection);
        assert_eq!(config.window_size, 0);
    }

    #[test]
    fn test_partial_json() {
        let config: BufferPoolConfig = serde_json::from_str(r#"{"size": 1024}"#).unwrap();
        assert_eq!(config.size, 1024);
        assert_eq!(config.max_blocks, 64);
    }
}
