//! Cumulative allocation statistics

use serde::Serialize;
use std::fmt;

/// Statistics record for one pool
///
/// Updated on every take and free while statistics are enabled. Sizes are
/// the sizes callers asked for; space figures include block bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BufferPoolStats {
    pub initialized: bool,
    pub space_available: usize,
    pub min_space_available: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub allocs: u64,
    pub cur_allocs: usize,
    pub max_allocs: usize,
    pub take_failures: u64,
    pub double_frees: u64,
    /// Ring of recently requested sizes, oldest overwritten first
    pub window: Vec<usize>,
    #[serde(skip)]
    window_index: usize,
}

impl BufferPoolStats {
    pub(crate) fn new(capacity: usize, window_size: usize) -> Self {
        Self {
            initialized: true,
            space_available: capacity,
            min_space_available: capacity,
            window: vec![0; window_size],
            ..Self::default()
        }
    }

    pub(crate) fn record_take(&mut self, requested: usize, space_available: usize) {
        if self.allocs == 0 {
            self.min_size = requested;
            self.max_size = requested;
        } else {
            self.min_size = self.min_size.min(requested);
            self.max_size = self.max_size.max(requested);
        }
        self.allocs += 1;
        self.cur_allocs += 1;
        self.max_allocs = self.max_allocs.max(self.cur_allocs);
        self.space_available = space_available;
        self.min_space_available = self.min_space_available.min(space_available);

        if !self.window.is_empty() {
            self.window[self.window_index] = requested;
            self.window_index = (self.window_index + 1) % self.window.len();
        }
    }

    pub(crate) fn record_free(&mut self, space_available: usize) {
        self.cur_allocs = self.cur_allocs.saturating_sub(1);
        self.space_available = space_available;
    }

    pub(crate) fn record_failure(&mut self) {
        self.take_failures += 1;
    }

    pub(crate) fn record_double_free(&mut self) {
        self.double_frees += 1;
    }
}

impl fmt::Display for BufferPoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stats initialized     {}", u8::from(self.initialized))?;
        writeln!(f, "space available       {}", self.space_available)?;
        writeln!(f, "min space available   {}", self.min_space_available)?;
        writeln!(f, "min alloced size      {}", self.min_size)?;
        writeln!(f, "max alloced size      {}", self.max_size)?;
        writeln!(f, "total allocs          {}", self.allocs)?;
        writeln!(f, "current allocations   {}", self.cur_allocs)?;
        writeln!(f, "max allocations       {}", self.max_allocs)?;
        writeln!(f, "take failures         {}", self.take_failures)?;
        writeln!(f, "double frees          {}", self.double_frees)?;
        if !self.window.is_empty() {
            writeln!(f, "List of recently allocated sizes:")?;
            let sizes: Vec<String> = self.window.iter().map(|s| s.to_string()).collect();
            writeln!(f, "{}", sizes.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_take_sets_size_bounds() {
        let mut stats = BufferPoolStats::new(100, 2);
        stats.record_take(10, 82);
        assert_eq!(stats.min_size, 10);
        assert_eq!(stats.max_size, 10);
        stats.record_take(4, 70);
        stats.record_take(30, 32);
        assert_eq!(stats.min_size, 4);
        assert_eq!(stats.max_size, 30);
        assert_eq!(stats.max_allocs, 3);
        assert_eq!(stats.min_space_available, 32);
    }

    #[test]
    fn test_window_wraps() {
        let mut stats = BufferPoolStats::new(100, 2);
        stats.record_take(1, 91);
        stats.record_take(2, 81);
        stats.record_take(3, 71);
        assert_eq!(stats.window, vec![3, 2]);
    }

    #[test]
    fn test_free_keeps_minimum() {
        let mut stats = BufferPoolStats::new(100, 0);
        stats.record_take(40, 52);
        stats.record_free(100);
        assert_eq!(stats.cur_allocs, 0);
        assert_eq!(stats.space_available, 100);
        assert_eq!(stats.min_space_available, 52);
        assert_eq!(stats.max_allocs, 1);
    }

    #[test]
    fn test_display_lists_window() {
        let mut stats = BufferPoolStats::new(64, 3);
        stats.record_take(5, 51);
        let report = stats.to_string();
        assert!(report.contains("space available       51"));
        assert!(report.contains("List of recently allocated sizes:\n5, 0, 0\n"));
    }

    #[test]
    fn test_display_without_window() {
        let stats = BufferPoolStats::new(64, 0);
        assert!(!stats.to_string().contains("recently"));
    }

    #[test]
    fn test_serialize() {
        let mut stats = BufferPoolStats::new(64, 1);
        stats.record_take(7, 49);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["allocs"], 1);
        assert_eq!(json["window"][0], 7);
        assert!(json.get("window_index").is_none());
    }
}
