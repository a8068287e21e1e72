//! `bp stats` shell command

use crate::pool::BufferPool;

/// Formats the statistics report for pool `index`
///
/// Returns the error line when statistics are disabled or the index names
/// no pool.
pub fn bp_stats(pool: &BufferPool, index: usize) -> String {
    match pool.stats(index) {
        Some(stats) => format!("Buffer Pool {}\n{}", index, stats),
        None => "Buffer pool not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BufferPoolConfig;

    #[test]
    fn test_report_for_pool_zero() {
        let pool = BufferPool::new(BufferPoolConfig::new().with_size(256));
        let _block = pool.try_to_take(16).unwrap();
        let report = bp_stats(&pool, 0);
        assert!(report.starts_with("Buffer Pool 0\n"));
        assert!(report.contains("current allocations   1"));
    }

    #[test]
    fn test_unknown_pool() {
        let pool = BufferPool::new(BufferPoolConfig::default());
        assert_eq!(bp_stats(&pool, 1), "Buffer pool not found");
    }

    #[test]
    fn test_stats_disabled() {
        let pool = BufferPool::new(BufferPoolConfig::new().with_stats(false));
        assert_eq!(bp_stats(&pool, 0), "Buffer pool not found");
    }
}
