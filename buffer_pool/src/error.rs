//! Buffer pool error types

use crate::pool::BlockHandle;
use thiserror::Error;

/// Errors reported by the buffer pool
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Not enough free bytes right now
    #[error("buffer pool exhausted: requested {requested} bytes, {available} available")]
    Exhausted { requested: usize, available: usize },

    /// Every block slot is in use
    #[error("buffer pool has no free block slots (max {max_blocks})")]
    NoFreeSlots { max_blocks: usize },

    /// The request can never be satisfied by this pool
    #[error("request of {requested} bytes exceeds pool size {capacity}")]
    TooLarge { requested: usize, capacity: usize },

    /// A blocking take gave up
    #[error("timed out waiting for {requested} bytes")]
    Timeout { requested: usize },

    /// A fault plan refused the allocation
    #[error("allocation refused by fault plan")]
    Injected,

    /// The block was already returned
    #[error("double free of {0}")]
    DoubleFree(BlockHandle),

    /// The handle was never issued by this pool
    #[error("release of unknown block {0}")]
    UnknownBlock(BlockHandle),
}
