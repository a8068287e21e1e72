//! # Buffer Pool
//!
//! This crate owns all message memory for the framework.
//!
//! ## Philosophy
//!
//! - **Finite and explicit**: A pool has a fixed byte budget and a fixed
//!   number of block slots. Requests beyond either fail; nothing grows.
//! - **Failure is a value**: [`BufferPool::try_to_take`] reports exhaustion
//!   to the caller. Only [`BufferPool::take`] escalates, and it escalates once.
//! - **Observable**: Every take and free updates a statistics record used to
//!   size pools for the worst case.
//!
//! ## Blocks and handles
//!
//! A [`Block`] is a zero-filled byte buffer plus a [`BlockHandle`]
//! (slot index and generation). Dropping a block returns it to the pool.
//! Handles are plain values; releasing a handle the pool no longer
//! considers live is detected through the generation counter and reported
//! as [`PoolError::DoubleFree`] or [`PoolError::UnknownBlock`].

pub mod config;
pub mod error;
pub mod fault;
pub mod pool;
pub mod shell;
pub mod stats;

pub use config::BufferPoolConfig;
pub use error::PoolError;
pub use fault::{AllocFault, FaultPlan};
pub use pool::{Block, BlockHandle, BufferPool, BLOCK_HEADER_SIZE};
pub use stats::BufferPoolStats;
