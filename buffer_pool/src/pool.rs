//! The pool allocator
//!
//! A pool is a byte budget plus a table of block slots. Each live block is
//! charged its requested size plus [`BLOCK_HEADER_SIZE`] bytes of
//! bookkeeping, so the available-space figures match what a header-prefixed
//! heap would report.
//!
//! Block memory itself comes from the global allocator, one boxed slice per
//! take. The pool does not own a preallocated arena: it bounds how much
//! message memory may be live at once, and a take past the budget or the
//! slot limit fails even when the heap could still serve it. There is no
//! fragmentation model, so any request that fits the remaining budget
//! succeeds.

use crate::config::BufferPoolConfig;
use crate::error::PoolError;
use crate::fault::{FaultInjector, FaultPlan};
use crate::stats::BufferPoolStats;
use hal::{fwk_assert, Assertions, DefaultPlatform, ExecContext, Timeout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Bytes of bookkeeping charged to every block
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Identity of one allocation
///
/// The generation increases every time a slot is reused, so a handle that
/// outlives its block never matches the slot again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    slot: u32,
    generation: u32,
}

impl BlockHandle {
    /// Builds a handle from raw parts
    pub const fn from_raw(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}#{}", self.slot, self.generation)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u32,
    in_use: bool,
    charged: usize,
}

struct PoolState {
    used: usize,
    slots: Vec<Slot>,
    free_slots: Vec<u32>,
    stats: Option<BufferPoolStats>,
    injector: FaultInjector,
}

impl PoolState {
    fn reserve(
        &mut self,
        requested: usize,
        config: &BufferPoolConfig,
    ) -> Result<BlockHandle, PoolError> {
        let charge = requested + BLOCK_HEADER_SIZE;
        let available = config.size - self.used;
        if charge > available {
            return Err(PoolError::Exhausted {
                requested,
                available,
            });
        }
        let slot = self.free_slots.pop().ok_or(PoolError::NoFreeSlots {
            max_blocks: config.max_blocks,
        })?;

        let entry = &mut self.slots[slot as usize];
        entry.generation = match entry.generation.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        entry.in_use = true;
        entry.charged = charge;
        let generation = entry.generation;

        self.used += charge;
        let space_available = config.size - self.used;
        if let Some(stats) = self.stats.as_mut() {
            stats.record_take(requested, space_available);
        }
        Ok(BlockHandle { slot, generation })
    }

    fn release(&mut self, handle: BlockHandle, capacity: usize) -> Result<(), PoolError> {
        let entry = self
            .slots
            .get_mut(handle.slot as usize)
            .ok_or(PoolError::UnknownBlock(handle))?;
        if handle.generation == 0 || handle.generation > entry.generation {
            return Err(PoolError::UnknownBlock(handle));
        }
        if handle.generation != entry.generation || !entry.in_use {
            return Err(PoolError::DoubleFree(handle));
        }

        entry.in_use = false;
        self.used -= entry.charged;
        entry.charged = 0;
        self.free_slots.push(handle.slot);
        if let Some(stats) = self.stats.as_mut() {
            stats.record_free(capacity - self.used);
        }
        Ok(())
    }

    fn record_failure(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_failure();
        }
    }
}

struct Shared {
    config: BufferPoolConfig,
    state: Mutex<PoolState>,
    space_freed: Condvar,
    take_failed: AtomicBool,
    asserts: Arc<Assertions>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, handle: BlockHandle) -> Result<(), PoolError> {
        let mut state = self.lock();
        match state.release(handle, self.config.size) {
            Ok(()) => {
                drop(state);
                self.space_freed.notify_all();
                Ok(())
            }
            Err(_) if !self.config.double_free_detection => Ok(()),
            Err(err) => {
                if matches!(err, PoolError::DoubleFree(_)) {
                    if let Some(stats) = state.stats.as_mut() {
                        stats.record_double_free();
                    }
                }
                log::error!("buffer pool: {}", err);
                Err(err)
            }
        }
    }
}

/// A fixed-capacity allocator for message memory
///
/// Cloning a pool yields another handle to the same memory. All operations
/// are safe from any thread; callers in interrupt context pass
/// [`ExecContext::Interrupt`] and never wait.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<Shared>,
}

impl BufferPool {
    /// Creates a pool whose fatal take failures go to the default platform
    pub fn new(config: BufferPoolConfig) -> Self {
        Self::with_assertions(
            config,
            Arc::new(Assertions::new(Arc::new(DefaultPlatform), true)),
        )
    }

    /// Creates a pool reporting fatal take failures through `asserts`
    pub fn with_assertions(config: BufferPoolConfig, asserts: Arc<Assertions>) -> Self {
        let state = PoolState {
            used: 0,
            slots: vec![Slot::default(); config.max_blocks],
            free_slots: (0..config.max_blocks as u32).rev().collect(),
            stats: None,
            injector: FaultInjector::default(),
        };
        let pool = Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                space_freed: Condvar::new(),
                take_failed: AtomicBool::new(false),
                asserts,
            }),
        };
        pool.initialize();
        pool
    }

    /// Sets up the statistics record; calling it again changes nothing
    pub fn initialize(&self) {
        if !self.shared.config.stats {
            return;
        }
        let mut state = self.shared.lock();
        if state.stats.is_none() {
            let space_available = self.shared.config.size - state.used;
            let mut stats =
                BufferPoolStats::new(self.shared.config.size, self.shared.config.window_size);
            stats.space_available = space_available;
            stats.min_space_available = space_available;
            state.stats = Some(stats);
        }
    }

    /// Carves a zero-filled block of `size` bytes
    ///
    /// Waits up to `timeout` for space to be freed; in interrupt context
    /// the wait is always skipped. Failures are logged with `tag` and
    /// counted in the statistics record.
    pub fn allocate(
        &self,
        size: usize,
        timeout: Timeout,
        ctx: ExecContext,
        tag: &str,
    ) -> Result<Block, PoolError> {
        let timeout = timeout.in_context(ctx);
        match self.reserve(size, timeout) {
            Ok(handle) => Ok(Block {
                shared: self.shared.clone(),
                handle,
                data: vec![0; size].into_boxed_slice(),
            }),
            Err(err) => {
                log::warn!("buffer pool: {} could not take {} bytes: {}", tag, size, err);
                Err(err)
            }
        }
    }

    fn reserve(&self, size: usize, timeout: Timeout) -> Result<BlockHandle, PoolError> {
        let config = &self.shared.config;
        let mut state = self.shared.lock();

        if state.injector.should_fail() {
            state.record_failure();
            return Err(PoolError::Injected);
        }
        if size.saturating_add(BLOCK_HEADER_SIZE) > config.size {
            state.record_failure();
            return Err(PoolError::TooLarge {
                requested: size,
                capacity: config.size,
            });
        }

        let deadline = timeout.deadline();
        loop {
            let err = match state.reserve(size, config) {
                Ok(handle) => return Ok(handle),
                Err(err) => err,
            };
            if timeout.is_no_wait() {
                state.record_failure();
                return Err(err);
            }
            state = match deadline {
                None => self
                    .shared
                    .space_freed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        state.record_failure();
                        return Err(PoolError::Timeout { requested: size });
                    }
                    self.shared
                        .space_freed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Non-blocking take; `None` when the pool cannot serve the request
    pub fn try_to_take(&self, size: usize) -> Option<Block> {
        self.allocate(size, Timeout::NoWait, ExecContext::Thread, "try_to_take")
            .ok()
    }

    /// Non-blocking take that treats failure as fatal
    ///
    /// The first failure in the life of the pool fires the framework
    /// assertion. Later failures only return `None`, so a handler that
    /// allocates cannot recurse into itself.
    pub fn take(&self, size: usize) -> Option<Block> {
        let block = self.try_to_take(size);
        if block.is_none() && !self.shared.take_failed.swap(true, Ordering::AcqRel) {
            fwk_assert!(self.shared.asserts, FORCED);
        }
        block
    }

    /// Returns a block to the pool by handle
    ///
    /// Dropping a [`Block`] does this automatically. With double-free
    /// detection disabled a bad handle is ignored.
    pub fn release(&self, handle: BlockHandle) -> Result<(), PoolError> {
        self.shared.release(handle)
    }

    /// Snapshot of the statistics record for pool `index`
    ///
    /// Only index 0 exists. Returns `None` when statistics are disabled.
    pub fn stats(&self, index: usize) -> Option<BufferPoolStats> {
        if index != 0 {
            return None;
        }
        self.shared.lock().stats.clone()
    }

    /// Installs a fault plan, replacing any previous one
    pub fn set_fault_plan(&self, plan: FaultPlan) {
        self.shared.lock().injector = FaultInjector::new(plan);
    }

    /// Removes the fault plan
    pub fn clear_fault_plan(&self) {
        self.shared.lock().injector = FaultInjector::default();
    }

    /// Number of takes refused by the current fault plan
    pub fn injected_failures(&self) -> usize {
        self.shared.lock().injector.refused()
    }

    /// Free bytes, bookkeeping included
    pub fn space_available(&self) -> usize {
        self.shared.config.size - self.shared.lock().used
    }

    /// Number of blocks currently taken
    pub fn live_blocks(&self) -> usize {
        let state = self.shared.lock();
        state.slots.len() - state.free_slots.len()
    }

    pub fn config(&self) -> &BufferPoolConfig {
        &self.shared.config
    }

    /// The assertion gate used by [`BufferPool::take`]
    pub fn assertions(&self) -> &Arc<Assertions> {
        &self.shared.asserts
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("config", &self.shared.config)
            .field("space_available", &self.space_available())
            .finish()
    }
}

/// A block of pool memory
///
/// Dereferences to its bytes. Dropping it returns the memory to the pool
/// it came from.
pub struct Block {
    shared: Arc<Shared>,
    handle: BlockHandle,
    data: Box<[u8]>,
}

impl Block {
    pub fn handle(&self) -> BlockHandle {
        self.handle
    }

    /// The pool this block belongs to
    pub fn pool(&self) -> BufferPool {
        BufferPool {
            shared: self.shared.clone(),
        }
    }
}

impl Deref for Block {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for Block {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        // Errors are already logged and counted by the pool.
        let _ = self.shared.release(self.handle);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("handle", &self.handle)
            .field("len", &self.data.len())
            .finish()
    }
}
