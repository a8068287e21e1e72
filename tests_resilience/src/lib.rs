//! Resilience Test Utilities
//!
//! Shared set-up for the fault and load tests under `tests/`.
//!
//! ## Test Philosophy
//!
//! - **Ownership under faults**: every block is freed exactly once, whichever
//!   path a message takes
//! - **Deterministic failures**: pool exhaustion is forced with a
//!   [`FaultPlan`](buffer_pool::FaultPlan), time is advanced by hand
//! - **Degrade, don't halt**: overload drops messages but never fires the
//!   assertion

use buffer_pool::BufferPoolConfig;
use core_types::{FwkId, MsgCode};
use framework::{Dispatch, Framework, FrameworkConfig, Receiver};
use ipc::BoundedQueue;
use sim_kernel::{SimPlatform, SimTimerDriver};
use std::sync::Arc;

/// A framework wired to simulated hooks
pub struct TestSystem {
    pub fwk: Arc<Framework>,
    pub platform: Arc<SimPlatform>,
    pub clock: SimTimerDriver,
}

/// Bootstrap helper for tests
///
/// The pool is `pool_size` bytes; receivers default to non-blocking
/// receives so a drained queue returns immediately.
pub fn test_bootstrap(pool_size: usize) -> TestSystem {
    let platform = Arc::new(SimPlatform::new());
    let clock = SimTimerDriver::new();
    let config = FrameworkConfig::new()
        .with_max_receivers(32)
        .with_default_rx_block(Some(0))
        .with_pool(BufferPoolConfig::new().with_size(pool_size).with_max_blocks(256));
    let fwk = Framework::new(config, platform.clone(), Arc::new(clock.clone()));
    TestSystem {
        fwk,
        platform,
        clock,
    }
}

/// A `Dispatch` claiming a fixed set of codes
pub struct ClaimSet(pub Vec<MsgCode>);

impl Dispatch for ClaimSet {
    fn claims(&self, code: MsgCode) -> bool {
        self.0.contains(&code)
    }
}

impl TestSystem {
    /// Registers a bare receiver that claims `codes`
    pub fn listener(&self, id: u8, depth: usize, codes: &[MsgCode]) -> Arc<BoundedQueue> {
        let queue = Arc::new(BoundedQueue::with_capacity(depth));
        let receiver = Receiver::new(FwkId(id), queue.clone(), Arc::new(ClaimSet(codes.to_vec())));
        if let Err(err) = self.fwk.register_receiver(receiver) {
            panic!("listener {} failed to register: {}", id, err);
        }
        queue
    }

    /// Checks that no block is live and no assertion fired
    pub fn assert_quiescent(&self) {
        assert_eq!(self.fwk.pool().live_blocks(), 0, "blocks leaked");
        assert_eq!(self.platform.assertion_count(), 0, "assertion fired");
    }
}
