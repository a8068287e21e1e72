//! # Message Framework
//!
//! Inter-task message passing for a fixed set of cooperating tasks.
//!
//! ## Philosophy
//!
//! - **Ownership is the protocol**: A [`Message`](ipc::Message) is given to
//!   the framework on send, handed back only on failure (inside
//!   [`Rejected`]), and consumed by the receiving handler unless it returns
//!   [`DispatchResult::DoNotFree`].
//! - **Fixed at start-up**: Receivers are registered once, before their
//!   tasks run, into a table sized by configuration. Nothing is created on
//!   the hot path.
//! - **Bounded everywhere**: Queues have a fixed depth and message memory
//!   comes from one [`BufferPool`](buffer_pool::BufferPool).
//!
//! ## Routing
//!
//! - [`Framework::send`]: by receiver id
//! - [`Framework::unicast`]: to the lowest-id receiver handling the code
//! - [`Framework::broadcast`]: a copy to every receiver handling the code
//! - [`Framework::queue`]: straight onto a queue, bypassing the registry
//!
//! Task timers are addressed by task id ([`Framework::start_timer`],
//! [`Framework::change_timer_period`]), so a handler can drive its own
//! timer from inside the receive loop.
//!
//! [`fwk_msg`] wraps these for call sites that want failures freed and
//! asserted rather than handed back.
//!
//! ## Example
//!
//! ```
//! use framework::{DispatchResult, Dispatcher, Framework, MsgTask, ReceiveOutcome};
//! use core_types::{FwkId, MsgCode};
//! use ipc::{Message, Timeout};
//! use std::sync::Arc;
//!
//! const PING: MsgCode = MsgCode::application(0);
//!
//! fn on_ping(_: &Framework, pings: &mut u32, msg: Message) -> DispatchResult {
//!     *pings += 1;
//!     DispatchResult::Ok(msg)
//! }
//!
//! let fwk = Framework::with_defaults();
//! let mut task = MsgTask::new(FwkId(1), 4, Dispatcher::new().with_handler(PING, on_ping), 0u32)
//!     .with_rx_block(Timeout::NoWait);
//! fwk.register_task(&task).unwrap();
//!
//! let msg = Message::new(fwk.pool(), PING, FwkId(2)).unwrap();
//! fwk.unicast(msg).unwrap();
//! assert!(matches!(task.run_once(&fwk), ReceiveOutcome::Dispatched(_)));
//! assert_eq!(*task.state(), 1);
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fwk_msg;
pub mod registry;
pub mod router;
pub mod task;

pub use config::FrameworkConfig;
pub use dispatch::{unknown_msg_handler, Dispatch, DispatchResult, DispatchStatus, Dispatcher, Handler};
pub use error::{ConfigError, Rejected, RegistryError, RouteError};
pub use registry::{Receiver, Registry};
pub use router::ReceiveOutcome;
pub use task::MsgTask;

use buffer_pool::BufferPool;
use hal::{fwk_assert, Assertions, DefaultPlatform, ExecContext, Platform, ThreadTimerDriver, TimerDriver};
use spin::Mutex;
use std::fmt;
use std::sync::Arc;
use task::TaskTimer;

/// The framework context
///
/// Owns the receiver registry, the task timers and the buffer pool. Shared
/// by every task, interrupt callback and timer through an `Arc`.
pub struct Framework {
    config: FrameworkConfig,
    asserts: Arc<Assertions>,
    pool: BufferPool,
    registry: Registry,
    timers: Mutex<Vec<Option<TaskTimer>>>,
    timer_driver: Arc<dyn TimerDriver>,
}

impl Framework {
    /// Creates the registry and initializes the buffer pool
    pub fn new(
        config: FrameworkConfig,
        platform: Arc<dyn Platform>,
        timer_driver: Arc<dyn TimerDriver>,
    ) -> Arc<Self> {
        let asserts = Arc::new(Assertions::new(platform, config.assert_enabled));
        let pool = BufferPool::with_assertions(config.pool.clone(), asserts.clone());
        let registry = Registry::new(config.max_receivers);
        let timers = Mutex::new((0..config.max_receivers).map(|_| None).collect());
        Arc::new(Self {
            config,
            asserts,
            pool,
            registry,
            timers,
            timer_driver,
        })
    }

    /// Default configuration, default platform hooks and thread timers
    pub fn with_defaults() -> Arc<Self> {
        Self::new(
            FrameworkConfig::default(),
            Arc::new(DefaultPlatform),
            Arc::new(ThreadTimerDriver::new()),
        )
    }

    /// Adds a receiver to the routing table
    ///
    /// An out-of-range or duplicate id is a start-up bug: it fires the
    /// assertion before the error is returned.
    pub fn register_receiver(&self, receiver: Receiver) -> Result<(), RegistryError> {
        let id = receiver.id();
        match self.registry.register(receiver) {
            Ok(()) => {
                log::debug!("registered receiver {}", id);
                Ok(())
            }
            Err(err) => {
                log::error!("receiver registration failed: {}", err);
                fwk_assert!(self.asserts, FORCED);
                Err(err)
            }
        }
    }

    /// Asks the platform whether the caller is in interrupt context
    pub fn exec_context(&self) -> ExecContext {
        ExecContext::current(self.platform().as_ref())
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Assertion gate shared with the pool
    pub fn assertions(&self) -> &Arc<Assertions> {
        &self.asserts
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        self.asserts.platform()
    }

    pub fn timer_driver(&self) -> &Arc<dyn TimerDriver> {
        &self.timer_driver
    }
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framework")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .finish()
    }
}
