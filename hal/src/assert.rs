//! Framework assertions
//!
//! Every fatal protocol violation in the framework is reported through one
//! gate so the application decides whether a fault halts, logs or resets.

use crate::interrupts::Platform;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Assertion gate in front of [`Platform::assertion_handler`]
///
/// Disabled gates still evaluate the condition (callers rely on the
/// returned value) but never invoke the handler.
pub struct Assertions {
    platform: Arc<dyn Platform>,
    enabled: bool,
    fired: AtomicU32,
}

impl Assertions {
    /// Creates a gate for `platform`
    pub fn new(platform: Arc<dyn Platform>, enabled: bool) -> Self {
        Self {
            platform,
            enabled,
            fired: AtomicU32::new(0),
        }
    }

    /// Reports a failed assertion when `cond` is false; returns `cond`
    pub fn check(&self, cond: bool, file: &'static str, line: u32) -> bool {
        if !cond && self.enabled {
            self.fired.fetch_add(1, Ordering::Relaxed);
            log::error!("framework assertion at {}:{}", file, line);
            self.platform.assertion_handler(file, line);
        }
        cond
    }

    /// Number of assertions that reached the handler
    pub fn fired(&self) -> u32 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Returns whether the gate forwards to the handler
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The platform behind this gate
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }
}

impl std::fmt::Debug for Assertions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertions")
            .field("enabled", &self.enabled)
            .field("fired", &self.fired())
            .finish()
    }
}

/// Checks a condition through an [`Assertions`] gate
///
/// Evaluates to the condition so the caller can bail out:
///
/// ```
/// use hal::{fwk_assert, Assertions, DefaultPlatform};
/// use std::sync::Arc;
///
/// let asserts = Assertions::new(Arc::new(DefaultPlatform), true);
/// if !fwk_assert!(asserts, 1 + 1 == 3) {
///     assert_eq!(asserts.fired(), 1);
/// }
/// ```
///
/// `fwk_assert!(gate, FORCED)` fires unconditionally.
#[macro_export]
macro_rules! fwk_assert {
    ($gate:expr, FORCED) => {
        $gate.check(false, file!(), line!())
    };
    ($gate:expr, $cond:expr) => {
        $gate.check($cond, file!(), line!())
    };
}
