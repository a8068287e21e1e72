//! Scriptable platform hooks

use hal::Platform;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// One call to the assertion handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionRecord {
    pub file: &'static str,
    pub line: u32,
}

/// Platform whose interrupt flag is set by the test
///
/// Assertions and resets are recorded instead of halting.
///
/// ```
/// use hal::{ExecContext, Platform};
/// use sim_kernel::SimPlatform;
///
/// let platform = SimPlatform::new();
/// assert_eq!(ExecContext::current(&platform), ExecContext::Thread);
/// platform.in_interrupt(|| {
///     assert_eq!(ExecContext::current(&platform), ExecContext::Interrupt);
/// });
/// platform.assertion_handler("lib.rs", 7);
/// assert_eq!(platform.assertion_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SimPlatform {
    in_isr: AtomicBool,
    assertions: Mutex<Vec<AssertionRecord>>,
    resets: AtomicU32,
}

impl SimPlatform {
    /// Creates a platform in thread context with no records
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets what [`Platform::interrupt_context`] reports
    pub fn set_interrupt_context(&self, in_isr: bool) {
        self.in_isr.store(in_isr, Ordering::SeqCst);
    }

    /// Runs `f` with the interrupt flag set
    pub fn in_interrupt<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.in_isr.swap(true, Ordering::SeqCst);
        let result = f();
        self.in_isr.store(previous, Ordering::SeqCst);
        result
    }

    /// Every assertion reported so far
    pub fn assertions(&self) -> Vec<AssertionRecord> {
        self.assertions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn assertion_count(&self) -> usize {
        self.assertions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of [`Platform::system_reset`] calls
    pub fn reset_count(&self) -> u32 {
        self.resets.load(Ordering::SeqCst)
    }

    /// Forgets recorded assertions and resets
    pub fn clear(&self) {
        self.assertions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.resets.store(0, Ordering::SeqCst);
    }
}

impl Platform for SimPlatform {
    fn interrupt_context(&self) -> bool {
        self.in_isr.load(Ordering::SeqCst)
    }

    fn assertion_handler(&self, file: &'static str, line: u32) {
        log::debug!("simulated assertion at {}:{}", file, line);
        self.assertions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AssertionRecord { file, line });
    }

    fn system_reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal::ExecContext;

    #[test]
    fn test_starts_in_thread_context() {
        let platform = SimPlatform::new();
        assert!(!platform.interrupt_context());
        assert_eq!(platform.assertion_count(), 0);
    }

    #[test]
    fn test_in_interrupt_restores_flag() {
        let platform = SimPlatform::new();
        let ctx = platform.in_interrupt(|| ExecContext::current(&platform));
        assert_eq!(ctx, ExecContext::Interrupt);
        assert!(!platform.interrupt_context());

        platform.set_interrupt_context(true);
        platform.in_interrupt(|| {});
        assert!(platform.interrupt_context());
    }

    #[test]
    fn test_records_assertions_and_resets() {
        let platform = SimPlatform::new();
        platform.assertion_handler("pool.rs", 12);
        platform.system_reset();
        assert_eq!(
            platform.assertions(),
            vec![AssertionRecord {
                file: "pool.rs",
                line: 12
            }]
        );
        assert_eq!(platform.reset_count(), 1);

        platform.clear();
        assert_eq!(platform.assertion_count(), 0);
        assert_eq!(platform.reset_count(), 0);
    }
}
