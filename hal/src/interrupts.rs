//! Execution context and platform hooks

use std::fmt;

/// Where the caller is running
///
/// Interrupt context must never block, so every queue or pool operation
/// that accepts a timeout forces "no wait" when handed
/// [`ExecContext::Interrupt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecContext {
    /// Preemptible thread; may block
    #[default]
    Thread,
    /// Interrupt service routine or timer expiry; must not block
    Interrupt,
}

impl ExecContext {
    /// Asks the platform which context the caller is in
    pub fn current(platform: &dyn Platform) -> Self {
        if platform.interrupt_context() {
            ExecContext::Interrupt
        } else {
            ExecContext::Thread
        }
    }

    /// Returns whether an operation in this context may wait
    pub fn may_block(self) -> bool {
        matches!(self, ExecContext::Thread)
    }

    /// Checks for interrupt context
    pub fn is_interrupt(self) -> bool {
        matches!(self, ExecContext::Interrupt)
    }
}

impl fmt::Display for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecContext::Thread => write!(f, "thread"),
            ExecContext::Interrupt => write!(f, "isr"),
        }
    }
}

/// Hooks supplied by the embedding application
///
/// All methods have defaults matching a hosted build: never in interrupt
/// context, assertions are a no-op, reset does nothing. Override
/// `assertion_handler` to halt or reset on a fault.
pub trait Platform: Send + Sync {
    /// Returns whether the caller is running in interrupt context
    fn interrupt_context(&self) -> bool {
        false
    }

    /// Called when a framework assertion fails
    ///
    /// Returning is allowed; the framework then continues with a defined
    /// error result.
    fn assertion_handler(&self, file: &'static str, line: u32) {
        let _ = (file, line);
    }

    /// Resets the system
    fn system_reset(&self) {}
}

/// Platform with every hook left at its default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPlatform;

impl Platform for DefaultPlatform {}
