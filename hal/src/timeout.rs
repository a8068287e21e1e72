//! Wait bounds for blocking operations

use crate::interrupts::ExecContext;
use std::time::{Duration, Instant};

/// How long a put, get or take may wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    /// Return immediately
    #[default]
    NoWait,
    /// Wait at most this long
    After(Duration),
    /// Wait until the operation can complete
    Forever,
}

impl Timeout {
    /// Convenience constructor for millisecond timeouts
    pub const fn millis(ms: u64) -> Self {
        Timeout::After(Duration::from_millis(ms))
    }

    /// Applies the interrupt rule: ISRs never wait
    pub fn in_context(self, ctx: ExecContext) -> Self {
        if ctx.may_block() {
            self
        } else {
            Timeout::NoWait
        }
    }

    /// Absolute deadline for a wait starting now, `None` for forever
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Timeout::NoWait => Some(Instant::now()),
            Timeout::After(d) => Some(Instant::now() + d),
            Timeout::Forever => None,
        }
    }

    /// Checks for the no-wait sentinel (including a zero duration)
    pub fn is_no_wait(self) -> bool {
        match self {
            Timeout::NoWait => true,
            Timeout::After(d) => d.is_zero(),
            Timeout::Forever => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_forces_no_wait() {
        assert_eq!(Timeout::Forever.in_context(ExecContext::Interrupt), Timeout::NoWait);
        assert_eq!(Timeout::millis(10).in_context(ExecContext::Interrupt), Timeout::NoWait);
    }

    #[test]
    fn test_thread_keeps_timeout() {
        assert_eq!(Timeout::Forever.in_context(ExecContext::Thread), Timeout::Forever);
        assert_eq!(Timeout::millis(10).in_context(ExecContext::Thread), Timeout::millis(10));
    }

    #[test]
    fn test_no_wait_detection() {
        assert!(Timeout::NoWait.is_no_wait());
        assert!(Timeout::After(Duration::ZERO).is_no_wait());
        assert!(!Timeout::millis(1).is_no_wait());
        assert!(!Timeout::Forever.is_no_wait());
        assert!(Timeout::Forever.deadline().is_none());
    }
}
