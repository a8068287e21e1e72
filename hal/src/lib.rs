//! # Hardware Abstraction Layer (HAL)
//!
//! This crate defines the platform collaborators the message framework
//! depends on but does not implement.
//!
//! ## Philosophy
//!
//! **The framework decides policy, the platform supplies mechanism.**
//!
//! Interrupt detection, fault handling, reset and periodic timers differ on
//! every target. The framework reaches them only through the traits here, so
//! the same routing code runs on a microcontroller, on a hosted OS and under
//! `cargo test`.
//!
//! ## Design Principles
//!
//! 1. **Overridable hooks**: Every hook has a default; applications override
//!    only what they need
//! 2. **Explicit execution context**: Callers that may be in an interrupt
//!    say so with [`ExecContext`] instead of the core probing for it
//! 3. **One fault path**: Fatal conditions go through
//!    [`Platform::assertion_handler`] via [`fwk_assert!`]

pub mod assert;
pub mod interrupts;
pub mod timeout;
pub mod timer;

pub use assert::Assertions;
pub use interrupts::{DefaultPlatform, ExecContext, Platform};
pub use timeout::Timeout;
pub use timer::{ExpiryFn, PeriodicTimer, ThreadTimerDriver, TimerDriver};
