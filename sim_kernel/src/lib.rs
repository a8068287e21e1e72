//! # Simulated Platform
//!
//! Deterministic stand-ins for the platform collaborators the framework
//! consumes.
//!
//! ## Purpose
//!
//! - Runs under `cargo test`
//! - Deterministic: timers fire only when the test advances time
//! - Inspectable: interrupt context is scripted and every assertion is
//!   recorded
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! The framework reaches interrupts, faults and timers only through
//! [`hal`] traits. Swapping in [`SimPlatform`] and [`SimTimerDriver`] lets a
//! test drive a periodic tick, an interrupt-context send or a fatal
//! assertion exactly when it wants to, and then look at what happened.

pub mod platform;
pub mod timer;

pub use platform::{AssertionRecord, SimPlatform};
pub use timer::SimTimerDriver;
