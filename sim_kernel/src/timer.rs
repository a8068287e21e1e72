//! # Simulated Timer Driver
//!
//! Deterministic periodic timers for testing.
//!
//! ## Philosophy
//!
//! **Determinism enables thorough testing.**
//!
//! Simulated time only moves when the test calls
//! [`SimTimerDriver::advance`]. Every timer created by the driver shares
//! that clock, and expiries fire in deadline order on the caller's thread
//! while time is advanced.

use hal::{ExpiryFn, PeriodicTimer, TimerDriver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct SimTimerSlot {
    expiry: ExpiryFn,
    deadline: Option<Duration>,
    period: Duration,
    fired: u64,
}

#[derive(Default)]
struct SimClock {
    now: Duration,
    timers: Vec<SimTimerSlot>,
}

/// Timer driver on a manually advanced clock
///
/// Cloning yields another handle to the same clock.
///
/// # Examples
///
/// ```
/// use hal::TimerDriver;
/// use sim_kernel::SimTimerDriver;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let driver = SimTimerDriver::new();
/// let ticks = Arc::new(AtomicU32::new(0));
/// let counter = ticks.clone();
/// let timer = driver.init(Arc::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// timer.start(Duration::from_millis(10), Duration::from_millis(5));
/// driver.advance(Duration::from_millis(20));
/// assert_eq!(ticks.load(Ordering::SeqCst), 3);
/// ```
#[derive(Clone, Default)]
pub struct SimTimerDriver {
    clock: Arc<Mutex<SimClock>>,
}

impl SimTimerDriver {
    /// Creates a driver whose clock starts at zero
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated time
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Advances the clock by `delta`, firing every expiry that falls due
    ///
    /// Expiry callbacks run without the clock locked, so they may start or
    /// stop timers.
    ///
    /// # Panics
    ///
    /// Panics if the clock would overflow.
    pub fn advance(&self, delta: Duration) {
        let target = self
            .now()
            .checked_add(delta)
            .expect("Timer tick overflow");

        loop {
            let expiry = {
                let mut clock = self.lock();
                let due = clock
                    .timers
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| slot.deadline.map(|deadline| (deadline, index)))
                    .filter(|(deadline, _)| *deadline <= target)
                    .min();
                let Some((deadline, index)) = due else {
                    clock.now = target;
                    break;
                };

                clock.now = deadline;
                let slot = &mut clock.timers[index];
                slot.fired += 1;
                slot.deadline = if slot.period.is_zero() {
                    None
                } else {
                    Some(deadline + slot.period)
                };
                slot.expiry.clone()
            };
            expiry();
        }
    }

    /// [`SimTimerDriver::advance`] in milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Number of timers created
    pub fn timer_count(&self) -> usize {
        self.lock().timers.len()
    }

    /// Number of armed timers
    pub fn armed_count(&self) -> usize {
        self.lock()
            .timers
            .iter()
            .filter(|slot| slot.deadline.is_some())
            .count()
    }

    /// Total expiries across all timers
    pub fn fired_total(&self) -> u64 {
        self.lock().timers.iter().map(|slot| slot.fired).sum()
    }
}

impl TimerDriver for SimTimerDriver {
    fn init(&self, expiry: ExpiryFn) -> Box<dyn PeriodicTimer> {
        let mut clock = self.lock();
        clock.timers.push(SimTimerSlot {
            expiry,
            deadline: None,
            period: Duration::ZERO,
            fired: 0,
        });
        Box::new(SimTimer {
            driver: self.clone(),
            index: clock.timers.len() - 1,
        })
    }
}

struct SimTimer {
    driver: SimTimerDriver,
    index: usize,
}

impl PeriodicTimer for SimTimer {
    fn start(&self, duration: Duration, period: Duration) {
        let mut clock = self.driver.lock();
        let deadline = clock.now + duration;
        let slot = &mut clock.timers[self.index];
        slot.deadline = Some(deadline);
        slot.period = period;
    }

    fn stop(&self) {
        self.driver.lock().timers[self.index].deadline = None;
    }

    fn is_running(&self) -> bool {
        self.driver.lock().timers[self.index].deadline.is_some()
    }
}
