//! # Periodic Timer
//!
//! Collaborator interface for the per-task periodic timer.
//!
//! ## Philosophy
//!
//! **A timer is armed, disarmed and fired. Nothing else.**
//!
//! The framework needs three operations: initialize with an expiry
//! callback, start with an initial duration and repeat period, and stop.
//! A period of zero means one-shot. The expiry callback runs in interrupt
//! context on real targets and must not block.
//!
//! [`ThreadTimerDriver`] backs each timer with a host thread. Deterministic
//! tests use the simulated driver in `sim_kernel` instead.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Callback invoked on every expiry
pub type ExpiryFn = Arc<dyn Fn() + Send + Sync>;

/// One periodic timer
pub trait PeriodicTimer: Send + Sync {
    /// Arms the timer: first expiry after `duration`, then every `period`
    ///
    /// Re-arming a running timer replaces its schedule. A zero `period`
    /// makes the timer one-shot.
    fn start(&self, duration: Duration, period: Duration);

    /// Disarms the timer. Immediate and idempotent.
    fn stop(&self);

    /// Returns whether an expiry is pending
    fn is_running(&self) -> bool;
}

/// Creates timers bound to an expiry callback
pub trait TimerDriver: Send + Sync {
    /// Initializes (but does not arm) a timer
    fn init(&self, expiry: ExpiryFn) -> Box<dyn PeriodicTimer>;
}

enum TimerCommand {
    Start {
        generation: u64,
        duration: Duration,
        period: Duration,
    },
    Stop,
}

/// Timer driver backed by one host thread per timer
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadTimerDriver;

impl ThreadTimerDriver {
    /// Creates a driver
    pub fn new() -> Self {
        Self
    }
}

impl TimerDriver for ThreadTimerDriver {
    fn init(&self, expiry: ExpiryFn) -> Box<dyn PeriodicTimer> {
        let (tx, rx) = channel::unbounded();
        let armed = Arc::new(AtomicU64::new(DISARMED));
        let worker_armed = armed.clone();
        thread::spawn(move || timer_thread(rx, expiry, worker_armed));
        Box::new(ThreadTimer {
            commands: tx,
            armed,
            next_generation: AtomicU64::new(DISARMED),
        })
    }
}

/// Generation value meaning "no schedule armed"
const DISARMED: u64 = 0;

/// Each `start` gets a fresh generation. `armed` holds the generation of
/// the live schedule, so the worker can tell a current schedule from one
/// that was stopped or replaced while it waited.
struct ThreadTimer {
    commands: Sender<TimerCommand>,
    armed: Arc<AtomicU64>,
    next_generation: AtomicU64,
}

impl PeriodicTimer for ThreadTimer {
    fn start(&self, duration: Duration, period: Duration) {
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.armed.store(generation, Ordering::Release);
        // The worker only exits once this sender is dropped.
        let _ = self.commands.send(TimerCommand::Start {
            generation,
            duration,
            period,
        });
    }

    fn stop(&self) {
        self.armed.store(DISARMED, Ordering::Release);
        let _ = self.commands.send(TimerCommand::Stop);
    }

    fn is_running(&self) -> bool {
        self.armed.load(Ordering::Acquire) != DISARMED
    }
}

struct Schedule {
    generation: u64,
    deadline: Instant,
    period: Duration,
}

fn timer_thread(commands: Receiver<TimerCommand>, expiry: ExpiryFn, armed: Arc<AtomicU64>) {
    let mut schedule: Option<Schedule> = None;
    loop {
        let command = match &schedule {
            None => match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            },
            Some(current) => match commands.recv_deadline(current.deadline) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
        };

        match command {
            Some(TimerCommand::Start {
                generation,
                duration,
                period,
            }) => {
                schedule = Some(Schedule {
                    generation,
                    deadline: Instant::now() + duration,
                    period,
                });
            }
            Some(TimerCommand::Stop) => schedule = None,
            None => {
                let Some(current) = schedule.take() else {
                    continue;
                };
                // Stopped or replaced; the newer command is still queued.
                if armed.load(Ordering::Acquire) != current.generation {
                    continue;
                }
                expiry();
                if current.period.is_zero() {
                    // Fails when the expiry re-armed the timer.
                    let _ = armed.compare_exchange(
                        current.generation,
                        DISARMED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                } else {
                    schedule = Some(Schedule {
                        deadline: current.deadline + current.period,
                        ..current
                    });
                }
            }
        }
    }
}
