//! Message tasks and their periodic timers
//!
//! A [`MsgTask`] is a receiver plus the state its handlers work on. Its
//! periodic timer lives in the framework's timer table, keyed by the task
//! id, so handlers can start, stop or re-period their own timer while the
//! task is borrowed by its receive loop. The timer never calls handlers
//! directly: each expiry routes a header-only [`MsgCode::PERIODIC`] message
//! to the task, so periodic work runs in the task's own loop.

use crate::dispatch::Dispatcher;
use crate::error::RegistryError;
use crate::registry::Receiver;
use crate::router::ReceiveOutcome;
use crate::Framework;
use core_types::{FwkId, MsgCode};
use hal::{fwk_assert, ExecContext, ExpiryFn, PeriodicTimer, Timeout};
use ipc::{BoundedQueue, Message, MsgHeader, MsgQueue};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A receiver with state and handlers
pub struct MsgTask<S> {
    receiver: Receiver,
    dispatcher: Arc<Dispatcher<S>>,
    state: S,
    timer_duration: Duration,
    timer_period: Duration,
}

impl<S: 'static> MsgTask<S> {
    /// Creates a task with its own queue of `queue_depth` messages
    pub fn new(id: FwkId, queue_depth: usize, dispatcher: Dispatcher<S>, state: S) -> Self {
        let queue: Arc<dyn MsgQueue> = Arc::new(BoundedQueue::with_capacity(queue_depth));
        Self::with_queue(id, queue, dispatcher, state)
    }

    /// Creates a task on an existing queue
    pub fn with_queue(
        id: FwkId,
        queue: Arc<dyn MsgQueue>,
        dispatcher: Dispatcher<S>,
        state: S,
    ) -> Self {
        let dispatcher = Arc::new(dispatcher);
        Self {
            receiver: Receiver::new(id, queue, dispatcher.clone()),
            dispatcher,
            state,
            timer_duration: Duration::ZERO,
            timer_period: Duration::ZERO,
        }
    }
}

impl<S> MsgTask<S> {
    /// Sets the receive timeout for this task
    pub fn with_rx_block(mut self, rx_block: Timeout) -> Self {
        self.receiver = self.receiver.with_rx_block(rx_block);
        self
    }

    /// Sets the timer schedule installed by [`Framework::register_task`]
    ///
    /// A zero `period` makes the timer one-shot.
    pub fn with_timer(mut self, duration: Duration, period: Duration) -> Self {
        self.timer_duration = duration;
        self.timer_period = period;
        self
    }

    pub fn id(&self) -> FwkId {
        self.receiver.id()
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Receives and dispatches one message
    pub fn run_once(&mut self, fwk: &Framework) -> ReceiveOutcome {
        fwk.msg_receiver(&self.receiver, &self.dispatcher, &mut self.state)
    }

    /// Runs the receive loop until `stop` is set
    ///
    /// `stop` is checked between messages, so the receive timeout bounds
    /// how long shutdown takes.
    pub fn run(&mut self, fwk: &Framework, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            self.run_once(fwk);
        }
    }

    /// Consumes the task and returns its state
    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S> fmt::Debug for MsgTask<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgTask")
            .field("receiver", &self.receiver)
            .field("timer_duration", &self.timer_duration)
            .field("timer_period", &self.timer_period)
            .finish()
    }
}

/// A task's timer and the schedule it is armed with
pub(crate) struct TaskTimer {
    timer: Box<dyn PeriodicTimer>,
    duration: Duration,
    period: Duration,
}

impl Framework {
    /// Registers a task's receiver and initializes (without arming) its
    /// timer
    ///
    /// Must run before the task starts receiving, so the timer exists
    /// before the first [`Framework::start_timer`].
    pub fn register_task<S>(self: &Arc<Self>, task: &MsgTask<S>) -> Result<(), RegistryError> {
        self.register_receiver(task.receiver.clone())?;

        let fwk = Arc::downgrade(self);
        let id = task.id();
        let expiry: ExpiryFn = Arc::new(move || {
            if let Some(fwk) = fwk.upgrade() {
                fwk.periodic_expiry(id);
            }
        });
        let timer = TaskTimer {
            timer: self.timer_driver().init(expiry),
            duration: task.timer_duration,
            period: task.timer_period,
        };
        // Registration already rejected ids outside the table.
        if let Some(slot) = self.timers.lock().get_mut(id.index()) {
            *slot = Some(timer);
        }
        log::debug!("registered task {}", id);
        Ok(())
    }

    /// Runs `f` on task `id`'s timer, asserting if it has none
    fn with_task_timer(&self, id: FwkId, f: impl FnOnce(&mut TaskTimer)) {
        let found = self
            .timers
            .lock()
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .map(f)
            .is_some();
        if !found {
            log::error!("no timer registered for {}", id);
            fwk_assert!(self.assertions(), FORCED);
        }
    }

    /// Arms task `id`'s timer with its current schedule
    pub fn start_timer(&self, id: FwkId) {
        self.with_task_timer(id, |t| {
            log::trace!("{} timer start {:?}/{:?}", id, t.duration, t.period);
            t.timer.start(t.duration, t.period);
        });
    }

    /// Disarms task `id`'s timer
    pub fn stop_timer(&self, id: FwkId) {
        self.with_task_timer(id, |t| {
            log::trace!("{} timer stop", id);
            t.timer.stop();
        });
    }

    /// Replaces task `id`'s timer schedule and re-arms immediately
    ///
    /// Callable from the task's own handlers.
    pub fn change_timer_period(&self, id: FwkId, duration: Duration, period: Duration) {
        self.with_task_timer(id, |t| {
            t.duration = duration;
            t.period = period;
            log::trace!("{} timer start {:?}/{:?}", id, duration, period);
            t.timer.start(duration, period);
        });
    }

    /// Returns whether task `id` has an armed timer
    pub fn timer_running(&self, id: FwkId) -> bool {
        self.timers
            .lock()
            .get(id.index())
            .and_then(Option::as_ref)
            .is_some_and(|t| t.timer.is_running())
    }

    /// Initial delay and repeat period of task `id`'s timer
    pub fn timer_schedule(&self, id: FwkId) -> Option<(Duration, Duration)> {
        self.timers
            .lock()
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|t| (t.duration, t.period))
    }

    /// Timer expiry: route a periodic tick to task `id`
    ///
    /// Runs in interrupt context. A tick that cannot be allocated or queued
    /// is dropped.
    pub(crate) fn periodic_expiry(&self, id: FwkId) {
        let msg = match Message::allocate(
            self.pool(),
            MsgHeader::new(MsgCode::PERIODIC, id),
            0,
            Timeout::NoWait,
            ExecContext::Interrupt,
        ) {
            Ok(msg) => msg,
            Err(err) => {
                log::trace!("periodic tick for {} dropped: {}", id, err);
                return;
            }
        };
        if let Err(rejected) = self.send(id, msg) {
            log::trace!("periodic tick for {} dropped: {}", id, rejected.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchResult;
    use crate::FrameworkConfig;
    use hal::{DefaultPlatform, ThreadTimerDriver};

    fn count(_: &Framework, ticks: &mut u32, msg: Message) -> DispatchResult {
        *ticks += 1;
        DispatchResult::Ok(msg)
    }

    fn framework() -> Arc<Framework> {
        Framework::new(
            FrameworkConfig::default(),
            Arc::new(DefaultPlatform),
            Arc::new(ThreadTimerDriver::new()),
        )
    }

    #[test]
    fn test_periodic_expiry_reaches_task() {
        let fwk = framework();
        let mut task = MsgTask::new(
            FwkId(1),
            4,
            Dispatcher::new().with_handler(MsgCode::PERIODIC, count),
            0u32,
        )
        .with_rx_block(Timeout::NoWait);
        fwk.register_task(&task).unwrap();

        fwk.periodic_expiry(FwkId(1));
        assert!(!fwk.queue_is_empty(FwkId(1)));
        assert_eq!(task.run_once(&fwk), ReceiveOutcome::Dispatched(crate::DispatchStatus::Ok));
        assert_eq!(*task.state(), 1);
        assert_eq!(fwk.pool().live_blocks(), 0);
    }

    #[test]
    fn test_tick_to_full_queue_is_dropped() {
        let fwk = framework();
        let task = MsgTask::new(
            FwkId(2),
            1,
            Dispatcher::new().with_handler(MsgCode::PERIODIC, count),
            0u32,
        );
        fwk.register_task(&task).unwrap();
        fwk.periodic_expiry(FwkId(2));
        fwk.periodic_expiry(FwkId(2));
        assert_eq!(fwk.flush(FwkId(2)), 1);
        assert_eq!(fwk.pool().live_blocks(), 0);
        assert_eq!(fwk.assertions().fired(), 0);
    }

    #[test]
    fn test_timer_without_registration_asserts() {
        let fwk = framework();
        fwk.start_timer(FwkId(3));
        fwk.stop_timer(FwkId(3));
        fwk.change_timer_period(FwkId(200), Duration::from_secs(1), Duration::ZERO);
        assert_eq!(fwk.assertions().fired(), 3);
        assert!(!fwk.timer_running(FwkId(3)));
        assert_eq!(fwk.timer_schedule(FwkId(3)), None);
    }

    #[test]
    fn test_change_timer_period_rearms() {
        let fwk = framework();
        let id = FwkId(4);
        let task = MsgTask::new(id, 1, Dispatcher::<u32>::new(), 0)
            .with_timer(Duration::from_secs(60), Duration::ZERO);
        fwk.register_task(&task).unwrap();
        assert!(!fwk.timer_running(id));
        assert_eq!(fwk.timer_schedule(id), Some((Duration::from_secs(60), Duration::ZERO)));

        fwk.change_timer_period(id, Duration::from_secs(30), Duration::from_secs(30));
        assert_eq!(
            fwk.timer_schedule(id),
            Some((Duration::from_secs(30), Duration::from_secs(30)))
        );
        assert!(fwk.timer_running(id));
        fwk.stop_timer(id);
        assert!(!fwk.timer_running(id));
    }
}
