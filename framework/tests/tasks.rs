//! Receive loop and periodic timer tests on simulated time

use buffer_pool::{AllocFault, BufferPoolConfig, FaultPlan};
use core_types::{FwkId, MsgCode};
use framework::{
    fwk_msg, DispatchResult, DispatchStatus, Dispatcher, Framework, FrameworkConfig, MsgTask,
    ReceiveOutcome,
};
use ipc::{Message, MsgCallback};
use sim_kernel::{SimPlatform, SimTimerDriver};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WORK: MsgCode = MsgCode::application(0);
const KEEP: MsgCode = MsgCode::application(1);
const STRANGER: MsgCode = MsgCode::application(2);

#[derive(Default)]
struct Worker {
    ticks: u32,
    work: u32,
    kept: Vec<Message>,
}

fn on_tick(_: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.ticks += 1;
    DispatchResult::Ok(msg)
}

fn on_work(_: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.work += 1;
    DispatchResult::Ok(msg)
}

fn on_keep(_: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.kept.push(msg);
    DispatchResult::DoNotFree
}

fn dispatcher() -> Dispatcher<Worker> {
    Dispatcher::new()
        .with_handler(MsgCode::PERIODIC, on_tick)
        .with_handler(WORK, on_work)
        .with_handler(KEEP, on_keep)
}

struct Sim {
    fwk: Arc<Framework>,
    platform: Arc<SimPlatform>,
    clock: SimTimerDriver,
}

fn sim() -> Sim {
    let platform = Arc::new(SimPlatform::new());
    let clock = SimTimerDriver::new();
    let fwk = Framework::new(
        FrameworkConfig::new()
            .with_pool(BufferPoolConfig::new().with_size(1024))
            .with_default_rx_block(Some(0)),
        platform.clone(),
        Arc::new(clock.clone()),
    );
    Sim {
        fwk,
        platform,
        clock,
    }
}

fn task(sim: &Sim, id: u8, depth: usize) -> MsgTask<Worker> {
    timed_task(sim, id, depth, 0, 0)
}

fn timed_task(sim: &Sim, id: u8, depth: usize, first_ms: u64, period_ms: u64) -> MsgTask<Worker> {
    let task = MsgTask::new(FwkId(id), depth, dispatcher(), Worker::default())
        .with_timer(Duration::from_millis(first_ms), Duration::from_millis(period_ms));
    sim.fwk.register_task(&task).unwrap();
    task
}

fn drain(sim: &Sim, task: &mut MsgTask<Worker>) -> usize {
    let mut handled = 0;
    while task.run_once(&sim.fwk) != ReceiveOutcome::Idle {
        handled += 1;
    }
    handled
}

#[test]
fn test_idle_when_nothing_queued() {
    let sim = sim();
    let mut task = task(&sim, 1, 4);
    assert_eq!(task.run_once(&sim.fwk), ReceiveOutcome::Idle);
}

#[test]
fn test_handled_messages_are_freed() {
    let sim = sim();
    let mut task = task(&sim, 1, 4);
    for _ in 0..3 {
        fwk_msg::create_and_send_to_self(&sim.fwk, FwkId(1), WORK).unwrap();
    }
    assert_eq!(sim.fwk.pool().live_blocks(), 3);
    assert_eq!(drain(&sim, &mut task), 3);
    assert_eq!(task.state().work, 3);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

#[test]
fn test_do_not_free_keeps_block_until_dropped() {
    let sim = sim();
    let mut task = task(&sim, 1, 4);
    fwk_msg::create_and_send(&sim.fwk, FwkId(2), FwkId(1), KEEP).unwrap();
    let before = sim.fwk.pool().stats(0).unwrap();

    assert_eq!(
        task.run_once(&sim.fwk),
        ReceiveOutcome::Dispatched(DispatchStatus::DoNotFree)
    );
    assert_eq!(sim.fwk.pool().live_blocks(), 1);
    assert_eq!(sim.fwk.pool().stats(0).unwrap(), before);

    let kept = task.state_mut().kept.pop().unwrap();
    assert_eq!(kept.src(), FwkId(2));
    drop(kept);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

#[test]
fn test_kept_message_can_be_forwarded() {
    let sim = sim();
    let mut first = task(&sim, 1, 4);
    let mut second = task(&sim, 2, 4);
    fwk_msg::create_and_send_to_self(&sim.fwk, FwkId(1), KEEP).unwrap();
    first.run_once(&sim.fwk);

    let mut msg = first.state_mut().kept.pop().unwrap();
    msg.set_code(WORK);
    fwk_msg::send_to(&sim.fwk, msg, FwkId(2)).unwrap();
    assert_eq!(drain(&sim, &mut second), 1);
    assert_eq!(second.state().work, 1);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

static CALLBACKS: Mutex<Vec<(u32, u32)>> = Mutex::new(Vec::new());
static WORK_SEEN: AtomicU32 = AtomicU32::new(0);

fn record_callback(arg: u32) {
    // Pair the argument with how much work had been done when it ran.
    CALLBACKS
        .lock()
        .unwrap()
        .push((arg, WORK_SEEN.load(Ordering::SeqCst)));
}

fn counted_work(_: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.work += 1;
    WORK_SEEN.fetch_add(1, Ordering::SeqCst);
    DispatchResult::Ok(msg)
}

#[test]
fn test_callback_runs_after_handler() {
    let sim = sim();
    let mut task = MsgTask::new(
        FwkId(1),
        4,
        Dispatcher::new()
            .with_handler(WORK, counted_work)
            .with_handler(KEEP, on_keep),
        Worker::default(),
    );
    sim.fwk.register_task(&task).unwrap();

    let msg = Message::new(sim.fwk.pool(), WORK, FwkId(1))
        .unwrap()
        .with_callback(MsgCallback::new(record_callback, 7));
    sim.fwk.send(FwkId(1), msg).unwrap();
    let kept = Message::new(sim.fwk.pool(), KEEP, FwkId(1))
        .unwrap()
        .with_callback(MsgCallback::new(record_callback, 8));
    sim.fwk.send(FwkId(1), kept).unwrap();
    let unknown = Message::new(sim.fwk.pool(), STRANGER, FwkId(1))
        .unwrap()
        .with_callback(MsgCallback::new(record_callback, 9));
    sim.fwk.send(FwkId(1), unknown).unwrap();

    assert_eq!(drain(&sim, &mut task), 3);
    let calls = CALLBACKS.lock().unwrap().clone();
    // No callback for the unknown message; the kept one still gets its own.
    assert_eq!(calls, vec![(7, 1), (8, 1)]);
    assert_eq!(sim.fwk.pool().live_blocks(), 1);
}

#[test]
fn test_unknown_message_asserts_and_frees() {
    let sim = sim();
    let mut task = task(&sim, 1, 4);
    fwk_msg::create_and_send_to_self(&sim.fwk, FwkId(1), STRANGER).unwrap();
    assert_eq!(
        task.run_once(&sim.fwk),
        ReceiveOutcome::Unknown(DispatchStatus::Error)
    );
    assert_eq!(sim.platform.assertion_count(), 1);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

fn tolerate(_: &Framework, _: &mut Worker, msg: Message) -> DispatchResult {
    DispatchResult::Ok(msg)
}

#[test]
fn test_custom_unknown_handler() {
    let sim = sim();
    let mut task = MsgTask::new(
        FwkId(1),
        4,
        dispatcher().with_unknown_handler(tolerate),
        Worker::default(),
    );
    sim.fwk.register_task(&task).unwrap();
    fwk_msg::create_and_send_to_self(&sim.fwk, FwkId(1), STRANGER).unwrap();
    assert_eq!(
        task.run_once(&sim.fwk),
        ReceiveOutcome::Unknown(DispatchStatus::Ok)
    );
    assert_eq!(sim.platform.assertion_count(), 0);
}

#[test]
fn test_periodic_timer_ticks_on_simulated_clock() {
    let sim = sim();
    let mut task = timed_task(&sim, 1, 8, 10, 10);
    sim.fwk.start_timer(FwkId(1));
    assert!(sim.fwk.timer_running(FwkId(1)));

    sim.clock.advance_ms(35);
    assert_eq!(drain(&sim, &mut task), 3);
    assert_eq!(task.state().ticks, 3);

    sim.fwk.stop_timer(FwkId(1));
    sim.clock.advance_ms(100);
    assert_eq!(drain(&sim, &mut task), 0);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

#[test]
fn test_one_shot_timer() {
    let sim = sim();
    let mut task = timed_task(&sim, 1, 8, 5, 0);
    sim.fwk.start_timer(FwkId(1));
    sim.clock.advance_ms(50);
    assert_eq!(drain(&sim, &mut task), 1);
    assert!(!sim.fwk.timer_running(FwkId(1)));
}

#[test]
fn test_change_timer_period() {
    let sim = sim();
    let mut task = timed_task(&sim, 1, 16, 100, 100);
    sim.fwk.start_timer(FwkId(1));
    sim.clock.advance_ms(50);
    sim.fwk
        .change_timer_period(FwkId(1), Duration::from_millis(5), Duration::from_millis(5));
    sim.clock.advance_ms(20);
    assert_eq!(drain(&sim, &mut task), 4);
}

fn speed_up_on_first_tick(fwk: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.ticks += 1;
    if state.ticks == 1 {
        fwk.change_timer_period(msg.dest(), Duration::from_millis(2), Duration::from_millis(2));
    }
    DispatchResult::Ok(msg)
}

#[test]
fn test_handler_changes_its_own_timer_period() {
    let sim = sim();
    let mut task = MsgTask::new(
        FwkId(1),
        16,
        Dispatcher::new().with_handler(MsgCode::PERIODIC, speed_up_on_first_tick),
        Worker::default(),
    )
    .with_timer(Duration::from_millis(10), Duration::from_millis(10));
    sim.fwk.register_task(&task).unwrap();
    sim.fwk.start_timer(FwkId(1));

    sim.clock.advance_ms(10);
    assert_eq!(drain(&sim, &mut task), 1);
    assert_eq!(
        sim.fwk.timer_schedule(FwkId(1)),
        Some((Duration::from_millis(2), Duration::from_millis(2)))
    );

    sim.clock.advance_ms(10);
    assert_eq!(drain(&sim, &mut task), 5);
    assert_eq!(task.state().ticks, 6);
    assert!(sim.fwk.timer_running(FwkId(1)));
    assert_eq!(sim.platform.assertion_count(), 0);
}

fn stop_on_tick(fwk: &Framework, state: &mut Worker, msg: Message) -> DispatchResult {
    state.ticks += 1;
    fwk.stop_timer(msg.dest());
    DispatchResult::Ok(msg)
}

#[test]
fn test_handler_stops_its_own_timer() {
    let sim = sim();
    let mut task = MsgTask::new(
        FwkId(1),
        16,
        Dispatcher::new().with_handler(MsgCode::PERIODIC, stop_on_tick),
        Worker::default(),
    )
    .with_timer(Duration::from_millis(1), Duration::from_millis(1));
    sim.fwk.register_task(&task).unwrap();
    sim.fwk.start_timer(FwkId(1));

    sim.clock.advance_ms(1);
    assert_eq!(drain(&sim, &mut task), 1);
    assert!(!sim.fwk.timer_running(FwkId(1)));
    sim.clock.advance_ms(20);
    assert_eq!(drain(&sim, &mut task), 0);
}

#[test]
fn test_ticks_dropped_when_queue_full() {
    let sim = sim();
    let mut task = timed_task(&sim, 1, 2, 1, 1);
    sim.fwk.start_timer(FwkId(1));
    sim.clock.advance_ms(10);
    assert_eq!(drain(&sim, &mut task), 2);
    assert_eq!(sim.platform.assertion_count(), 0);
    assert_eq!(sim.fwk.pool().live_blocks(), 0);
}

#[test]
fn test_ticks_dropped_when_pool_exhausted() {
    let sim = sim();
    let mut task = timed_task(&sim, 1, 8, 1, 1);
    sim.fwk
        .pool()
        .set_fault_plan(FaultPlan::new().with_alloc_fault(AllocFault::FailAll));
    sim.fwk.start_timer(FwkId(1));
    sim.clock.advance_ms(5);
    assert_eq!(drain(&sim, &mut task), 0);
    assert_eq!(sim.platform.assertion_count(), 0);

    sim.fwk.pool().clear_fault_plan();
    sim.clock.advance_ms(1);
    assert_eq!(drain(&sim, &mut task), 1);
}

#[test]
fn test_timer_of_unregistered_task_asserts() {
    let sim = sim();
    sim.fwk.start_timer(FwkId(5));
    assert_eq!(sim.platform.assertion_count(), 1);
    assert!(!sim.fwk.timer_running(FwkId(5)));
}

#[test]
fn test_registration_of_reserved_id_asserts() {
    let sim = sim();
    let task = MsgTask::new(FwkId::RESERVED, 1, dispatcher(), Worker::default());
    assert!(sim.fwk.register_task(&task).is_err());
    assert_eq!(sim.platform.assertion_count(), 1);
    assert!(sim.fwk.queue_is_empty(FwkId::RESERVED));
}
