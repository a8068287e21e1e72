//! Concurrent Producer Tests
//!
//! Several threads feed one task through a shallow queue. Every message
//! must arrive exactly once, in order per producer, and the pool must end
//! empty.

use core_types::{FwkId, MsgCode};
use framework::{DispatchResult, Dispatcher, Framework, MsgTask, RouteError};
use ipc::{ExecContext, Message, MsgHeader, Timeout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tests_resilience::test_bootstrap;

const SAMPLE: MsgCode = MsgCode::application(0);
const CONSUMER: FwkId = FwkId(1);
const PRODUCERS: u8 = 4;
const PER_PRODUCER: u32 = 200;

#[derive(Default)]
struct Tally {
    received: u32,
    next_seq: [u32; 32],
    out_of_order: u32,
}

fn on_sample(_: &Framework, tally: &mut Tally, msg: Message) -> DispatchResult {
    let mut seq = [0u8; 4];
    seq.copy_from_slice(&msg.buffer()[..4]);
    let seq = u32::from_le_bytes(seq);
    let expected = &mut tally.next_seq[msg.src().index()];
    if seq != *expected {
        tally.out_of_order += 1;
    }
    *expected = seq + 1;
    tally.received += 1;
    DispatchResult::Ok(msg)
}

fn produce(fwk: &Framework, src: FwkId) {
    for seq in 0..PER_PRODUCER {
        let mut msg = Message::allocate(
            fwk.pool(),
            MsgHeader::new(SAMPLE, src),
            4,
            Timeout::Forever,
            ExecContext::Thread,
        )
        .unwrap();
        msg.write(&seq.to_le_bytes());

        // Spin on a full queue, resending the message we got back.
        loop {
            match fwk.send(CONSUMER, msg) {
                Ok(()) => break,
                Err(rejected) => {
                    assert_eq!(rejected.reason, RouteError::QueueFull(CONSUMER));
                    msg = rejected.into_message();
                    thread::yield_now();
                }
            }
        }
    }
}

#[test]
fn test_producers_deliver_everything_in_order() {
    let system = test_bootstrap(4096);
    let mut consumer = MsgTask::new(
        CONSUMER,
        8,
        Dispatcher::new().with_handler(SAMPLE, on_sample),
        Tally::default(),
    )
    .with_rx_block(Timeout::millis(5));
    system.fwk.register_task(&consumer).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let consumer_thread = {
        let fwk = system.fwk.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            consumer.run(&fwk, &stop);
            consumer
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|n| {
            let fwk = system.fwk.clone();
            thread::spawn(move || produce(&fwk, FwkId(10 + n)))
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    while !system.fwk.queue_is_empty(CONSUMER) {
        thread::yield_now();
    }
    stop.store(true, Ordering::Release);
    let tally = consumer_thread.join().unwrap().into_state();

    assert_eq!(tally.received, u32::from(PRODUCERS) * PER_PRODUCER);
    assert_eq!(tally.out_of_order, 0);
    system.assert_quiescent();
}

#[test]
fn test_blocking_allocation_waits_for_consumer() {
    // Room for a handful of messages only; producers must wait on frees.
    let system = test_bootstrap(128);
    let mut consumer = MsgTask::new(
        CONSUMER,
        2,
        Dispatcher::new().with_handler(SAMPLE, on_sample),
        Tally::default(),
    )
    .with_rx_block(Timeout::millis(5));
    system.fwk.register_task(&consumer).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let consumer_thread = {
        let fwk = system.fwk.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            consumer.run(&fwk, &stop);
            consumer
        })
    };

    let producers: Vec<_> = (0..2)
        .map(|n| {
            let fwk = system.fwk.clone();
            thread::spawn(move || produce(&fwk, FwkId(20 + n)))
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    while !system.fwk.queue_is_empty(CONSUMER) {
        thread::yield_now();
    }
    stop.store(true, Ordering::Release);
    let tally = consumer_thread.join().unwrap().into_state();

    assert_eq!(tally.received, 2 * PER_PRODUCER);
    assert_eq!(tally.out_of_order, 0);
    let stats = system.fwk.pool().stats(0).unwrap();
    assert_eq!(stats.cur_allocs, 0);
    assert!(stats.max_allocs <= 128 / (4 + 4 + buffer_pool::BLOCK_HEADER_SIZE));
    system.assert_quiescent();
}
