//! Fire-and-forget message helpers
//!
//! Wrappers around the router for call sites that treat a routing failure
//! as a bug. Each helper frees the message when routing fails and fires
//! the framework assertion, except [`try_to_send`] (a full queue is
//! expected) and [`create_and_broadcast`] (nobody listening is fine).
//! The error is still returned so callers can log or count it.

use crate::error::{Rejected, RouteError};
use crate::registry::Receiver;
use crate::Framework;
use core_types::{FwkId, MsgCode};
use hal::{fwk_assert, ExecContext, Timeout};
use ipc::{Message, HEADER_SIZE};

fn settle(fwk: &Framework, result: Result<(), Rejected>, assert: bool) -> Result<(), RouteError> {
    let Err(rejected) = result else {
        return Ok(());
    };
    let Rejected { reason, message } = rejected;
    log::warn!("{} not routed: {}", message, reason);
    drop(message);
    if assert {
        fwk_assert!(fwk.assertions(), FORCED);
    }
    Err(reason)
}

fn take(fwk: &Framework, code: MsgCode, src: FwkId) -> Result<Message, RouteError> {
    // `take` already fired the assertion on failure.
    Message::take(fwk.pool(), code, src).ok_or(RouteError::AllocFailed)
}

/// Stamps code and source; clears the destination
pub fn header_init(msg: &mut Message, code: MsgCode, src: FwkId) {
    msg.set_code(code);
    msg.set_dest(FwkId::RESERVED);
    msg.set_src(src);
}

/// Sends to the destination already in the header
pub fn send(fwk: &Framework, msg: Message) -> Result<(), RouteError> {
    let dest = msg.dest();
    settle(fwk, fwk.send(dest, msg), true)
}

/// Like [`send`] without the assertion
pub fn try_to_send(fwk: &Framework, msg: Message) -> Result<(), RouteError> {
    let dest = msg.dest();
    settle(fwk, fwk.send(dest, msg), false)
}

/// Sets the destination, then sends
pub fn send_to(fwk: &Framework, mut msg: Message, dest: FwkId) -> Result<(), RouteError> {
    msg.set_dest(dest);
    settle(fwk, fwk.send(dest, msg), true)
}

pub fn unicast(fwk: &Framework, msg: Message) -> Result<(), RouteError> {
    settle(fwk, fwk.unicast(msg), true)
}

/// Allocates a header-only message and sends it to `dest`
pub fn create_and_send(
    fwk: &Framework,
    src: FwkId,
    dest: FwkId,
    code: MsgCode,
) -> Result<(), RouteError> {
    let msg = take(fwk, code, src)?;
    settle(fwk, fwk.send(dest, msg), true)
}

/// [`create_and_send`] with source and destination both `id`
pub fn create_and_send_to_self(fwk: &Framework, id: FwkId, code: MsgCode) -> Result<(), RouteError> {
    create_and_send(fwk, id, id, code)
}

/// Allocates a header-only message and unicasts it
pub fn unicast_create_and_send(fwk: &Framework, src: FwkId, code: MsgCode) -> Result<(), RouteError> {
    let msg = take(fwk, code, src)?;
    settle(fwk, fwk.unicast(msg), true)
}

/// Allocates a header-only message and broadcasts it
///
/// The calling context is taken from the platform.
pub fn create_and_broadcast(fwk: &Framework, src: FwkId, code: MsgCode) -> Result<(), RouteError> {
    let msg = take(fwk, code, src)?;
    settle(fwk, fwk.broadcast(msg, HEADER_SIZE, fwk.exec_context()), false)
}

/// Answers `msg`: swaps source and destination, sets `code`, sends
///
/// The original sender must have filled in its source id. Handlers
/// usually reply and then return
/// [`DispatchResult::DoNotFree`](crate::DispatchResult::DoNotFree).
pub fn reply(fwk: &Framework, mut msg: Message, code: MsgCode) -> Result<(), RouteError> {
    let (src, dest) = (msg.src(), msg.dest());
    msg.set_dest(src);
    msg.set_src(dest);
    msg.set_code(code);
    settle(fwk, fwk.send(src, msg), true)
}

/// Puts a header-only message on the receiver's own queue, bypassing the
/// registry
pub fn send_direct_to_self(fwk: &Framework, receiver: &Receiver, code: MsgCode) -> Result<(), RouteError> {
    let mut msg = take(fwk, code, receiver.id())?;
    msg.set_dest(receiver.id());
    let result = fwk.queue(
        receiver.queue().as_ref(),
        msg,
        Timeout::NoWait,
        ExecContext::Thread,
    );
    settle(fwk, result, true)
}
