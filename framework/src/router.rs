//! Routing and the receive loop
//!
//! ## Ownership
//!
//! Every routing call consumes its [`Message`]. On success the framework
//! (and then the receiving task) owns it. On failure the call returns a
//! [`Rejected`] that carries the message back to the caller.
//!
//! [`Framework::broadcast`] is the one asymmetric case: when every copy is
//! delivered the router frees the original itself, but on any failure, or
//! when nobody claims the code, the original comes back in the error.
//! Copies that were already delivered stay delivered.

use crate::dispatch::{DispatchStatus, Dispatcher};
use crate::error::{Rejected, RouteError};
use crate::registry::Receiver;
use crate::Framework;
use core_types::FwkId;
use hal::{fwk_assert, ExecContext, Timeout};
use ipc::{Message, MsgQueue};

/// What one pass of the receive loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Nothing arrived before the receive timeout
    Idle,
    /// A handler ran
    Dispatched(DispatchStatus),
    /// No handler for the code; the unknown-message handler ran
    Unknown(DispatchStatus),
}

impl Framework {
    /// Sends `msg` to receiver `dest` without waiting
    ///
    /// The message is untouched when `dest` is not registered.
    pub fn send(&self, dest: FwkId, mut msg: Message) -> Result<(), Rejected> {
        let Some(receiver) = self.registry().get(dest) else {
            return Err(Rejected::new(RouteError::UnknownReceiver(dest), msg));
        };
        msg.set_dest(dest);
        self.queue(
            receiver.queue().as_ref(),
            msg,
            Timeout::NoWait,
            ExecContext::Thread,
        )
    }

    /// Sends `msg` to the lowest-id receiver that handles its code
    ///
    /// Codes handled by several receivers always go to the lowest id, so
    /// unicast is only meaningful for codes with a single owner.
    pub fn unicast(&self, mut msg: Message) -> Result<(), Rejected> {
        let code = msg.code();
        let Some(receiver) = self.registry().first_claimant(code) else {
            return Err(Rejected::new(RouteError::NoClaimant(code), msg));
        };
        msg.set_dest(receiver.id());
        self.queue(
            receiver.queue().as_ref(),
            msg,
            Timeout::NoWait,
            ExecContext::Thread,
        )
    }

    /// Copies the first `msg_size` bytes of `msg` to every receiver that
    /// handles its code
    ///
    /// Returns `Ok` and frees `msg` only when at least one receiver claims
    /// the code and every copy was allocated and queued. Otherwise `msg` is
    /// handed back with the first failure.
    pub fn broadcast(
        &self,
        msg: Message,
        msg_size: usize,
        ctx: ExecContext,
    ) -> Result<(), Rejected> {
        if ctx.is_interrupt() && !self.config().allow_broadcast_from_isr {
            fwk_assert!(self.assertions(), FORCED);
            return Err(Rejected::new(RouteError::BroadcastFromIsr, msg));
        }

        let code = msg.code();
        let claimants = self.registry().claimants(code);
        if claimants.is_empty() {
            return Err(Rejected::new(RouteError::NoClaimant(code), msg));
        }

        let mut failure = None;
        for receiver in &claimants {
            let mut copy = match msg.copy_sized(msg_size, ctx) {
                Ok(copy) => copy,
                Err(error) => {
                    failure.get_or_insert(RouteError::CopyFailed {
                        dest: receiver.id(),
                        error,
                    });
                    continue;
                }
            };
            copy.set_dest(receiver.id());
            if let Err(rejected) =
                self.queue(receiver.queue().as_ref(), copy, Timeout::NoWait, ctx)
            {
                failure.get_or_insert(rejected.reason);
            }
        }

        match failure {
            None => {
                drop(msg);
                Ok(())
            }
            Some(reason) => Err(Rejected::new(reason, msg)),
        }
    }

    /// Puts `msg` on `queue`, bypassing the registry
    ///
    /// Interrupt callers never wait. A message with the invalid code fires
    /// the assertion and is rejected.
    pub fn queue(
        &self,
        queue: &dyn MsgQueue,
        msg: Message,
        timeout: Timeout,
        ctx: ExecContext,
    ) -> Result<(), Rejected> {
        if !fwk_assert!(self.assertions(), !msg.code().is_invalid()) {
            return Err(Rejected::new(RouteError::InvalidCode, msg));
        }
        let dest = msg.dest();
        queue
            .put(msg, timeout.in_context(ctx))
            .map_err(|msg| Rejected::new(RouteError::QueueFull(dest), msg))
    }

    /// Takes the next message from `queue`
    ///
    /// Interrupt callers never wait. `None` on timeout.
    pub fn receive(
        &self,
        queue: &dyn MsgQueue,
        timeout: Timeout,
        ctx: ExecContext,
    ) -> Option<Message> {
        queue.get(timeout.in_context(ctx))
    }

    /// One pass of a task's event loop
    ///
    /// Waits for a message, runs its handler, then the message's callback
    /// (when the callback option is set), then frees the message unless the
    /// handler kept it.
    pub fn msg_receiver<S>(
        &self,
        receiver: &Receiver,
        dispatcher: &Dispatcher<S>,
        state: &mut S,
    ) -> ReceiveOutcome {
        let timeout = receiver
            .rx_block()
            .unwrap_or_else(|| self.config().default_rx_block());
        let Some(msg) = self.receive(receiver.queue().as_ref(), timeout, ExecContext::Thread)
        else {
            return ReceiveOutcome::Idle;
        };

        match dispatcher.handler(msg.code()) {
            Some(handler) => {
                let callback = msg.pending_callback();
                let result = handler(self, state, msg);
                if let Some(callback) = callback {
                    callback.invoke();
                }
                ReceiveOutcome::Dispatched(result.status())
            }
            None => {
                let result = (dispatcher.unknown_handler())(self, state, msg);
                ReceiveOutcome::Unknown(result.status())
            }
        }
    }

    /// Checks whether receiver `id` has nothing queued
    ///
    /// Unregistered and out-of-range ids count as empty.
    pub fn queue_is_empty(&self, id: FwkId) -> bool {
        self.registry()
            .get(id)
            .map_or(true, |receiver| receiver.queue().is_empty())
    }

    /// Frees every message waiting for receiver `id`; returns the count
    pub fn flush(&self, id: FwkId) -> usize {
        let Some(receiver) = self.registry().get(id) else {
            return 0;
        };
        let mut flushed = 0;
        while let Some(msg) = receiver.queue().get(Timeout::NoWait) {
            drop(msg);
            flushed += 1;
        }
        log::debug!("flushed {} messages from {}", flushed, id);
        flushed
    }
}
