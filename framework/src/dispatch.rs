//! Handler tables
//!
//! Each receiver owns a [`Dispatcher`] mapping message codes to handlers.
//! The router only ever asks a dispatcher whether it *claims* a code
//! (through [`Dispatch`]); the receive loop is the one place a handler is
//! actually called.

use crate::Framework;
use core_types::MsgCode;
use hal::fwk_assert;
use ipc::Message;
use std::fmt;

/// What a handler did with its message
pub enum DispatchResult {
    /// Handled; the receive loop frees the message
    Ok(Message),
    /// Handling failed; the receive loop still frees the message
    Error(Message),
    /// The handler kept the message (stored or forwarded it)
    DoNotFree,
}

impl DispatchResult {
    pub fn status(&self) -> DispatchStatus {
        match self {
            DispatchResult::Ok(_) => DispatchStatus::Ok,
            DispatchResult::Error(_) => DispatchStatus::Error,
            DispatchResult::DoNotFree => DispatchStatus::DoNotFree,
        }
    }
}

impl fmt::Debug for DispatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchResult::Ok(msg) => f.debug_tuple("Ok").field(msg).finish(),
            DispatchResult::Error(msg) => f.debug_tuple("Error").field(msg).finish(),
            DispatchResult::DoNotFree => f.write_str("DoNotFree"),
        }
    }
}

/// [`DispatchResult`] without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStatus {
    Ok,
    Error,
    DoNotFree,
}

/// Message handler for a task with state `S`
pub type Handler<S> = fn(&Framework, &mut S, Message) -> DispatchResult;

/// Code-claim lookup used for unicast and broadcast
pub trait Dispatch: Send + Sync {
    /// Checks whether a handler is registered for `code`
    fn claims(&self, code: MsgCode) -> bool;
}

/// Code-to-handler table
///
/// Lookup is a direct index by code, so the cost does not grow with the
/// number of handlers.
pub struct Dispatcher<S> {
    handlers: Vec<Option<Handler<S>>>,
    unknown: Handler<S>,
}

impl<S> Dispatcher<S> {
    /// Creates an empty table with the asserting unknown-message handler
    pub fn new() -> Self {
        Self {
            handlers: vec![None; usize::from(u8::MAX) + 1],
            unknown: unknown_msg_handler::<S>,
        }
    }

    /// Adds a handler for `code`
    pub fn with_handler(mut self, code: MsgCode, handler: Handler<S>) -> Self {
        self.register(code, handler);
        self
    }

    /// Replaces the handler for messages nobody claims
    pub fn with_unknown_handler(mut self, handler: Handler<S>) -> Self {
        self.unknown = handler;
        self
    }

    /// Adds or replaces a handler
    pub fn register(&mut self, code: MsgCode, handler: Handler<S>) {
        self.handlers[usize::from(code.raw())] = Some(handler);
    }

    /// Looks up the handler for `code`
    pub fn handler(&self, code: MsgCode) -> Option<Handler<S>> {
        self.handlers[usize::from(code.raw())]
    }

    pub fn unknown_handler(&self) -> Handler<S> {
        self.unknown
    }

    /// Codes with a registered handler, ascending
    pub fn codes(&self) -> impl Iterator<Item = MsgCode> + '_ {
        self.handlers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_some())
            .map(|(code, _)| MsgCode(code as u8))
    }
}

impl<S> Default for Dispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Dispatch for Dispatcher<S> {
    fn claims(&self, code: MsgCode) -> bool {
        self.handler(code).is_some()
    }
}

impl<S> fmt::Debug for Dispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("codes", &self.codes().collect::<Vec<_>>())
            .finish()
    }
}

/// Default handler for codes without a handler: fires the assertion
pub fn unknown_msg_handler<S>(fwk: &Framework, _state: &mut S, msg: Message) -> DispatchResult {
    log::error!("unknown message {} at {}", msg.code(), msg.dest());
    fwk_assert!(fwk.assertions(), FORCED);
    DispatchResult::Error(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &Framework, count: &mut u32, msg: Message) -> DispatchResult {
        *count += 1;
        DispatchResult::Ok(msg)
    }

    #[test]
    fn test_claims_registered_codes_only() {
        let dispatcher = Dispatcher::<u32>::new().with_handler(MsgCode::application(1), ok);
        assert!(dispatcher.claims(MsgCode::application(1)));
        assert!(!dispatcher.claims(MsgCode::application(2)));
        assert!(!dispatcher.claims(MsgCode::INVALID));
    }

    #[test]
    fn test_codes_listing() {
        let dispatcher = Dispatcher::<u32>::new()
            .with_handler(MsgCode::application(3), ok)
            .with_handler(MsgCode::PERIODIC, ok);
        let codes: Vec<MsgCode> = dispatcher.codes().collect();
        assert_eq!(codes, vec![MsgCode::PERIODIC, MsgCode::application(3)]);
    }

    #[test]
    fn test_highest_code_is_addressable() {
        let mut dispatcher = Dispatcher::<u32>::new();
        dispatcher.register(MsgCode(u8::MAX), ok);
        assert!(dispatcher.claims(MsgCode(u8::MAX)));
    }

    #[test]
    fn test_status() {
        assert_eq!(DispatchResult::DoNotFree.status(), DispatchStatus::DoNotFree);
    }
}
