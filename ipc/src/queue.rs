//! Bounded message queues
//!
//! The framework only needs FIFO order, a put/get pair with a timeout and
//! a count of queued messages. [`MsgQueue`] is that contract;
//! [`BoundedQueue`] is the stock implementation on a crossbeam channel.

use crate::message::Message;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use hal::Timeout;
use std::fmt;

/// Queue collaborator used by the router
///
/// Implementations must be safe to call from any thread and must not block
/// when given [`Timeout::NoWait`].
pub trait MsgQueue: Send + Sync {
    /// Enqueues `msg`, handing it back if the queue stayed full
    fn put(&self, msg: Message, timeout: Timeout) -> Result<(), Message>;

    /// Dequeues the oldest message, `None` on timeout
    fn get(&self, timeout: Timeout) -> Option<Message>;

    /// Number of queued messages
    fn used(&self) -> usize;

    /// Returns whether the queue is empty.
    fn is_empty(&self) -> bool {
        self.used() == 0
    }
}

/// Fixed-depth FIFO queue
pub struct BoundedQueue {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    capacity: usize,
}

impl BoundedQueue {
    /// Creates a queue holding at most `capacity` messages (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = channel::bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns remaining capacity.
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.tx.len())
    }
}

impl MsgQueue for BoundedQueue {
    fn put(&self, msg: Message, timeout: Timeout) -> Result<(), Message> {
        match timeout {
            Timeout::NoWait => self.tx.try_send(msg).map_err(|err| match err {
                TrySendError::Full(msg) | TrySendError::Disconnected(msg) => msg,
            }),
            Timeout::After(wait) => self.tx.send_timeout(msg, wait).map_err(|err| match err {
                SendTimeoutError::Timeout(msg) | SendTimeoutError::Disconnected(msg) => msg,
            }),
            Timeout::Forever => self.tx.send(msg).map_err(|err| err.into_inner()),
        }
    }

    fn get(&self, timeout: Timeout) -> Option<Message> {
        match timeout {
            Timeout::NoWait => self.rx.try_recv().ok(),
            Timeout::After(wait) => match self.rx.recv_timeout(wait) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
            },
            Timeout::Forever => self.rx.recv().ok(),
        }
    }

    fn used(&self) -> usize {
        self.rx.len()
    }
}

impl fmt::Debug for BoundedQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("used", &self.used())
            .finish()
    }
}
