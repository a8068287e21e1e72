//! Framework error types

use buffer_pool::PoolError;
use core_types::{FwkId, MsgCode};
use ipc::Message;
use thiserror::Error;

/// Why a message could not be routed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No receiver registered under this id
    #[error("no receiver registered as {0}")]
    UnknownReceiver(FwkId),

    /// Destination queue stayed full
    #[error("queue of {0} is full")]
    QueueFull(FwkId),

    /// No receiver handles this code
    #[error("no receiver handles {0}")]
    NoClaimant(MsgCode),

    /// Message carries the invalid code
    #[error("message code is invalid")]
    InvalidCode,

    /// Broadcast attempted from interrupt context
    #[error("broadcast from interrupt context")]
    BroadcastFromIsr,

    /// A broadcast copy could not be allocated
    #[error("could not copy message for {dest}: {error}")]
    CopyFailed { dest: FwkId, error: PoolError },

    /// A helper could not allocate the message it was asked to send
    #[error("message allocation failed")]
    AllocFailed,
}

/// A routing failure that hands the message back
///
/// The caller owns `message` again and decides whether to retry or drop.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Rejected {
    pub reason: RouteError,
    pub message: Message,
}

impl Rejected {
    pub fn new(reason: RouteError, message: Message) -> Self {
        Self { reason, message }
    }

    pub fn reason(&self) -> &RouteError {
        &self.reason
    }

    /// Takes the message back
    pub fn into_message(self) -> Message {
        self.message
    }
}

/// Receiver registration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Id is reserved or not below the table size
    #[error("receiver id {id} outside 1..{max}")]
    IdOutOfRange { id: FwkId, max: usize },

    /// Slot already taken
    #[error("receiver id {0} already registered")]
    AlreadyRegistered(FwkId),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
