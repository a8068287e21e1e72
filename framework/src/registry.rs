//! # Receiver Registry
//!
//! Fixed table from receiver id to [`Receiver`].
//!
//! The table is sized to the largest id up front so a lookup is a single
//! index. Writes happen only during start-up registration; routing reads
//! it from any thread or interrupt callback.

use crate::dispatch::Dispatch;
use crate::error::RegistryError;
use core_types::{FwkId, MsgCode};
use hal::Timeout;
use ipc::MsgQueue;
use spin::RwLock;
use std::fmt;
use std::sync::Arc;

/// One addressable endpoint
#[derive(Clone)]
pub struct Receiver {
    id: FwkId,
    queue: Arc<dyn MsgQueue>,
    rx_block: Option<Timeout>,
    dispatch: Arc<dyn Dispatch>,
}

impl Receiver {
    /// Creates a receiver using the framework's default receive timeout
    pub fn new(id: FwkId, queue: Arc<dyn MsgQueue>, dispatch: Arc<dyn Dispatch>) -> Self {
        Self {
            id,
            queue,
            rx_block: None,
            dispatch,
        }
    }

    /// Sets how long the receive loop waits for a message
    pub fn with_rx_block(mut self, rx_block: Timeout) -> Self {
        self.rx_block = Some(rx_block);
        self
    }

    pub fn id(&self) -> FwkId {
        self.id
    }

    pub fn queue(&self) -> &Arc<dyn MsgQueue> {
        &self.queue
    }

    /// Configured receive timeout, if any
    pub fn rx_block(&self) -> Option<Timeout> {
        self.rx_block
    }

    /// Asks the receiver's dispatcher whether it handles `code`
    pub fn claims(&self, code: MsgCode) -> bool {
        self.dispatch.claims(code)
    }
}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("id", &self.id)
            .field("queued", &self.queue.used())
            .field("rx_block", &self.rx_block)
            .finish()
    }
}

/// Id-indexed receiver table
pub struct Registry {
    slots: RwLock<Vec<Option<Receiver>>>,
}

impl Registry {
    /// Creates a table for ids below `max_receivers`
    pub fn new(max_receivers: usize) -> Self {
        Self {
            slots: RwLock::new(vec![None; max_receivers]),
        }
    }

    /// Stores `receiver` in the slot named by its id
    pub fn register(&self, receiver: Receiver) -> Result<(), RegistryError> {
        let id = receiver.id();
        let mut slots = self.slots.write();
        let max = slots.len();
        if id.is_reserved() || id.index() >= max {
            return Err(RegistryError::IdOutOfRange { id, max });
        }
        let slot = &mut slots[id.index()];
        if slot.is_some() {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        *slot = Some(receiver);
        Ok(())
    }

    /// Looks up a receiver by id
    pub fn get(&self, id: FwkId) -> Option<Receiver> {
        self.slots.read().get(id.index()).cloned().flatten()
    }

    /// Checks whether `id` is registered
    pub fn contains(&self, id: FwkId) -> bool {
        matches!(self.slots.read().get(id.index()), Some(Some(_)))
    }

    /// Lowest-id application receiver that claims `code`
    pub fn first_claimant(&self, code: MsgCode) -> Option<Receiver> {
        self.slots
            .read()
            .iter()
            .skip(FwkId::APPLICATION_START.index())
            .flatten()
            .find(|receiver| receiver.claims(code))
            .cloned()
    }

    /// Every application receiver that claims `code`, ascending by id
    pub fn claimants(&self, code: MsgCode) -> Vec<Receiver> {
        self.slots
            .read()
            .iter()
            .skip(FwkId::APPLICATION_START.index())
            .flatten()
            .filter(|receiver| receiver.claims(code))
            .cloned()
            .collect()
    }

    /// Table size
    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    /// Number of registered receivers
    pub fn len(&self) -> usize {
        self.slots.read().iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("capacity", &self.capacity())
            .field("registered", &self.len())
            .finish()
    }
}
