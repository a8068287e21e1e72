//! Receiver identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a message receiver
///
/// Ids are dense and assigned at build time. They index the receiver table
/// directly, so the largest id in use bounds the table size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct FwkId(pub u8);

impl FwkId {
    /// "No task". Never registered, never a unicast target.
    pub const RESERVED: FwkId = FwkId(0);

    /// First id available to applications.
    pub const APPLICATION_START: FwkId = FwkId(1);

    /// Creates an id from its raw value
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns the id as a table index
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks whether this is the framework-reserved id
    pub const fn is_reserved(self) -> bool {
        self.0 == Self::RESERVED.0
    }
}

impl From<u8> for FwkId {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for FwkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rx({})", self.0)
    }
}
