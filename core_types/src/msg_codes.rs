//! Message codes reserved by the framework.
//!
//! Codes 0 through 7 belong to the framework. Application codes are
//! allocated from [`MsgCode::APPLICATION_START`] upward, usually as
//! associated constants in the application crate:
//!
//! ```
//! use core_types::MsgCode;
//!
//! const SENSOR_READING: MsgCode = MsgCode::application(0);
//! assert_eq!(SENSOR_READING.raw(), 8);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message type carried in the first header byte
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MsgCode(pub u8);

impl MsgCode {
    /// Never queued. A zeroed header carries this code.
    pub const INVALID: MsgCode = MsgCode(0);
    /// Periodic timer tick routed to a task by its own timer.
    pub const PERIODIC: MsgCode = MsgCode(1);
    pub const SOFTWARE_RESET: MsgCode = MsgCode(2);
    pub const WATCHDOG_CHALLENGE: MsgCode = MsgCode(3);
    pub const WATCHDOG_RESPONSE: MsgCode = MsgCode(4);
    pub const ATTR_CHANGED: MsgCode = MsgCode(5);
    pub const FACTORY_RESET: MsgCode = MsgCode(6);
    /// Spare framework code.
    pub const RESERVED_7: MsgCode = MsgCode(7);

    /// First code available to applications.
    pub const APPLICATION_START: MsgCode = MsgCode(8);

    /// Returns the `offset`-th application code
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a const) if the code would not fit in a byte.
    pub const fn application(offset: u8) -> Self {
        match Self::APPLICATION_START.0.checked_add(offset) {
            Some(raw) => Self(raw),
            None => panic!("application message code out of range"),
        }
    }

    /// Returns the raw value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Checks for the reserved invalid code
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID.0
    }

    /// Checks whether the framework owns this code
    pub const fn is_framework(self) -> bool {
        self.0 < Self::APPLICATION_START.0
    }

    /// Short name for framework codes, `None` for application codes
    pub fn framework_name(self) -> Option<&'static str> {
        match self {
            Self::INVALID => Some("invalid"),
            Self::PERIODIC => Some("periodic"),
            Self::SOFTWARE_RESET => Some("software-reset"),
            Self::WATCHDOG_CHALLENGE => Some("watchdog-challenge"),
            Self::WATCHDOG_RESPONSE => Some("watchdog-response"),
            Self::ATTR_CHANGED => Some("attr-changed"),
            Self::FACTORY_RESET => Some("factory-reset"),
            Self::RESERVED_7 => Some("reserved"),
            _ => None,
        }
    }
}

impl From<u8> for MsgCode {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.framework_name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "app({})", self.0),
        }
    }
}
