//! # Bracket Framer
//!
//! Streaming extraction of brace-delimited objects from a byte stream.
//!
//! ## Philosophy
//!
//! - **One byte at a time**: The framer is fed from a UART or similar and
//!   never looks ahead.
//! - **Noise tolerant**: Everything before the first `{` is ignored.
//! - **Bounded**: The capture buffer has a fixed capacity. Overflow drops
//!   the capture and starts over rather than failing the stream.
//!
//! ## Example
//!
//! ```
//! use bracket::{Bracket, BracketStatus};
//!
//! let mut framer = Bracket::new(64);
//! let mut status = BracketStatus::NotStarted;
//! for byte in br#"noise{"a":{"b":2}}"# {
//!     status = framer.compute(*byte);
//! }
//! assert_eq!(status, BracketStatus::Match);
//! assert_eq!(framer.captured(), br#"{"a":{"b":2}}"#);
//! ```

use std::fmt;

/// Out-of-memory code returned by [`BracketStatus::as_code`]
pub const ENOMEM: i32 = 12;

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketStatus {
    /// Depth returned to zero after at least one `{`
    Match,
    /// Capturing; the value is the unmatched depth
    Open(u32),
    /// No `{` seen yet
    NotStarted,
    /// The capture buffer filled before a match; the framer has reset
    OutOfMemory,
}

impl BracketStatus {
    /// Integer form: 0 match, depth while open, 1 not started, `-ENOMEM`
    pub fn as_code(self) -> i32 {
        match self {
            BracketStatus::Match => 0,
            BracketStatus::Open(depth) => depth as i32,
            BracketStatus::NotStarted => 1,
            BracketStatus::OutOfMemory => -ENOMEM,
        }
    }
}

impl fmt::Display for BracketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketStatus::Match => write!(f, "match"),
            BracketStatus::Open(depth) => write!(f, "open({})", depth),
            BracketStatus::NotStarted => write!(f, "not started"),
            BracketStatus::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

/// Brace-matching capture context
#[derive(Debug, Clone)]
pub struct Bracket {
    buffer: Box<[u8]>,
    length: usize,
    delta: i32,
    entered: bool,
    unescape_slash: bool,
}

impl Bracket {
    /// Creates a framer with a `capacity`-byte capture buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity].into_boxed_slice(),
            length: 0,
            delta: 0,
            entered: false,
            unescape_slash: true,
        }
    }

    /// Enables or disables collapsing `\/` to `/` (on by default)
    pub fn with_slash_unescape(mut self, enabled: bool) -> Self {
        self.unescape_slash = enabled;
        self
    }

    /// Discards any capture in progress
    pub fn reset(&mut self) {
        self.entered = false;
        self.length = 0;
        self.delta = 0;
    }

    /// Feeds one byte
    pub fn compute(&mut self, byte: u8) -> BracketStatus {
        if byte == b'{' {
            self.delta += 1;
            self.entered = true;
        }

        if self.entered && self.length < self.buffer.len() {
            if byte == b'}' {
                self.delta -= 1;
            }
            self.buffer[self.length] = byte;
            self.length += 1;

            if self.unescape_slash
                && self.length >= 2
                && self.buffer[self.length - 2] == b'\\'
                && self.buffer[self.length - 1] == b'/'
            {
                self.buffer[self.length - 2] = b'/';
                self.length -= 1;
            }
        }

        if self.is_match() {
            BracketStatus::Match
        } else if self.length == self.buffer.len() {
            log::error!("Not enough memory for bracket handler");
            self.reset();
            BracketStatus::OutOfMemory
        } else if self.entered {
            BracketStatus::Open(self.delta.unsigned_abs())
        } else {
            BracketStatus::NotStarted
        }
    }

    /// Copies the capture into `dest` and returns the captured length
    ///
    /// Pass `None` to query the length. At most `dest.len()` bytes are
    /// written.
    pub fn copy_to(&self, dest: Option<&mut [u8]>) -> usize {
        if let Some(dest) = dest {
            let len = self.length.min(dest.len());
            dest[..len].copy_from_slice(&self.buffer[..len]);
        }
        self.length
    }

    /// The captured bytes
    pub fn captured(&self) -> &[u8] {
        &self.buffer[..self.length]
    }

    pub fn is_match(&self) -> bool {
        self.delta == 0 && self.entered
    }

    pub fn entered(&self) -> bool {
        self.entered
    }

    /// Used length of the capture buffer
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Total capacity of the capture buffer
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
