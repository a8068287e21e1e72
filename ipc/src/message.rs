//! Message handle and header layout

use buffer_pool::{Block, BlockHandle, BufferPool, PoolError};
use core_types::{FwkId, MsgCode};
use hal::{ExecContext, Timeout};
use std::fmt;

/// Bytes of header at the start of every message
pub const HEADER_SIZE: usize = 4;

/// Option bit: run the embedded callback after the handler
pub const OPTION_CALLBACK: u8 = 1 << 0;

const CODE: usize = 0;
const DEST: usize = 1;
const SRC: usize = 2;
const OPTIONS: usize = 3;

/// Decoded message header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MsgHeader {
    pub code: MsgCode,
    pub dest: FwkId,
    pub src: FwkId,
    pub options: u8,
}

impl MsgHeader {
    /// Creates a header with no destination and no options
    pub const fn new(code: MsgCode, src: FwkId) -> Self {
        Self {
            code,
            dest: FwkId::RESERVED,
            src,
            options: 0,
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        [self.code.raw(), self.dest.raw(), self.src.raw(), self.options]
    }

    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            code: MsgCode(bytes[CODE]),
            dest: FwkId(bytes[DEST]),
            src: FwkId(bytes[SRC]),
            options: bytes[OPTIONS],
        }
    }
}

/// Deferred work carried by a message
///
/// The receive loop calls `callback(arg)` after the handler returns when
/// the message has [`OPTION_CALLBACK`] set.
#[derive(Debug, Clone, Copy)]
pub struct MsgCallback {
    pub callback: fn(u32),
    pub arg: u32,
}

impl MsgCallback {
    pub const fn new(callback: fn(u32), arg: u32) -> Self {
        Self { callback, arg }
    }

    pub fn invoke(&self) {
        (self.callback)(self.arg)
    }
}

/// View of what follows the header
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    /// Header only
    Empty,
    /// Variable-length data; `data` is the used part of the buffer
    Buffer { data: &'a [u8], capacity: usize },
    /// Callback payload
    Callback(MsgCallback),
}

/// A framework message
///
/// Move-only: the value is the ownership token for its pool block.
/// Dropping it frees the block. Routing calls that fail hand it back.
pub struct Message {
    block: Block,
    used: usize,
    callback: Option<MsgCallback>,
}

impl Message {
    /// Allocates a message with room for `capacity` payload bytes
    ///
    /// Blocking and interrupt rules are those of
    /// [`BufferPool::allocate`].
    pub fn allocate(
        pool: &BufferPool,
        header: MsgHeader,
        capacity: usize,
        timeout: Timeout,
        ctx: ExecContext,
    ) -> Result<Self, PoolError> {
        let block = pool.allocate(HEADER_SIZE + capacity, timeout, ctx, "message")?;
        let mut msg = Self {
            block,
            used: 0,
            callback: None,
        };
        msg.set_header(header);
        Ok(msg)
    }

    /// Non-blocking allocation of a header-only message
    pub fn new(pool: &BufferPool, code: MsgCode, src: FwkId) -> Option<Self> {
        Self::allocate(
            pool,
            MsgHeader::new(code, src),
            0,
            Timeout::NoWait,
            ExecContext::Thread,
        )
        .ok()
    }

    /// Non-blocking allocation of a message with a payload buffer
    pub fn with_capacity(
        pool: &BufferPool,
        code: MsgCode,
        src: FwkId,
        capacity: usize,
    ) -> Option<Self> {
        Self::allocate(
            pool,
            MsgHeader::new(code, src),
            capacity,
            Timeout::NoWait,
            ExecContext::Thread,
        )
        .ok()
    }

    /// Header-only message taken with [`BufferPool::take`]
    ///
    /// Allocation failure fires the framework assertion (once).
    pub fn take(pool: &BufferPool, code: MsgCode, src: FwkId) -> Option<Self> {
        let block = pool.take(HEADER_SIZE)?;
        let mut msg = Self {
            block,
            used: 0,
            callback: None,
        };
        msg.set_header(MsgHeader::new(code, src));
        Some(msg)
    }

    /// Wraps a raw block, reading the header from its first bytes
    ///
    /// Hands the block back when it is too short for a header.
    pub fn from_block(block: Block) -> Result<Self, Block> {
        if block.len() < HEADER_SIZE {
            return Err(block);
        }
        Ok(Self {
            block,
            used: 0,
            callback: None,
        })
    }

    /// Attaches a callback payload and sets [`OPTION_CALLBACK`]
    pub fn with_callback(mut self, callback: MsgCallback) -> Self {
        self.callback = Some(callback);
        self.block[OPTIONS] |= OPTION_CALLBACK;
        self
    }

    pub fn header(&self) -> MsgHeader {
        MsgHeader::from_bytes([
            self.block[CODE],
            self.block[DEST],
            self.block[SRC],
            self.block[OPTIONS],
        ])
    }

    pub fn set_header(&mut self, header: MsgHeader) {
        self.block[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn code(&self) -> MsgCode {
        MsgCode(self.block[CODE])
    }

    pub fn set_code(&mut self, code: MsgCode) {
        self.block[CODE] = code.raw();
    }

    pub fn dest(&self) -> FwkId {
        FwkId(self.block[DEST])
    }

    pub fn set_dest(&mut self, dest: FwkId) {
        self.block[DEST] = dest.raw();
    }

    pub fn src(&self) -> FwkId {
        FwkId(self.block[SRC])
    }

    pub fn set_src(&mut self, src: FwkId) {
        self.block[SRC] = src.raw();
    }

    pub fn options(&self) -> u8 {
        self.block[OPTIONS]
    }

    pub fn set_options(&mut self, options: u8) {
        self.block[OPTIONS] = options;
    }

    /// Checks the callback option bit
    pub fn has_callback(&self) -> bool {
        self.options() & OPTION_CALLBACK != 0
    }

    /// The callback to run after dispatch, if the option bit is set
    pub fn pending_callback(&self) -> Option<MsgCallback> {
        if self.has_callback() {
            self.callback
        } else {
            None
        }
    }

    /// Payload bytes available after the header
    pub fn capacity(&self) -> usize {
        self.block.len() - HEADER_SIZE
    }

    /// Payload bytes in use
    pub fn used(&self) -> usize {
        self.used
    }

    /// Sets the used length, clamped to the capacity
    pub fn set_used(&mut self, used: usize) {
        self.used = used.min(self.capacity());
    }

    /// Copies `data` into the payload and returns the bytes written
    pub fn write(&mut self, data: &[u8]) -> usize {
        let len = data.len().min(self.capacity());
        self.block[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(&data[..len]);
        self.used = len;
        len
    }

    /// The whole payload area
    pub fn buffer(&self) -> &[u8] {
        &self.block[HEADER_SIZE..]
    }

    /// Mutable payload area; call [`Message::set_used`] afterwards
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.block[HEADER_SIZE..]
    }

    /// Views the payload
    ///
    /// A callback is only reported while the callback option bit is set.
    pub fn payload(&self) -> Payload<'_> {
        if let Some(callback) = self.pending_callback() {
            return Payload::Callback(callback);
        }
        if self.capacity() == 0 {
            return Payload::Empty;
        }
        Payload::Buffer {
            data: &self.buffer()[..self.used],
            capacity: self.capacity(),
        }
    }

    /// The full in-memory image, header first
    pub fn as_bytes(&self) -> &[u8] {
        &self.block
    }

    /// Size of the block, header included
    pub fn size(&self) -> usize {
        self.block.len()
    }

    /// Pool identity of the underlying block
    pub fn handle(&self) -> BlockHandle {
        self.block.handle()
    }

    /// The pool this message was taken from
    pub fn pool(&self) -> BufferPool {
        self.block.pool()
    }

    /// Copies the first `size` bytes into a fresh block from the same pool
    ///
    /// `size` is raised to [`HEADER_SIZE`] if smaller. Bytes beyond the
    /// original block stay zero. Never waits.
    pub fn copy_sized(&self, size: usize, ctx: ExecContext) -> Result<Self, PoolError> {
        let size = size.max(HEADER_SIZE);
        let mut block = self
            .block
            .pool()
            .allocate(size, Timeout::NoWait, ctx, "message copy")?;
        let len = size.min(self.block.len());
        block[..len].copy_from_slice(&self.block[..len]);
        Ok(Self {
            block,
            used: self.used.min(size - HEADER_SIZE),
            callback: self.callback,
        })
    }

    /// Gives up the message and returns its block
    pub fn into_block(self) -> Block {
        self.block
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("header", &self.header())
            .field("used", &self.used)
            .field("block", &self.block.handle())
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.code(), self.src(), self.dest())
    }
}
