//! # Inter-Task Communication (IPC)
//!
//! This crate defines the message and queue primitives the framework moves
//! between tasks.
//!
//! ## Philosophy
//!
//! - **Messages are owned**: A [`Message`] is a move-only handle to pool
//!   memory. Whoever holds it is responsible for it; dropping it frees it.
//! - **Fixed header, flat memory**: Every message starts with the same
//!   four-byte header (code, destination, source, options) followed by an
//!   optional payload in the same block.
//! - **Bounded queues**: Queues have a fixed depth. A full queue hands the
//!   message back instead of growing.
//!
//! ## Architecture
//!
//! A producer allocates a message from a
//! [`BufferPool`](buffer_pool::BufferPool), stamps the header and puts it
//! on a [`MsgQueue`]. The consumer gets it, dispatches on the code and
//! drops it (or keeps it, which is the same as taking ownership).

pub mod message;
pub mod queue;

pub use hal::{ExecContext, Timeout};
pub use message::{Message, MsgCallback, MsgHeader, Payload, HEADER_SIZE, OPTION_CALLBACK};
pub use queue::{BoundedQueue, MsgQueue};
