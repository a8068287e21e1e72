//! # Core Types
//!
//! This crate defines the identifiers shared by every layer of the message
//! framework.
//!
//! ## Philosophy
//!
//! - **Small and dense**: Ids and codes are single bytes so that a message
//!   header stays four bytes and the receiver table can be indexed directly.
//! - **Reserved ranges are explicit**: The framework owns receiver id 0 and
//!   message codes 0 through 7. Applications start above them.
//!
//! ## Key Types
//!
//! - [`FwkId`]: Identifier of a registered receiver (or task)
//! - [`MsgCode`]: Message type carried in every header

pub mod ids;
pub mod msg_codes;

pub use ids::FwkId;
pub use msg_codes::MsgCode;
