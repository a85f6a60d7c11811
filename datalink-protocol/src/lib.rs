//! DataLink protocol types, commands, and frame parsing.
//!
//! This crate provides the I/O-free protocol layer for DataLink: the
//! `"DL"` frame codec, command headers, reply and packet header parsing,
//! and stream identifiers.

pub mod command;
pub mod error;
pub mod frame;
pub mod packet;
pub mod packet_id;
pub mod response;
pub mod stream_id;

pub use command::Command;
pub use error::{DataLinkError, Result};
pub use frame::{MAX_HEADER_LEN, MAX_PACKET_SIZE};
pub use packet::PacketHeader;
pub use packet_id::PacketId;
pub use response::{Reply, Response};
pub use stream_id::StreamId;
