//! Async DataLink client built on tokio.
//!
//! Connects to a DataLink ring-buffer server, negotiates capabilities,
//! runs request/acknowledge operations (INFO, MATCH, REJECT, POSITION,
//! READ, WRITE) and drives the STREAM / ENDSTREAM state machine.

pub mod client;
pub mod config;
mod connection;
pub mod error;
mod exchange;
mod negotiate;
pub mod state;
mod stream;

#[cfg(test)]
mod mock;

pub use client::{DataLinkClient, Terminator};
pub use config::{ClientConfig, client_id};
pub use error::{ClientError, ErrorKind, Result};
pub use state::{Collected, Packet, ServerCapabilities, StreamState};
