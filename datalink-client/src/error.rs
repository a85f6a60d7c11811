use std::time::Duration;

use datalink_rs_protocol::DataLinkError;

/// Errors that can occur during DataLink client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// TCP connect or socket setup error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing a frame to the server failed. The connection must be re-established.
    #[error("send error: {0}")]
    Send(std::io::Error),

    /// Reading from the server failed.
    #[error("receive error: {0}")]
    Recv(std::io::Error),

    /// A declared payload could not be read in full.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes the header declared.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// DataLink protocol parsing error (invalid sync, malformed reply, etc.).
    #[error("protocol error: {0}")]
    Protocol(#[from] DataLinkError),

    /// An I/O operation exceeded the configured timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Server closed the connection (read returned 0 bytes).
    #[error("disconnected")]
    Disconnected,

    /// Operation requires a connection but the client is not connected.
    #[error("not connected")]
    NotConnected,

    /// Method called in the wrong streaming state (e.g., `read` while streaming).
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        /// The state(s) required for the operation.
        expected: &'static str,
        /// The current streaming state.
        actual: &'static str,
    },

    /// Caller-supplied argument rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server did not identify itself as a DataLink server.
    #[error("not a DataLink server: {0:?}")]
    NoDataLinkId(String),

    /// Server returned an ERROR reply to a command.
    #[error("server error: {0}")]
    ServerError(String),
}

/// Protocol-level classification of a [`ClientError`].
///
/// Mirrors the error vocabulary of the DataLink protocol; the non-error
/// outcomes (success, no data available) are `Ok` values instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Eof,
    InvalidHeaderLength,
    InvalidSync,
    InvalidArgument,
    InvalidResponse,
    NoDataLinkId,
    NoSocket,
    NoSync,
    RecvError,
    SendError,
    SocketTimeout,
    StreamingError,
}

impl ClientError {
    /// Returns the protocol error kind for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::NoSocket,
            Self::Send(_) => ErrorKind::SendError,
            Self::Recv(_) | Self::ShortRead { .. } => ErrorKind::RecvError,
            Self::Protocol(e) => match e {
                DataLinkError::FrameTooShort { .. } => ErrorKind::NoSync,
                DataLinkError::InvalidSync { .. } => ErrorKind::InvalidSync,
                DataLinkError::InvalidHeaderLength(_) => ErrorKind::InvalidHeaderLength,
                DataLinkError::EmptyHeader
                | DataLinkError::HeaderTooLong { .. }
                | DataLinkError::NonAsciiHeader
                | DataLinkError::InvalidCommand(_)
                | DataLinkError::PayloadTooLarge { .. } => ErrorKind::InvalidArgument,
                DataLinkError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            },
            Self::Timeout(_) => ErrorKind::SocketTimeout,
            Self::Disconnected => ErrorKind::Eof,
            Self::NotConnected => ErrorKind::NoSocket,
            Self::InvalidState { .. } => ErrorKind::StreamingError,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NoDataLinkId(_) => ErrorKind::NoDataLinkId,
            Self::ServerError(_) => ErrorKind::InvalidResponse,
        }
    }
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;
