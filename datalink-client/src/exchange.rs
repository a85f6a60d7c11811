use std::cell::OnceCell;

use datalink_rs_protocol::{Command, DataLinkError, Reply};
use tracing::{trace, warn};

use crate::connection::Connection;
use crate::error::Result;

/// Request/acknowledge layer over a [`Connection`].
///
/// Owns the read buffer: the last received header, or the reply payload once
/// [`decode_reply`](Self::decode_reply) has pulled it in. The buffer and its
/// text view are cleared at the start of every receive; the text is decoded
/// on first access.
pub struct Exchange {
    connection: Connection,
    read_buf: Vec<u8>,
    read_text: OnceCell<String>,
}

impl Exchange {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            read_buf: Vec::new(),
            read_text: OnceCell::new(),
        }
    }

    /// Send `cmd` followed by its payload. The frame is built, and every
    /// size limit checked, before anything is written.
    pub async fn send(&mut self, cmd: &Command, payload: &[u8]) -> Result<()> {
        let bytes = cmd.to_frame(payload).inspect_err(|e| {
            warn!(command = cmd.name(), error = %e, "cannot frame command");
        })?;
        trace!(header = %cmd.header(), payload_len = payload.len(), "sending");
        self.connection.send_raw(&bytes).await
    }

    /// Send `cmd` and wait for one reply header, returned uninterpreted.
    ///
    /// Commands the server does not answer are refused before any I/O.
    pub async fn request(&mut self, cmd: &Command, payload: &[u8]) -> Result<String> {
        if !cmd.expects_reply() {
            return Err(DataLinkError::InvalidCommand(format!(
                "{} is not answered with a reply",
                cmd.name()
            ))
            .into());
        }
        self.send(cmd, payload).await?;
        self.read_header().await
    }

    /// Receive one frame header and keep it in the read buffer.
    ///
    /// `Ok(None)` means a non-blocking receive found nothing to read.
    pub async fn recv_header(&mut self, blocking: bool) -> Result<Option<String>> {
        self.invalidate();
        let header = self.connection.recv_frame(blocking).await?;
        if let Some(header) = &header {
            self.read_buf.extend_from_slice(header.as_bytes());
        }
        Ok(header)
    }

    pub async fn read_header(&mut self) -> Result<String> {
        self.invalidate();
        let header = self.connection.read_frame().await?;
        self.read_buf.extend_from_slice(header.as_bytes());
        Ok(header)
    }

    /// Parse a generic `status value size` reply and pull its payload into
    /// the read buffer.
    pub async fn decode_reply(&mut self, header: &str) -> Result<Reply> {
        let reply = Reply::parse(header).inspect_err(|_| {
            warn!(header, "unable to parse reply header");
        })?;
        self.invalidate();
        self.read_buf = self.connection.read_committed(reply.size).await?;
        Ok(reply)
    }

    /// Read a packet payload of `len` bytes. The read buffer is left empty;
    /// the bytes belong to the packet.
    pub async fn read_payload(&mut self, len: usize) -> Result<Vec<u8>> {
        self.invalidate();
        self.connection.read_committed(len).await
    }

    pub fn read_buffer(&self) -> &[u8] {
        &self.read_buf
    }

    /// The read buffer as text.
    pub fn read_text(&self) -> &str {
        self.read_text
            .get_or_init(|| String::from_utf8_lossy(&self.read_buf).into_owned())
    }

    fn invalidate(&mut self) {
        self.read_buf.clear();
        self.read_text.take();
    }
}
