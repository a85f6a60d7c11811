use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use datalink_rs_protocol::{Command, DataLinkError, PacketId, Reply, Response};
use futures_core::Stream;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::exchange::Exchange;
use crate::negotiate;
use crate::state::{Collected, Packet, ServerCapabilities, StreamState};

/// Async DataLink client.
///
/// One session per connection. Point operations (INFO, MATCH, POSITION, READ,
/// WRITE, ...) are request/acknowledge exchanges; [`collect`](Self::collect)
/// drives the streaming state machine
/// `Idle` → `Streaming` → `Draining` → `Idle`.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> datalink_rs_client::Result<()> {
/// use datalink_rs_client::{ClientConfig, Collected, DataLinkClient};
///
/// let mut client = DataLinkClient::new(ClientConfig::default());
/// client.connect().await?;
/// client.identify().await?;
/// client.set_match("IU_ANMO_.*/MSEED").await?;
///
/// while let Collected::Packet(packet) = client.collect(false, true).await? {
///     println!("{packet}");
/// }
/// client.close();
/// # Ok(())
/// # }
/// ```
pub struct DataLinkClient {
    config: ClientConfig,
    exchange: Option<Exchange>,
    state: StreamState,
    capabilities: ServerCapabilities,
    last_reply: Option<Reply>,
    terminate: Arc<AtomicBool>,
}

/// Cloneable handle that stops a [`collect`](DataLinkClient::collect) loop
/// from another task or thread.
///
/// The flag is checked between receives, so a blocked receive is only
/// interrupted once its I/O timeout expires.
#[derive(Clone, Debug)]
pub struct Terminator {
    flag: Arc<AtomicBool>,
}

impl Terminator {
    pub fn terminate(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            info!("terminating connection");
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for DataLinkClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl DataLinkClient {
    /// Create an unconnected client.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            exchange: None,
            state: StreamState::Idle,
            capabilities: ServerCapabilities::default(),
            last_reply: None,
            terminate: Arc::new(AtomicBool::new(false)),
        }
    }

    // -- Lifecycle --

    /// Open the TCP connection to the configured address.
    ///
    /// An existing connection is closed first. Clears the termination flag.
    pub async fn connect(&mut self) -> Result<()> {
        if self.exchange.is_some() {
            self.close();
        }
        let addr = self.config.address.as_str();
        info!(addr, "connecting");
        let connection = Connection::connect(addr, self.config.io_timeout)
            .await
            .inspect_err(|e| warn!(addr, error = %e, "connect failed"))?;

        self.exchange = Some(Exchange::new(connection));
        self.state = StreamState::Idle;
        self.terminate.store(false, Ordering::SeqCst);
        info!(addr, "connected");
        Ok(())
    }

    /// Drop the connection and reset the session.
    ///
    /// Idempotent, safe before [`connect`](Self::connect), and leaves the
    /// client ready to connect again. Sets the termination flag so a
    /// concurrent collect loop stops.
    pub fn close(&mut self) {
        self.terminate.store(true, Ordering::SeqCst);
        if self.exchange.take().is_some() {
            info!(addr = %self.config.address, "connection closed");
        }
        self.state = StreamState::Idle;
        self.capabilities = ServerCapabilities::default();
        self.last_reply = None;
    }

    pub fn is_connected(&self) -> bool {
        self.exchange.is_some()
    }

    /// Returns a handle that can stop a collect loop from elsewhere.
    pub fn terminator(&self) -> Terminator {
        Terminator {
            flag: Arc::clone(&self.terminate),
        }
    }

    /// Ask a running collect loop to return.
    pub fn terminate(&self) {
        self.terminator().terminate();
    }

    // -- Accessors --

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Capabilities learned from the last [`exchange_ids`](Self::exchange_ids).
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// The last generic reply decoded on this connection.
    pub fn last_reply(&self) -> Option<&Reply> {
        self.last_reply.as_ref()
    }

    /// Bytes of the last reply payload, or the last header received.
    pub fn read_buffer(&self) -> &[u8] {
        self.exchange.as_ref().map(Exchange::read_buffer).unwrap_or_default()
    }

    /// [`read_buffer`](Self::read_buffer) as text.
    pub fn read_text(&self) -> &str {
        self.exchange.as_ref().map(Exchange::read_text).unwrap_or_default()
    }

    // -- Capability negotiation --

    /// Identify this client and learn what the server supports.
    ///
    /// Fails with [`ClientError::NoDataLinkId`] if the peer does not answer
    /// like a DataLink server. Malformed capability flags are logged and
    /// ignored.
    pub async fn exchange_ids(&mut self, client_id: &str) -> Result<ServerCapabilities> {
        self.require_not_streaming("exchange_ids")?;

        let cmd = Command::Id {
            client_id: client_id.to_owned(),
        };
        let header = self.exchange()?.request(&cmd, &[]).await?;
        self.capabilities = negotiate::parse_capabilities(&header, self.capabilities)?;
        info!(
            protocol = ?self.capabilities.protocol,
            max_packet_size = ?self.capabilities.max_packet_size,
            write = self.capabilities.write_permission,
            "server identified"
        );
        Ok(self.capabilities)
    }

    /// [`exchange_ids`](Self::exchange_ids) with the configured
    /// [`ClientConfig::client_id`].
    pub async fn identify(&mut self) -> Result<ServerCapabilities> {
        let client_id = self.config.client_id.clone();
        self.exchange_ids(&client_id).await
    }

    // -- Point operations (not while Streaming) --

    /// Request server information. The XML document is in
    /// [`read_text`](Self::read_text) afterwards.
    pub async fn get_info(&mut self, kind: &str, matching: Option<&str>) -> Result<Reply> {
        self.require_not_streaming("get_info")?;

        let cmd = Command::Info {
            kind: kind.to_owned(),
            matching: matching.map(str::to_owned),
        };
        let header = self.exchange()?.request(&cmd, &[]).await?;
        let reply = self.decode_reply(&header).await?;

        if reply.status == "INFO" {
            if reply.value != kind {
                warn!(requested = kind, received = %reply.value, "INFO type mismatch");
            }
            Ok(reply)
        } else if reply.is_error() {
            let text = self.read_text().to_owned();
            warn!(%text, "INFO failed");
            Err(ClientError::ServerError(text))
        } else {
            Err(DataLinkError::InvalidResponse(format!(
                "expected INFO reply, got {header:?}"
            ))
            .into())
        }
    }

    /// Select the streams to send. An empty pattern matches all streams.
    ///
    /// The reply value is the number of streams currently matched.
    pub async fn set_match(&mut self, pattern: &str) -> Result<Reply> {
        let cmd = Command::Match { len: pattern.len() };
        self.acknowledged("set_match", &cmd, pattern.as_bytes()).await
    }

    /// Exclude streams. An empty pattern clears the reject list.
    pub async fn set_reject(&mut self, pattern: &str) -> Result<Reply> {
        let cmd = Command::Reject { len: pattern.len() };
        self.acknowledged("set_reject", &cmd, pattern.as_bytes()).await
    }

    /// Position the read cursor at `id`, or at one end of the ring buffer
    /// with [`PacketId::EARLIEST`] / [`PacketId::LATEST`].
    ///
    /// The reply value is the packet id positioned to.
    pub async fn position(&mut self, id: PacketId, time: i64) -> Result<Reply> {
        let cmd = Command::PositionSet { id, time };
        self.acknowledged("position", &cmd, &[]).await
    }

    /// Position the read cursor at the first packet with data after `time` (µs).
    pub async fn position_after(&mut self, time: i64) -> Result<Reply> {
        let cmd = Command::PositionAfter { time };
        self.acknowledged("position_after", &cmd, &[]).await
    }

    /// Read one packet.
    ///
    /// A real id sends `READ <id>`; any other id picks up the next frame of
    /// an exchange already in flight. Returns `Ok(None)` if that frame was the
    /// server's `ENDSTREAM` at the end of a drain.
    pub async fn read(&mut self, id: PacketId) -> Result<Option<Packet>> {
        self.require_not_streaming("read")?;

        let header = if id.is_real() {
            debug!(%id, "READ");
            self.exchange()?.request(&Command::Read { id }, &[]).await?
        } else {
            self.exchange()?.read_header().await?
        };
        self.decode_packet(&header).await
    }

    /// Send a packet to the server.
    ///
    /// With `ack` the server's reply is decoded and returned; without it the
    /// call returns as soon as the packet is written and no reply is expected.
    pub async fn write(
        &mut self,
        payload: &[u8],
        stream_id: &str,
        data_start: i64,
        data_end: i64,
        ack: bool,
    ) -> Result<Option<Reply>> {
        self.require_not_streaming("write")?;

        let ceiling = self.capabilities.write_ceiling();
        if payload.len() > ceiling {
            warn!(len = payload.len(), max = ceiling, "packet too large to write");
            return Err(ClientError::InvalidArgument(format!(
                "packet of {} bytes exceeds maximum of {ceiling}",
                payload.len()
            )));
        }

        let cmd = Command::Write {
            stream_id: stream_id.to_owned(),
            data_start,
            data_end,
            ack,
            len: payload.len(),
        };
        if !cmd.expects_reply() {
            self.exchange()?.send(&cmd, payload).await?;
            return Ok(None);
        }
        self.acknowledged("write", &cmd, payload).await.map(Some)
    }

    // -- Streaming --

    /// Collect the next streamed packet, starting or ending the stream as needed.
    ///
    /// From `Idle`, sends STREAM. With `end_requested` while `Streaming`,
    /// sends ENDSTREAM and enters `Draining`; keep calling until
    /// [`Collected::Drained`] to receive the packets still in flight.
    ///
    /// I/O timeouts are retried here, so the loop only returns on a packet,
    /// the end of a drain, termination, an error, or (when not `blocking`)
    /// [`Collected::NoData`]. A stall in the middle of a frame drops the
    /// bytes already read and the next receive fails with an invalid sync;
    /// reconnect in that case.
    pub async fn collect(&mut self, end_requested: bool, blocking: bool) -> Result<Collected> {
        if self.exchange.is_none() {
            warn!("collect: not connected");
            return Err(ClientError::NotConnected);
        }

        match (self.state, end_requested) {
            (StreamState::Idle, false) => {
                self.exchange()?.send(&Command::Stream, &[]).await.inspect_err(|e| {
                    warn!(error = %e, "problem sending STREAM command");
                })?;
                self.state = StreamState::Streaming;
                info!("STREAM command sent to server");
            }
            (StreamState::Idle, true) => {
                warn!("collect: connection is not in streaming mode, cannot continue");
                return Err(ClientError::InvalidState {
                    expected: "Streaming|Draining",
                    actual: self.state.as_str(),
                });
            }
            (StreamState::Streaming, true) => {
                self.exchange()?.send(&Command::EndStream, &[]).await.inspect_err(|e| {
                    warn!(error = %e, "problem sending ENDSTREAM command");
                })?;
                self.state = StreamState::Draining;
                info!("ENDSTREAM command sent to server");
            }
            _ => {}
        }

        loop {
            if self.is_terminated() {
                return Ok(Collected::Terminated);
            }
            let header = match self.exchange()?.recv_header(blocking).await {
                Ok(Some(header)) => header,
                Ok(None) => return Ok(Collected::NoData),
                Err(ClientError::Timeout(timeout)) => {
                    debug!(?timeout, "no data within I/O timeout, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if self.is_terminated() {
                return Ok(Collected::Terminated);
            }
            return Ok(match self.decode_packet(&header).await? {
                Some(packet) => Collected::Packet(packet),
                None => Collected::Drained,
            });
        }
    }

    /// Consume this client and return a [`Stream`] of packets.
    ///
    /// The stream sends STREAM if needed and ends when the stream is drained
    /// or the client is terminated.
    pub fn into_stream(self) -> impl Stream<Item = Result<Packet>> {
        crate::stream::packet_stream(self)
    }

    // -- Private helpers --

    fn exchange(&mut self) -> Result<&mut Exchange> {
        self.exchange.as_mut().ok_or(ClientError::NotConnected)
    }

    fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    fn require_not_streaming(&self, method: &'static str) -> Result<()> {
        if self.exchange.is_none() {
            warn!(method, "no connection");
            return Err(ClientError::NotConnected);
        }
        if self.state == StreamState::Streaming {
            warn!(method, "connection in streaming mode, cannot continue");
            return Err(ClientError::InvalidState {
                expected: "Idle|Draining",
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }

    async fn decode_reply(&mut self, header: &str) -> Result<Reply> {
        let reply = self.exchange()?.decode_reply(header).await?;
        trace!(status = %reply.status, value = %reply.value, size = reply.size, "reply");
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    /// Send a command answered by a generic reply; an ERROR status becomes
    /// [`ClientError::ServerError`] carrying the reply text.
    async fn acknowledged(
        &mut self,
        method: &'static str,
        cmd: &Command,
        payload: &[u8],
    ) -> Result<Reply> {
        self.require_not_streaming(method)?;

        let header = self.exchange()?.request(cmd, payload).await?;
        let reply = self.decode_reply(&header).await?;
        if reply.is_error() {
            let text = self.read_text().to_owned();
            warn!(method, %text, "server returned error");
            return Err(ClientError::ServerError(text));
        }
        debug!(method, value = %reply.value, "{}", self.read_text());
        Ok(reply)
    }

    /// Decode a header received where a packet is expected.
    ///
    /// `Ok(None)` is the server's `ENDSTREAM` at the end of a drain.
    async fn decode_packet(&mut self, header: &str) -> Result<Option<Packet>> {
        let response = Response::parse(header).inspect_err(|_| {
            warn!(header, "unable to parse reply header");
        })?;

        match response {
            Response::Packet(packet_header) => {
                let len = packet_header.data_size;
                let payload = self.exchange()?.read_payload(len).await.inspect_err(|e| {
                    warn!(len, error = %e, "problem receiving packet data");
                })?;
                let packet = Packet::from_header(packet_header, payload);
                trace!(stream_id = %packet.stream_id, id = %packet.id, len, "packet");
                Ok(Some(packet))
            }
            Response::Error => {
                self.decode_reply(header).await?;
                let text = self.read_text().to_owned();
                warn!(%text, "server returned error");
                Err(ClientError::ServerError(text))
            }
            Response::EndStream if self.state == StreamState::Draining => {
                self.state = StreamState::Idle;
                info!("stream drained");
                Ok(None)
            }
            Response::EndStream => {
                warn!(header, "ENDSTREAM received without an end request");
                Err(DataLinkError::InvalidResponse("unexpected ENDSTREAM".into()).into())
            }
        }
    }
}
