use datalink_rs_protocol::{MAX_PACKET_SIZE, PacketHeader, PacketId};

/// Streaming state machine.
///
/// Transitions: `Idle` → `Streaming` (STREAM sent) → `Draining` (ENDSTREAM sent)
/// → `Idle` (server's `ENDSTREAM` received).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Request/response mode; point operations are allowed.
    Idle,
    /// The server pushes packets continuously.
    Streaming,
    /// ENDSTREAM requested; packets already in flight are still arriving.
    Draining,
}

impl StreamState {
    /// Returns the state name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Streaming => "Streaming",
            Self::Draining => "Draining",
        }
    }
}

/// Server capabilities advertised in the ID exchange.
///
/// Discovered once per connection and reset on close.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ServerCapabilities {
    /// `DLPROTO:<version>`, if advertised and parsable.
    pub protocol: Option<f32>,
    /// `PACKETSIZE:<bytes>`, if advertised and parsable.
    pub max_packet_size: Option<usize>,
    /// `WRITE`: the server accepts WRITE from this client.
    pub write_permission: bool,
}

impl ServerCapabilities {
    /// Largest payload this client may WRITE: the protocol ceiling, or the
    /// server's packet size if that is smaller.
    pub fn write_ceiling(&self) -> usize {
        match self.max_packet_size {
            Some(size) if size > 0 => size.min(MAX_PACKET_SIZE),
            _ => MAX_PACKET_SIZE,
        }
    }
}

/// A DataLink packet with its payload copied to the heap.
///
/// All times are microseconds since the Unix epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packet {
    /// Opaque stream identifier, e.g. `"IU_ANMO_00_BHZ/MSEED"`.
    pub stream_id: String,
    /// Server-assigned packet id.
    pub id: PacketId,
    /// Time the server received the packet.
    pub time: i64,
    /// Start of the data window.
    pub data_start: i64,
    /// End of the data window.
    pub data_end: i64,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Payload size in bytes. Zero marks the empty packet.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the packet carries no data.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub(crate) fn from_header(header: PacketHeader, payload: Vec<u8>) -> Self {
        Self {
            stream_id: header.stream_id,
            id: header.id,
            time: header.time,
            data_start: header.data_start,
            data_end: header.data_end,
            payload,
        }
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.stream_id,
            self.id,
            self.time,
            self.data_start,
            self.data_end,
            self.size()
        )
    }
}

/// Outcome of one [`collect`](crate::DataLinkClient::collect) call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Collected {
    /// A packet arrived.
    Packet(Packet),
    /// The server acknowledged ENDSTREAM; all in-flight packets were delivered
    /// and the client is back in [`StreamState::Idle`].
    Drained,
    /// The termination flag was observed.
    Terminated,
    /// Non-blocking collect and nothing was available.
    NoData,
}

impl Collected {
    /// Returns the packet, if one arrived.
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            Self::Packet(packet) => Some(packet),
            _ => None,
        }
    }
}
