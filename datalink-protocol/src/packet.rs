use crate::error::{DataLinkError, Result};
use crate::frame::MAX_PACKET_SIZE;
use crate::packet_id::PacketId;

/// Metadata announced by a `PACKET` reply header.
///
/// All times are microseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    /// Opaque stream identifier, e.g. `"IU_ANMO_00_BHZ/MSEED"`.
    pub stream_id: String,
    /// Server-assigned packet id.
    pub id: PacketId,
    /// Time the server received the packet.
    pub time: i64,
    /// Start of the data window carried by the payload.
    pub data_start: i64,
    /// End of the data window carried by the payload.
    pub data_end: i64,
    /// Payload length in bytes, at most [`MAX_PACKET_SIZE`].
    pub data_size: usize,
}

impl PacketHeader {
    pub const PREFIX: &'static str = "PACKET ";

    /// Parse the six fields following `"PACKET "`:
    /// `streamId pktId pktTime dataStart dataEnd dataSize`.
    pub fn parse_fields(fields: &str) -> Result<Self> {
        let parts: Vec<&str> = fields.split_whitespace().collect();
        let [stream_id, id, time, data_start, data_end, data_size] = parts.as_slice() else {
            return Err(DataLinkError::InvalidResponse(format!(
                "PACKET: expected 6 fields, got {} ({fields:?})",
                parts.len()
            )));
        };

        let data_size: i64 = parse_field("data size", data_size)?;
        if !(0..=MAX_PACKET_SIZE as i64).contains(&data_size) {
            return Err(DataLinkError::InvalidResponse(format!(
                "PACKET: data size {data_size} outside 0..={MAX_PACKET_SIZE}"
            )));
        }

        Ok(Self {
            stream_id: (*stream_id).to_owned(),
            id: PacketId::new(parse_field("packet id", id)?),
            time: parse_field("packet time", time)?,
            data_start: parse_field("data start", data_start)?,
            data_end: parse_field("data end", data_end)?,
            data_size: data_size as usize,
        })
    }

    /// Parse a complete `"PACKET ..."` header line.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = line.strip_prefix(Self::PREFIX).ok_or_else(|| {
            DataLinkError::InvalidResponse(format!("expected PACKET header, got {line:?}"))
        })?;
        Self::parse_fields(fields)
    }

    /// Format as the header line a server sends ahead of the payload.
    pub fn to_header(&self) -> String {
        format!(
            "PACKET {} {} {} {} {} {}",
            self.stream_id,
            self.id.value(),
            self.time,
            self.data_start,
            self.data_end,
            self.data_size
        )
    }
}

fn parse_field(name: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| DataLinkError::InvalidResponse(format!("PACKET: invalid {name}: {value:?}")))
}
