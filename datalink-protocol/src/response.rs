use crate::error::{DataLinkError, Result};
use crate::frame::MAX_PACKET_SIZE;
use crate::packet::PacketHeader;

/// Generic acknowledgement: `"<status> <value> <size>"` followed by `size`
/// bytes of payload (usually a human-readable message).
///
/// Used for ID, INFO, POSITION, MATCH, REJECT and acknowledged WRITE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// `OK`, `INFO`, `ERROR`, ...
    pub status: String,
    /// Command-specific value: packet id, matched stream count, info type.
    pub value: String,
    /// Declared payload length, in `1..MAX_PACKET_SIZE`.
    pub size: usize,
}

impl Reply {
    /// Parse a reply header. Exactly three whitespace-separated tokens are
    /// required and the size must lie in `1..MAX_PACKET_SIZE`.
    pub fn parse(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [status, value, size] = parts.as_slice() else {
            return Err(DataLinkError::InvalidResponse(format!(
                "unable to parse reply header: {line:?}"
            )));
        };

        let size: i64 = size.parse().map_err(|_| {
            DataLinkError::InvalidResponse(format!("invalid reply size in {line:?}"))
        })?;
        if size < 1 || size >= MAX_PACKET_SIZE as i64 {
            return Err(DataLinkError::InvalidResponse(format!(
                "reply size {size} outside 1..{MAX_PACKET_SIZE} in {line:?}"
            )));
        }

        Ok(Self {
            status: (*status).to_owned(),
            value: (*value).to_owned(),
            size: size as usize,
        })
    }

    /// Returns true if the server reported a failure.
    pub fn is_error(&self) -> bool {
        self.status.starts_with("ERROR")
    }

    /// The value token as an integer (packet id, matched stream count).
    pub fn value_as_i64(&self) -> Option<i64> {
        self.value.parse().ok()
    }

    /// Format as the header line a server sends ahead of the payload.
    pub fn to_header(&self) -> String {
        format!("{} {} {}", self.status, self.value, self.size)
    }
}

/// Classification of a header received where a packet is expected
/// (READ replies and streaming).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// `PACKET ...`: a data packet whose payload follows.
    Packet(PacketHeader),
    /// `ERROR ...`: to be decoded as a generic [`Reply`].
    Error,
    /// Bare `ENDSTREAM`: the server has drained the stream.
    EndStream,
}

impl Response {
    pub fn parse(line: &str) -> Result<Self> {
        if let Some(fields) = line.strip_prefix(PacketHeader::PREFIX) {
            return Ok(Self::Packet(PacketHeader::parse_fields(fields)?));
        }

        if line.starts_with("ERROR") {
            return Ok(Self::Error);
        }

        if line == "ENDSTREAM" {
            return Ok(Self::EndStream);
        }

        Err(DataLinkError::InvalidResponse(format!(
            "unrecognized response: {line:?}"
        )))
    }
}
