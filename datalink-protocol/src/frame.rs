//! DataLink frame encoding and decoding.
//!
//! ```text
//! ┌──────┬─────┬──────────────────┬───────────────────────────┐
//! │ "DL" │ LEN │ HEADER           │ PAYLOAD                   │
//! │ 2 B  │ 1 B │ LEN bytes ASCII  │ length carried in HEADER  │
//! └──────┴─────┴──────────────────┴───────────────────────────┘
//! ```
//!
//! The payload length is never part of the frame itself; it is declared by
//! the command or reply text in the header, so this module only deals with
//! the sync marker, the length byte and the header.

use crate::error::{DataLinkError, Result};

pub const SYNC: &[u8; 2] = b"DL";

/// Sync marker + header length byte.
pub const PREFIX_LEN: usize = 3;

pub const MAX_HEADER_LEN: usize = 255;

/// Protocol payload ceiling, also the size of a client read buffer.
pub const MAX_PACKET_SIZE: usize = 16384;

/// Check that `header` can be carried by a frame: 1..=255 ASCII bytes.
pub fn validate_header(header: &str) -> Result<()> {
    let len = header.len();
    if len == 0 {
        return Err(DataLinkError::EmptyHeader);
    }
    if len > MAX_HEADER_LEN {
        return Err(DataLinkError::HeaderTooLong {
            len,
            max: MAX_HEADER_LEN,
        });
    }
    if !header.is_ascii() {
        return Err(DataLinkError::NonAsciiHeader);
    }
    Ok(())
}

/// Write a frame: sync, header length, header, then the payload verbatim.
pub fn write(header: &str, payload: &[u8]) -> Result<Vec<u8>> {
    validate_header(header)?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + header.len() + payload.len());
    frame.extend_from_slice(SYNC);
    frame.push(header.len() as u8);
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Validate the 3-byte prefix and return the header length it announces.
///
/// `capacity` is the largest header the receiver can buffer.
pub fn parse_prefix(prefix: &[u8], capacity: usize) -> Result<usize> {
    if prefix.len() < PREFIX_LEN {
        return Err(DataLinkError::FrameTooShort {
            expected: PREFIX_LEN,
            actual: prefix.len(),
        });
    }

    if &prefix[0..2] != SYNC.as_slice() {
        return Err(DataLinkError::InvalidSync {
            expected: "DL",
            actual: [prefix[0], prefix[1]],
        });
    }

    let len = usize::from(prefix[2]);
    if len > capacity {
        return Err(DataLinkError::InvalidHeaderLength(len));
    }
    Ok(len)
}

/// Parse the prefix and header from the beginning of a buffer.
///
/// Returns `(header, bytes_consumed)`. Any payload that follows is left in
/// place for the caller, who learns its length from the header text.
pub fn parse(data: &[u8]) -> Result<(String, usize)> {
    let len = parse_prefix(data, MAX_HEADER_LEN)?;
    let total_len = PREFIX_LEN + len;

    if data.len() < total_len {
        return Err(DataLinkError::FrameTooShort {
            expected: total_len,
            actual: data.len(),
        });
    }

    let header = header_text(&data[PREFIX_LEN..total_len]);
    Ok((header, total_len))
}

/// Decode received header bytes as text. Non-ASCII bytes are replaced
/// rather than rejected; the command layer decides what is malformed.
pub fn header_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
