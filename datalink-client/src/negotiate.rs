use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::state::ServerCapabilities;

/// Prefix every DataLink server's ID reply starts with, compared ignoring case.
pub const SIGNATURE: &str = "ID DATALINK";

const CAPS_MARKER: &str = "::";

/// Parse the server's ID reply.
///
/// The reply looks like `"ID DataLink 2018.078 :: DLPROTO:1.0 PACKETSIZE:512 WRITE"`.
/// Capability flags are only recognized after the `"::"` marker. A flag whose
/// value does not parse is logged and skipped; the matching field of
/// `current` is kept.
pub fn parse_capabilities(reply: &str, current: ServerCapabilities) -> Result<ServerCapabilities> {
    let signed = reply
        .get(..SIGNATURE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SIGNATURE));
    if !signed {
        warn!(reply, "unrecognized server ID");
        return Err(ClientError::NoDataLinkId(reply.to_owned()));
    }

    let mut caps = current;
    let Some((ident, flags)) = reply.split_once(CAPS_MARKER) else {
        debug!(reply, "server ID without capabilities");
        return Ok(caps);
    };
    debug!(id = ident[3..].trim(), "server ID");

    if let Some(value) = flag_value(flags, "DLPROTO:") {
        match value.parse::<f32>() {
            Ok(version) => {
                debug!(version, "DLPROTO");
                caps.protocol = Some(version);
            }
            Err(_) => warn!(value, "could not parse protocol version from DLPROTO flag"),
        }
    }

    if let Some(value) = flag_value(flags, "PACKETSIZE:") {
        match value.parse::<usize>() {
            Ok(size) => {
                debug!(size, "PACKETSIZE");
                caps.max_packet_size = Some(size);
            }
            Err(_) => warn!(value, "could not parse packet size from PACKETSIZE flag"),
        }
    }

    if flags.contains("WRITE") {
        debug!("WRITE");
        caps.write_permission = true;
    }

    Ok(caps)
}

/// Text after `name`, up to the next space or the end of `flags`.
fn flag_value<'a>(flags: &'a str, name: &str) -> Option<&'a str> {
    let start = flags.find(name)? + name.len();
    flags[start..].split(' ').next()
}
