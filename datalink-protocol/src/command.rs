use crate::error::{DataLinkError, Result};
use crate::frame;
use crate::packet_id::PacketId;

/// A client request, as carried in a frame header.
///
/// Commands that carry a payload (MATCH, REJECT, WRITE) only record its
/// length here; the bytes travel after the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Id {
        client_id: String,
    },
    Info {
        kind: String,
        matching: Option<String>,
    },
    Stream,
    EndStream,
    /// `POSITION SET`; the EARLIEST/LATEST sentinels select the ring ends.
    PositionSet {
        id: PacketId,
        time: i64,
    },
    PositionAfter {
        time: i64,
    },
    Match {
        len: usize,
    },
    Reject {
        len: usize,
    },
    Read {
        id: PacketId,
    },
    Write {
        stream_id: String,
        data_start: i64,
        data_end: i64,
        ack: bool,
        len: usize,
    },
}

impl Command {
    /// Parse a command from frame header text.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let keyword = parts
            .next()
            .ok_or_else(|| DataLinkError::InvalidCommand("empty command".into()))?;

        match keyword {
            "ID" => {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    return Err(DataLinkError::InvalidCommand("ID requires a client id".into()));
                }
                Ok(Self::Id {
                    client_id: rest.join(" "),
                })
            }
            "INFO" => {
                let kind = parts
                    .next()
                    .ok_or_else(|| DataLinkError::InvalidCommand("INFO requires a type".into()))?
                    .to_owned();
                let rest: Vec<&str> = parts.collect();
                let matching = (!rest.is_empty()).then(|| rest.join(" "));
                Ok(Self::Info { kind, matching })
            }
            "STREAM" => {
                reject_extra_args(&mut parts, "STREAM")?;
                Ok(Self::Stream)
            }
            "ENDSTREAM" => {
                reject_extra_args(&mut parts, "ENDSTREAM")?;
                Ok(Self::EndStream)
            }
            "POSITION" => match parts.next() {
                Some("SET") => {
                    let id = parts.next().ok_or_else(|| {
                        DataLinkError::InvalidCommand("POSITION SET requires an id".into())
                    })?;
                    let command = match id {
                        "EARLIEST" => Self::PositionSet {
                            id: PacketId::EARLIEST,
                            time: 0,
                        },
                        "LATEST" => Self::PositionSet {
                            id: PacketId::LATEST,
                            time: 0,
                        },
                        _ => {
                            let time = parts.next().ok_or_else(|| {
                                DataLinkError::InvalidCommand("POSITION SET requires a time".into())
                            })?;
                            Self::PositionSet {
                                id: PacketId::new(parse_int("POSITION SET", id)?),
                                time: parse_int("POSITION SET", time)?,
                            }
                        }
                    };
                    reject_extra_args(&mut parts, "POSITION SET")?;
                    Ok(command)
                }
                Some("AFTER") => {
                    let time = parts.next().ok_or_else(|| {
                        DataLinkError::InvalidCommand("POSITION AFTER requires a time".into())
                    })?;
                    reject_extra_args(&mut parts, "POSITION AFTER")?;
                    Ok(Self::PositionAfter {
                        time: parse_int("POSITION AFTER", time)?,
                    })
                }
                other => Err(DataLinkError::InvalidCommand(format!(
                    "POSITION: expected SET or AFTER, got {other:?}"
                ))),
            },
            "MATCH" | "REJECT" => {
                let len = parts.next().ok_or_else(|| {
                    DataLinkError::InvalidCommand(format!("{keyword} requires a length"))
                })?;
                reject_extra_args(&mut parts, keyword)?;
                let len = parse_len(keyword, len)?;
                if keyword == "MATCH" {
                    Ok(Self::Match { len })
                } else {
                    Ok(Self::Reject { len })
                }
            }
            "READ" => {
                let id = parts
                    .next()
                    .ok_or_else(|| DataLinkError::InvalidCommand("READ requires an id".into()))?;
                reject_extra_args(&mut parts, "READ")?;
                Ok(Self::Read {
                    id: PacketId::new(parse_int("READ", id)?),
                })
            }
            "WRITE" => {
                let args: Vec<&str> = parts.collect();
                let [stream_id, data_start, data_end, flags, len] = args.as_slice() else {
                    return Err(DataLinkError::InvalidCommand(format!(
                        "WRITE: expected 5 arguments, got {}",
                        args.len()
                    )));
                };
                let ack = match *flags {
                    "A" => true,
                    "N" => false,
                    other => {
                        return Err(DataLinkError::InvalidCommand(format!(
                            "WRITE: expected A or N, got {other:?}"
                        )));
                    }
                };
                Ok(Self::Write {
                    stream_id: (*stream_id).to_owned(),
                    data_start: parse_int("WRITE", data_start)?,
                    data_end: parse_int("WRITE", data_end)?,
                    ack,
                    len: parse_len("WRITE", len)?,
                })
            }
            _ => Err(DataLinkError::InvalidCommand(format!(
                "unknown command: {keyword:?}"
            ))),
        }
    }

    /// Header text for this command.
    pub fn header(&self) -> String {
        match self {
            Self::Id { client_id } => format!("ID {client_id}"),
            Self::Info { kind, matching } => {
                format!("INFO {kind} {}", matching.as_deref().unwrap_or(""))
            }
            Self::Stream => "STREAM".into(),
            Self::EndStream => "ENDSTREAM".into(),
            Self::PositionSet { id, time } => {
                if *id == PacketId::EARLIEST {
                    "POSITION SET EARLIEST".into()
                } else if *id == PacketId::LATEST {
                    "POSITION SET LATEST".into()
                } else {
                    format!("POSITION SET {} {time}", id.value())
                }
            }
            Self::PositionAfter { time } => format!("POSITION AFTER {time}"),
            Self::Match { len } => format!("MATCH {len}"),
            Self::Reject { len } => format!("REJECT {len}"),
            Self::Read { id } => format!("READ {}", id.value()),
            Self::Write {
                stream_id,
                data_start,
                data_end,
                ack,
                len,
            } => {
                let flag = if *ack { "A" } else { "N" };
                format!("WRITE {stream_id} {data_start} {data_end} {flag} {len}")
            }
        }
    }

    /// Length of the payload that follows the header.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Match { len } | Self::Reject { len } | Self::Write { len, .. } => *len,
            _ => 0,
        }
    }

    /// Whether the server answers this command with a reply frame.
    ///
    /// STREAM is acknowledged only by the packets that follow it, ENDSTREAM
    /// by a bare `ENDSTREAM` once drained, and WRITE only when `ack` is set.
    pub fn expects_reply(&self) -> bool {
        match self {
            Self::Stream | Self::EndStream => false,
            Self::Write { ack, .. } => *ack,
            _ => true,
        }
    }

    /// Serialize to wire bytes with the given payload.
    ///
    /// The payload must match the declared length and fit the protocol ceiling.
    pub fn to_frame(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let declared = self.payload_len();
        if payload.len() != declared {
            return Err(DataLinkError::InvalidCommand(format!(
                "{}: declared payload of {declared} bytes, got {}",
                self.name(),
                payload.len()
            )));
        }
        if payload.len() > frame::MAX_PACKET_SIZE {
            return Err(DataLinkError::PayloadTooLarge {
                len: payload.len(),
                max: frame::MAX_PACKET_SIZE,
            });
        }
        frame::write(&self.header(), payload)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Id { .. } => "ID",
            Self::Info { .. } => "INFO",
            Self::Stream => "STREAM",
            Self::EndStream => "ENDSTREAM",
            Self::PositionSet { .. } => "POSITION SET",
            Self::PositionAfter { .. } => "POSITION AFTER",
            Self::Match { .. } => "MATCH",
            Self::Reject { .. } => "REJECT",
            Self::Read { .. } => "READ",
            Self::Write { .. } => "WRITE",
        }
    }
}

fn reject_extra_args<'a>(parts: &mut impl Iterator<Item = &'a str>, cmd: &str) -> Result<()> {
    if let Some(extra) = parts.next() {
        return Err(DataLinkError::InvalidCommand(format!(
            "{cmd}: unexpected argument {extra:?}"
        )));
    }
    Ok(())
}

fn parse_int(cmd: &str, s: &str) -> Result<i64> {
    s.parse()
        .map_err(|_| DataLinkError::InvalidCommand(format!("{cmd}: invalid number {s:?}")))
}

fn parse_len(cmd: &str, s: &str) -> Result<usize> {
    s.parse()
        .map_err(|_| DataLinkError::InvalidCommand(format!("{cmd}: invalid length {s:?}")))
}
