use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use datalink_rs_protocol::frame::{self, PREFIX_LEN};
use datalink_rs_protocol::{Command, PacketId};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

pub const DEFAULT_ID: &str = "ID DataLink 2018.078 :: DLPROTO:1.0 PACKETSIZE:16384 WRITE";

pub struct MockConfig {
    pub id_reply: String,
    /// Frames sent after STREAM.
    pub packets: Vec<Vec<u8>>,
    /// Frames still in flight when ENDSTREAM arrives; sent before the final `ENDSTREAM`.
    pub drain_packets: Vec<Vec<u8>>,
    pub matched: usize,
    pub info: String,
    /// Status token of the INFO reply.
    pub info_status: &'static str,
    /// Commands (by name) answered with an ERROR reply.
    pub fail: Vec<&'static str>,
    pub stream_delay: Option<Duration>,
    pub close_after_stream: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            id_reply: DEFAULT_ID.to_owned(),
            packets: Vec::new(),
            drain_packets: Vec::new(),
            matched: 0,
            info: "<DataLink/>".to_owned(),
            info_status: "INFO",
            fail: Vec::new(),
            stream_delay: None,
            close_after_stream: false,
        }
    }
}

impl MockConfig {
    pub fn with_packets(packets: Vec<Vec<u8>>) -> Self {
        Self {
            packets,
            ..Self::default()
        }
    }
}

/// `PACKET` frame with times derived from the id.
pub fn packet_frame(stream_id: &str, id: i64, payload: &[u8]) -> Vec<u8> {
    let header = format!(
        "PACKET {stream_id} {id} {} {} {} {}",
        id * 1_000_000,
        id * 1_000_000 - 100_000,
        id * 1_000_000 - 40_000,
        payload.len()
    );
    frame::write(&header, payload).unwrap()
}

pub fn reply_frame(status: &str, value: &str, message: &str) -> Vec<u8> {
    let header = format!("{status} {value} {}", message.len());
    frame::write(&header, message.as_bytes()).unwrap()
}

pub struct MockServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        tokio::spawn(async move {
            Self::handle_connections(listener, config, log).await;
        });

        Self { addr, received }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Headers received so far, in order.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    async fn handle_connections(
        listener: TcpListener,
        config: MockConfig,
        received: Arc<Mutex<Vec<String>>>,
    ) {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        loop {
            let mut prefix = [0u8; PREFIX_LEN];
            if reader.read_exact(&mut prefix).await.is_err() {
                break;
            }
            let Ok(len) = frame::parse_prefix(&prefix, frame::MAX_HEADER_LEN) else {
                break;
            };
            let mut header = vec![0u8; len];
            if reader.read_exact(&mut header).await.is_err() {
                break;
            }
            let header = frame::header_text(&header);

            let cmd = match Command::parse(&header) {
                Ok(cmd) => cmd,
                Err(_) => {
                    let bytes = reply_frame("ERROR", "0", "unrecognized command");
                    if write_half.write_all(&bytes).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let mut payload = vec![0u8; cmd.payload_len()];
            if reader.read_exact(&mut payload).await.is_err() {
                break;
            }
            received.lock().unwrap().push(header);

            if config.fail.contains(&cmd.name()) {
                let message = format!("{} failed", cmd.name());
                let bytes = reply_frame("ERROR", "0", &message);
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
                continue;
            }

            let out: Vec<u8> = match &cmd {
                Command::Id { .. } => frame::write(&config.id_reply, b"").unwrap(),
                Command::Info { kind, .. } => reply_frame(config.info_status, kind, &config.info),
                Command::Match { .. } | Command::Reject { .. } => reply_frame(
                    "OK",
                    &config.matched.to_string(),
                    &format!("{} streams selected", config.matched),
                ),
                Command::PositionSet { id, .. } => {
                    let id = if id.is_special() {
                        PacketId::new(1)
                    } else {
                        *id
                    };
                    reply_frame(
                        "OK",
                        &id.value().to_string(),
                        &format!("Positioned to packet ID {}", id.value()),
                    )
                }
                Command::PositionAfter { .. } => {
                    reply_frame("OK", "1", "Positioned to packet ID 1")
                }
                Command::Read { id } => {
                    let index = usize::try_from(id.value() - 1).ok();
                    match index.and_then(|i| config.packets.get(i)) {
                        Some(packet) => packet.clone(),
                        None => reply_frame("ERROR", "0", "Packet not found"),
                    }
                }
                Command::Write { ack, len, .. } => {
                    if *ack {
                        reply_frame("OK", "0", &format!("Received {len} bytes"))
                    } else {
                        Vec::new()
                    }
                }
                Command::Stream => {
                    if let Some(delay) = config.stream_delay {
                        tokio::time::sleep(delay).await;
                    }
                    config.packets.concat()
                }
                Command::EndStream => {
                    let mut out = config.drain_packets.concat();
                    out.extend(frame::write("ENDSTREAM", b"").unwrap());
                    out
                }
            };

            if write_half.write_all(&out).await.is_err() {
                break;
            }
            let _ = write_half.flush().await;

            if matches!(cmd, Command::Stream) && config.close_after_stream {
                break;
            }
        }
    }
}
