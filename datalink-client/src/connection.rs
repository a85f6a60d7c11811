use std::time::Duration;

use datalink_rs_protocol::frame::{self, MAX_PACKET_SIZE, PREFIX_LEN};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};

pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    io_timeout: Duration,
}

impl Connection {
    pub async fn connect(addr: &str, io_timeout: Duration) -> Result<Self> {
        debug!(addr, "TCP connecting");
        let stream = tokio::time::timeout(io_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout(io_timeout))?
            .map_err(ClientError::Io)?;

        stream.set_nodelay(true).ok();

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            io_timeout,
        })
    }

    /// Write an encoded frame and flush it.
    ///
    /// A transport failure is not retried; the connection is unusable afterwards.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let result = async {
            self.writer.write_all(data).await?;
            self.writer.flush().await
        }
        .await;
        result.map_err(|e| {
            warn!(error = %e, "error sending data");
            ClientError::Send(e)
        })
    }

    /// Receive one frame header.
    ///
    /// Returns `Ok(None)` only when `blocking` is false and nothing has arrived.
    pub async fn recv_frame(&mut self, blocking: bool) -> Result<Option<String>> {
        if !blocking && !self.has_pending().await? {
            return Ok(None);
        }
        self.read_frame().await.map(Some)
    }

    /// Receive one frame header, waiting for it.
    ///
    /// Once the prefix is in, the header is read in full: the length byte
    /// commits the peer to sending it.
    pub async fn read_frame(&mut self) -> Result<String> {
        let mut prefix = [0u8; PREFIX_LEN];
        self.read_exact(&mut prefix).await?;

        let len = frame::parse_prefix(&prefix, MAX_PACKET_SIZE).inspect_err(|e| {
            warn!(error = %e, "no DataLink frame detected");
        })?;

        let header = self.read_committed(len).await?;
        let header = frame::header_text(&header);
        trace!(header, "received");
        Ok(header)
    }

    /// Read `n` bytes whose arrival a previously received header promised.
    ///
    /// Running out of data here is a short read, not a clean disconnect.
    pub async fn read_committed(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        match self.read_exact(&mut buf).await {
            Ok(()) => Ok(buf),
            Err(ClientError::Disconnected) => {
                warn!(expected = n, "connection closed before declared data arrived");
                Err(ClientError::ShortRead {
                    expected: n,
                    actual: 0,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Fill `buf` across as many reads as needed. The I/O timeout applies to
    /// each underlying read.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = tokio::time::timeout(self.io_timeout, self.reader.read(&mut buf[filled..]))
                .await
                .map_err(|_| {
                    debug!(timeout = ?self.io_timeout, filled, "read timeout");
                    ClientError::Timeout(self.io_timeout)
                })?
                .map_err(|e| {
                    warn!(error = %e, expected = buf.len(), filled, "error receiving data");
                    ClientError::Recv(e)
                })?;
            if n == 0 {
                if filled == 0 {
                    return Err(ClientError::Disconnected);
                }
                return Err(ClientError::ShortRead {
                    expected: buf.len(),
                    actual: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Zero-wait probe: is at least one byte (or EOF) ready to be read?
    ///
    /// Consumes nothing.
    async fn has_pending(&mut self) -> Result<bool> {
        if !self.reader.buffer().is_empty() {
            return Ok(true);
        }
        match tokio::time::timeout(Duration::ZERO, self.reader.fill_buf()).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(ClientError::Recv(e)),
            Err(_) => Ok(false),
        }
    }
}
