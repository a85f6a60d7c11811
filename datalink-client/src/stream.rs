use futures_core::Stream;

use crate::DataLinkClient;
use crate::error::ClientError;
use crate::state::{Collected, Packet};

/// Convert a [`DataLinkClient`] into a [`Stream`] of packets.
///
/// Polling the stream drives [`collect(false, true)`](DataLinkClient::collect),
/// which sends STREAM first if the client is idle. The stream ends after the
/// server's `ENDSTREAM` (the client was already draining) or once the client
/// is terminated through a [`Terminator`](crate::Terminator).
pub fn packet_stream(mut client: DataLinkClient) -> impl Stream<Item = Result<Packet, ClientError>> {
    async_stream::try_stream! {
        loop {
            match client.collect(false, true).await? {
                Collected::Packet(packet) => yield packet,
                Collected::Drained | Collected::Terminated | Collected::NoData => break,
            }
        }
        client.close();
    }
}
