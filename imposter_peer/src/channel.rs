// Framed TCP channel between host and joiner.
//
// A `Channel` owns the write half of one connection. Opening it spawns a
// reader thread that decodes `NetworkMessage`s and pushes them, tagged with
// the channel id, into the coordinator's inbound queue. When the stream ends
// or a frame fails to decode, the reader reports `Inbound::Closed` and exits.
//
// Only the coordinator thread writes; reader threads only read. Dropping a
// `Channel` shuts the socket down in both directions, which unblocks its
// reader and tells the remote end the channel is gone.
//
// The host's accept thread also feeds this queue (`Inbound::Connected`), so
// the coordinator sees every network event through a single receiver.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc::Sender;
use std::thread;

use imposter_protocol::framing::{WireError, recv_json, send_json};
use imposter_protocol::message::NetworkMessage;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

/// Events delivered to the coordinator thread.
#[derive(Debug)]
pub enum Inbound {
    /// The host's listener accepted a connection.
    Connected { stream: TcpStream },
    Message {
        from: ChannelId,
        message: NetworkMessage,
    },
    Closed { from: ChannelId },
}

pub struct Channel {
    id: ChannelId,
    peer: SocketAddr,
    writer: BufWriter<TcpStream>,
}

impl Channel {
    /// Wrap `stream` and start its reader thread.
    pub fn open(
        id: ChannelId,
        stream: TcpStream,
        inbox: Sender<Inbound>,
    ) -> Result<Self, WireError> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        thread::spawn(move || reader_loop(reader, id, inbox));
        debug!(channel = id.0, %peer, "channel open");
        Ok(Self {
            id,
            peer,
            writer: BufWriter::new(stream),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn send(&mut self, message: &NetworkMessage) -> Result<(), WireError> {
        trace!(channel = self.id.0, kind = message.kind(), "send");
        send_json(&mut self.writer, message)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

fn reader_loop(mut reader: BufReader<TcpStream>, id: ChannelId, inbox: Sender<Inbound>) {
    loop {
        match recv_json::<_, NetworkMessage>(&mut reader) {
            Ok(message) => {
                trace!(channel = id.0, kind = message.kind(), "recv");
                if inbox.send(Inbound::Message { from: id, message }).is_err() {
                    // Coordinator is gone.
                    return;
                }
            }
            Err(e) => {
                if !e.is_disconnect() {
                    debug!(channel = id.0, error = %e, "closing channel");
                }
                let _ = inbox.send(Inbound::Closed { from: id });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn messages_cross_and_close_is_reported() {
        let (a, b) = tcp_pair();
        let (tx_a, rx_a) = mpsc::channel();
        let (tx_b, rx_b) = mpsc::channel();
        let mut left = Channel::open(ChannelId(1), a, tx_a).unwrap();
        let right = Channel::open(ChannelId(2), b, tx_b).unwrap();

        left.send(&NetworkMessage::Reset).unwrap();
        match rx_b.recv_timeout(Duration::from_secs(5)).unwrap() {
            Inbound::Message { from, message } => {
                assert_eq!(from, ChannelId(2));
                assert_eq!(message, NetworkMessage::Reset);
            }
            other => panic!("expected message, got {other:?}"),
        }

        drop(right);
        match rx_a.recv_timeout(Duration::from_secs(5)).unwrap() {
            Inbound::Closed { from } => assert_eq!(from, ChannelId(1)),
            other => panic!("expected close, got {other:?}"),
        }
        // Also the dropped side's own reader reports closed.
        assert!(matches!(
            rx_b.recv_timeout(Duration::from_secs(5)).unwrap(),
            Inbound::Closed { .. }
        ));
    }

    #[test]
    fn garbage_frame_closes_channel() {
        use imposter_protocol::framing::write_frame;

        let (a, b) = tcp_pair();
        let (tx, rx) = mpsc::channel();
        let _channel = Channel::open(ChannelId(7), b, tx).unwrap();

        let mut raw = BufWriter::new(a);
        write_frame(&mut raw, br#"{"type":"NOT_A_MESSAGE"}"#).unwrap();

        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Inbound::Closed { from: ChannelId(7) }
        ));
    }
}
