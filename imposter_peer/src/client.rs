// Joiner side: resolve a room code and dial the host.
//
// `JoinerEndpoint::connect` runs on the calling thread:
// 1. normalize the code and resolve it through the directory;
// 2. open a TCP connection to the registered address;
// 3. start the channel's reader thread;
// 4. send JOIN with our display name and our own address.
//
// The address we announce is the local end of the connection, which is
// exactly what the host sees as the peer address of our channel. It becomes
// the `peerId` stamped on our seat so we can find it in START_GAME.
//
// A code that does not resolve, or resolves to an address where nothing is
// listening any more, is `PeerUnreachable`. Any other transport failure is a
// `Channel` error.

use std::io;
use std::net::TcpStream;
use std::sync::mpsc::Sender;

use imposter_protocol::message::NetworkMessage;
use imposter_protocol::types::RoomCode;
use tracing::info;

use crate::channel::{Channel, ChannelId, Inbound};
use crate::config::PeerConfig;
use crate::directory::Directory;
use crate::error::PeerError;

/// Channel id the joiner uses for its single host link.
pub const HOST_CHANNEL: ChannelId = ChannelId(0);

pub struct JoinerEndpoint {
    room_code: RoomCode,
    self_address: String,
    channel: Channel,
}

impl JoinerEndpoint {
    pub fn connect(
        directory: &dyn Directory,
        code: &str,
        display_name: &str,
        config: &PeerConfig,
        inbox: Sender<Inbound>,
    ) -> Result<Self, PeerError> {
        let room_code =
            RoomCode::normalize(code).map_err(|_| PeerError::PeerUnreachable(code.to_string()))?;
        let addr = directory
            .resolve(&room_code)?
            .ok_or_else(|| PeerError::PeerUnreachable(room_code.to_string()))?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::ConnectionRefused {
                PeerError::PeerUnreachable(room_code.to_string())
            } else {
                e.into()
            }
        })?;
        let self_address = stream.local_addr()?.to_string();

        let mut channel = Channel::open(HOST_CHANNEL, stream, inbox)?;
        channel.send(&NetworkMessage::Join {
            name: display_name.to_string(),
            peer_id: self_address.clone(),
        })?;

        info!(code = %room_code, host = %addr, me = %self_address, "joined room");
        Ok(Self {
            room_code,
            self_address,
            channel,
        })
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn self_address(&self) -> &str {
        &self.self_address
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }
}
