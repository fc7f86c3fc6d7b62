// Protocol messages.
//
// Two vocabularies share the framing in `framing.rs`:
// - `NetworkMessage`: the game protocol carried over every host/joiner
//   channel. Internally tagged by a `type` field whose values (`JOIN`,
//   `START_GAME`, `VOTE_SYNC`, `RESET`, `LOBBY_UPDATE`) and camelCase payload
//   fields are the wire contract.
// - `DirectoryRequest` / `DirectoryResponse`: the rendezvous exchange between
//   a participant and the directory server that maps room codes to socket
//   addresses.
//
// Only the host originates state-changing `NetworkMessage`s. `JOIN` is the
// single joiner-to-host message.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::types::{LobbyEntry, Player, PlayerId, RoomCode, RoundContent};

/// Game messages exchanged between host and joiners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkMessage {
    /// Joiner announces itself once its channel opens.
    Join {
        name: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    /// Host deals a round: content, seats, and discussion length in seconds.
    StartGame {
        #[serde(rename = "gameData")]
        game_data: RoundContent,
        players: Vec<Player>,
        duration: u32,
        category: String,
    },
    /// Host resolved an accusation; receivers replay it locally.
    VoteSync {
        #[serde(rename = "suspectId")]
        suspect_id: PlayerId,
    },
    /// Host returned to setup.
    Reset,
    /// Host's current lobby roster, host first.
    LobbyUpdate { players: Vec<LobbyEntry> },
}

impl NetworkMessage {
    /// Wire name of the message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkMessage::Join { .. } => "JOIN",
            NetworkMessage::StartGame { .. } => "START_GAME",
            NetworkMessage::VoteSync { .. } => "VOTE_SYNC",
            NetworkMessage::Reset => "RESET",
            NetworkMessage::LobbyUpdate { .. } => "LOBBY_UPDATE",
        }
    }
}

/// Requests sent to the directory server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DirectoryRequest {
    /// Claim `code` for the sender's listening address. The claim lasts as
    /// long as the requesting connection stays open.
    Register { code: RoomCode, address: SocketAddr },
    /// Find the host listening under `code`.
    Lookup { code: RoomCode },
}

/// Replies from the directory server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DirectoryResponse {
    Registered { code: RoomCode },
    Rejected { reason: String },
    Found { address: SocketAddr },
    NotFound,
}
