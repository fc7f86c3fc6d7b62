// Shared data model for the peer protocol.
//
// Everything here crosses the wire verbatim inside `NetworkMessage` (see
// `message.rs`), so field names are pinned with serde attributes to the
// camelCase JSON shape every participant expects (`isEliminated`, `peerId`,
// `gameData`, ...). Enum values travel as SCREAMING_CASE strings.
//
// `RoomCode` is the host's reachable name. It is generated by the host or
// supplied by the caller and always normalized to uppercase before use, so a
// joiner typing "ab12c" reaches the host registered as "AB12C".

use std::fmt;

use imposter_prng::GameRng;
use serde::{Deserialize, Serialize};

use crate::framing::WireError;

/// Session-scoped player number, assigned by the host in seating order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hidden role dealt to each player for one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Civilian,
    Imposter,
}

impl Role {
    /// The side that wins when a player of this role is accused.
    pub fn opponent(self) -> Role {
        match self {
            Role::Civilian => Role::Imposter,
            Role::Imposter => Role::Civilian,
        }
    }
}

/// How obscure the generated word should be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Average,
    Advanced,
    Expert,
}

/// A citation returned by the content provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// The secret word and imposter hint for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContent {
    pub word: String,
    pub hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl RoundContent {
    pub fn new(word: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            hint: hint.into(),
            sources: None,
        }
    }

    /// Both the word and the hint carry visible text.
    pub fn is_well_formed(&self) -> bool {
        !self.word.trim().is_empty() && !self.hint.trim().is_empty()
    }

    /// The secret shown to a player holding `role`.
    pub fn secret_for(&self, role: Role) -> &str {
        match role {
            Role::Civilian => &self.word,
            Role::Imposter => &self.hint,
        }
    }
}

/// One seat in a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub secret: String,
    pub is_eliminated: bool,
    /// Network address of the participant viewing this seat. `None` in
    /// pass-and-play rounds.
    #[serde(rename = "peerId", default, skip_serializing_if = "Option::is_none")]
    pub peer_address: Option<String>,
}

/// A participant connected to the host before the round starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub name: String,
    #[serde(rename = "peerId")]
    pub peer_address: String,
}

/// Characters a generated room code is drawn from.
const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a host-generated room code.
pub const ROOM_CODE_LEN: usize = 5;

/// The host's reachable name, shared out-of-band with joiners.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a fresh 5-character uppercase alphanumeric code.
    pub fn generate(rng: &mut GameRng) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.range_usize(0, ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Accept a caller-supplied code: trimmed and uppercased. Empty or
    /// whitespace-containing codes are rejected.
    pub fn normalize(raw: &str) -> Result<Self, WireError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(WireError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
