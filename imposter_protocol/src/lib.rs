// imposter_protocol — wire protocol for Imposter peer sessions.
//
// Defines the data model that crosses the network, the message vocabularies,
// and the framing used by `imposter_peer` on both the host and joiner side.
// Has no dependency on the game rules crate or on any transport.
//
// Module overview:
// - `types.rs`:    `Player`, `PlayerId`, `Role`, `Difficulty`, `RoundContent`,
//                  `Source`, `LobbyEntry`, `RoomCode`.
// - `message.rs`:  `NetworkMessage` (host/joiner game messages) and the
//                  `DirectoryRequest` / `DirectoryResponse` rendezvous pair.
// - `framing.rs`:  Length-delimited JSON frames over any `Read`/`Write`
//                  stream, plus `WireError`.
//
// Design decisions:
// - **JSON payloads.** The game message shapes are a fixed, structurally
//   typed contract (`{"type":"VOTE_SYNC","suspectId":2}`); serde attributes
//   pin the names so the Rust field names stay idiomatic.
// - **No async runtime.** Framing is plain `std::io`, used from blocking
//   reader threads.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_FRAME_SIZE, WireError, read_frame, recv_json, send_json, write_frame};
pub use message::{DirectoryRequest, DirectoryResponse, NetworkMessage};
pub use types::{
    Difficulty, LobbyEntry, Player, PlayerId, ROOM_CODE_LEN, Role, RoomCode, RoundContent, Source,
};
