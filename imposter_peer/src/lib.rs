// imposter_peer — host/joiner session coordination for Imposter.
//
// Participants form a star: one host listens under a room code, joiners dial
// it, and only the host originates state-changing messages. Room codes are
// resolved through a `Directory`, either in-process or via the standalone
// directory server.
//
// Module overview:
// - `coordinator.rs`: `Coordinator`, the per-participant dispatch loop that
//                     owns a `Session` and turns local actions and inbound
//                     messages into transitions and broadcasts.
// - `host.rs`:        listener, room code registration, joiner channels,
//                     fire-and-forget broadcast.
// - `client.rs`:      joiner connect: resolve, dial, send JOIN.
// - `channel.rs`:     framed TCP channel with a reader thread feeding the
//                     coordinator's `mpsc` queue.
// - `directory.rs`:   `Directory` trait, `MemoryDirectory`, `RemoteDirectory`.
// - `registry.rs`:    room code state for the directory server.
// - `server.rs`:      directory server listener and main loop.
// - `config.rs`:      `PeerConfig`.
// - `error.rs`:       `PeerError`, `CoordinatorError`.
//
// Everything is `std::net` plus threads; there is no async runtime.

pub mod channel;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod host;
pub mod registry;
pub mod server;

pub use config::PeerConfig;
pub use coordinator::{Coordinator, SessionEvent};
pub use directory::{Directory, MemoryDirectory, Registration, RemoteDirectory};
pub use error::{CoordinatorError, PeerError};
pub use server::{DirectoryConfig, DirectoryHandle, start_directory};
