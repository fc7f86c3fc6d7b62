// Error taxonomy for session coordination.
//
// `PeerError` covers the transport boundary: establishing our own identity
// (`ChannelInit`), finding a host (`PeerUnreachable`), and moving bytes
// (`Channel`). `CoordinatorError` wraps it together with the game crate's
// rule errors for the coordinator's public operations.
//
// Content generation failures never appear here; they are absorbed by the
// fallback in `imposter_game::content`. Invalid vote targets are absorbed by
// the coordinator as no-ops.

use std::io;

use imposter_game::{ConfigError, SessionError};
use imposter_protocol::framing::WireError;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Our own network identity could not be established.
    #[error("could not open a room: {0}")]
    ChannelInit(String),
    /// The room code does not lead to a listening host.
    #[error("room {0} not found")]
    PeerUnreachable(String),
    /// Generic transport failure.
    #[error("connection failed: {0}")]
    Channel(#[from] WireError),
}

impl From<io::Error> for PeerError {
    fn from(e: io::Error) -> Self {
        PeerError::Channel(WireError::Io(e))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("only the host can {0}")]
    NotHost(&'static str),
}
