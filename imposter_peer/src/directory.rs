// Room code resolution.
//
// A host claims a room code for its listening address; joiners resolve a code
// back to that address. The `Directory` trait is the seam, with two
// implementations:
// - `MemoryDirectory`: a shared in-process map. Clones share the map, so a
//   host and its joiners in one process (tests, hot-seat demos) can find each
//   other without a server.
// - `RemoteDirectory`: a client of the directory server in `server.rs`. A
//   registration holds its TCP connection open; the server drops the claim
//   when that connection closes.
//
// A claim is represented by a `Registration` guard. Dropping it releases the
// code.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use imposter_protocol::framing::{recv_json, send_json};
use imposter_protocol::message::{DirectoryRequest, DirectoryResponse};
use imposter_protocol::types::RoomCode;
use tracing::debug;

use crate::error::PeerError;

pub trait Directory: Send + Sync {
    /// Claim `code` for `address`. Fails with `ChannelInit` if the code is
    /// already held or the directory cannot be reached.
    fn register(&self, code: &RoomCode, address: SocketAddr) -> Result<Registration, PeerError>;

    /// The address currently registered under `code`, if any.
    fn resolve(&self, code: &RoomCode) -> Result<Option<SocketAddr>, PeerError>;
}

/// A held room code. Released on drop.
pub struct Registration {
    code: RoomCode,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Registration {
    fn new(code: RoomCode, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            code,
            release: Some(Box::new(release)),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    rooms: Arc<Mutex<HashMap<RoomCode, SocketAddr>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for MemoryDirectory {
    fn register(&self, code: &RoomCode, address: SocketAddr) -> Result<Registration, PeerError> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        if rooms.contains_key(code) {
            return Err(PeerError::ChannelInit(format!(
                "room code {code} is already in use"
            )));
        }
        rooms.insert(code.clone(), address);

        let shared = Arc::clone(&self.rooms);
        let owned = code.clone();
        Ok(Registration::new(code.clone(), move || {
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&owned);
        }))
    }

    fn resolve(&self, code: &RoomCode) -> Result<Option<SocketAddr>, PeerError> {
        Ok(self
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .copied())
    }
}

/// Client for a directory server.
#[derive(Clone, Debug)]
pub struct RemoteDirectory {
    server: SocketAddr,
    timeout: Duration,
}

impl RemoteDirectory {
    pub fn new(server: SocketAddr) -> Self {
        Self {
            server,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn exchange(
        &self,
        request: &DirectoryRequest,
    ) -> Result<(TcpStream, DirectoryResponse), PeerError> {
        let stream = TcpStream::connect_timeout(&self.server, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        let mut writer = BufWriter::new(stream.try_clone()?);
        send_json(&mut writer, request)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let response = recv_json(&mut reader)?;
        Ok((stream, response))
    }
}

impl Directory for RemoteDirectory {
    fn register(&self, code: &RoomCode, address: SocketAddr) -> Result<Registration, PeerError> {
        let request = DirectoryRequest::Register {
            code: code.clone(),
            address,
        };
        let (stream, response) = self.exchange(&request).map_err(|e| {
            PeerError::ChannelInit(format!("directory {} unreachable: {e}", self.server))
        })?;
        match response {
            DirectoryResponse::Registered { .. } => {
                debug!(%code, %address, "room code registered");
                // The claim lives as long as this connection.
                stream.set_read_timeout(None)?;
                Ok(Registration::new(code.clone(), move || {
                    let _ = stream.shutdown(Shutdown::Both);
                }))
            }
            DirectoryResponse::Rejected { reason } => Err(PeerError::ChannelInit(reason)),
            other => Err(PeerError::ChannelInit(format!(
                "unexpected directory reply: {other:?}"
            ))),
        }
    }

    fn resolve(&self, code: &RoomCode) -> Result<Option<SocketAddr>, PeerError> {
        let request = DirectoryRequest::Lookup { code: code.clone() };
        let (stream, response) = self.exchange(&request)?;
        let _ = stream.shutdown(Shutdown::Both);
        match response {
            DirectoryResponse::Found { address } => Ok(Some(address)),
            DirectoryResponse::NotFound => Ok(None),
            DirectoryResponse::Rejected { reason } => Err(io::Error::other(reason).into()),
            DirectoryResponse::Registered { .. } => Ok(None),
        }
    }
}
