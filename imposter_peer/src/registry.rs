// Room registry for the directory server.
//
// `Registry` is the state `server.rs` drives: which connection holds which
// room code, and the write half of every open connection. All mutation
// happens on the server's main loop thread, so there is no internal locking.
//
// A code belongs to the connection that registered it and is released when
// that connection disconnects. Lookups are answered from any connection.
// Write errors to a single connection are logged and otherwise ignored; its
// reader thread will report the disconnect.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::{SocketAddr, TcpStream};

use imposter_protocol::framing::send_json;
use imposter_protocol::message::{DirectoryRequest, DirectoryResponse};
use imposter_protocol::types::RoomCode;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

struct Room {
    address: SocketAddr,
    owner: ConnectionId,
}

#[derive(Default)]
pub struct Registry {
    rooms: BTreeMap<RoomCode, Room>,
    writers: BTreeMap<ConnectionId, BufWriter<TcpStream>>,
    next_connection: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection's write half and hand out its id.
    pub fn add_connection(&mut self, stream: TcpStream) -> ConnectionId {
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.writers.insert(id, BufWriter::new(stream));
        id
    }

    /// Forget a connection and every code it held.
    pub fn remove_connection(&mut self, id: ConnectionId) {
        self.writers.remove(&id);
        self.rooms.retain(|code, room| {
            let keep = room.owner != id;
            if !keep {
                info!(%code, "room released");
            }
            keep
        });
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.writers.len()
    }

    pub fn lookup(&self, code: &RoomCode) -> Option<SocketAddr> {
        self.rooms.get(code).map(|room| room.address)
    }

    /// Apply `request` from `from` and send the reply back on its stream.
    pub fn handle(&mut self, from: ConnectionId, request: DirectoryRequest) {
        let response = self.apply(from, request);
        self.send_to(from, &response);
    }

    fn apply(&mut self, from: ConnectionId, request: DirectoryRequest) -> DirectoryResponse {
        match request {
            DirectoryRequest::Register { code, address } => match self.rooms.get(&code) {
                Some(room) if room.owner != from => DirectoryResponse::Rejected {
                    reason: format!("room code {code} is already in use"),
                },
                _ => {
                    info!(%code, %address, "room registered");
                    self.rooms.insert(
                        code.clone(),
                        Room {
                            address,
                            owner: from,
                        },
                    );
                    DirectoryResponse::Registered { code }
                }
            },
            DirectoryRequest::Lookup { code } => match self.lookup(&code) {
                Some(address) => DirectoryResponse::Found { address },
                None => {
                    debug!(%code, "lookup miss");
                    DirectoryResponse::NotFound
                }
            },
        }
    }

    fn send_to(&mut self, id: ConnectionId, response: &DirectoryResponse) {
        let Some(writer) = self.writers.get_mut(&id) else {
            return;
        };
        if let Err(e) = send_json(writer, response) {
            warn!(connection = id.0, error = %e, "failed to send directory reply");
        }
    }
}
