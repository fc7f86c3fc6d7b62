// Host side of the star topology.
//
// `HostEndpoint` binds a listener, claims a room code in the directory, and
// holds one `Channel` per joiner. The accept thread only hands raw streams to
// the coordinator queue; channels are opened on the coordinator thread so all
// writes happen there.
//
// `broadcast` is fire-and-forget. A send failure on one channel is logged and
// that channel is dropped; its reader thread reports the close, and the rest
// of the fan-out continues.

use std::collections::BTreeMap;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use imposter_prng::GameRng;
use imposter_protocol::message::NetworkMessage;
use imposter_protocol::types::RoomCode;
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelId, Inbound};
use crate::config::PeerConfig;
use crate::directory::{Directory, Registration};
use crate::error::PeerError;

pub struct HostEndpoint {
    registration: Registration,
    channels: BTreeMap<ChannelId, Channel>,
    next_channel: u64,
    keep_running: Arc<AtomicBool>,
}

impl HostEndpoint {
    /// Bind, register, and start accepting. `desired_code` is normalized; a
    /// random code is generated when none is given.
    pub fn open(
        directory: &dyn Directory,
        desired_code: Option<&str>,
        config: &PeerConfig,
        rng: &mut GameRng,
        inbox: Sender<Inbound>,
    ) -> Result<Self, PeerError> {
        let code = match desired_code {
            Some(raw) => {
                RoomCode::normalize(raw).map_err(|e| PeerError::ChannelInit(e.to_string()))?
            }
            None => RoomCode::generate(rng),
        };

        let listener = TcpListener::bind(config.bind_address)
            .map_err(|e| PeerError::ChannelInit(format!("bind {}: {e}", config.bind_address)))?;
        let local = listener
            .local_addr()
            .map_err(|e| PeerError::ChannelInit(e.to_string()))?;
        let listen_addr = config.advertised(local);
        let registration = directory.register(&code, listen_addr)?;

        let keep_running = Arc::new(AtomicBool::new(true));
        spawn_accept_loop(listener, keep_running.clone(), inbox)
            .map_err(|e| PeerError::ChannelInit(e.to_string()))?;

        info!(%code, addr = %listen_addr, "hosting");
        Ok(Self {
            registration,
            channels: BTreeMap::new(),
            next_channel: 0,
            keep_running,
        })
    }

    pub fn room_code(&self) -> &RoomCode {
        self.registration.code()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Open a channel for an accepted stream.
    pub fn accept(&mut self, stream: TcpStream, inbox: Sender<Inbound>) -> Option<ChannelId> {
        let id = ChannelId(self.next_channel);
        self.next_channel += 1;
        match Channel::open(id, stream, inbox) {
            Ok(channel) => {
                self.channels.insert(id, channel);
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "could not open joiner channel");
                None
            }
        }
    }

    pub fn remove(&mut self, id: ChannelId) -> bool {
        self.channels.remove(&id).is_some()
    }

    /// Send `message` on every open channel. Returns how many sends succeeded.
    pub fn broadcast(&mut self, message: &NetworkMessage) -> usize {
        let mut failed = Vec::new();
        for (id, channel) in &mut self.channels {
            if let Err(e) = channel.send(message) {
                warn!(channel = id.0, kind = message.kind(), error = %e, "broadcast send failed");
                failed.push(*id);
            }
        }
        for id in &failed {
            self.channels.remove(id);
        }
        debug!(kind = message.kind(), sent = self.channels.len(), "broadcast");
        self.channels.len()
    }
}

impl Drop for HostEndpoint {
    fn drop(&mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }
}

fn spawn_accept_loop(
    listener: TcpListener,
    keep_running: Arc<AtomicBool>,
    inbox: Sender<Inbound>,
) -> io::Result<()> {
    // Non-blocking so the loop can notice shutdown.
    listener.set_nonblocking(true)?;
    thread::spawn(move || {
        while keep_running.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!(%addr, "joiner connected");
                    stream.set_nonblocking(false).ok();
                    if inbox.send(Inbound::Connected { stream }).is_err() {
                        break;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    });
    Ok(())
}
