// Per-participant coordinator: one `Session` plus its network link.
//
// A `Coordinator` is created in one of three shapes:
// - `local`: pass-and-play on one device, no network.
// - `host`: listens under a room code, deals rounds, and broadcasts every
//   state change (START_GAME, VOTE_SYNC, RESET, LOBBY_UPDATE) to joiners.
// - `join`: one channel to the host. State changes only arrive as host
//   messages; local reset/accuse are applied immediately but marked
//   speculative, and the next host broadcast overwrites them.
//
// All network input reaches the coordinator through one `mpsc` queue (see
// `channel.rs`). `poll` drains it without blocking; `pump` waits up to a
// timeout for the next event and then drains. Both return `SessionEvent`s for
// the presentation layer. Nothing mutates the session except calls on this
// struct, and this struct lives on one thread.
//
// Host lobby: joiners are listed in join order after the host. When a round
// starts in network mode, the roster replaces the configured player names
// and each seat is stamped with its viewer's address so every participant
// can find its own seat in START_GAME.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use imposter_game::config::{CustomItem, SessionConfig};
use imposter_game::content::{
    ContentProvider, ContentRequest, OfflineProvider, generate_with_fallback,
};
use imposter_game::state::{Mode, Phase, Session, SessionError};
use imposter_prng::GameRng;
use imposter_protocol::message::NetworkMessage;
use imposter_protocol::types::{LobbyEntry, PlayerId, Role, RoomCode};
use tracing::{debug, info, warn};

use crate::channel::{ChannelId, Inbound};
use crate::client::{HOST_CHANNEL, JoinerEndpoint};
use crate::config::PeerConfig;
use crate::directory::Directory;
use crate::error::{CoordinatorError, PeerError};
use crate::host::HostEndpoint;

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(Phase),
    LobbyChanged(Vec<LobbyEntry>),
    JoinerConnected { name: String },
    JoinerLeft { name: String },
    /// The joiner's channel to the host closed. The session keeps its last
    /// state but will receive no further updates.
    HostLost,
}

enum Link {
    Local,
    Host(HostEndpoint),
    Joiner(JoinerEndpoint),
}

struct LobbySeat {
    channel: ChannelId,
    entry: LobbyEntry,
}

pub struct Coordinator {
    session: Session,
    link: Link,
    config: PeerConfig,
    provider: Arc<dyn ContentProvider>,
    rng: GameRng,
    /// Host: joiners in join order.
    joiners: Vec<LobbySeat>,
    /// Joiner: last roster received from the host.
    lobby: Vec<LobbyEntry>,
    inbox: Receiver<Inbound>,
    outbox: Sender<Inbound>,
}

impl Coordinator {
    fn with_link(mode: Mode, link: Link, config: PeerConfig, rng: GameRng) -> Self {
        let (outbox, inbox) = mpsc::channel();
        Self {
            session: Session::new(mode),
            link,
            config,
            provider: Arc::new(OfflineProvider),
            rng,
            joiners: Vec::new(),
            lobby: Vec::new(),
            inbox,
            outbox,
        }
    }

    /// Pass-and-play on this device.
    pub fn local(config: PeerConfig) -> Self {
        Self::with_link(Mode::Local, Link::Local, config, GameRng::from_entropy())
    }

    /// Open a room. Returns once the listener is bound and the code is
    /// registered; joiners are accepted as `poll`/`pump` run.
    pub fn host(
        directory: &dyn Directory,
        desired_code: Option<&str>,
        config: PeerConfig,
    ) -> Result<Self, PeerError> {
        let mut coordinator =
            Self::with_link(Mode::Network, Link::Local, config, GameRng::from_entropy());
        let endpoint = HostEndpoint::open(
            directory,
            desired_code,
            &coordinator.config,
            &mut coordinator.rng,
            coordinator.outbox.clone(),
        )?;
        coordinator
            .session
            .set_self_address(endpoint.room_code().as_str());
        coordinator.link = Link::Host(endpoint);
        Ok(coordinator)
    }

    /// Connect to the host registered under `code` and announce ourselves.
    pub fn join(
        directory: &dyn Directory,
        code: &str,
        display_name: &str,
        config: PeerConfig,
    ) -> Result<Self, PeerError> {
        let mut coordinator =
            Self::with_link(Mode::Network, Link::Local, config, GameRng::from_entropy());
        let endpoint = JoinerEndpoint::connect(
            directory,
            code,
            display_name,
            &coordinator.config,
            coordinator.outbox.clone(),
        )?;
        coordinator.session.set_self_address(endpoint.self_address());
        coordinator.link = Link::Joiner(endpoint);
        Ok(coordinator)
    }

    pub fn with_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_rng(mut self, rng: GameRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn is_host(&self) -> bool {
        matches!(self.link, Link::Host(_))
    }

    pub fn is_joiner(&self) -> bool {
        matches!(self.link, Link::Joiner(_))
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        match &self.link {
            Link::Host(host) => Some(host.room_code()),
            Link::Joiner(joiner) => Some(joiner.room_code()),
            Link::Local => None,
        }
    }

    /// Open joiner channels (host) or 1 while connected to a host (joiner).
    pub fn open_channels(&self) -> usize {
        match &self.link {
            Link::Host(host) => host.channel_count(),
            Link::Joiner(_) => 1,
            Link::Local => 0,
        }
    }

    /// The current roster. On the host this is authoritative; on a joiner it
    /// is the last LOBBY_UPDATE received.
    pub fn lobby(&self) -> Vec<LobbyEntry> {
        match &self.link {
            Link::Host(host) => std::iter::once(LobbyEntry {
                name: self.config.display_name.clone(),
                peer_address: host.room_code().to_string(),
            })
            .chain(self.joiners.iter().map(|seat| seat.entry.clone()))
            .collect(),
            Link::Joiner(_) => self.lobby.clone(),
            Link::Local => Vec::new(),
        }
    }

    /// Deal a new round. In network mode the lobby roster supplies the
    /// player names and the round is broadcast to every joiner.
    pub fn start_round(&mut self, config: SessionConfig) -> Result<(), CoordinatorError> {
        if self.is_joiner() {
            return Err(CoordinatorError::NotHost("start a round"));
        }
        let phase = self.session.phase();
        if !matches!(phase, Phase::Setup | Phase::Winner) {
            return Err(SessionError::InvalidTransition {
                phase,
                action: "start a round",
            }
            .into());
        }

        let (config, addresses) = if self.is_host() {
            let roster = self.lobby();
            let config = SessionConfig {
                player_names: roster.iter().map(|e| e.name.clone()).collect(),
                ..config
            };
            let addresses: Vec<String> = roster.into_iter().map(|e| e.peer_address).collect();
            (config, Some(addresses))
        } else {
            (config, None)
        };
        // Reject before spending a provider call.
        config.validate()?;

        let request = ContentRequest {
            category: config.category.clone(),
            difficulty: config.difficulty,
            custom_items: config.custom_items().map(<[CustomItem]>::to_vec),
        };
        let content = generate_with_fallback(
            &self.provider,
            &request,
            self.config.content_timeout,
            &mut self.rng,
        );
        self.session
            .begin_round(config, content, addresses.as_deref(), &mut self.rng)?;
        info!(players = self.session.players().len(), "round started");

        if let (Some(message), Link::Host(host)) = (self.start_game_message(), &mut self.link) {
            host.broadcast(&message);
        }
        Ok(())
    }

    /// Deal again with the previous round's settings.
    pub fn restart(&mut self) -> Result<(), CoordinatorError> {
        if self.is_joiner() {
            return Err(CoordinatorError::NotHost("restart"));
        }
        let config = self.session.restart_config()?;
        self.start_round(config)
    }

    fn start_game_message(&self) -> Option<NetworkMessage> {
        let content = self.session.content()?;
        let config = self.session.last_config()?;
        Some(NetworkMessage::StartGame {
            game_data: content.clone(),
            players: self.session.players().to_vec(),
            duration: config.discussion_duration_secs,
            category: config.category.clone(),
        })
    }

    pub fn acknowledge_reveal(&mut self) -> Result<Phase, CoordinatorError> {
        Ok(self.session.advance_reveal()?)
    }

    /// Advance the discussion clock. Returns true when voting opens.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.session.tick(elapsed)
    }

    pub fn end_discussion(&mut self) -> Result<(), CoordinatorError> {
        Ok(self.session.end_discussion()?)
    }

    /// Accuse `id`. Returns the winning side, or `None` when `id` names no
    /// live player (ignored).
    pub fn accuse(&mut self, id: PlayerId) -> Result<Option<Role>, CoordinatorError> {
        let winner = match self.session.accuse(id) {
            Ok(winner) => winner,
            Err(SessionError::InvalidVote(e)) => {
                debug!(error = %e, "ignoring accusation");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        match &mut self.link {
            Link::Host(host) => {
                host.broadcast(&NetworkMessage::VoteSync { suspect_id: id });
            }
            Link::Joiner(_) => self.session.mark_speculative(),
            Link::Local => {}
        }
        Ok(Some(winner))
    }

    /// Back to setup. From the host this is broadcast, followed by the
    /// current roster; from a joiner it is local only.
    pub fn reset(&mut self) {
        self.session.reset();
        match &mut self.link {
            Link::Host(host) => {
                host.broadcast(&NetworkMessage::Reset);
            }
            Link::Joiner(_) => self.session.mark_speculative(),
            Link::Local => {}
        }
        self.announce_lobby();
    }

    /// Send `message` to every joiner. Returns how many channels took it.
    pub fn broadcast(&mut self, message: &NetworkMessage) -> Result<usize, CoordinatorError> {
        match &mut self.link {
            Link::Host(host) => Ok(host.broadcast(message)),
            _ => Err(CoordinatorError::NotHost("broadcast")),
        }
    }

    /// Apply one inbound message. `from` is the channel it arrived on.
    pub fn on_message(
        &mut self,
        message: NetworkMessage,
        from: Option<ChannelId>,
    ) -> Vec<SessionEvent> {
        match self.link {
            Link::Host(_) => self.on_joiner_message(message, from),
            Link::Joiner(_) => self.on_host_message(message),
            Link::Local => {
                debug!(kind = message.kind(), "ignoring network message in local mode");
                Vec::new()
            }
        }
    }

    fn on_joiner_message(
        &mut self,
        message: NetworkMessage,
        from: Option<ChannelId>,
    ) -> Vec<SessionEvent> {
        let (NetworkMessage::Join { name, peer_id }, Some(channel)) = (&message, from) else {
            debug!(kind = message.kind(), "ignoring non-authoritative message from joiner");
            return Vec::new();
        };

        let entry = LobbyEntry {
            name: name.clone(),
            peer_address: peer_id.clone(),
        };
        match self.joiners.iter_mut().find(|seat| seat.channel == channel) {
            Some(seat) => seat.entry = entry,
            None => self.joiners.push(LobbySeat { channel, entry }),
        }
        info!(%name, peer = %peer_id, "joiner registered");

        let mut events = vec![SessionEvent::JoinerConnected { name: name.clone() }];
        events.extend(self.announce_lobby());
        events
    }

    fn on_host_message(&mut self, message: NetworkMessage) -> Vec<SessionEvent> {
        match message {
            NetworkMessage::StartGame {
                game_data,
                players,
                duration,
                category,
            } => {
                self.session
                    .adopt_round(game_data, players, duration, &category);
                vec![SessionEvent::PhaseChanged(Phase::Reveal)]
            }
            NetworkMessage::VoteSync { suspect_id } => {
                match self.session.apply_vote_sync(suspect_id) {
                    Ok(_) => vec![SessionEvent::PhaseChanged(Phase::Winner)],
                    Err(e) => {
                        debug!(error = %e, "ignoring vote sync");
                        Vec::new()
                    }
                }
            }
            NetworkMessage::Reset => {
                self.session.reset();
                vec![SessionEvent::PhaseChanged(Phase::Setup)]
            }
            NetworkMessage::LobbyUpdate { players } => {
                self.lobby = players.clone();
                vec![SessionEvent::LobbyChanged(players)]
            }
            NetworkMessage::Join { .. } => {
                debug!("ignoring JOIN sent to a joiner");
                Vec::new()
            }
        }
    }

    /// Broadcast the roster while the lobby is open.
    fn announce_lobby(&mut self) -> Option<SessionEvent> {
        if self.session.phase() != Phase::Setup {
            return None;
        }
        let players = self.lobby();
        if let Link::Host(host) = &mut self.link {
            host.broadcast(&NetworkMessage::LobbyUpdate {
                players: players.clone(),
            });
        }
        Some(SessionEvent::LobbyChanged(players))
    }

    fn channel_closed(&mut self, from: ChannelId) -> Vec<SessionEvent> {
        if let Link::Joiner(endpoint) = &self.link {
            if from != HOST_CHANNEL {
                return Vec::new();
            }
            warn!(host = %endpoint.channel().peer(), "lost connection to host");
            return vec![SessionEvent::HostLost];
        }
        let Link::Host(host) = &mut self.link else {
            return Vec::new();
        };
        host.remove(from);
        let Some(pos) = self.joiners.iter().position(|seat| seat.channel == from) else {
            return Vec::new();
        };
        let seat = self.joiners.remove(pos);
        info!(name = %seat.entry.name, "joiner left");
        let mut events = vec![SessionEvent::JoinerLeft {
            name: seat.entry.name,
        }];
        events.extend(self.announce_lobby());
        events
    }

    fn handle_inbound(&mut self, event: Inbound) -> Vec<SessionEvent> {
        match event {
            Inbound::Connected { stream } => {
                if let Link::Host(host) = &mut self.link {
                    host.accept(stream, self.outbox.clone());
                }
                Vec::new()
            }
            Inbound::Message { from, message } => self.on_message(message, Some(from)),
            Inbound::Closed { from } => self.channel_closed(from),
        }
    }

    /// Apply every queued network event without blocking.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            events.extend(self.handle_inbound(event));
        }
        events
    }

    /// Wait up to `timeout` for a network event, then drain the queue.
    pub fn pump(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        match self.inbox.recv_timeout(timeout) {
            Ok(event) => {
                let mut events = self.handle_inbound(event);
                events.extend(self.poll());
                events
            }
            Err(_) => Vec::new(),
        }
    }
}
