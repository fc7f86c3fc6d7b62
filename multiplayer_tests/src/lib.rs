// Test-only participant for multiplayer integration tests.
//
// Wraps a real `Coordinator` (from `imposter_peer`) to give tests a
// synchronous API for the full path: host → directory → join → START_GAME /
// VOTE_SYNC / RESET → every participant's `Session`.
//
// The only test-specific code is the blocking wait loops around
// `Coordinator::pump`. Events that arrive while waiting for something else
// are kept in a backlog so a later wait can still see them.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::sync::Arc;
use std::time::{Duration, Instant};

use imposter_game::content::ContentProvider;
use imposter_game::state::Phase;
use imposter_peer::PeerConfig;
use imposter_peer::coordinator::{Coordinator, SessionEvent};
use imposter_peer::directory::MemoryDirectory;
use imposter_prng::GameRng;
use imposter_protocol::types::Player;

/// Default timeout for blocking waits.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Slice handed to each `pump` call.
const PUMP_INTERVAL: Duration = Duration::from_millis(20);

pub struct TestParticipant {
    pub peer: Coordinator,
    backlog: Vec<SessionEvent>,
}

impl TestParticipant {
    pub fn host(directory: &MemoryDirectory, code: Option<&str>, name: &str) -> Self {
        let config = PeerConfig {
            display_name: name.into(),
            ..PeerConfig::default()
        };
        let peer = Coordinator::host(directory, code, config)
            .expect("TestParticipant::host failed")
            .with_rng(GameRng::new(0x1A2B));
        Self::wrap(peer)
    }

    pub fn join(directory: &MemoryDirectory, code: &str, name: &str) -> Self {
        let peer = Coordinator::join(directory, code, name, PeerConfig::default())
            .expect("TestParticipant::join failed");
        Self::wrap(peer)
    }

    fn wrap(peer: Coordinator) -> Self {
        Self {
            peer,
            backlog: Vec::new(),
        }
    }

    pub fn with_provider(self, provider: Arc<dyn ContentProvider>) -> Self {
        Self {
            peer: self.peer.with_provider(provider),
            backlog: self.backlog,
        }
    }

    /// Block until an event matching `pred` arrives, and return it.
    pub fn wait_for(&mut self, what: &str, pred: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        let start = Instant::now();
        loop {
            if let Some(pos) = self.backlog.iter().position(&pred) {
                return self.backlog.remove(pos);
            }
            assert!(start.elapsed() < WAIT_TIMEOUT, "timed out waiting for {what}");
            let events = self.peer.pump(PUMP_INTERVAL);
            self.backlog.extend(events);
        }
    }

    pub fn wait_for_phase(&mut self, phase: Phase) {
        self.wait_for(&format!("{phase:?}"), |e| *e == SessionEvent::PhaseChanged(phase));
        assert_eq!(self.peer.phase(), phase);
    }

    /// Let pending network events settle without waiting for anything in
    /// particular.
    pub fn settle(&mut self, duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {
            let events = self.peer.pump(PUMP_INTERVAL);
            self.backlog.extend(events);
        }
    }

    /// The seat stamped with this participant's own address.
    pub fn my_seat(&self) -> Option<&Player> {
        let me = self.peer.session().self_address()?;
        self.peer
            .session()
            .players()
            .iter()
            .find(|p| p.peer_address.as_deref() == Some(me))
    }
}

/// Open a room on a fresh in-memory directory and connect `joiners` to it in
/// order. Returns once the host has registered every joiner and every joiner
/// has seen the full roster.
pub fn start_room(joiners: &[&str]) -> (MemoryDirectory, TestParticipant, Vec<TestParticipant>) {
    let directory = MemoryDirectory::new();
    let mut host = TestParticipant::host(&directory, None, "Host");
    let code = host
        .peer
        .room_code()
        .expect("host has a room code")
        .to_string();

    let mut connected = Vec::new();
    for name in joiners {
        let joiner = TestParticipant::join(&directory, &code, name);
        host.wait_for("joiner registration", |e| {
            matches!(e, SessionEvent::JoinerConnected { name: n } if n == name)
        });
        connected.push(joiner);
    }

    let total = joiners.len() + 1;
    for joiner in &mut connected {
        joiner.wait_for("full roster", |e| {
            matches!(e, SessionEvent::LobbyChanged(players) if players.len() == total)
        });
        joiner.backlog.clear();
    }
    host.backlog.clear();
    (directory, host, connected)
}
