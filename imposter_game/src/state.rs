// Per-participant session state machine.
//
// `Session` is the aggregate each participant owns exactly one of. It holds
// the seats, the round content, the winner, and the current `Phase`, and it
// exposes one method per transition. Nothing here touches the network: the
// coordinator in `imposter_peer` decides which transitions a local action or
// an inbound message triggers, and whether to broadcast afterwards.
//
// Lifecycle (identical on host and joiner):
//
//   Setup --begin_round / adopt_round--> Reveal --advance_reveal--> Playing
//   Playing --accuse / apply_vote_sync--> Winner
//   Winner --reset--> Setup
//   Winner --begin_round (restart with last config)--> Reveal
//
// Reveal behaves differently per `Mode`. Pass-and-play cycles one device
// through every seat before discussion starts; a networked participant only
// acknowledges its own seat.
//
// `Authority` records whether the current state came from the host (or from
// this participant acting as host) or from a joiner-local speculative write.
// Speculative state is never reconciled; the next host broadcast overwrites it.

use std::time::Duration;

use imposter_prng::GameRng;
use imposter_protocol::types::{Player, PlayerId, Role, RoundContent};

use crate::config::{ConfigError, SessionConfig};
use crate::roles::{RoleError, assign_roles, deal_players};
use crate::vote::{InvalidVoteTarget, resolve_vote};

/// How seats map to devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// One device, every seat (pass-and-play).
    Local,
    /// One device per seat, synchronized through the host.
    Network,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Reveal,
    Playing,
    Winner,
}

/// Provenance of the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    Canonical,
    Speculative,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} during {phase:?}")]
    InvalidTransition { phase: Phase, action: &'static str },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Roles(#[from] RoleError),
    #[error(transparent)]
    InvalidVote(#[from] InvalidVoteTarget),
    #[error("{names} seats but {addresses} peer addresses")]
    AddressCount { names: usize, addresses: usize },
    #[error("no previous round to restart")]
    NoPreviousRound,
}

/// Countdown for the discussion phase. Voting opens when it reaches zero or
/// when discussion is ended early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscussionTimer {
    remaining: Duration,
    voting: bool,
}

impl DiscussionTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            remaining: duration,
            voting: duration.is_zero(),
        }
    }

    /// Advance by `elapsed`. Returns true on the tick that opens voting.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.voting {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.voting = true;
            return true;
        }
        false
    }

    pub fn end(&mut self) {
        self.voting = true;
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_voting(&self) -> bool {
        self.voting
    }
}

pub struct Session {
    mode: Mode,
    phase: Phase,
    players: Vec<Player>,
    content: Option<RoundContent>,
    winner: Option<Role>,
    reveal_index: usize,
    discussion: Duration,
    timer: Option<DiscussionTimer>,
    last_config: Option<SessionConfig>,
    self_address: Option<String>,
    authority: Authority,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            phase: Phase::Setup,
            players: Vec::new(),
            content: None,
            winner: None,
            reveal_index: 0,
            discussion: Duration::ZERO,
            timer: None,
            last_config: None,
            self_address: None,
            authority: Authority::Canonical,
        }
    }

    /// Address this participant is known by; used to find its own seat.
    pub fn set_self_address(&mut self, address: impl Into<String>) {
        self.self_address = Some(address.into());
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn content(&self) -> Option<&RoundContent> {
        self.content.as_ref()
    }

    pub fn winner(&self) -> Option<Role> {
        self.winner
    }

    pub fn last_config(&self) -> Option<&SessionConfig> {
        self.last_config.as_ref()
    }

    pub fn self_address(&self) -> Option<&str> {
        self.self_address.as_deref()
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn timer(&self) -> Option<&DiscussionTimer> {
        self.timer.as_ref()
    }

    pub fn is_voting(&self) -> bool {
        self.timer.as_ref().is_some_and(DiscussionTimer::is_voting)
    }

    /// Deal a new round from `config`. Allowed from Setup, or from Winner to
    /// play again. `addresses` stamps each seat with its viewer's address in
    /// network rounds.
    pub fn begin_round(
        &mut self,
        config: SessionConfig,
        content: RoundContent,
        addresses: Option<&[String]>,
        rng: &mut GameRng,
    ) -> Result<(), SessionError> {
        self.require(&[Phase::Setup, Phase::Winner], "start a round")?;
        config.validate()?;
        let names = config.resolved_names();
        if let Some(addresses) = addresses {
            if addresses.len() != names.len() {
                return Err(SessionError::AddressCount {
                    names: names.len(),
                    addresses: addresses.len(),
                });
            }
        }
        let roles = assign_roles(rng, names.len(), config.num_imposters)?;
        let players = deal_players(&names, &roles, &content, addresses);

        self.install_round(content, players, config.discussion_duration());
        self.last_config = Some(config);
        Ok(())
    }

    /// Replace local state with a round dealt by the host. Accepted in any
    /// phase: the host is the only authority.
    pub fn adopt_round(
        &mut self,
        content: RoundContent,
        players: Vec<Player>,
        duration_secs: u32,
        category: &str,
    ) {
        self.last_config = Some(SessionConfig::from_received(&players, duration_secs, category));
        self.install_round(
            content,
            players,
            Duration::from_secs(u64::from(duration_secs)),
        );
    }

    fn install_round(&mut self, content: RoundContent, players: Vec<Player>, discussion: Duration) {
        self.players = players;
        self.content = Some(content);
        self.winner = None;
        self.reveal_index = 0;
        self.discussion = discussion;
        self.timer = None;
        self.phase = Phase::Reveal;
        self.authority = Authority::Canonical;
    }

    /// The config to replay for "play again with same settings".
    pub fn restart_config(&self) -> Result<SessionConfig, SessionError> {
        self.require(&[Phase::Winner], "restart")?;
        self.last_config.clone().ok_or(SessionError::NoPreviousRound)
    }

    /// The seat whose secret is on screen. In network mode this is the seat
    /// stamped with our own address; a participant with no seat sees nothing.
    pub fn revealing(&self) -> Option<&Player> {
        if self.phase != Phase::Reveal {
            return None;
        }
        match self.mode {
            Mode::Network => {
                let me = self.self_address.as_deref()?;
                self.players
                    .iter()
                    .find(|p| p.peer_address.as_deref() == Some(me))
            }
            Mode::Local => self.players.get(self.reveal_index),
        }
    }

    pub fn is_last_reveal(&self) -> bool {
        match self.mode {
            Mode::Network => true,
            Mode::Local => self.reveal_index + 1 >= self.players.len(),
        }
    }

    /// Acknowledge the secret on screen. Pass-and-play moves to the next seat
    /// until the last one; networked participants go straight to discussion.
    pub fn advance_reveal(&mut self) -> Result<Phase, SessionError> {
        self.require(&[Phase::Reveal], "advance the reveal")?;
        if self.is_last_reveal() {
            self.timer = Some(DiscussionTimer::new(self.discussion));
            self.phase = Phase::Playing;
        } else {
            self.reveal_index += 1;
        }
        Ok(self.phase)
    }

    /// Advance the discussion clock. Returns true when voting opens.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        self.timer.as_mut().is_some_and(|t| t.tick(elapsed))
    }

    pub fn end_discussion(&mut self) -> Result<(), SessionError> {
        self.require(&[Phase::Playing], "end discussion")?;
        if let Some(timer) = self.timer.as_mut() {
            timer.end();
        }
        Ok(())
    }

    /// A local accusation. Only valid once voting has opened.
    pub fn accuse(&mut self, accused: PlayerId) -> Result<Role, SessionError> {
        self.require(&[Phase::Playing], "accuse")?;
        if !self.is_voting() {
            return Err(SessionError::InvalidTransition {
                phase: self.phase,
                action: "accuse",
            });
        }
        Ok(self.apply_vote_sync(accused)?)
    }

    /// Replay an accusation resolved elsewhere. Valid in any phase that has
    /// seats; an id that names no live seat changes nothing.
    pub fn apply_vote_sync(&mut self, accused: PlayerId) -> Result<Role, InvalidVoteTarget> {
        let outcome = resolve_vote(&self.players, accused)?;
        self.players = outcome.players;
        self.winner = Some(outcome.winner);
        self.timer = None;
        self.phase = Phase::Winner;
        self.authority = Authority::Canonical;
        Ok(outcome.winner)
    }

    /// Back to setup. Seats, content and winner are discarded; the last
    /// config is kept for the setup screen.
    pub fn reset(&mut self) {
        self.players.clear();
        self.content = None;
        self.winner = None;
        self.reveal_index = 0;
        self.timer = None;
        self.phase = Phase::Setup;
        self.authority = Authority::Canonical;
    }

    /// Flag the current state as a joiner-local write that the host has not
    /// confirmed.
    pub fn mark_speculative(&mut self) {
        self.authority = Authority::Speculative;
    }

    fn require(&self, allowed: &[Phase], action: &'static str) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }
}
