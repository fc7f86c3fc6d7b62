// End-to-end tests for the host/joiner pipeline.
//
// Each test opens a real room on an in-memory directory, connects real
// joiners over loopback TCP (via TestParticipant), and checks that every
// participant's `Session` converges on what the host decided:
// host deals → START_GAME → joiners adopt → accusation → VOTE_SYNC → reset.
//
// These use the same code paths as a live session; the only test-specific
// code is the blocking wait helpers in TestParticipant.

use std::io::BufWriter;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use imposter_game::config::{CustomCategory, CustomItem, SessionConfig};
use imposter_game::content::{ContentGenerationError, ContentProvider, ContentRequest};
use imposter_game::state::{Authority, Phase};
use imposter_game::storage::{CategoryStore, MemoryCategoryStore};
use imposter_peer::PeerConfig;
use imposter_peer::coordinator::{Coordinator, SessionEvent};
use imposter_peer::directory::{Directory, MemoryDirectory};
use imposter_peer::error::{CoordinatorError, PeerError};
use imposter_protocol::framing::send_json;
use imposter_protocol::message::NetworkMessage;
use imposter_protocol::types::{PlayerId, Role, RoomCode, RoundContent};
use multiplayer_tests::{TestParticipant, start_room};

fn round_config() -> SessionConfig {
    SessionConfig {
        num_imposters: 1,
        ..SessionConfig::default()
    }
}

/// Host deals, every joiner adopts START_GAME and reaches Reveal.
fn deal(host: &mut TestParticipant, joiners: &mut [TestParticipant]) {
    host.peer.start_round(round_config()).unwrap();
    assert_eq!(host.peer.phase(), Phase::Reveal);
    for joiner in joiners.iter_mut() {
        joiner.wait_for_phase(Phase::Reveal);
    }
}

/// Everyone acknowledges their own seat.
fn reveal_all(host: &mut TestParticipant, joiners: &mut [TestParticipant]) {
    assert_eq!(host.peer.acknowledge_reveal().unwrap(), Phase::Playing);
    for joiner in joiners.iter_mut() {
        assert_eq!(joiner.peer.acknowledge_reveal().unwrap(), Phase::Playing);
    }
}

fn seat_with_role(participant: &TestParticipant, role: Role) -> PlayerId {
    participant
        .peer
        .session()
        .players()
        .iter()
        .find(|p| p.role == role)
        .unwrap()
        .id
}

fn assert_converged(host: &TestParticipant, joiners: &[TestParticipant]) {
    let expected = host.peer.session();
    for joiner in joiners {
        let got = joiner.peer.session();
        assert_eq!(got.phase(), expected.phase());
        assert_eq!(got.players(), expected.players());
        assert_eq!(got.content(), expected.content());
        assert_eq!(got.winner(), expected.winner());
    }
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// START_GAME carries content and seats verbatim; every participant finds
/// exactly its own seat.
#[test]
fn start_game_converges() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo", "Cy"]);
    deal(&mut host, &mut joiners);
    assert_converged(&host, &joiners);

    let players = host.peer.session().players();
    assert_eq!(players.len(), 4);
    let names: Vec<_> = players.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["Host", "Ada", "Bo", "Cy"]);
    assert!(players.iter().all(|p| p.peer_address.is_some()));
    assert_eq!(
        players.iter().filter(|p| p.role == Role::Imposter).count(),
        1
    );

    assert_eq!(host.my_seat().unwrap().name, "Host");
    for (joiner, name) in joiners.iter().zip(["Ada", "Bo", "Cy"]) {
        let seat = joiner.my_seat().unwrap();
        assert_eq!(seat.name, name);
        assert_eq!(joiner.peer.session().revealing().unwrap().id, seat.id);
    }

    // Joiners rebuild the settings for display.
    let received = joiners[0].peer.session().last_config().unwrap();
    assert_eq!(received.discussion_duration_secs, 180);
    assert_eq!(received.category, "Silly & Random");
    assert_eq!(received.num_imposters, 1);
}

/// Each device acknowledges only its own seat before discussion starts.
#[test]
fn network_reveal_is_one_acknowledgement() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);

    assert_eq!(joiners[0].peer.acknowledge_reveal().unwrap(), Phase::Playing);
    // Others are still on their reveal screens.
    assert_eq!(host.peer.phase(), Phase::Reveal);
    assert_eq!(joiners[1].peer.phase(), Phase::Reveal);
}

/// Accusing the imposter: VOTE_SYNC replays the same resolution everywhere.
#[test]
fn vote_sync_converges_civilians_win() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo", "Cy"]);
    deal(&mut host, &mut joiners);
    reveal_all(&mut host, &mut joiners);

    let imposter = seat_with_role(&host, Role::Imposter);
    host.peer.end_discussion().unwrap();
    assert_eq!(host.peer.accuse(imposter).unwrap(), Some(Role::Civilian));

    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Winner);
    }
    assert_converged(&host, &joiners);

    let survivors: Vec<_> = host
        .peer
        .session()
        .players()
        .iter()
        .filter(|p| !p.is_eliminated)
        .map(|p| p.id)
        .collect();
    assert_eq!(survivors, vec![imposter]);
}

/// A joiner still on its reveal screen applies VOTE_SYNC too.
#[test]
fn vote_sync_reaches_joiner_mid_reveal() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);
    host.peer.acknowledge_reveal().unwrap();
    host.peer.end_discussion().unwrap();

    let civilian = seat_with_role(&host, Role::Civilian);
    assert_eq!(host.peer.accuse(civilian).unwrap(), Some(Role::Imposter));

    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Winner);
        assert_eq!(joiner.peer.session().winner(), Some(Role::Imposter));
    }
    assert_converged(&host, &joiners);
}

/// Re-delivering the same VOTE_SYNC leaves everyone where they were.
#[test]
fn duplicate_vote_sync_is_idempotent() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);
    reveal_all(&mut host, &mut joiners);

    let imposter = seat_with_role(&host, Role::Imposter);
    host.peer.end_discussion().unwrap();
    host.peer.accuse(imposter).unwrap();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Winner);
    }
    let before: Vec<_> = joiners
        .iter()
        .map(|j| j.peer.session().players().to_vec())
        .collect();

    let sent = host
        .peer
        .broadcast(&NetworkMessage::VoteSync {
            suspect_id: imposter,
        })
        .unwrap();
    assert_eq!(sent, 2);
    // A stale id for an eliminated seat is ignored.
    let stale = seat_with_role(&host, Role::Civilian);
    host.peer
        .broadcast(&NetworkMessage::VoteSync { suspect_id: stale })
        .unwrap();

    for (joiner, players) in joiners.iter_mut().zip(before) {
        joiner.settle(Duration::from_millis(200));
        assert_eq!(joiner.peer.session().players(), players.as_slice());
        assert_eq!(joiner.peer.phase(), Phase::Winner);
    }
}

/// RESET returns everyone to setup; restart deals a fresh round to the same
/// roster.
#[test]
fn reset_and_restart_propagate() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);
    reveal_all(&mut host, &mut joiners);
    let imposter = seat_with_role(&host, Role::Imposter);
    host.peer.end_discussion().unwrap();
    host.peer.accuse(imposter).unwrap();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Winner);
    }

    host.peer.restart().unwrap();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Reveal);
    }
    assert_converged(&host, &joiners);
    assert_eq!(host.peer.session().players().len(), 3);

    host.peer.reset();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Setup);
        assert!(joiner.peer.session().players().is_empty());
        assert!(joiner.peer.session().content().is_none());
    }
    assert_converged(&host, &joiners);
}

/// Joiner-local writes are speculative and overwritten by the host.
#[test]
fn joiner_reset_is_local_and_overwritten() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);

    joiners[0].peer.reset();
    assert_eq!(joiners[0].peer.phase(), Phase::Setup);
    assert_eq!(joiners[0].peer.session().authority(), Authority::Speculative);

    // Not propagated upstream.
    host.settle(Duration::from_millis(200));
    assert_eq!(host.peer.phase(), Phase::Reveal);
    assert_eq!(joiners[1].peer.phase(), Phase::Reveal);

    host.peer.acknowledge_reveal().unwrap();
    let imposter = seat_with_role(&host, Role::Imposter);
    host.peer.end_discussion().unwrap();
    host.peer.accuse(imposter).unwrap();
    joiners[1].wait_for_phase(Phase::Winner);
    // The reset joiner has no seats, so the sync is a no-op there.
    joiners[0].settle(Duration::from_millis(200));
    assert_eq!(joiners[0].peer.phase(), Phase::Setup);

    host.peer.restart().unwrap();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Reveal);
        assert_eq!(joiner.peer.session().authority(), Authority::Canonical);
    }
    assert_converged(&host, &joiners);
}

#[test]
fn joiners_cannot_drive_the_round() {
    let (_dir, _host, mut joiners) = start_room(&["Ada", "Bo"]);
    let joiner = &mut joiners[0].peer;
    assert!(matches!(
        joiner.start_round(round_config()),
        Err(CoordinatorError::NotHost(_))
    ));
    assert!(matches!(joiner.restart(), Err(CoordinatorError::NotHost(_))));
    assert!(matches!(
        joiner.broadcast(&NetworkMessage::Reset),
        Err(CoordinatorError::NotHost(_))
    ));
}

/// State-changing messages sent upstream by a joiner are ignored.
#[test]
fn host_ignores_non_authoritative_messages() {
    let (dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);

    let code = host.peer.room_code().unwrap().clone();
    let addr = dir.resolve(&code).unwrap().unwrap();
    let mut rogue = BufWriter::new(TcpStream::connect(addr).unwrap());
    send_json(&mut rogue, &NetworkMessage::Reset).unwrap();
    send_json(
        &mut rogue,
        &NetworkMessage::VoteSync {
            suspect_id: PlayerId(0),
        },
    )
    .unwrap();

    host.settle(Duration::from_millis(200));
    assert_eq!(host.peer.phase(), Phase::Reveal);
    assert!(host.peer.session().winner().is_none());
}

#[test]
fn lobby_tracks_joins_and_leaves() {
    let (_dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    let roster: Vec<_> = joiners[0]
        .peer
        .lobby()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(roster, ["Host", "Ada", "Bo"]);
    assert_eq!(host.peer.lobby(), joiners[1].peer.lobby());
    assert_eq!(host.peer.open_channels(), 2);

    let bo = joiners.pop().unwrap();
    drop(bo);
    host.wait_for("Bo leaving", |e| {
        matches!(e, SessionEvent::JoinerLeft { name } if name == "Bo")
    });
    joiners[0].wait_for("shrunk roster", |e| {
        matches!(e, SessionEvent::LobbyChanged(players) if players.len() == 2)
    });
    assert_eq!(host.peer.open_channels(), 1);
}

/// A joiner that arrives mid-round gets the roster once the host is back in
/// setup.
#[test]
fn reset_announces_roster_to_late_joiner() {
    let (dir, mut host, mut joiners) = start_room(&["Ada", "Bo"]);
    deal(&mut host, &mut joiners);

    let code = host.peer.room_code().unwrap().to_string();
    let mut late = TestParticipant::join(&dir, &code, "Cy");
    host.wait_for("late joiner", |e| {
        matches!(e, SessionEvent::JoinerConnected { name } if name == "Cy")
    });
    late.settle(Duration::from_millis(200));
    assert!(late.peer.lobby().is_empty());

    host.peer.reset();
    late.wait_for("roster after reset", |e| {
        matches!(e, SessionEvent::LobbyChanged(players) if players.len() == 4)
    });
    let names: Vec<_> = late.peer.lobby().into_iter().map(|e| e.name).collect();
    assert_eq!(names, ["Host", "Ada", "Bo", "Cy"]);
}

#[test]
fn too_small_lobby_cannot_start() {
    let (_dir, mut host, _joiners) = start_room(&["Ada"]);
    let err = host.peer.start_round(round_config()).unwrap_err();
    assert!(matches!(err, CoordinatorError::Config(_)));
    assert_eq!(host.peer.phase(), Phase::Setup);
}

#[test]
fn joiner_sees_host_loss() {
    let (_dir, host, mut joiners) = start_room(&["Ada", "Bo"]);
    drop(host);
    for joiner in &mut joiners {
        joiner.wait_for("host loss", |e| *e == SessionEvent::HostLost);
    }
}

/// A code nobody registered is "room not found".
#[test]
fn unknown_room_is_unreachable() {
    let dir = MemoryDirectory::new();
    let Err(err) = Coordinator::join(&dir, "ZZZZZ", "Ada", PeerConfig::default()) else {
        panic!("join should fail");
    };
    assert!(matches!(err, PeerError::PeerUnreachable(_)));

    let Err(err) = Coordinator::join(&dir, "   ", "Ada", PeerConfig::default()) else {
        panic!("join should fail");
    };
    assert!(matches!(err, PeerError::PeerUnreachable(_)));
}

/// A code that still resolves but has no listener behind it.
#[test]
fn stale_registration_is_unreachable() {
    let dir = MemoryDirectory::new();
    let dead: SocketAddr = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let _reg = dir
        .register(&RoomCode::normalize("GHOST").unwrap(), dead)
        .unwrap();
    let Err(err) = Coordinator::join(&dir, "ghost", "Ada", PeerConfig::default()) else {
        panic!("join should fail");
    };
    assert!(matches!(err, PeerError::PeerUnreachable(_)));
}

#[test]
fn taken_room_code_fails_to_host() {
    let dir = MemoryDirectory::new();
    let _first = TestParticipant::host(&dir, Some("PARTY"), "One");
    let Err(err) = Coordinator::host(&dir, Some("party"), PeerConfig::default()) else {
        panic!("second host should fail");
    };
    assert!(matches!(err, PeerError::ChannelInit(_)));
}

#[test]
fn room_code_is_released_when_host_leaves() {
    let dir = MemoryDirectory::new();
    let host = TestParticipant::host(&dir, Some("bye01"), "One");
    assert_eq!(host.peer.room_code().unwrap().as_str(), "BYE01");
    assert_eq!(dir.len(), 1);
    drop(host);
    assert!(dir.is_empty());
}

struct FixedWord;

impl ContentProvider for FixedWord {
    fn generate(&self, request: &ContentRequest) -> Result<RoundContent, ContentGenerationError> {
        assert_eq!(request.category, "Animals & Nature");
        Ok(RoundContent::new("Penguin", "Dresses formally on ice"))
    }
}

/// Provider content reaches joiners verbatim, secrets split by role.
#[test]
fn provider_content_reaches_joiners() {
    let dir = MemoryDirectory::new();
    let mut host = TestParticipant::host(&dir, None, "Host").with_provider(Arc::new(FixedWord));
    let code = host.peer.room_code().unwrap().to_string();
    let mut joiners = Vec::new();
    for name in ["Ada", "Bo"] {
        joiners.push(TestParticipant::join(&dir, &code, name));
        host.wait_for("join", |e| matches!(e, SessionEvent::JoinerConnected { .. }));
    }

    host.peer
        .start_round(SessionConfig {
            category: "Animals & Nature".into(),
            ..round_config()
        })
        .unwrap();
    for joiner in &mut joiners {
        joiner.wait_for_phase(Phase::Reveal);
        let seat = joiner.my_seat().unwrap();
        let expected = match seat.role {
            Role::Civilian => "Penguin",
            Role::Imposter => "Dresses formally on ice",
        };
        assert_eq!(seat.secret, expected);
    }
    assert_converged(&host, &joiners);
}

/// A stored custom category with the setup screen's name feeds the fallback.
#[test]
fn stored_custom_category_supplies_offline_words() {
    let mut store = MemoryCategoryStore::new();
    store
        .save_custom_category(CustomCategory {
            id: "c1".into(),
            name: "Office".into(),
            items: vec![CustomItem {
                word: "Stapler".into(),
                hint: "Binds paper".into(),
            }],
        })
        .unwrap();

    let config = SessionConfig {
        category: "Office".into(),
        player_names: vec!["A".into(), "B".into(), "C".into()],
        ..round_config()
    }
    .with_custom_from(&store.get_custom_categories().unwrap());

    let mut local = Coordinator::local(PeerConfig::default());
    local.start_round(config).unwrap();
    assert_eq!(local.session().content().unwrap().word, "Stapler");
}
