//! Multi-participant session scenarios.
//!
//! Every scenario runs two or more clients against one simulated server and
//! ends with an oracle over the final world.

use std::time::Duration;

use gambit_client::{ClientError, ClientEvent, SyncPhase};
use gambit_core::SessionStatus;
use gambit_harness::scenario::{Scenario, oracle};
use gambit_proto::Seat;

const PAST_HANDSHAKE: Duration = Duration::from_secs(11);

fn healthy() -> gambit_harness::scenario::OracleFn {
    oracle::all_of(vec![
        oracle::all_synced(),
        oracle::mirrors_match_server(),
        oracle::single_channel(),
        oracle::no_pending_moves(),
    ])
}

#[test]
fn two_players_open_a_game() {
    let world = Scenario::new("two players open a game")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("alice", "e2e4")
        .play("bob", "e7e5")
        .play("alice", "g1f3")
        .play("bob", "b8c6")
        .oracle(healthy())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    let bob = world.client("bob").unwrap();
    assert_eq!(alice.seat(), Some(Seat::First));
    assert_eq!(bob.seat(), Some(Seat::Second));
    assert_eq!(alice.history(), ["e4", "e5", "Nf3", "Nc6"]);
    assert_eq!(alice.status(), &SessionStatus::Ongoing);
    assert_eq!(alice.side_to_move(), Some(Seat::First));
}

#[test]
fn creator_waits_until_opponent_arrives() {
    let world = Scenario::new("creator waits")
        .client("alice")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .play("alice", "e2e4")
        .oracle(healthy())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    assert_eq!(alice.status(), &SessionStatus::Waiting);
    assert!(alice.history().is_empty(), "moves are refused while waiting");
    assert!(alice.notice().is_some());
}

#[test]
fn moving_out_of_turn_is_refused_locally() {
    let world = Scenario::new("out of turn")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("bob", "e7e5")
        .oracle(healthy())
        .run_world()
        .unwrap();

    assert!(world.client("bob").unwrap().history().is_empty());
    assert!(world.network().server().sessions().all(|(_, s)| s.history().is_empty()));
}

#[test]
fn third_participant_is_turned_away() {
    let world = Scenario::new("session full")
        .client("alice")
        .client("bob")
        .client("carol")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .join_peer("carol", "alice")
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let carol = world.client("carol").unwrap();
    assert_eq!(carol.phase(), SyncPhase::Errored);
    assert_eq!(carol.seat(), None);
    assert_eq!(carol.channel(), None);
    assert!(matches!(carol.last_error(), Some(ClientError::Capacity(_))));
    let SessionStatus::Errored(reason) = carol.status() else {
        panic!("expected errored status, got {}", carol.status());
    };
    assert!(reason.contains("Game is full"), "{reason}");

    assert_eq!(world.client("alice").unwrap().phase(), SyncPhase::Synced);
    assert_eq!(world.client("bob").unwrap().phase(), SyncPhase::Synced);
}

#[test]
fn dropped_player_keeps_board_and_rejoins_same_seat() {
    let world = Scenario::new("drop and rejoin")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("alice", "d2d4")
        .play("bob", "d7d5")
        .drop_channel("bob")
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let bob = world.client("bob").unwrap();
    assert_eq!(bob.phase(), SyncPhase::Disconnected);
    assert_eq!(bob.status(), &SessionStatus::Disconnected);
    assert_eq!(bob.seat(), None);
    assert_eq!(bob.history(), ["d4", "d5"], "position is kept for display");
    assert_eq!(bob.notice(), Some("disconnected: connection reset"));

    let world = Scenario::new("drop and rejoin")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("alice", "d2d4")
        .play("bob", "d7d5")
        .drop_channel("bob")
        .join_peer("bob", "alice")
        .play("alice", "c2c4")
        .oracle(healthy())
        .run_world()
        .unwrap();

    let bob = world.client("bob").unwrap();
    assert_eq!(bob.seat(), Some(Seat::Second));
    assert_eq!(bob.history(), ["d4", "d5", "c4"]);
}

#[test]
fn moves_during_disconnect_arrive_with_the_next_handshake() {
    let world = Scenario::new("catch up on rejoin")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .drop_channel("bob")
        .play("alice", "e2e4")
        .join_peer("bob", "alice")
        .play("bob", "c7c5")
        .oracle(healthy())
        .run_world()
        .unwrap();

    assert_eq!(world.client("alice").unwrap().history(), ["e4", "c5"]);
}

#[test]
fn garbage_on_the_channel_triggers_resync() {
    let world = Scenario::new("garbage resync")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("alice", "e2e4")
        .inject("bob", "{not json")
        .oracle(healthy())
        .run_world()
        .unwrap();

    let bob = world.client("bob").unwrap();
    assert_eq!(bob.history(), ["e4"]);
    assert!(matches!(bob.last_error(), Some(ClientError::Protocol(_))));
    assert_eq!(bob.notice(), None);
}

#[test]
fn unexplainable_move_is_replaced_by_server_state() {
    let world = Scenario::new("desync resync")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .play("alice", "e2e4")
        .inject("alice", r#"{"type":"move","from":"a2","to":"a5"}"#)
        .play("bob", "e7e5")
        .oracle(healthy())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    assert_eq!(alice.history(), ["e4", "e5"]);
    assert!(matches!(alice.last_error(), Some(ClientError::Rule(_))));
}

#[test]
fn unknown_status_is_a_protocol_error() {
    let world = Scenario::new("unknown status")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .inject("bob", r#"{"type":"status","status":"paused"}"#)
        .oracle(healthy())
        .run_world()
        .unwrap();

    let bob = world.client("bob").unwrap();
    assert_eq!(bob.status(), &SessionStatus::Ongoing);
    assert!(matches!(bob.last_error(), Some(ClientError::Protocol(_))));
}

#[test]
fn failing_snapshots_exhaust_resync_budget() {
    let world = Scenario::new("resync exhausted")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .join_peer("bob", "alice")
        .fail_fetches(10)
        .inject("bob", "{not json")
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let bob = world.client("bob").unwrap();
    assert_eq!(bob.phase(), SyncPhase::Errored);
    assert_eq!(bob.channel(), None);
    let SessionStatus::Errored(reason) = bob.status() else {
        panic!("expected errored status, got {}", bob.status());
    };
    assert!(reason.starts_with("unable to resynchronise"), "{reason}");
    assert_eq!(world.client("alice").unwrap().phase(), SyncPhase::Synced);
}

#[test]
fn silent_server_exhausts_handshake_attempts() {
    let world = Scenario::new("handshake timeout")
        .client("alice")
        .networked()
        .mute_handshakes(true)
        .on("alice", ClientEvent::CreateSession)
        .advance(PAST_HANDSHAKE)
        .advance(PAST_HANDSHAKE)
        .advance(PAST_HANDSHAKE)
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    assert_eq!(alice.phase(), SyncPhase::Errored);
    assert_eq!(alice.status(), &SessionStatus::Errored("handshake timed out".into()));
    assert!(matches!(alice.last_error(), Some(ClientError::Connection(_))));
    assert_eq!(world.network().live_channels("alice"), 0);
}

#[test]
fn handshake_retry_succeeds_once_server_answers() {
    let world = Scenario::new("handshake retry")
        .client("alice")
        .networked()
        .mute_handshakes(true)
        .on("alice", ClientEvent::CreateSession)
        .advance(PAST_HANDSHAKE)
        .mute_handshakes(false)
        .advance(PAST_HANDSHAKE)
        .oracle(healthy())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    assert_eq!(alice.seat(), Some(Seat::First));
    assert_eq!(alice.channel().map(|c| c.0), Some(3));
}

#[test]
fn leaving_returns_to_discovery() {
    let world = Scenario::new("leave")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .on("alice", ClientEvent::LeaveSession)
        .on("bob", ClientEvent::CreateSession)
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let alice = world.client("alice").unwrap();
    assert_eq!(alice.phase(), SyncPhase::Idle);
    assert_eq!(alice.session(), None);
    assert!(alice.is_discovering());
    assert_eq!(alice.status(), &SessionStatus::Absent);
}

#[test]
fn discovery_lists_open_sessions() {
    let world = Scenario::new("discovery")
        .client("alice")
        .client("bob")
        .networked()
        .on("alice", ClientEvent::CreateSession)
        .advance(Duration::from_secs(11))
        .oracle(oracle::single_channel())
        .run_world()
        .unwrap();

    let alice_session = world.client("alice").unwrap().session().cloned().unwrap();
    let bob = world.client("bob").unwrap();
    assert!(bob.is_discovering());
    assert_eq!(bob.sessions(), [alice_session]);
}

#[test]
fn same_seed_same_sessions() {
    let run = |seed| {
        Scenario::new("determinism")
            .seed(seed)
            .client("alice")
            .networked()
            .on("alice", ClientEvent::CreateSession)
            .oracle(oracle::all_synced())
            .run_world()
            .unwrap()
            .client("alice")
            .unwrap()
            .session()
            .cloned()
    };
    assert_eq!(run(9), run(9));
    assert_ne!(run(9), run(10));
}
