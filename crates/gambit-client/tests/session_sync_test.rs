//! Session synchronisation flows driven event by event.
//!
//! Each test plays the part of the driver: it feeds events into a client and
//! inspects the returned actions and the resulting mirror.

use std::time::Duration;

use gambit_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, Endpoint, FetchKind, SyncPhase,
};
use gambit_core::{
    ChannelId, ChessRules, HttpError, HttpMethod, MoveRequest, PlayMode, RulesEngine,
    SearchMode, SessionStatus,
};
use gambit_harness::SimEnv;
use gambit_proto::{ClientId, Seat, SessionId};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn client(env: &SimEnv) -> Client<SimEnv, ChessRules> {
    let endpoint = Endpoint::parse("http://localhost:8000").unwrap();
    Client::new(env.clone(), ChessRules, endpoint, ClientId::new("c-1"), &ClientConfig::default())
}

fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn opened_channel(actions: &[ClientAction]) -> ChannelId {
    actions
        .iter()
        .find_map(|a| match a {
            ClientAction::OpenChannel { channel, .. } => Some(*channel),
            _ => None,
        })
        .expect("an OpenChannel action")
}

fn sent(actions: &[ClientAction]) -> Vec<&str> {
    actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::Send { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn message(channel: ChannelId, text: &str) -> ClientEvent {
    ClientEvent::ChannelMessage { channel, text: text.to_string() }
}

fn init(color: &str) -> String {
    format!(r#"{{"type":"init","fen":"{START}","move_history":[],"status":"ongoing","color":"{color}"}}"#)
}

/// Networked client joined to `g1` and synchronised as `color`.
fn synced(env: &SimEnv, color: &str) -> (Client<SimEnv, ChessRules>, ChannelId) {
    let mut client = client(env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let actions = client.handle(ClientEvent::JoinSession(session("g1")));
    let channel = opened_channel(&actions);
    client.handle(ClientEvent::ChannelOpened { channel });
    client.handle(message(channel, &init(color)));
    assert_eq!(client.phase(), SyncPhase::Synced);
    (client, channel)
}

#[test]
fn join_submit_and_receive_reply() {
    let env = SimEnv::with_seed(7);
    let (mut client, channel) = synced(&env, "first");
    assert_eq!(client.seat(), Some(Seat::First));
    assert_eq!(client.status(), &SessionStatus::Ongoing);

    let actions = client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4")));
    assert_eq!(sent(&actions), [r#"{"type":"move","from":"e2","to":"e4"}"#]);
    assert_eq!(client.history(), ["e4"]);
    assert_eq!(client.side_to_move(), Some(Seat::Second));

    // Server echoes our move, then relays the opponent's reply
    client.handle(message(channel, r#"{"type":"move","from":"e2","to":"e4"}"#));
    assert_eq!(client.history(), ["e4"]);
    assert_eq!(client.pending_moves(), 0);

    client.handle(message(channel, r#"{"type":"move","from":"e7","to":"e5"}"#));
    assert_eq!(client.history(), ["e4", "e5"]);
    assert_eq!(client.side_to_move(), Some(Seat::First));
}

#[test]
fn capacity_error_closes_channel_and_keeps_position() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let channel = opened_channel(&client.handle(ClientEvent::JoinSession(session("g1"))));
    let before = client.position().clone();

    let actions = client.handle(message(channel, r#"{"type":"error","message":"Game is full"}"#));
    assert_eq!(actions, vec![ClientAction::CloseChannel { channel }]);
    assert_eq!(client.phase(), SyncPhase::Errored);
    assert!(matches!(client.status(), SessionStatus::Errored(reason) if reason.contains("Game is full")));
    assert!(matches!(client.last_error(), Some(ClientError::Capacity(_))));
    assert_eq!(client.position(), &before);
    assert_eq!(client.channel(), None);

    // Whatever the dead channel still delivers is ignored
    assert!(client.handle(message(channel, &init("first"))).is_empty());
    assert_eq!(client.phase(), SyncPhase::Errored);
}

#[test]
fn unexpected_close_keeps_board_and_clears_identity() {
    let env = SimEnv::with_seed(7);
    let (mut client, channel) = synced(&env, "first");
    client.handle(ClientEvent::Submit(MoveRequest::new("d2", "d4")));
    let position = client.position().clone();

    client.handle(ClientEvent::ChannelClosed { channel, reason: Some("server restart".into()) });
    assert_eq!(client.seat(), None);
    assert_eq!(client.status(), &SessionStatus::Disconnected);
    assert_eq!(client.phase(), SyncPhase::Disconnected);
    assert_eq!(client.position(), &position);
    assert_eq!(client.history(), ["d4"]);

    // Closing again is a no-op
    assert!(client.handle(ClientEvent::ChannelClosed { channel, reason: None }).is_empty());
    assert_eq!(client.status(), &SessionStatus::Disconnected);
}

#[test]
fn gate_rejections_have_no_effect() {
    let env = SimEnv::with_seed(7);
    let (mut client, _channel) = synced(&env, "second");

    let actions = client.handle(ClientEvent::Submit(MoveRequest::new("e7", "e5")));
    assert!(actions.is_empty());
    assert!(client.history().is_empty());
    assert!(client.notice().is_some_and(|n| n.contains("not your turn")));
}

#[test]
fn switching_session_closes_previous_channel_first() {
    let env = SimEnv::with_seed(7);
    let (mut client, first) = synced(&env, "first");

    let actions = client.handle(ClientEvent::JoinSession(session("g2")));
    assert_eq!(actions[0], ClientAction::CloseChannel { channel: first });
    let second = opened_channel(&actions);
    assert_ne!(first, second);
    assert_eq!(client.session(), Some(&session("g2")));

    // Late traffic from the first channel does not leak into the new session
    client.handle(message(first, r#"{"type":"move","from":"e7","to":"e5"}"#));
    client.handle(ClientEvent::ChannelClosed { channel: first, reason: None });
    assert_eq!(client.phase(), SyncPhase::Joining);
    assert!(client.history().is_empty());
}

#[test]
fn discovery_runs_only_while_no_session_is_selected() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    assert!(!client.is_discovering());

    let actions = client.handle(ClientEvent::SetMode(PlayMode::Networked));
    assert!(matches!(
        actions.as_slice(),
        [ClientAction::Fetch { request: FetchKind::Listing, http }] if http.method == HttpMethod::Get
    ));
    assert!(client.is_discovering());

    client.handle(ClientEvent::Fetched {
        request: FetchKind::Listing,
        result: Ok(r#"{"games":["g1","g2"]}"#.into()),
    });
    assert_eq!(client.sessions(), [session("g1"), session("g2")]);

    env.advance(Duration::from_secs(10));
    let actions = client.handle(ClientEvent::Tick);
    assert!(matches!(actions.as_slice(), [ClientAction::Fetch { request: FetchKind::Listing, .. }]));

    client.handle(ClientEvent::JoinSession(session("g1")));
    assert!(!client.is_discovering());
    env.advance(Duration::from_secs(30));
    let actions = client.handle(ClientEvent::Tick);
    assert!(!actions.iter().any(|a| matches!(a, ClientAction::Fetch { request: FetchKind::Listing, .. })));

    client.handle(ClientEvent::LeaveSession);
    assert!(client.is_discovering());
    client.handle(ClientEvent::SetMode(PlayMode::Local));
    assert!(!client.is_discovering());
}

#[test]
fn failed_listing_keeps_previous_sessions() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    client.handle(ClientEvent::Fetched {
        request: FetchKind::Listing,
        result: Ok(r#"{"sessions":["g1"]}"#.into()),
    });
    client.handle(ClientEvent::Fetched {
        request: FetchKind::Listing,
        result: Err(HttpError::Status(503)),
    });
    assert_eq!(client.sessions(), [session("g1")]);
}

#[test]
fn malformed_init_triggers_snapshot_resync() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let channel = opened_channel(&client.handle(ClientEvent::JoinSession(session("g1"))));

    let actions = client.handle(message(channel, r#"{"type":"init","fen":"not a position","color":"first"}"#));
    assert!(matches!(
        actions.as_slice(),
        [ClientAction::Fetch { request: FetchKind::Snapshot(id), .. }] if *id == session("g1")
    ));
    assert_eq!(client.phase(), SyncPhase::Reconciling);

    // A second complaint while the snapshot is in flight issues nothing new
    assert!(client.handle(message(channel, "{ broken")).is_empty());

    let after_e4 = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    client.handle(ClientEvent::Fetched {
        request: FetchKind::Snapshot(session("g1")),
        result: Ok(format!(r#"{{"fen":"{after_e4}","move_history":["e4"],"status":"ongoing"}}"#)),
    });
    assert_eq!(client.phase(), SyncPhase::Synced);
    assert_eq!(client.history(), ["e4"]);
    assert_eq!(client.position().as_str(), after_e4);
}

#[test]
fn desynced_move_requests_snapshot_and_budget_runs_out() {
    let env = SimEnv::with_seed(7);
    let (mut client, channel) = synced(&env, "first");

    let actions = client.handle(message(channel, r#"{"type":"move","from":"e7","to":"e5"}"#));
    assert!(matches!(actions.as_slice(), [ClientAction::Fetch { request: FetchKind::Snapshot(_), .. }]));

    // Every snapshot fails; the budget is three attempts
    let mut last = Vec::new();
    for _ in 0..3 {
        last = client.handle(ClientEvent::Fetched {
            request: FetchKind::Snapshot(session("g1")),
            result: Err(HttpError::Transport("connection refused".into())),
        });
    }
    assert_eq!(last, vec![ClientAction::CloseChannel { channel }]);
    assert_eq!(client.phase(), SyncPhase::Errored);
    assert!(matches!(client.status(), SessionStatus::Errored(r) if r.starts_with("unable to resynchronise")));
}

#[test]
fn late_snapshot_after_init_is_ignored() {
    let env = SimEnv::with_seed(7);
    let (mut client, _channel) = synced(&env, "first");
    client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4")));

    client.handle(ClientEvent::Fetched {
        request: FetchKind::Snapshot(session("g1")),
        result: Ok(format!(r#"{{"fen":"{START}","move_history":[]}}"#)),
    });
    assert_eq!(client.history(), ["e4"]);
}

#[test]
fn handshake_timeout_reopens_then_errors() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let mut channel = opened_channel(&client.handle(ClientEvent::CreateSession));

    for _ in 0..2 {
        env.advance(Duration::from_secs(11));
        let actions = client.handle(ClientEvent::Tick);
        assert_eq!(actions[0], ClientAction::CloseChannel { channel });
        let next = opened_channel(&actions);
        assert!(next > channel);
        channel = next;
    }

    env.advance(Duration::from_secs(11));
    let actions = client.handle(ClientEvent::Tick);
    assert_eq!(actions, vec![ClientAction::CloseChannel { channel }]);
    assert_eq!(client.status(), &SessionStatus::Errored("handshake timed out".into()));
}

#[test]
fn created_session_skips_snapshot_and_uses_fresh_id() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let actions = client.handle(ClientEvent::CreateSession);

    assert_eq!(actions.len(), 1);
    let ClientAction::OpenChannel { url, .. } = &actions[0] else { panic!("expected open") };
    let id = client.session().unwrap().as_str().to_string();
    assert_eq!(url.path(), format!("/ws/chess/{id}"));
    assert_eq!(url.query(), Some("client_id=c-1"));
}

#[test]
fn server_status_and_late_seat_assignment() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    client.handle(ClientEvent::SetMode(PlayMode::Networked));
    let channel = opened_channel(&client.handle(ClientEvent::JoinSession(session("g1"))));

    client.handle(message(
        channel,
        &format!(r#"{{"type":"init","fen":"{START}","status":"waiting","color":null}}"#),
    ));
    assert_eq!(client.status(), &SessionStatus::Waiting);
    assert!(client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4"))).is_empty());

    client.handle(message(channel, r#"{"type":"color_assignment","color":"white"}"#));
    client.handle(message(channel, r#"{"type":"status","status":"ongoing"}"#));
    client.handle(message(channel, r#"{"type":"chat","text":"hello"}"#));
    assert_eq!(client.seat(), Some(Seat::First));
    assert_eq!(client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4"))).len(), 1);

    client.handle(message(channel, r#"{"type":"status","status":"1-0"}"#));
    assert_eq!(client.status(), &SessionStatus::WonFirst);
    assert!(client.handle(ClientEvent::Submit(MoveRequest::new("d2", "d4"))).is_empty());
}

#[test]
fn send_failure_is_reported_without_rollback() {
    let env = SimEnv::with_seed(7);
    let (mut client, channel) = synced(&env, "first");
    client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4")));
    client.handle(ClientEvent::SendFailed { channel, error: "broken pipe".into() });

    assert_eq!(client.history(), ["e4"]);
    assert!(matches!(client.last_error(), Some(ClientError::Connection(_))));
}

#[test]
fn local_mode_plays_to_checkmate_and_undoes() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
        client.handle(ClientEvent::Submit(MoveRequest::from_coordinates(mv).unwrap()));
    }
    assert_eq!(client.history(), ["f3", "e5", "g4", "Qh4#"]);
    assert_eq!(client.status(), &SessionStatus::WonSecond);
    assert!(client.handle(ClientEvent::Submit(MoveRequest::new("a2", "a3"))).is_empty());

    client.handle(ClientEvent::Undo);
    assert_eq!(client.history(), ["f3", "e5", "g4"]);
    assert_eq!(client.status(), &SessionStatus::Ongoing);

    client.handle(ClientEvent::Reset);
    assert!(client.history().is_empty());
    assert_eq!(client.position(), &ChessRules.initial_position());
}

#[test]
fn undo_is_refused_in_networked_mode() {
    let env = SimEnv::with_seed(7);
    let (mut client, _channel) = synced(&env, "first");
    client.handle(ClientEvent::Submit(MoveRequest::new("e2", "e4")));
    client.handle(ClientEvent::Undo);
    assert_eq!(client.history(), ["e4"]);
}

#[test]
fn engine_mode_evaluates_and_applies_suggestions() {
    let env = SimEnv::with_seed(7);
    let mut client = client(&env);
    let actions =
        client.handle(ClientEvent::SetMode(PlayMode::Engine { search: SearchMode::Minimax }));
    assert!(matches!(actions.as_slice(), [ClientAction::Fetch { request: FetchKind::Evaluation(_), .. }]));

    let actions = client.handle(ClientEvent::RequestSuggestion);
    let [ClientAction::Fetch { request, http }] = actions.as_slice() else {
        panic!("expected one fetch");
    };
    assert_eq!(http.method, HttpMethod::Post);
    assert_eq!(http.url.query(), Some("game_mode=minimax"));

    let actions = client.handle(ClientEvent::Fetched {
        request: request.clone(),
        result: Ok(r#"{"best_move":"g1f3"}"#.into()),
    });
    assert_eq!(client.history(), ["Nf3"]);
    let [ClientAction::Fetch { request: FetchKind::Evaluation(position), .. }] = actions.as_slice()
    else {
        panic!("expected evaluation of the new position");
    };
    assert_eq!(position, client.position());

    client.handle(ClientEvent::Fetched {
        request: FetchKind::Evaluation(position.clone()),
        result: Ok(r#"{"evaluation":35}"#.into()),
    });
    assert_eq!(client.evaluation(), Some(35));

    // Answers for positions we have left behind are dropped
    client.handle(ClientEvent::Fetched {
        request: request.clone(),
        result: Ok(r#"{"best_move":"e2e4"}"#.into()),
    });
    assert_eq!(client.history(), ["Nf3"]);
}

#[test]
fn shutdown_closes_channel_once() {
    let env = SimEnv::with_seed(7);
    let (mut client, channel) = synced(&env, "first");
    assert_eq!(client.handle(ClientEvent::Shutdown), vec![ClientAction::CloseChannel { channel }]);
    assert!(client.handle(ClientEvent::Shutdown).is_empty());
}
