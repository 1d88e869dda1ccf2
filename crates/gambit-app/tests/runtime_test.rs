//! Runtime tests against the scripted simulation driver.

use gambit_app::Runtime;
use gambit_client::{Client, ClientAction, ClientConfig, ClientEvent, Endpoint, FetchKind, SyncPhase};
use gambit_core::{ChessRules, MoveRequest, PlayMode, SessionStatus};
use gambit_harness::{SimDriver, SimEnv, SimNetwork};
use gambit_proto::ClientId;

fn client() -> Client<SimEnv, ChessRules> {
    Client::new(
        SimEnv::with_seed(3),
        ChessRules,
        Endpoint::parse("http://localhost:8000").unwrap(),
        ClientId::new("runtime"),
        &ClientConfig::default(),
    )
}

fn submit(coordinates: &str) -> ClientEvent {
    ClientEvent::Submit(MoveRequest::from_coordinates(coordinates).unwrap())
}

#[tokio::test]
async fn offline_script_runs_to_completion() {
    let driver = SimDriver::new("alice", SimNetwork::default().shared())
        .script([submit("e2e4"), submit("e7e5"), submit("g1f3")]);
    let mut runtime = Runtime::new(driver, client());

    runtime.run().await.unwrap();

    assert_eq!(runtime.client().history(), ["e4", "e5", "Nf3"]);
    assert_eq!(runtime.driver().renders(), 4, "initial render plus one per event");
    assert_eq!(runtime.driver().stops(), 1);
    assert!(runtime.driver().executed().is_empty(), "local play needs no I/O");
}

#[tokio::test]
async fn shutdown_event_ends_the_loop() {
    let driver = SimDriver::new("alice", SimNetwork::default().shared()).script([
        submit("e2e4"),
        ClientEvent::Shutdown,
        submit("e7e5"),
    ]);
    let mut runtime = Runtime::new(driver, client());

    runtime.run().await.unwrap();

    assert_eq!(runtime.client().history(), ["e4"]);
    assert_eq!(runtime.driver().stops(), 1);
}

#[tokio::test]
async fn networked_session_is_closed_on_teardown() {
    let network = SimNetwork::default().shared();
    let driver = SimDriver::new("alice", network.clone())
        .script([ClientEvent::SetMode(PlayMode::Networked), ClientEvent::CreateSession]);
    let mut runtime = Runtime::new(driver, client());

    runtime.run().await.unwrap();

    let client = runtime.client();
    assert_eq!(client.phase(), SyncPhase::Synced);
    assert_eq!(client.status(), &SessionStatus::Waiting);
    assert_eq!(client.channel(), None);

    let executed = runtime.driver().executed();
    assert!(matches!(
        executed.first(),
        Some(ClientAction::Fetch { request: FetchKind::Listing, .. })
    ));
    assert!(matches!(executed.get(1), Some(ClientAction::OpenChannel { .. })));
    assert!(matches!(executed.last(), Some(ClientAction::CloseChannel { .. })));
    assert_eq!(network.lock().unwrap().live_channels("alice"), 0);
}

#[tokio::test]
async fn step_processes_a_single_event() {
    let driver = SimDriver::new("alice", SimNetwork::default().shared());
    let mut runtime = Runtime::new(driver, client());

    runtime.step(submit("d2d4")).await.unwrap();
    runtime.step(ClientEvent::Undo).await.unwrap();

    assert!(runtime.client().history().is_empty());
    assert_eq!(runtime.driver().renders(), 2);
    assert_eq!(runtime.driver().stops(), 0);
}
