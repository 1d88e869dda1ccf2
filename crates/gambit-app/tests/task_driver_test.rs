//! Channel bookkeeping of the tokio task driver.

use std::{future, io};

use async_trait::async_trait;
use gambit_app::{Driver, DriverConfig, TaskDriver};
use gambit_client::{ClientAction, ClientEvent};
use gambit_core::{ChannelId, HttpClient, HttpError, HttpRequest, Transport, TransportChannel};
use tokio::sync::mpsc;
use url::Url;

/// Refuses every connection.
struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    type Channel = Line;

    async fn connect(&self, _url: &Url) -> io::Result<Line> {
        Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
    }
}

/// Connects; the peer hangs up at once when `hang_up` is set, otherwise the
/// channel stays silent.
struct Peer {
    hang_up: bool,
}

#[async_trait]
impl Transport for Peer {
    type Channel = Line;

    async fn connect(&self, _url: &Url) -> io::Result<Line> {
        Ok(Line { hang_up: self.hang_up })
    }
}

struct Line {
    hang_up: bool,
}

#[async_trait]
impl TransportChannel for Line {
    async fn send(&mut self, _text: String) -> io::Result<()> {
        Ok(())
    }

    async fn recv(&mut self) -> Option<io::Result<String>> {
        if self.hang_up {
            return None;
        }
        future::pending().await
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Offline;

#[async_trait]
impl HttpClient for Offline {
    async fn execute(&self, _request: HttpRequest) -> Result<String, HttpError> {
        Err(HttpError::Transport("offline".into()))
    }
}

fn url() -> Url {
    Url::parse("ws://localhost:8000/ws/chess/g1?client_id=c").unwrap()
}

fn driver<T: Transport>(
    transport: T,
) -> (TaskDriver<T, Offline, ()>, mpsc::Sender<ClientEvent>) {
    let (input_tx, input_rx) = mpsc::channel(8);
    let driver = TaskDriver::new(transport, Offline, (), input_rx, &DriverConfig::default());
    (driver, input_tx)
}

/// Next event other than a tick.
async fn next_channel_event<D: Driver>(driver: &mut D) -> ClientEvent {
    loop {
        match driver.next_event().await.unwrap() {
            Some(ClientEvent::Tick) => {},
            Some(event) => return event,
            None => panic!("input closed"),
        }
    }
}

#[tokio::test]
async fn failed_connects_release_their_channels() {
    let (mut driver, _input) = driver(Unreachable);

    for n in 1..=5 {
        let channel = ChannelId(n);
        driver.execute(ClientAction::OpenChannel { channel, url: url() }).await.unwrap();
        assert_eq!(driver.open_channels(), 1);

        let event = next_channel_event(&mut driver).await;
        assert!(matches!(event, ClientEvent::ChannelFailed { channel: c, .. } if c == channel));
        assert_eq!(driver.open_channels(), 0);

        // A late close for the dead channel is a no-op.
        driver.execute(ClientAction::CloseChannel { channel }).await.unwrap();
        assert_eq!(driver.open_channels(), 0);
    }
}

#[tokio::test]
async fn peer_close_releases_the_channel() {
    let (mut driver, _input) = driver(Peer { hang_up: true });
    driver.execute(ClientAction::OpenChannel { channel: ChannelId(1), url: url() }).await.unwrap();

    assert_eq!(
        next_channel_event(&mut driver).await,
        ClientEvent::ChannelOpened { channel: ChannelId(1) }
    );
    assert!(matches!(
        next_channel_event(&mut driver).await,
        ClientEvent::ChannelClosed { channel: ChannelId(1), .. }
    ));
    assert_eq!(driver.open_channels(), 0);
}

#[tokio::test]
async fn explicit_close_releases_a_live_channel() {
    let (mut driver, _input) = driver(Peer { hang_up: false });
    driver.execute(ClientAction::OpenChannel { channel: ChannelId(1), url: url() }).await.unwrap();
    assert_eq!(
        next_channel_event(&mut driver).await,
        ClientEvent::ChannelOpened { channel: ChannelId(1) }
    );
    assert_eq!(driver.open_channels(), 1);

    driver.execute(ClientAction::CloseChannel { channel: ChannelId(1) }).await.unwrap();
    assert_eq!(driver.open_channels(), 0);
}
