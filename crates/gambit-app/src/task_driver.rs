//! Tokio task driver.
//!
//! Executes client actions on background tasks and funnels every completion
//! into one event queue. Each channel gets its own task owning the transport
//! connection; the driver holds only an outbox per channel, so closing a
//! channel never waits for the network.

use std::{collections::HashMap, io, sync::Arc, time::Duration};

use gambit_client::{Client, ClientAction, ClientEvent, FetchKind};
use gambit_core::{
    ChannelId, Environment, HttpClient, HttpRequest, RulesEngine, Transport, TransportChannel,
};
use thiserror::Error;
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time::{Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::Driver;

/// Task driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Period of [`ClientEvent::Tick`]. Bounds how late discovery polls and
    /// handshake timeouts fire.
    pub tick_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_millis(250) }
    }
}

/// Presents client state to the user.
pub trait View: Send {
    /// Draw the current state.
    fn render<E, R>(&mut self, client: &Client<E, R>) -> io::Result<()>
    where
        E: Environment,
        R: RulesEngine;
}

/// Headless view.
impl View for () {
    fn render<E, R>(&mut self, _client: &Client<E, R>) -> io::Result<()>
    where
        E: Environment,
        R: RulesEngine,
    {
        Ok(())
    }
}

/// Task driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The view failed to draw
    #[error("render failed: {0}")]
    Render(#[from] io::Error),
}

enum Outgoing {
    Text(String),
    Close,
}

/// [`Driver`] running every action on the tokio runtime.
///
/// User intents arrive on the `input` queue handed to [`TaskDriver::new`];
/// when that queue closes the driver reports end of input. Must be created
/// inside a tokio runtime. Fetches still in flight are aborted when the
/// driver is dropped.
pub struct TaskDriver<T: Transport, H: HttpClient, V: View> {
    transport: Arc<T>,
    http: Arc<H>,
    view: V,
    input: mpsc::Receiver<ClientEvent>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    channels: HashMap<ChannelId, mpsc::UnboundedSender<Outgoing>>,
    tasks: JoinSet<()>,
    ticker: Interval,
    stopped: bool,
}

impl<T: Transport, H: HttpClient, V: View> TaskDriver<T, H, V> {
    /// Create a driver.
    pub fn new(
        transport: T,
        http: H,
        view: V,
        input: mpsc::Receiver<ClientEvent>,
        config: &DriverConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut ticker = tokio::time::interval(config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            transport: Arc::new(transport),
            http: Arc::new(http),
            view,
            input,
            events_tx,
            events_rx,
            channels: HashMap::new(),
            tasks: JoinSet::new(),
            ticker,
            stopped: false,
        }
    }

    /// Channels with a running task.
    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    fn open(&mut self, channel: ChannelId, url: Url) {
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        if let Some(previous) = self.channels.insert(channel, outbox_tx) {
            warn!(%channel, "channel id reused, closing previous task");
            let _ = previous.send(Outgoing::Close);
        }
        let transport = Arc::clone(&self.transport);
        let events = self.events_tx.clone();
        self.tasks.spawn(run_channel(transport, url, channel, outbox_rx, events));
    }

    fn close(&mut self, channel: ChannelId) {
        match self.channels.remove(&channel) {
            Some(outbox) => {
                debug!(%channel, "closing channel");
                // Task may already have exited after a peer close.
                let _ = outbox.send(Outgoing::Close);
            },
            None => debug!(%channel, "close for unknown channel ignored"),
        }
    }

    fn send(&mut self, channel: ChannelId, text: String) {
        let delivered = self
            .channels
            .get(&channel)
            .is_some_and(|outbox| outbox.send(Outgoing::Text(text)).is_ok());
        if !delivered {
            let _ = self
                .events_tx
                .send(ClientEvent::SendFailed { channel, error: "channel is not open".into() });
        }
    }

    fn fetch(&mut self, request: FetchKind, http: HttpRequest) {
        let client = Arc::clone(&self.http);
        let events = self.events_tx.clone();
        self.tasks.spawn(async move {
            debug!(method = %http.method, url = %http.url, "fetching");
            let result = client.execute(http).await;
            let _ = events.send(ClientEvent::Fetched { request, result });
        });
    }

    fn reap(&mut self) {
        while self.tasks.try_join_next().is_some() {}
    }
}

impl<T: Transport, H: HttpClient, V: View> Driver for TaskDriver<T, H, V> {
    type Error = DriverError;

    async fn next_event(&mut self) -> Result<Option<ClientEvent>, Self::Error> {
        if self.stopped {
            return Ok(None);
        }
        let event = tokio::select! {
            biased;
            Some(event) = self.events_rx.recv() => Some(event),
            input = self.input.recv() => input,
            _ = self.ticker.tick() => Some(ClientEvent::Tick),
        };
        match &event {
            // The channel task has exited; drop its outbox.
            Some(
                ClientEvent::ChannelClosed { channel, .. } | ClientEvent::ChannelFailed { channel, .. },
            ) => {
                if self.channels.remove(channel).is_some() {
                    debug!(%channel, "channel task finished");
                }
            },
            Some(_) => {},
            None => info!("input closed"),
        }
        Ok(event)
    }

    async fn execute(&mut self, action: ClientAction) -> Result<(), Self::Error> {
        self.reap();
        match action {
            ClientAction::OpenChannel { channel, url } => self.open(channel, url),
            ClientAction::CloseChannel { channel } => self.close(channel),
            ClientAction::Send { channel, text } => self.send(channel, text),
            ClientAction::Fetch { request, http } => self.fetch(request, http),
        }
        Ok(())
    }

    fn render<E, R>(&mut self, client: &Client<E, R>) -> Result<(), Self::Error>
    where
        E: Environment,
        R: RulesEngine,
    {
        self.view.render(client)?;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for (_, outbox) in self.channels.drain() {
            let _ = outbox.send(Outgoing::Close);
        }
        info!("driver stopped");
    }
}

async fn run_channel<T: Transport>(
    transport: Arc<T>,
    url: Url,
    channel: ChannelId,
    mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let mut connection = match transport.connect(&url).await {
        Ok(connection) => connection,
        Err(error) => {
            warn!(%channel, %url, %error, "connect failed");
            let _ = events.send(ClientEvent::ChannelFailed { channel, error: error.to_string() });
            return;
        },
    };
    info!(%channel, %url, "channel connected");
    let _ = events.send(ClientEvent::ChannelOpened { channel });

    loop {
        tokio::select! {
            outgoing = outbox.recv() => match outgoing {
                Some(Outgoing::Text(text)) => {
                    if let Err(error) = connection.send(text).await {
                        let _ = events.send(ClientEvent::SendFailed { channel, error: error.to_string() });
                    }
                },
                Some(Outgoing::Close) | None => {
                    if let Err(error) = connection.close().await {
                        debug!(%channel, %error, "close failed");
                    }
                    return;
                },
            },
            incoming = connection.recv() => match incoming {
                Some(Ok(text)) => {
                    let _ = events.send(ClientEvent::ChannelMessage { channel, text });
                },
                Some(Err(error)) => {
                    let _ = events.send(ClientEvent::ChannelFailed { channel, error: error.to_string() });
                    return;
                },
                None => {
                    let _ = events.send(ClientEvent::ChannelClosed { channel, reason: None });
                    return;
                },
            },
        }
    }
}
