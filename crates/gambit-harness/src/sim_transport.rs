//! Turmoil-backed transport.
//!
//! Channels run over simulated TCP as newline-delimited text. The first line
//! a client writes is the request target (path and query of the channel
//! address), standing in for the WebSocket upgrade request; every line after
//! that is one message. [`serve`] runs a [`SimServer`](crate::SimServer)
//! behind a listener, and [`SimHttp`] answers the auxiliary endpoints from the
//! same shared server without going through the network.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use gambit_core::{
    HttpClient, HttpError, HttpMethod, HttpRequest, Position, RulesEngine, Transport,
    TransportChannel,
};
use gambit_proto::{PositionBody, SessionId};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf},
    sync::mpsc,
};
use tracing::{debug, info, warn};
use turmoil::net::{TcpListener, TcpStream};
use url::Url;

use crate::{
    sim_network::parse_channel_url,
    sim_server::{ParticipantId, ServerOutput, SharedSimServer},
};

/// Client side: dials `host:port` of the channel address.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

impl SimTransport {
    /// Connect to a simulated host, e.g. `"server:443"`.
    pub async fn connect_to(addr: &str) -> io::Result<SimChannel> {
        Ok(SimChannel::new(TcpStream::connect(addr).await?))
    }
}

#[async_trait]
impl Transport for SimTransport {
    type Channel = SimChannel;

    async fn connect(&self, url: &Url) -> io::Result<SimChannel> {
        let host = url
            .host_str()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "channel url has no host"))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let mut channel = Self::connect_to(&format!("{host}:{port}")).await?;
        let target = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        channel.send(target).await?;
        Ok(channel)
    }
}

/// One simulated TCP connection carrying line-delimited messages.
pub struct SimChannel {
    lines: Lines<BufReader<ReadHalf<TcpStream>>>,
    writer: WriteHalf<TcpStream>,
}

impl SimChannel {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self { lines: BufReader::new(reader).lines(), writer }
    }
}

#[async_trait]
impl TransportChannel for SimChannel {
    async fn send(&mut self, text: String) -> io::Result<()> {
        if text.contains('\n') {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "message contains a newline"));
        }
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    async fn recv(&mut self) -> Option<io::Result<String>> {
        self.lines.next_line().await.transpose()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}

/// Server side listener.
pub struct SimListener {
    inner: TcpListener,
}

impl SimListener {
    /// Bind inside the current turmoil host, e.g. `"0.0.0.0:443"`.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        Ok(Self { inner: TcpListener::bind(addr).await? })
    }

    /// Accept one connection and read its request target.
    pub async fn accept(&self) -> io::Result<(String, SimChannel)> {
        let (stream, peer) = self.inner.accept().await?;
        let mut channel = SimChannel::new(stream);
        let target = channel.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "closed before request target")
        })??;
        debug!(%peer, %target, "accepted channel");
        Ok((target, channel))
    }
}

type Outboxes = Arc<Mutex<HashMap<ParticipantId, mpsc::UnboundedSender<ServerOutput>>>>;

/// Serve `server` on `listener` until the listener fails.
///
/// Each connection becomes one participant; messages between participants
/// are routed through per-connection outboxes.
pub async fn serve(listener: SimListener, server: SharedSimServer) -> io::Result<()> {
    let outboxes: Outboxes = Arc::new(Mutex::new(HashMap::new()));
    let mut participant: ParticipantId = 0;
    loop {
        let (target, channel) = listener.accept().await?;
        participant += 1;
        tokio::spawn(run_participant(
            participant,
            target,
            channel,
            Arc::clone(&server),
            Arc::clone(&outboxes),
        ));
    }
}

async fn run_participant(
    participant: ParticipantId,
    target: String,
    mut channel: SimChannel,
    server: SharedSimServer,
    outboxes: Outboxes,
) {
    let address = Url::parse("ws://sim").and_then(|base| base.join(&target)).ok();
    let Some((session, client)) = address.as_ref().and_then(parse_channel_url) else {
        warn!(%target, "unroutable request target");
        let _ = channel.close().await;
        return;
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    outboxes.lock().unwrap_or_else(PoisonError::into_inner).insert(participant, tx);
    let outputs = server
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .connect(participant, session, &client);
    dispatch(&outboxes, outputs);

    loop {
        tokio::select! {
            output = rx.recv() => match output {
                Some(ServerOutput::Deliver { text, .. }) => {
                    if channel.send(text).await.is_err() {
                        break;
                    }
                },
                Some(ServerOutput::Close { .. }) | None => {
                    let _ = channel.close().await;
                    break;
                },
            },
            incoming = channel.recv() => match incoming {
                Some(Ok(text)) => {
                    let outputs = server
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .receive(participant, &text);
                    dispatch(&outboxes, outputs);
                },
                Some(Err(_)) | None => break,
            },
        }
    }

    info!(participant, "participant left");
    outboxes.lock().unwrap_or_else(PoisonError::into_inner).remove(&participant);
    server.lock().unwrap_or_else(PoisonError::into_inner).disconnect(participant);
}

fn dispatch(outboxes: &Outboxes, outputs: Vec<ServerOutput>) {
    let outboxes = outboxes.lock().unwrap_or_else(PoisonError::into_inner);
    for output in outputs {
        let to = match &output {
            ServerOutput::Deliver { to, .. } => *to,
            ServerOutput::Close { participant } => *participant,
        };
        if let Some(outbox) = outboxes.get(&to) {
            let _ = outbox.send(output);
        }
    }
}

/// [`HttpClient`] answering from a shared server.
#[derive(Clone)]
pub struct SimHttp {
    server: SharedSimServer,
}

impl SimHttp {
    /// Answer from `server`.
    pub fn new(server: SharedSimServer) -> Self {
        Self { server }
    }

    fn answer(&self, request: &HttpRequest) -> Result<String, HttpError> {
        let path = request.url.path();
        let server = self.server.lock().unwrap_or_else(PoisonError::into_inner);
        let body = match (request.method, path) {
            (HttpMethod::Get, p) if p.ends_with("/waiting-games/") => {
                serde_json::to_value(server.listing())
            },
            (HttpMethod::Get, p) if p.contains("/join-game/") => {
                let id = p.rsplit('/').next().and_then(|raw| SessionId::new(raw).ok());
                let snapshot =
                    id.and_then(|id| server.snapshot(&id)).ok_or(HttpError::Status(404))?;
                serde_json::to_value(snapshot)
            },
            (HttpMethod::Post, p) if p.ends_with("/best-move/") => {
                let position = position_of(request)?;
                let best = server
                    .rules()
                    .legal_moves(&position)
                    .ok()
                    .and_then(|moves| moves.into_iter().next())
                    .map(|m| m.to_string());
                Ok(serde_json::json!({ "best_move": best }))
            },
            (HttpMethod::Post, p) if p.ends_with("/evalbar/") => {
                Ok(serde_json::json!({ "evaluation": 0 }))
            },
            _ => return Err(HttpError::Status(404)),
        };
        body.map(|value| value.to_string()).map_err(|e| HttpError::Transport(e.to_string()))
    }
}

fn position_of(request: &HttpRequest) -> Result<Position, HttpError> {
    let body = request.body.as_deref().ok_or(HttpError::Status(400))?;
    let parsed: PositionBody = serde_json::from_str(body).map_err(|_| HttpError::Status(400))?;
    Ok(Position::new(parsed.fen))
}

#[async_trait]
impl HttpClient for SimHttp {
    async fn execute(&self, request: HttpRequest) -> Result<String, HttpError> {
        self.answer(&request)
    }
}
