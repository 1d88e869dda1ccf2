//! WebSocket session channels.

use std::io;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use gambit_core::{Transport, TransportChannel};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;
use websocket::{ClientBuilder, MaybeTlsStream, Message, WebSocketStream};

/// Dials `ws://` and `wss://` channel addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    type Channel = WebSocketChannel;

    async fn connect(&self, url: &Url) -> io::Result<WebSocketChannel> {
        let builder = ClientBuilder::new()
            .uri(url.as_str())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let (stream, _response) = builder.connect().await.map_err(io::Error::other)?;
        debug!(%url, "websocket connected");
        Ok(WebSocketChannel { stream, closed: false })
    }
}

/// One WebSocket connection. Only text frames carry messages; control and
/// binary frames are skipped.
pub struct WebSocketChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl TransportChannel for WebSocketChannel {
    async fn send(&mut self, text: String) -> io::Result<()> {
        self.stream.send(Message::text(text)).await.map_err(io::Error::other)
    }

    async fn recv(&mut self) -> Option<io::Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(message) if message.is_close() => return None,
                Ok(message) => {
                    if let Some(text) = message.as_text() {
                        return Some(Ok(text.to_string()));
                    }
                },
                Err(e) => return Some(Err(io::Error::other(e))),
            }
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.stream.close().await.map_err(io::Error::other)
    }
}
