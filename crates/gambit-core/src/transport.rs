//! Transport abstraction for session channels and auxiliary HTTP calls.
//!
//! Production uses WebSockets and a real HTTP client, tests use turmoil
//! (simulated TCP) or in-memory doubles. Drivers are generic over these
//! traits; the client state machine never sees them.

use std::{fmt, io};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Opens message channels.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// An open channel.
    type Channel: TransportChannel;

    /// Connect to the channel endpoint at `url`.
    ///
    /// Resolves once the channel is usable for sending and receiving.
    async fn connect(&self, url: &Url) -> io::Result<Self::Channel>;
}

/// A bidirectional, ordered channel of text messages.
#[async_trait]
pub trait TransportChannel: Send + 'static {
    /// Send one message.
    async fn send(&mut self, text: String) -> io::Result<()>;

    /// Receive the next message.
    ///
    /// Returns `None` once the peer has closed the channel.
    async fn recv(&mut self) -> Option<io::Result<String>>;

    /// Close the channel. Closing twice is not an error.
    async fn close(&mut self) -> io::Result<()>;
}

/// HTTP verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST with a JSON body
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// One request to an auxiliary endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Verb
    pub method: HttpMethod,
    /// Absolute URL
    pub url: Url,
    /// JSON body for POST
    pub body: Option<String>,
}

impl HttpRequest {
    /// GET `url`.
    pub fn get(url: Url) -> Self {
        Self { method: HttpMethod::Get, url, body: None }
    }

    /// POST `body` as JSON to `url`.
    pub fn post(url: Url, body: String) -> Self {
        Self { method: HttpMethod::Post, url, body: Some(body) }
    }
}

/// HTTP request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Non-success status code
    #[error("HTTP {0}")]
    Status(u16),
    /// Network or protocol failure before a status was received
    #[error("request failed: {0}")]
    Transport(String),
}

/// Executes auxiliary HTTP requests.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Execute `request` and return the response body on success.
    async fn execute(&self, request: HttpRequest) -> Result<String, HttpError>;
}
