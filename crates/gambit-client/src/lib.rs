//! Gambit client
//!
//! Action-based state machine that keeps a local mirror of a two-participant
//! game session in step with an authoritative server.
//!
//! # Architecture
//!
//! The client is a pure state machine: it consumes [`ClientEvent`]s and
//! returns [`ClientAction`]s without performing any I/O. A driver executes
//! the actions (open a channel, send a message, issue an HTTP request) and
//! feeds every completion back as a later event. The same code therefore runs
//! under a real network and under deterministic simulation.
//!
//! ```text
//!  ┌──────────────┐  ClientEvent   ┌────────────────────────────────────┐
//!  │    Driver    │───────────────>│               Client               │
//!  │ (I/O, timer) │                │  Discovery ─ Connector ─ Reconciler│
//!  │              │<───────────────│               Gate                 │
//!  └──────────────┘  ClientAction  └────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Client`]: Event dispatcher tying the pieces together
//! - [`Connector`]: At most one live channel, handshake and resync budgets
//! - [`Reconciler`]: Position, move record, status and seat
//! - [`gate`]: Whether the local participant may move right now
//! - [`Endpoint`]: Backend URL derivation
//! - [`identity`]: Persisted client identifier

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod client;
mod config;
mod connector;
mod endpoint;
mod error;
mod event;
pub mod gate;
pub mod identity;
mod reconciler;

pub use action::ClientAction;
pub use client::Client;
pub use config::ClientConfig;
pub use connector::{Connector, HandshakeCheck};
pub use endpoint::{Endpoint, EndpointError};
pub use error::ClientError;
pub use event::{ClientEvent, FetchKind};
pub use gate::Rejection;
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use reconciler::{Authoritative, Reconciler, RemoteOutcome, SyncPhase};
