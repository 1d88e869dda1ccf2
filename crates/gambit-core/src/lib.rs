//! Gambit session core
//!
//! Pure building blocks for keeping a local mirror of a two-participant game
//! session in step with an authoritative server. Nothing in this crate performs
//! I/O: time and randomness come from an [`env::Environment`], and network
//! access is described by the [`transport`] traits that drivers implement.
//!
//! # Components
//!
//! - [`connection`]: Channel lifecycle state machine (handshake, timeout, close)
//! - [`discovery`]: Session listing poller with an explicitly released timer
//! - [`rules`]: Rules engine seam plus the chess implementation
//! - [`session`]: Session domain types (position, status, move requests, modes)
//! - [`mod@env`]: Environment abstraction (time, RNG)
//! - [`transport`]: Transport and HTTP abstractions
//! - [`error`]: Connection and rule error types

pub mod connection;
pub mod discovery;
pub mod env;
pub mod error;
pub mod rules;
pub mod session;
pub mod transport;

pub use connection::{ChannelId, Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use discovery::Discovery;
pub use env::{Environment, SystemEnv};
pub use error::{ConnectionError, RuleViolation};
pub use rules::{AppliedMove, ChessRules, RulesEngine};
pub use session::{MoveRequest, PlayMode, Position, SearchMode, SessionStatus};
pub use transport::{HttpClient, HttpError, HttpMethod, HttpRequest, Transport, TransportChannel};
