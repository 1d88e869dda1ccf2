//! Terminal client for Gambit
//!
//! A thin shell over [`gambit_app::TaskDriver`] that provides the real I/O:
//! WebSocket channels, reqwest for the auxiliary endpoints, stdin commands
//! and plain-text rendering. All session logic lives in
//! [`gambit_client::Client`] and runs under the generic
//! [`gambit_app::Runtime`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod commands;
pub mod http;
pub mod render;
pub mod websocket;

pub use args::Args;
pub use commands::Command;
pub use gambit_app::{Driver, DriverConfig, Runtime, TaskDriver};
pub use http::ReqwestHttp;
pub use render::TextView;
pub use websocket::{WebSocketChannel, WebSocketTransport};
