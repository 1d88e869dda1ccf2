//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use gambit_client::ClientConfig;
use gambit_core::{ConnectionConfig, PlayMode, SearchMode};

/// Play chess locally, against the engine service, or online.
#[derive(Debug, Parser)]
#[command(name = "gambit", version, about)]
pub struct Args {
    /// Backend base URL; channel and HTTP endpoints are derived from it
    #[arg(long, default_value = "http://localhost:8000")]
    pub backend: String,

    /// Play mode at startup
    #[arg(long, value_enum, default_value_t = ModeArg::Local)]
    pub mode: ModeArg,

    /// Search flavour for engine mode
    #[arg(long, value_enum, default_value_t = SearchArg::Engine)]
    pub search: SearchArg,

    /// File holding the persistent client id
    #[arg(long, default_value = ".gambit-client-id")]
    pub identity_file: PathBuf,

    /// Seconds between joinable-session listing refreshes
    #[arg(long, default_value_t = 10)]
    pub discovery_secs: u64,

    /// Seconds to wait for the session handshake before retrying
    #[arg(long, default_value_t = 10)]
    pub handshake_secs: u64,
}

/// `--mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Two players at this terminal
    Local,
    /// Local play with evaluation and suggestions
    Engine,
    /// Session on the server
    Online,
}

/// `--search` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchArg {
    /// Full engine search
    Engine,
    /// Shallow minimax
    Minimax,
}

impl Args {
    /// Startup play mode.
    pub fn play_mode(&self) -> PlayMode {
        match self.mode {
            ModeArg::Local => PlayMode::Local,
            ModeArg::Online => PlayMode::Networked,
            ModeArg::Engine => PlayMode::Engine {
                search: match self.search {
                    SearchArg::Engine => SearchMode::Engine,
                    SearchArg::Minimax => SearchMode::Minimax,
                },
            },
        }
    }

    /// Client tunables.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            discovery_interval: Duration::from_secs(self.discovery_secs),
            connection: ConnectionConfig {
                handshake_timeout: Duration::from_secs(self.handshake_secs),
            },
            ..ClientConfig::default()
        }
    }
}
