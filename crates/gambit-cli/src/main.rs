//! `gambit` binary.

use std::{
    io::{self, Write},
    process::ExitCode,
    time::Duration,
};

use clap::Parser;
use gambit_app::{DriverConfig, DriverError, Runtime, TaskDriver};
use gambit_cli::{
    Args, Command, ReqwestHttp, TextView, WebSocketTransport,
    commands::{self, HELP},
};
use gambit_client::{
    Client, ClientEvent, Endpoint, EndpointError, FileIdentityStore, identity::load_or_create,
};
use gambit_core::{ChessRules, PlayMode, SystemEnv};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid backend: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("client id unavailable: {0}")]
    Identity(io::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gambit exited with an error");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let endpoint = Endpoint::parse(&args.backend)?;
    let mut store = FileIdentityStore::new(&args.identity_file);
    let client_id = load_or_create(&mut store, &SystemEnv).map_err(CliError::Identity)?;
    info!(backend = %args.backend, %client_id, "starting");

    let (input_tx, input_rx) = mpsc::channel(32);
    let mode = args.play_mode();
    if mode != PlayMode::Local {
        let _ = input_tx.send(ClientEvent::SetMode(mode)).await;
    }
    tokio::spawn(read_commands(input_tx));

    let driver = TaskDriver::new(
        WebSocketTransport,
        ReqwestHttp::new(HTTP_TIMEOUT)?,
        TextView::new(io::stdout()),
        input_rx,
        &DriverConfig::default(),
    );
    let client = Client::new(SystemEnv, ChessRules, endpoint, client_id, &args.client_config());
    Runtime::new(driver, client).run().await?;
    info!("bye");
    Ok(())
}

/// Forward stdin lines as client events until EOF or `/quit`.
async fn read_commands(input: mpsc::Sender<ClientEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            },
        };
        let command = commands::parse(&line);
        let quit = command == Command::Quit;
        match &command {
            Command::Help => note(HELP),
            Command::Unknown { input } => note(&format!("unknown command: {input} (try /help)")),
            Command::InvalidArgs { command, error } => note(&format!("/{command}: {error}")),
            _ => {},
        }
        if let Some(event) = command.into_event() {
            if input.send(event).await.is_err() {
                break;
            }
        }
        if quit {
            break;
        }
    }
}

fn note(text: &str) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}
