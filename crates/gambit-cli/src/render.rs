//! Plain-text rendering of client state.

use std::{fmt::Write as _, io};

use gambit_app::View;
use gambit_client::Client;
use gambit_core::{Environment, PlayMode, Position, RulesEngine};

/// Writes a text frame to `out` whenever the client state is rendered.
pub struct TextView<W> {
    out: W,
    last: Option<String>,
}

impl<W: io::Write + Send> TextView<W> {
    /// View writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<W: io::Write + Send> View for TextView<W> {
    fn render<E, R>(&mut self, client: &Client<E, R>) -> io::Result<()>
    where
        E: Environment,
        R: RulesEngine,
    {
        let frame = frame(client);
        // Ticks re-render constantly; only print changes.
        if self.last.as_deref() == Some(frame.as_str()) {
            return Ok(());
        }
        writeln!(self.out, "{frame}")?;
        self.out.flush()?;
        self.last = Some(frame);
        Ok(())
    }
}

/// Text frame for the current client state.
pub fn frame<E: Environment, R: RulesEngine>(client: &Client<E, R>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "mode: {} | phase: {} | status: {}",
        mode_label(client.mode()),
        client.phase(),
        client.status()
    );
    if let Some(session) = client.session() {
        let seat = client.seat().map_or_else(|| "none".to_string(), |seat| seat.to_string());
        let _ = writeln!(out, "session: {session} | seat: {seat}");
    }
    for line in board(client.position()) {
        let _ = writeln!(out, "{line}");
    }
    if let Some(side) = client.side_to_move() {
        let _ = writeln!(out, "to move: {side}");
    }
    if !client.history().is_empty() {
        let _ = writeln!(out, "moves: {}", numbered(client.history()));
    }
    if let Some(evaluation) = client.evaluation() {
        let _ = writeln!(out, "evaluation: {evaluation}");
    }
    if client.is_discovering() {
        let sessions: Vec<&str> = client.sessions().iter().map(|s| s.as_str()).collect();
        let listing = if sessions.is_empty() { "none".to_string() } else { sessions.join(", ") };
        let _ = writeln!(out, "open sessions: {listing}");
    }
    if let Some(notice) = client.notice() {
        let _ = writeln!(out, "! {notice}");
    }
    out.trim_end().to_string()
}

fn mode_label(mode: PlayMode) -> String {
    match mode {
        PlayMode::Local => "local".into(),
        PlayMode::Engine { search } => format!("engine ({})", search.as_str()),
        PlayMode::Networked => "online".into(),
    }
}

/// `1. e4 e5 2. Nf3`
fn numbered(history: &[String]) -> String {
    history
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rank lines top to bottom plus a file footer. Falls back to the raw
/// encoding when the placement field is not eight ranks.
fn board(position: &Position) -> Vec<String> {
    let placement = position.as_str().split_whitespace().next().unwrap_or("");
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return vec![format!("position: {position}")];
    }
    let mut lines = Vec::with_capacity(9);
    for (rank, row) in (1..=8).rev().zip(ranks) {
        let mut squares = Vec::with_capacity(8);
        for c in row.chars() {
            match c.to_digit(10) {
                Some(empty) => squares.extend(std::iter::repeat_n(".".to_string(), empty as usize)),
                None => squares.push(c.to_string()),
            }
        }
        lines.push(format!("{rank} {}", squares.join(" ")));
    }
    lines.push("  a b c d e f g h".to_string());
    lines
}
