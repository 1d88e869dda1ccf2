//! Client state machine.
//!
//! [`Client::handle`] is the single entry point. Each event is dispatched to
//! one transition; whatever goes wrong inside a transition is converted into
//! a status or a notice before `handle` returns.

use gambit_core::{
    ChannelId, Discovery, Environment, HttpError, HttpRequest, MoveRequest, PlayMode, Position,
    RulesEngine, SessionStatus,
};
use gambit_proto::{
    ClientId, EvaluationResponse, InitPayload, MovePayload, PositionBody, Seat, ServerMessage,
    SessionId, SessionListing, SessionSnapshot, SuggestionResponse,
};
use tracing::{debug, error, info, warn};

use crate::{
    Authoritative, ClientAction, ClientConfig, ClientError, ClientEvent, Connector, Endpoint,
    FetchKind, HandshakeCheck, Reconciler, Rejection, RemoteOutcome, SyncPhase, gate,
};

/// Session synchronisation client.
///
/// Owns the session mirror, the discovery poller and the channel connector.
/// Generic over the environment (time, randomness) and the rules engine.
pub struct Client<E: Environment, R: RulesEngine> {
    env: E,
    rules: R,
    endpoint: Endpoint,
    client_id: ClientId,
    mode: PlayMode,
    phase: SyncPhase,
    mirror: Reconciler,
    discovery: Discovery<E::Instant>,
    connector: Connector<E::Instant>,
    evaluation: Option<i64>,
    notice: Option<String>,
    last_error: Option<ClientError>,
}

impl<E: Environment, R: RulesEngine> Client<E, R> {
    /// Create a client in local mode at the initial position.
    pub fn new(
        env: E,
        rules: R,
        endpoint: Endpoint,
        client_id: ClientId,
        config: &ClientConfig,
    ) -> Self {
        let mirror = Reconciler::new(rules.initial_position(), SessionStatus::Ongoing);
        Self {
            env,
            rules,
            endpoint,
            client_id,
            mode: PlayMode::Local,
            phase: SyncPhase::Idle,
            mirror,
            discovery: Discovery::new(config.discovery_interval),
            connector: Connector::new(config),
            evaluation: None,
            notice: None,
            last_error: None,
        }
    }

    /// Current play mode.
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Synchronisation phase.
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        self.mirror.position()
    }

    /// Notation of every accepted move.
    pub fn history(&self) -> &[String] {
        self.mirror.history()
    }

    /// Session status.
    pub fn status(&self) -> &SessionStatus {
        self.mirror.status()
    }

    /// Assigned seat, if any.
    pub fn seat(&self) -> Option<Seat> {
        self.mirror.seat()
    }

    /// Seat to move in the current position.
    pub fn side_to_move(&self) -> Option<Seat> {
        self.rules.side_to_move(self.mirror.position()).ok()
    }

    /// Local moves awaiting the server's echo.
    pub fn pending_moves(&self) -> usize {
        self.mirror.pending().len()
    }

    /// Selected session.
    pub fn session(&self) -> Option<&SessionId> {
        self.connector.session()
    }

    /// Live channel.
    pub fn channel(&self) -> Option<ChannelId> {
        self.connector.channel()
    }

    /// Joinable sessions from the last successful listing.
    pub fn sessions(&self) -> &[SessionId] {
        self.discovery.sessions()
    }

    /// Whether the discovery timer is armed.
    pub fn is_discovering(&self) -> bool {
        self.discovery.is_polling()
    }

    /// Latest evaluation of the current position (engine mode).
    pub fn evaluation(&self) -> Option<i64> {
        self.evaluation
    }

    /// Latest message for the user.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Most recent error.
    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    /// Identifier sent with every join.
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Rules engine in use.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Process one event.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::SetMode(mode) => self.set_mode(mode),
            ClientEvent::JoinSession(session) => self.join(session, true),
            ClientEvent::CreateSession => self.create_session(),
            ClientEvent::LeaveSession => self.leave(),
            ClientEvent::Submit(request) => self.submit(request).unwrap_or_else(|rejection| {
                debug!(%rejection, "submission rejected");
                self.notice = Some(rejection.to_string());
                Vec::new()
            }),
            ClientEvent::Undo => self.undo(),
            ClientEvent::Reset => self.reset(),
            ClientEvent::RequestSuggestion => self.request_suggestion(),
            ClientEvent::Tick => self.tick(),
            ClientEvent::ChannelOpened { channel } => {
                if self.connector.is_current(channel) {
                    info!(%channel, "channel open, waiting for handshake");
                } else {
                    debug!(%channel, "open reported for stale channel");
                }
                Vec::new()
            },
            ClientEvent::ChannelMessage { channel, text } => self.on_message(channel, &text),
            ClientEvent::ChannelClosed { channel, reason } => self.on_closed(channel, reason),
            ClientEvent::ChannelFailed { channel, error } => self.on_failed(channel, error),
            ClientEvent::SendFailed { channel, error } => self.on_send_failed(channel, error),
            ClientEvent::Fetched { request, result } => self.on_fetched(request, result),
            ClientEvent::Shutdown => self.shutdown(),
        }
    }

    /// Submit a local move through the gate.
    ///
    /// On acceptance the move is applied to the mirror immediately and, when
    /// a channel is live, queued for transmission. It is not rolled back if
    /// the send later fails.
    ///
    /// # Errors
    ///
    /// [`Rejection`] when the gate refuses; the mirror is unchanged.
    pub fn submit(&mut self, request: MoveRequest) -> Result<Vec<ClientAction>, Rejection> {
        let applied = gate::authorize(&self.rules, self.mode, &self.mirror, &request)?;
        let networked = self.mode.is_networked();
        info!(%request, notation = %applied.notation, "move accepted");
        self.mirror.apply_local(applied, request.clone(), networked);
        self.notice = None;

        if !networked {
            return Ok(self.evaluate().into_iter().collect());
        }
        let Some(channel) = self.connector.channel() else {
            return Ok(Vec::new());
        };
        match request.to_message().to_json() {
            Ok(text) => Ok(vec![ClientAction::Send { channel, text }]),
            Err(error) => {
                warn!(%error, "failed to encode move");
                Ok(Vec::new())
            },
        }
    }

    /// Tear everything down: close the channel and stop discovery.
    pub fn shutdown(&mut self) -> Vec<ClientAction> {
        let actions = self.connector.leave();
        self.discovery.stop();
        info!("client shut down");
        actions
    }

    fn set_mode(&mut self, mode: PlayMode) -> Vec<ClientAction> {
        if mode == self.mode {
            return Vec::new();
        }
        info!(?mode, "switching play mode");
        let mut actions = self.connector.leave();
        self.discovery.stop();
        self.mode = mode;
        self.phase = SyncPhase::Idle;
        self.evaluation = None;
        self.notice = None;
        self.last_error = None;

        let initial = self.rules.initial_position();
        if mode.is_networked() {
            self.mirror.reset(initial, SessionStatus::Absent);
            actions.extend(self.start_discovery());
        } else {
            self.mirror.reset(initial, SessionStatus::Ongoing);
            actions.extend(self.evaluate());
        }
        actions
    }

    fn join(&mut self, session: SessionId, fetch_snapshot: bool) -> Vec<ClientAction> {
        if !self.mode.is_networked() {
            self.notice = Some("sessions are only available in networked mode".into());
            return Vec::new();
        }
        info!(%session, "joining session");
        self.discovery.stop();
        self.mirror.reset(self.rules.initial_position(), SessionStatus::Absent);
        self.phase = SyncPhase::Joining;
        self.notice = None;
        self.last_error = None;

        let url = self.endpoint.channel_url(&session, &self.client_id);
        let mut actions = self.connector.open(session.clone(), url, self.env.now());
        if fetch_snapshot {
            actions.push(self.snapshot_fetch(&session));
        }
        actions
    }

    fn create_session(&mut self) -> Vec<ClientAction> {
        if !self.mode.is_networked() {
            self.notice = Some("sessions are only available in networked mode".into());
            return Vec::new();
        }
        match SessionId::new(self.env.fresh_token()) {
            Ok(session) => self.join(session, false),
            Err(error) => {
                warn!(%error, "failed to generate session id");
                Vec::new()
            },
        }
    }

    fn leave(&mut self) -> Vec<ClientAction> {
        if !self.mode.is_networked() {
            return Vec::new();
        }
        if let Some(session) = self.connector.session() {
            info!(%session, "leaving session");
        }
        let mut actions = self.connector.leave();
        self.mirror.reset(self.rules.initial_position(), SessionStatus::Absent);
        self.phase = SyncPhase::Idle;
        actions.extend(self.start_discovery());
        actions
    }

    fn undo(&mut self) -> Vec<ClientAction> {
        if self.mode.is_networked() {
            self.notice = Some("undo is only available offline".into());
            return Vec::new();
        }
        if !self.mirror.undo() {
            self.notice = Some("nothing to undo".into());
            return Vec::new();
        }
        self.evaluate().into_iter().collect()
    }

    fn reset(&mut self) -> Vec<ClientAction> {
        if self.mode.is_networked() {
            self.notice = Some("reset is only available offline".into());
            return Vec::new();
        }
        self.mirror.reset(self.rules.initial_position(), SessionStatus::Ongoing);
        self.evaluation = None;
        self.evaluate().into_iter().collect()
    }

    fn request_suggestion(&mut self) -> Vec<ClientAction> {
        let PlayMode::Engine { search } = self.mode else {
            self.notice = Some("suggestions are only available in engine mode".into());
            return Vec::new();
        };
        if self.mirror.status() != &SessionStatus::Ongoing {
            self.notice = Some(format!("no suggestion while {}", self.mirror.status()));
            return Vec::new();
        }
        let position = self.mirror.position().clone();
        let Some(body) = position_body(&position) else {
            return Vec::new();
        };
        vec![ClientAction::Fetch {
            request: FetchKind::Suggestion(position),
            http: HttpRequest::post(self.endpoint.suggestion_url(search), body),
        }]
    }

    fn tick(&mut self) -> Vec<ClientAction> {
        let now = self.env.now();
        let mut actions = Vec::new();
        if self.discovery.tick(now) {
            actions.push(self.listing_fetch());
        }
        match self.connector.tick(now) {
            HandshakeCheck::Idle => {},
            HandshakeCheck::Retried(retry) => actions.extend(retry),
            HandshakeCheck::Exhausted(closed) => {
                actions.extend(closed);
                let error = ClientError::Connection("handshake timed out".into());
                actions.extend(self.fail("handshake timed out".into(), error));
            },
        }
        actions
    }

    fn on_message(&mut self, channel: ChannelId, text: &str) -> Vec<ClientAction> {
        if !self.connector.is_current(channel) {
            debug!(%channel, "dropping message from stale channel");
            return Vec::new();
        }
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(error) => return self.on_mirror_error(error.into()),
        };
        match message {
            ServerMessage::Init(init) => self.on_init(init),
            ServerMessage::Move(payload) => self.on_remote_move(&payload),
            ServerMessage::Error(payload) => self.on_server_error(payload.message),
            ServerMessage::ColorAssignment(assignment) => {
                info!(seat = ?assignment.color, "seat assigned");
                self.mirror.set_seat(assignment.color);
                Vec::new()
            },
            ServerMessage::Status(payload) => {
                match SessionStatus::from_wire(Some(&payload.status)) {
                    Ok(status) => {
                        info!(%status, "session status changed");
                        self.mirror.set_status(status);
                        Vec::new()
                    },
                    Err(error) => self.on_mirror_error(error.into()),
                }
            },
            ServerMessage::Unrecognized { kind } => {
                debug!(%kind, "ignoring unrecognized message");
                Vec::new()
            },
        }
    }

    fn on_init(&mut self, init: InitPayload) -> Vec<ClientAction> {
        let status = match SessionStatus::from_wire(init.status.as_deref()) {
            Ok(status) => status,
            Err(error) => return self.on_mirror_error(error.into()),
        };
        let state = Authoritative {
            position: Position::new(init.fen),
            history: init.move_history,
            status,
            seat: Some(init.color),
        };
        if let Err(violation) = self.mirror.overwrite(&self.rules, state) {
            return self.on_mirror_error(violation.into());
        }
        if let Err(error) = self.connector.on_init(self.env.now()) {
            warn!(%error, "handshake in unexpected connection state");
        }
        self.phase = SyncPhase::Synced;
        self.notice = None;
        info!(
            seat = ?self.mirror.seat(),
            moves = self.mirror.history().len(),
            status = %self.mirror.status(),
            "session synchronised"
        );
        Vec::new()
    }

    fn on_remote_move(&mut self, payload: &MovePayload) -> Vec<ClientAction> {
        if self.phase != SyncPhase::Synced {
            debug!(phase = %self.phase, "move before authoritative state; it will be included there");
            return Vec::new();
        }
        match self.mirror.apply_remote(&self.rules, payload) {
            Ok(RemoteOutcome::Applied(notation)) => {
                info!(%notation, "opponent moved");
                Vec::new()
            },
            Ok(RemoteOutcome::Confirmed(request)) => {
                debug!(%request, "server confirmed move");
                Vec::new()
            },
            Err(error) => self.on_mirror_error(error),
        }
    }

    fn on_server_error(&mut self, message: String) -> Vec<ClientAction> {
        let reason = format!("failed to join session: {message}");
        self.fail(reason, ClientError::from_server(message))
    }

    /// Channel content disagreed with the mirror. A snapshot already in
    /// flight will replace the mirror, so only the first complaint counts.
    fn on_mirror_error(&mut self, cause: ClientError) -> Vec<ClientAction> {
        if self.phase == SyncPhase::Reconciling {
            debug!(%cause, "already resynchronising");
            return Vec::new();
        }
        warn!(%cause, "session mirror out of step, resynchronising");
        self.request_snapshot(cause)
    }

    fn request_snapshot(&mut self, cause: ClientError) -> Vec<ClientAction> {
        let Some(session) = self.connector.session().cloned() else {
            return Vec::new();
        };
        if !self.connector.begin_resync() {
            let reason = format!("unable to resynchronise: {cause}");
            return self.fail(reason, cause);
        }
        self.phase = SyncPhase::Reconciling;
        self.notice = Some("resynchronising".into());
        self.last_error = Some(cause);
        vec![self.snapshot_fetch(&session)]
    }

    fn on_closed(&mut self, channel: ChannelId, reason: Option<String>) -> Vec<ClientAction> {
        if !self.connector.on_closed(channel) {
            debug!(%channel, "close reported for stale channel");
            return Vec::new();
        }
        info!(%channel, reason = reason.as_deref().unwrap_or(""), "channel closed");
        self.mirror.disconnect();
        self.phase = SyncPhase::Disconnected;
        self.notice = Some(match reason {
            Some(reason) if !reason.is_empty() => format!("disconnected: {reason}"),
            _ => "disconnected".into(),
        });
        Vec::new()
    }

    fn on_failed(&mut self, channel: ChannelId, error: String) -> Vec<ClientAction> {
        if !self.connector.on_closed(channel) {
            debug!(%channel, "failure reported for stale channel");
            return Vec::new();
        }
        warn!(%channel, %error, "channel failed");
        self.mirror.disconnect();
        self.phase = SyncPhase::Disconnected;
        self.notice = Some(format!("failed to connect to game server: {error}"));
        self.last_error = Some(ClientError::Connection(error));
        Vec::new()
    }

    fn on_send_failed(&mut self, channel: ChannelId, error: String) -> Vec<ClientAction> {
        if !self.connector.is_current(channel) {
            debug!(%channel, "send failure reported for stale channel");
            return Vec::new();
        }
        warn!(%channel, %error, "failed to send move");
        self.notice = Some(format!("failed to send move: {error}"));
        self.last_error = Some(ClientError::Connection(error));
        Vec::new()
    }

    fn on_fetched(
        &mut self,
        request: FetchKind,
        result: Result<String, HttpError>,
    ) -> Vec<ClientAction> {
        match request {
            FetchKind::Listing => {
                let listing = result.map_err(|e| e.to_string()).and_then(|body| {
                    SessionListing::from_json(&body).map(|l| l.sessions).map_err(|e| e.to_string())
                });
                if self.discovery.on_listing(listing) {
                    debug!(count = self.discovery.sessions().len(), "joinable sessions updated");
                }
                Vec::new()
            },
            FetchKind::Snapshot(session) => self.on_snapshot(&session, result),
            FetchKind::Suggestion(position) => self.on_suggestion(&position, result),
            FetchKind::Evaluation(position) => {
                if !self.wants_analysis_of(&position) {
                    debug!("dropping evaluation for a stale position");
                    return Vec::new();
                }
                match result.map_err(ClientError::from).and_then(|body| {
                    EvaluationResponse::from_json(&body).map_err(ClientError::from)
                }) {
                    Ok(response) => self.evaluation = response.evaluation,
                    Err(error) => warn!(%error, "evaluation failed"),
                }
                Vec::new()
            },
        }
    }

    fn on_snapshot(
        &mut self,
        session: &SessionId,
        result: Result<String, HttpError>,
    ) -> Vec<ClientAction> {
        let expected = matches!(self.phase, SyncPhase::Joining | SyncPhase::Reconciling);
        if !expected || self.connector.session() != Some(session) {
            debug!(%session, phase = %self.phase, "ignoring late snapshot");
            return Vec::new();
        }
        match self.load_snapshot(result) {
            Ok(()) if self.phase == SyncPhase::Reconciling => {
                info!(%session, moves = self.mirror.history().len(), "resynchronised");
                self.connector.resync_succeeded();
                self.phase = SyncPhase::Synced;
                self.notice = None;
                Vec::new()
            },
            Ok(()) => {
                debug!(%session, "snapshot loaded, waiting for handshake");
                Vec::new()
            },
            Err(error) if self.phase == SyncPhase::Reconciling => {
                warn!(%session, %error, "snapshot failed");
                self.request_snapshot(error)
            },
            Err(error) => {
                warn!(%session, %error, "join snapshot unavailable");
                Vec::new()
            },
        }
    }

    fn load_snapshot(&mut self, result: Result<String, HttpError>) -> Result<(), ClientError> {
        let body = result?;
        let snapshot = SessionSnapshot::from_json(&body)?;
        let status = SessionStatus::from_wire(snapshot.status.as_deref())?;
        self.mirror.overwrite(&self.rules, Authoritative {
            position: Position::new(snapshot.fen),
            history: snapshot.move_history,
            status,
            seat: None,
        })?;
        Ok(())
    }

    fn on_suggestion(
        &mut self,
        position: &Position,
        result: Result<String, HttpError>,
    ) -> Vec<ClientAction> {
        if !self.wants_analysis_of(position) {
            debug!("dropping suggestion for a stale position");
            return Vec::new();
        }
        let response = match result
            .map_err(ClientError::from)
            .and_then(|body| SuggestionResponse::from_json(&body).map_err(ClientError::from))
        {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "suggestion failed");
                self.notice = Some(format!("suggestion failed: {error}"));
                return Vec::new();
            },
        };
        let Some(suggested) = response.best_move else {
            self.notice =
                Some(response.error.unwrap_or_else(|| "no move available".to_string()));
            return Vec::new();
        };
        let request = match MoveRequest::from_coordinates(&suggested) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "unusable suggestion");
                self.notice = Some(format!("unusable suggestion `{suggested}`"));
                return Vec::new();
            },
        };
        match self.submit(request) {
            Ok(actions) => actions,
            Err(rejection) => {
                warn!(%rejection, %suggested, "suggested move rejected");
                self.notice = Some(format!("suggested move {suggested} rejected: {rejection}"));
                Vec::new()
            },
        }
    }

    /// Session attempt is over: mirror errored, channel closed.
    fn fail(&mut self, reason: String, cause: ClientError) -> Vec<ClientAction> {
        error!(%reason, %cause, "session failed");
        self.mirror.fail(reason.clone());
        self.phase = SyncPhase::Errored;
        self.notice = Some(reason);
        self.last_error = Some(cause);
        self.connector.close()
    }

    fn wants_analysis_of(&self, position: &Position) -> bool {
        matches!(self.mode, PlayMode::Engine { .. }) && position == self.mirror.position()
    }

    fn start_discovery(&mut self) -> Option<ClientAction> {
        self.discovery.start(self.env.now()).then(|| self.listing_fetch())
    }

    fn evaluate(&self) -> Option<ClientAction> {
        if !matches!(self.mode, PlayMode::Engine { .. }) {
            return None;
        }
        let position = self.mirror.position().clone();
        let body = position_body(&position)?;
        Some(ClientAction::Fetch {
            request: FetchKind::Evaluation(position),
            http: HttpRequest::post(self.endpoint.evaluation_url(), body),
        })
    }

    fn listing_fetch(&self) -> ClientAction {
        ClientAction::Fetch {
            request: FetchKind::Listing,
            http: HttpRequest::get(self.endpoint.listing_url()),
        }
    }

    fn snapshot_fetch(&self, session: &SessionId) -> ClientAction {
        ClientAction::Fetch {
            request: FetchKind::Snapshot(session.clone()),
            http: HttpRequest::get(self.endpoint.snapshot_url(session)),
        }
    }
}

fn position_body(position: &Position) -> Option<String> {
    match (PositionBody { fen: position.as_str().to_string() }).to_json() {
        Ok(body) => Some(body),
        Err(error) => {
            warn!(%error, "failed to encode position");
            None
        },
    }
}
