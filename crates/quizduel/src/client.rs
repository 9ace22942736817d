//! `DuelClient` and the client actor.
//!
//! A connected client is one Tokio task, the actor, that owns everything
//! with state: the dispatcher, the matchmaker and the match session. It
//! waits on four sources at once:
//!
//! ```text
//!   transport events ──┐
//!   client commands ───┼──→ tokio::select! ──→ one transition at a time
//!   timer / handler ───┤
//!   shutdown ──────────┘
//! ```
//!
//! [`DuelClient`], [`PendingMatch`] and [`MatchHandle`] are handles that
//! talk to the actor over channels, the same way a room handle talks to
//! its room.

use std::sync::Arc;

use quizduel_match::{
    InputReceiver, InputSender, MatchConfig, MatchInput, MatchSession,
    Matchmaker, MatchmakingError, MatchmakingEvent, MatchmakingInput, Outbox,
    PlayerProfile, RequestId, SessionError, SessionInput, SessionUpdate,
};
use quizduel_protocol::{
    AnswerFeedback, Dispatcher, GameEnded, GameId, MatchFound, NextQuestion,
    PlayerPresence, ScoreUpdate, SubscriptionId, UserId, kind,
};
use quizduel_transport::{
    ConnectionManager, ConnectionState, Credential, FrameSink, TransportEvent,
    TransportEvents, WebSocketConnector,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::{
    ClientConfig, CredentialStore, HttpUserDirectory, QuizDuelError,
    UserDirectory,
};

/// Capacity of the command channel between handles and the actor.
const COMMAND_CHANNEL_SIZE: usize = 64;

type UserHandler = Box<dyn FnMut(&Value) + Send>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Requests from the handles to the actor. Most carry a reply channel.
enum ClientCommand {
    FindMatch {
        reply: oneshot::Sender<Result<PendingMatch, QuizDuelError>>,
    },
    CancelMatch {
        reply: oneshot::Sender<Result<RequestId, QuizDuelError>>,
    },
    SubmitAnswer {
        game_id: GameId,
        choice: String,
        reply: oneshot::Sender<Result<(), QuizDuelError>>,
    },
    Abandon {
        game_id: GameId,
        reply: oneshot::Sender<Result<(), QuizDuelError>>,
    },
    Subscribe {
        kind: String,
        handler: UserHandler,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        id: SubscriptionId,
        reply: oneshot::Sender<bool>,
    },
    Reconnect {
        reply: oneshot::Sender<Result<(), QuizDuelError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Sends `make(reply)` to the actor and waits for the reply.
async fn request<T>(
    commands: &mpsc::Sender<ClientCommand>,
    make: impl FnOnce(oneshot::Sender<T>) -> ClientCommand,
) -> Result<T, QuizDuelError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    commands
        .send(make(reply_tx))
        .await
        .map_err(|_| QuizDuelError::Closed)?;
    reply_rx.await.map_err(|_| QuizDuelError::Closed)
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// How a [`PendingMatch`] resolved.
#[derive(Debug)]
pub enum MatchOutcome {
    /// An opponent was found and the session is running.
    Found(MatchHandle),
    /// Nobody was found before the matchmaking timeout.
    TimedOut,
    /// The search was cancelled with [`DuelClient::cancel_match`].
    Cancelled,
}

/// A search started by [`DuelClient::find_match`].
///
/// Dropping it before the search resolves cancels the search.
#[derive(Debug)]
pub struct PendingMatch {
    request: RequestId,
    outcome: oneshot::Receiver<MatchOutcome>,
}

impl PendingMatch {
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Waits for the search to resolve.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Closed`] if the client shut down first.
    pub async fn outcome(self) -> Result<MatchOutcome, QuizDuelError> {
        self.outcome.await.map_err(|_| QuizDuelError::Closed)
    }
}

/// The local player's side of a running match.
///
/// Updates arrive in the order the session produced them. The stream ends
/// after [`SessionUpdate::Ended`].
#[derive(Debug)]
pub struct MatchHandle {
    game_id: GameId,
    opponent: UserId,
    commands: mpsc::Sender<ClientCommand>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
}

impl MatchHandle {
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn opponent(&self) -> &UserId {
        &self.opponent
    }

    /// Answers the current question. Resulting updates arrive through
    /// [`next_update`](Self::next_update).
    ///
    /// # Errors
    /// [`QuizDuelError::Session`] if the answer was not accepted (already
    /// answered, no open question, match over, or not sent).
    pub async fn submit_answer(
        &self,
        choice: impl Into<String>,
    ) -> Result<(), QuizDuelError> {
        let game_id = self.game_id.clone();
        let choice = choice.into();
        request(&self.commands, |reply| ClientCommand::SubmitAnswer {
            game_id,
            choice,
            reply,
        })
        .await?
    }

    /// Waits for the next update. Returns `None` once the match is over
    /// and every update was read.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// Returns an update if one is already queued.
    pub fn try_next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.try_recv().ok()
    }

    /// Leaves the match.
    ///
    /// # Errors
    /// [`QuizDuelError::Session`] if the match already ended.
    pub async fn abandon(&self) -> Result<(), QuizDuelError> {
        let game_id = self.game_id.clone();
        request(&self.commands, |reply| ClientCommand::Abandon { game_id, reply })
            .await?
    }
}

/// A connected QuizDuel client.
///
/// Dropping the client shuts the actor down: the search is cancelled, the
/// match is abandoned and the connection is closed.
#[derive(Debug)]
pub struct DuelClient {
    local: PlayerProfile,
    commands: mpsc::Sender<ClientCommand>,
    connection: watch::Receiver<ConnectionState>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl DuelClient {
    /// Starts building a client for `config`.
    pub fn builder(config: ClientConfig) -> DuelClientBuilder<HttpUserDirectory> {
        DuelClientBuilder::new(config)
    }

    /// Connects with the account API in `config` as the user directory.
    ///
    /// # Errors
    /// See [`DuelClientBuilder::connect`].
    pub async fn connect(
        config: ClientConfig,
        credentials: &impl CredentialStore,
    ) -> Result<Self, QuizDuelError> {
        Self::builder(config).connect(credentials).await
    }

    /// The signed-in player.
    pub fn local_player(&self) -> &PlayerProfile {
        &self.local
    }

    /// Current state of the match server connection.
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Watches the match server connection.
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.clone()
    }

    /// Joins the matchmaking pool.
    ///
    /// # Errors
    /// [`QuizDuelError::Matchmaking`] if a search or a match is already
    /// running, or the request could not be sent.
    pub async fn find_match(&self) -> Result<PendingMatch, QuizDuelError> {
        request(&self.commands, |reply| ClientCommand::FindMatch { reply }).await?
    }

    /// Cancels the running search. Its [`PendingMatch`] resolves to
    /// [`MatchOutcome::Cancelled`].
    ///
    /// # Errors
    /// [`QuizDuelError::Matchmaking`] if nothing is being searched for.
    pub async fn cancel_match(&self) -> Result<RequestId, QuizDuelError> {
        request(&self.commands, |reply| ClientCommand::CancelMatch { reply }).await?
    }

    /// Runs `handler` for every inbound frame of type `kind`, alongside the
    /// client's own handling.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Closed`] if the client shut down.
    pub async fn subscribe(
        &self,
        kind: impl Into<String>,
        handler: impl FnMut(&Value) + Send + 'static,
    ) -> Result<SubscriptionId, QuizDuelError> {
        let kind = kind.into();
        let handler: UserHandler = Box::new(handler);
        request(&self.commands, |reply| ClientCommand::Subscribe {
            kind,
            handler,
            reply,
        })
        .await
    }

    /// Removes a handler added with [`subscribe`](Self::subscribe).
    /// Returns `false` if it was already gone.
    ///
    /// # Errors
    /// Returns [`QuizDuelError::Closed`] if the client shut down.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, QuizDuelError> {
        request(&self.commands, |reply| ClientCommand::Unsubscribe { id, reply }).await
    }

    /// Opens a new connection with the stored credential after the old one
    /// dropped.
    ///
    /// # Errors
    /// [`QuizDuelError::Transport`] if the connection is still open or the
    /// handshake fails.
    pub async fn reconnect(&self) -> Result<(), QuizDuelError> {
        request(&self.commands, |reply| ClientCommand::Reconnect { reply }).await?
    }

    /// Shuts the client down and waits for the actor to finish.
    pub async fn close(mut self) {
        // The actor is already gone if this fails.
        let _ = request(&self.commands, |reply| ClientCommand::Close { reply }).await;
        self.shutdown.take();
    }
}

impl Drop for DuelClient {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Builder for [`DuelClient`].
#[derive(Debug)]
pub struct DuelClientBuilder<D> {
    config: ClientConfig,
    directory: D,
}

impl DuelClientBuilder<HttpUserDirectory> {
    /// Creates a builder that looks users up through the account API in
    /// `config`.
    pub fn new(config: ClientConfig) -> Self {
        let directory = HttpUserDirectory::new(config.api_base_url.clone());
        Self { config, directory }
    }
}

impl<D: UserDirectory> DuelClientBuilder<D> {
    /// Replaces the user directory.
    pub fn directory<D2: UserDirectory>(self, directory: D2) -> DuelClientBuilder<D2> {
        DuelClientBuilder {
            config: self.config,
            directory,
        }
    }

    /// Identifies the local player, opens the match server connection and
    /// starts the client actor.
    ///
    /// # Errors
    /// - [`QuizDuelError::Config`] / [`QuizDuelError::Transport`] if there
    ///   is no usable credential.
    /// - [`QuizDuelError::Directory`] if the local player cannot be looked
    ///   up.
    /// - [`QuizDuelError::Transport`] if the handshake fails.
    pub async fn connect(
        self,
        credentials: &impl CredentialStore,
    ) -> Result<DuelClient, QuizDuelError> {
        let credential = credentials.credential()?;
        let local = self.directory.current_user(&credential).await?;
        info!(local = %local.id, username = %local.username, "signed in");

        let match_config = self.config.match_config.clone().validated();
        let manager = Arc::new(ConnectionManager::new(WebSocketConnector::new(
            self.config.connect.clone(),
        )));
        let events = manager.connect(&credential).await?;
        let connection = manager.watch_state();

        let sink: Arc<dyn FrameSink> = manager.clone();
        let outbox = Outbox::new(sink);
        let (inputs, input_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (shutdown_tx, shutdown) = oneshot::channel();

        let mut dispatcher = Dispatcher::new();
        let found_tx = inputs.clone();
        dispatcher.subscribe_typed(kind::MATCH_FOUND, move |found: MatchFound| {
            let _ = found_tx.send(MatchmakingInput::MatchFound(found).into());
        });

        let actor = ClientActor {
            matchmaker: Matchmaker::new(
                outbox.clone(),
                inputs.clone(),
                match_config.matchmaking_timeout,
            ),
            manager,
            events: Some(events),
            credential,
            local: local.clone(),
            directory: Arc::new(self.directory),
            config: match_config,
            dispatcher,
            pending: None,
            active: None,
            outbox,
            inputs,
            input_rx,
            commands,
            self_commands: commands_tx.clone(),
            shutdown,
        };
        tokio::spawn(actor.run());

        Ok(DuelClient {
            local,
            commands: commands_tx,
            connection,
            shutdown: Some(shutdown_tx),
        })
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The running match and what the actor registered for it.
struct ActiveMatch {
    session: MatchSession,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    subscriptions: Vec<SubscriptionId>,
}

struct ClientActor<D: UserDirectory> {
    manager: Arc<ConnectionManager<WebSocketConnector>>,
    events: Option<TransportEvents>,
    credential: Credential,
    local: PlayerProfile,
    directory: Arc<D>,
    config: MatchConfig,
    dispatcher: Dispatcher,
    matchmaker: Matchmaker,
    pending: Option<(RequestId, oneshot::Sender<MatchOutcome>)>,
    active: Option<ActiveMatch>,
    outbox: Outbox,
    inputs: InputSender,
    input_rx: InputReceiver,
    commands: mpsc::Receiver<ClientCommand>,
    /// Handed to every [`MatchHandle`].
    self_commands: mpsc::Sender<ClientCommand>,
    shutdown: oneshot::Receiver<()>,
}

impl<D: UserDirectory> ClientActor<D> {
    async fn run(mut self) {
        info!(local = %self.local.id, "client actor started");

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    self.teardown("client dropped");
                    break;
                }
                Some(command) = self.commands.recv() => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                event = next_event(&mut self.events) => self.handle_transport(event),
                Some(input) = self.input_rx.recv() => self.handle_input(input),
                request = pending_dropped(&mut self.pending) => self.abandon_search(request),
            }
        }

        info!(local = %self.local.id, "client actor stopped");
    }

    /// Returns `false` when the actor should stop.
    async fn handle_command(&mut self, command: ClientCommand) -> bool {
        match command {
            ClientCommand::FindMatch { reply } => {
                let _ = reply.send(self.find_match());
            }
            ClientCommand::CancelMatch { reply } => {
                let _ = reply.send(self.cancel_match());
            }
            ClientCommand::SubmitAnswer {
                game_id,
                choice,
                reply,
            } => {
                let _ = reply.send(self.submit_answer(&game_id, choice));
            }
            ClientCommand::Abandon { game_id, reply } => {
                let _ = reply.send(self.abandon(&game_id));
            }
            ClientCommand::Subscribe {
                kind,
                handler,
                reply,
            } => {
                let _ = reply.send(self.dispatcher.subscribe(kind, handler));
            }
            ClientCommand::Unsubscribe { id, reply } => {
                let _ = reply.send(self.dispatcher.unsubscribe(id));
            }
            ClientCommand::Reconnect { reply } => {
                let _ = reply.send(self.reconnect().await);
            }
            ClientCommand::Close { reply } => {
                self.teardown("client closed");
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // -- matchmaking --------------------------------------------------------

    fn find_match(&mut self) -> Result<PendingMatch, QuizDuelError> {
        if self.active.is_some() {
            return Err(MatchmakingError::SessionActive.into());
        }
        let request = self.matchmaker.find_match()?;
        let (outcome_tx, outcome) = oneshot::channel();
        self.pending = Some((request, outcome_tx));
        Ok(PendingMatch { request, outcome })
    }

    fn cancel_match(&mut self) -> Result<RequestId, QuizDuelError> {
        let request = self.matchmaker.cancel_match()?;
        self.resolve_pending(request, MatchOutcome::Cancelled);
        Ok(request)
    }

    /// The [`PendingMatch`] for `request` was dropped: leave the pool so
    /// the server does not pair an opponent with nobody.
    fn abandon_search(&mut self, request: RequestId) {
        self.pending = None;
        if self.matchmaker.request() == Some(request) && self.matchmaker.is_searching() {
            info!(%request, "pending match dropped, leaving matchmaking");
            if let Err(e) = self.matchmaker.cancel_match() {
                debug!(%request, error = %e, "search already over");
            }
        }
    }

    fn on_matchmaking_event(&mut self, event: MatchmakingEvent) {
        match event {
            MatchmakingEvent::Found { request, found } => {
                let handle = self.start_session(found);
                if let Some(MatchOutcome::Found(handle)) =
                    self.resolve_pending(request, MatchOutcome::Found(handle))
                {
                    // Only reachable when match_found raced the drop of the
                    // PendingMatch; the server already paired us.
                    warn!(game_id = %handle.game_id, "nobody is waiting for the match, abandoning it");
                    self.abandon_active();
                }
            }
            MatchmakingEvent::TimedOut { request } => {
                self.resolve_pending(request, MatchOutcome::TimedOut);
            }
        }
    }

    /// Hands `outcome` to the waiting [`PendingMatch`]. Gives it back if
    /// nobody is waiting.
    fn resolve_pending(
        &mut self,
        request: RequestId,
        outcome: MatchOutcome,
    ) -> Option<MatchOutcome> {
        match self.pending.take() {
            Some((pending, reply)) if pending == request => reply.send(outcome).err(),
            other => {
                self.pending = other;
                debug!(%request, "no pending search for this outcome");
                Some(outcome)
            }
        }
    }

    // -- session ------------------------------------------------------------

    fn start_session(&mut self, found: MatchFound) -> MatchHandle {
        let (session, opening) = MatchSession::start(
            found,
            self.local.id.clone(),
            self.config.clone(),
            self.outbox.clone(),
            self.inputs.clone(),
        );
        let game_id = session.game_id().clone();
        let opponent = session.opponent().clone();

        let subscriptions = vec![
            self.route(kind::ANSWER_FEEDBACK, |p: AnswerFeedback| {
                SessionInput::AnswerFeedback(p)
            }),
            self.route(kind::SCORE_UPDATE, |p: ScoreUpdate| SessionInput::ScoreUpdate(p)),
            self.route(kind::NEXT_QUESTION, |p: NextQuestion| {
                SessionInput::NextQuestion(p)
            }),
            self.route(kind::GAME_ENDED, |p: GameEnded| SessionInput::GameEnded(p)),
            self.route(kind::PLAYER_DISCONNECTED, |p: PlayerPresence| {
                SessionInput::PlayerDisconnected(p)
            }),
            self.route(kind::PLAYER_RECONNECTED, |p: PlayerPresence| {
                SessionInput::PlayerReconnected(p)
            }),
        ];

        let (updates_tx, updates) = mpsc::unbounded_channel();
        self.active = Some(ActiveMatch {
            session,
            updates: updates_tx,
            subscriptions,
        });
        self.publish(opening);
        self.resolve_opponent(opponent.clone());

        MatchHandle {
            game_id,
            opponent,
            commands: self.self_commands.clone(),
            updates,
        }
    }

    /// Subscribes a handler that forwards `kind` payloads to the session.
    fn route<T>(&mut self, kind: &str, wrap: fn(T) -> SessionInput) -> SubscriptionId
    where
        T: DeserializeOwned + 'static,
    {
        let inputs = self.inputs.clone();
        self.dispatcher.subscribe_typed(kind, move |payload: T| {
            let _ = inputs.send(wrap(payload).into());
        })
    }

    /// Looks the opponent up in the background. A failure only costs the
    /// display name.
    fn resolve_opponent(&self, opponent: UserId) {
        let directory = Arc::clone(&self.directory);
        let credential = self.credential.clone();
        let inputs = self.inputs.clone();
        tokio::spawn(async move {
            match directory.get_user(&opponent, &credential).await {
                Ok(profile) => {
                    let _ = inputs.send(SessionInput::OpponentProfile(profile).into());
                }
                Err(e) => {
                    warn!(%opponent, error = %e, "opponent lookup failed, showing bare id");
                }
            }
        });
    }

    fn session_for(&mut self, game_id: &GameId) -> Result<&mut MatchSession, SessionError> {
        match self.active.as_mut() {
            Some(active) if active.session.game_id() == game_id => Ok(&mut active.session),
            _ => Err(SessionError::Ended),
        }
    }

    fn submit_answer(&mut self, game_id: &GameId, choice: String) -> Result<(), QuizDuelError> {
        let updates = self.session_for(game_id)?.submit_answer(choice)?;
        self.publish(updates);
        Ok(())
    }

    fn abandon(&mut self, game_id: &GameId) -> Result<(), QuizDuelError> {
        let updates = self.session_for(game_id)?.abandon()?;
        self.publish(updates);
        Ok(())
    }

    fn abandon_active(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Ok(updates) = active.session.abandon() {
            self.publish(updates);
        }
    }

    fn apply_session(&mut self, input: SessionInput) {
        let Some(active) = self.active.as_mut() else {
            debug!("no match session, dropping input");
            return;
        };
        match active.session.handle(input) {
            Ok(updates) => self.publish(updates),
            Err(e @ (SessionError::Protocol(_) | SessionError::SlotMismatch { .. })) => {
                warn!(error = %e, "session input ignored");
            }
            Err(e) => debug!(error = %e, "session input ignored"),
        }
    }

    /// Forwards updates to the [`MatchHandle`] and closes the session once
    /// it has ended.
    fn publish(&mut self, updates: Vec<SessionUpdate>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        for update in updates {
            // The handle may be gone; the session still runs to its end.
            let _ = active.updates.send(update);
        }
        if active.session.is_ended() {
            self.finish_session();
        }
    }

    /// Drops the session and every subscription it registered.
    fn finish_session(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        for id in active.subscriptions {
            self.dispatcher.unsubscribe(id);
        }
        info!(game_id = %active.session.game_id(), "match session closed");
    }

    // -- transport ----------------------------------------------------------

    fn handle_transport(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Frame(raw)) => {
                // Malformed frames are logged by the dispatcher and dropped.
                let _ = self.dispatcher.on_frame(&raw);
                self.drain_inputs();
            }
            Some(TransportEvent::Closed { reason }) => {
                self.events = None;
                warn!(%reason, "connection to match server lost");
                self.apply_session(SessionInput::ConnectionLost);
            }
            None => self.events = None,
        }
    }

    async fn reconnect(&mut self) -> Result<(), QuizDuelError> {
        let events = self.manager.connect(&self.credential).await?;
        self.events = Some(events);
        info!("reconnected to match server");
        self.apply_session(SessionInput::ConnectionRestored);
        Ok(())
    }

    // -- inputs -------------------------------------------------------------

    /// Handles what the last frame's subscribers queued before the next
    /// frame is read.
    fn drain_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            self.handle_input(input);
        }
    }

    fn handle_input(&mut self, input: MatchInput) {
        match input {
            MatchInput::Matchmaking(input) => {
                if let Some(event) = self.matchmaker.handle(input) {
                    self.on_matchmaking_event(event);
                }
            }
            MatchInput::Session(input) => self.apply_session(input),
        }
    }

    fn teardown(&mut self, reason: &str) {
        info!(%reason, "shutting down client");
        if self.matchmaker.is_searching() {
            if let Ok(request) = self.matchmaker.cancel_match() {
                self.resolve_pending(request, MatchOutcome::Cancelled);
            }
        }
        self.abandon_active();
        self.manager.close();
    }
}

/// Resolves when the waiter for the pending search goes away. Never
/// resolves while nothing is pending.
async fn pending_dropped(
    pending: &mut Option<(RequestId, oneshot::Sender<MatchOutcome>)>,
) -> RequestId {
    match pending {
        Some((request, reply)) => {
            reply.closed().await;
            *request
        }
        None => std::future::pending().await,
    }
}

/// The next transport event, or never if there is no connection.
async fn next_event(events: &mut Option<TransportEvents>) -> Option<TransportEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
