//! The match session state machine.
//!
//! One [`MatchSession`] exists per ranked match. Every change to it goes
//! through [`MatchSession::handle`] or one of the local actions
//! ([`submit_answer`](MatchSession::submit_answer),
//! [`abandon`](MatchSession::abandon)). Each returns the
//! [`SessionUpdate`]s the change produced, or an error explaining why the
//! input was ignored. An ignored input never changes state.
//!
//! ```text
//! AwaitingQuestion ─→ AnswerOpen ─→ AnswerLocked ─→ AnswerOpen (next_question)
//!                          │              │
//!                          └──────────────┴───────→ Ended (game_ended / abandoned)
//! ```
//!
//! Scores are never computed here. They only change when the server says
//! so, through `score_update` or `game_ended`.

use std::fmt;

use quizduel_protocol::{
    AnswerFeedback, AnswerQuestion, ClientMessage, DecodedQuestion, GameEnded,
    GameId, MatchFound, NextQuestion, PlayerPresence, Question, ScoreUpdate,
    SlotScores, UserId, WireQuestion,
};
use quizduel_timer::{TimerHandle, TimerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::input::start_session_timer;
use crate::{
    InputSender, MatchConfig, Outbox, SessionError, SessionInput, TimerEvent,
    TimerKind,
};

// ---------------------------------------------------------------------------
// Public state types
// ---------------------------------------------------------------------------

/// A player's display identity, from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// The player's account id.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Avatar file reference, relative to the media host.
    pub avatar: Option<String>,
}

/// Scores from the local player's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub local: i64,
    pub opponent: i64,
}

/// Whose answer an `answer_feedback` was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    Local,
    Opponent,
}

/// Was-it-correct flags for the current question. Display only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Feedback {
    pub local: Option<bool>,
    pub opponent: Option<bool>,
}

/// A question as shown to the player: everything except the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPrompt {
    pub order: u32,
    pub text: String,
    pub category: String,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionPrompt {
    fn from(q: &Question) -> Self {
        Self {
            order: q.order,
            text: q.text.clone(),
            category: q.category.clone(),
            options: q.options.clone(),
        }
    }
}

/// The final result, relative to the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Draw,
}

/// What `game_ended` told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// The winner's id, `None` for a draw.
    pub winner: Option<UserId>,
    pub outcome: Outcome,
    pub scores: Scoreboard,
}

/// Why a session ended without `game_ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// The local player left.
    Local,
    /// Our connection stayed down past the grace period.
    ConnectionLost,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ending {
    Finished(GameResult),
    Abandoned(AbandonReason),
}

/// Where the session is in the question/answer cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No question has been delivered yet.
    AwaitingQuestion,
    /// The current question can be answered.
    AnswerOpen,
    /// An answer was sent for `order`; waiting for the server to move on.
    AnswerLocked { order: u32, answer: String },
    /// Terminal.
    Ended(Ending),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Self::AwaitingQuestion => "AwaitingQuestion",
            Self::AnswerOpen => "AnswerOpen",
            Self::AnswerLocked { .. } => "AnswerLocked",
            Self::Ended(_) => "Ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opponent liveness, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentPresence {
    Connected,
    /// Disconnected; `grace_remaining` is `None` once the grace period is
    /// over.
    Disconnected { grace_remaining: Option<u64> },
}

/// A UI-facing change produced by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A new question can be answered.
    QuestionOpened(QuestionPrompt),
    /// The question's options could not be decoded; it is shown without
    /// choices.
    OptionsUnreadable { order: u32 },
    /// Seconds left to answer the current question.
    QuestionCountdown { remaining: u64 },
    /// The answer window ran out. The server still decides when the round
    /// closes.
    QuestionTimeUp { order: u32 },
    /// Our answer was sent.
    AnswerLocked { order: u32, answer: String },
    /// The correct answer may now be shown.
    AnswerRevealed { order: u32, correct_answer: String },
    /// Someone's answer was judged.
    Feedback { player: Player, correct: bool },
    /// The scoreboard changed.
    ScoresChanged(Scoreboard),
    /// The opponent dropped; they have `grace_secs` to come back.
    OpponentDisconnected { grace_secs: u64 },
    /// Seconds left in the opponent's grace period.
    OpponentGraceCountdown { remaining: u64 },
    /// The opponent is back.
    OpponentReconnected,
    /// The opponent's grace period ran out. Display only; the server
    /// decides whether the match continues.
    OpponentUnreachable,
    /// Our connection dropped; the session is abandoned after `grace_secs`.
    ConnectionLost { grace_secs: u64 },
    /// Seconds left before the session is abandoned.
    ConnectionGraceCountdown { remaining: u64 },
    /// Our connection is back.
    ConnectionRestored,
    /// The opponent's display identity is known.
    OpponentProfile(PlayerProfile),
    /// Terminal.
    Ended(Ending),
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One ranked match, from `match_found` to its end.
pub struct MatchSession {
    game_id: GameId,
    local: UserId,
    opponent: UserId,
    opponent_profile: Option<PlayerProfile>,
    /// Questions announced in `match_found`.
    questions: Vec<Question>,
    current: Option<Question>,
    phase: Phase,
    scores: Scoreboard,
    feedback: Feedback,
    presence: OpponentPresence,
    question_timer: Option<TimerHandle>,
    grace_timer: Option<TimerHandle>,
    connection_timer: Option<TimerHandle>,
    config: MatchConfig,
    outbox: Outbox,
    inputs: InputSender,
}

impl MatchSession {
    /// Creates the session for a `match_found` payload.
    ///
    /// The first announced question is opened immediately. Returns the
    /// session and its opening updates.
    pub fn start(
        found: MatchFound,
        local: UserId,
        config: MatchConfig,
        outbox: Outbox,
        inputs: InputSender,
    ) -> (Self, Vec<SessionUpdate>) {
        let MatchFound {
            game_id,
            opponent,
            questions,
        } = found;

        let mut updates = Vec::new();
        let mut decoded = Vec::with_capacity(questions.len());
        for (index, wire) in questions.into_iter().enumerate() {
            let fallback = u32::try_from(index).unwrap_or(u32::MAX);
            decoded.push(decode_announced(wire, fallback, &mut updates));
        }

        let mut session = Self {
            game_id,
            local,
            opponent,
            opponent_profile: None,
            current: None,
            questions: decoded,
            phase: Phase::AwaitingQuestion,
            scores: Scoreboard::default(),
            feedback: Feedback::default(),
            presence: OpponentPresence::Connected,
            question_timer: None,
            grace_timer: None,
            connection_timer: None,
            config: config.validated(),
            outbox,
            inputs,
        };

        info!(
            game_id = %session.game_id,
            local = %session.local,
            opponent = %session.opponent,
            questions = session.questions.len(),
            "match session started"
        );

        if let Some(first) = session.questions.first().cloned() {
            session.open_question(first, &mut updates);
        } else {
            debug!(game_id = %session.game_id, "no questions announced, awaiting next_question");
        }
        (session, updates)
    }

    // -- accessors ----------------------------------------------------------

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn local_player(&self) -> &UserId {
        &self.local
    }

    pub fn opponent(&self) -> &UserId {
        &self.opponent
    }

    pub fn opponent_profile(&self) -> Option<&PlayerProfile> {
        self.opponent_profile.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn presence(&self) -> OpponentPresence {
        self.presence
    }

    /// Number of questions announced at match start.
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Order of the question currently on screen.
    pub fn current_order(&self) -> Option<u32> {
        self.current.as_ref().map(|q| q.order)
    }

    /// The question currently on screen, without its answer.
    pub fn prompt(&self) -> Option<QuestionPrompt> {
        self.current.as_ref().map(QuestionPrompt::from)
    }

    /// The correct answer to the current question, once it may be shown:
    /// after our answer is locked, or after the match ended.
    pub fn revealed_answer(&self) -> Option<&str> {
        match self.phase {
            Phase::AnswerLocked { .. } | Phase::Ended(_) => {
                self.current.as_ref()?.correct_answer()
            }
            Phase::AwaitingQuestion | Phase::AnswerOpen => None,
        }
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended(_))
    }

    /// `true` while the opponent grace countdown is running.
    pub fn grace_running(&self) -> bool {
        self.grace_timer.as_ref().is_some_and(TimerHandle::is_running)
    }

    // -- local actions ------------------------------------------------------

    /// Answers the current question with `choice`.
    ///
    /// At most one answer is ever sent per question.
    ///
    /// # Errors
    /// - [`SessionError::AnswerLocked`] / [`SessionError::Ended`] /
    ///   [`SessionError::NoOpenQuestion`]: nothing is sent.
    /// - [`SessionError::Transport`]: the frame could not be queued. The
    ///   answer is not locked, so the player may try again.
    pub fn submit_answer(
        &mut self,
        choice: impl Into<String>,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        match &self.phase {
            Phase::AnswerOpen => {}
            Phase::AnswerLocked { order, .. } => {
                return Err(SessionError::AnswerLocked(*order));
            }
            Phase::Ended(_) => return Err(SessionError::Ended),
            Phase::AwaitingQuestion => return Err(SessionError::NoOpenQuestion),
        }
        let Some(order) = self.current_order() else {
            return Err(SessionError::NoOpenQuestion);
        };
        let answer = choice.into();

        self.outbox.send::<SessionError>(&ClientMessage::AnswerQuestion(
            AnswerQuestion {
                game_id: self.game_id.clone(),
                question_order: order,
                answer: answer.clone(),
            },
        ))?;

        self.stop_question_timer();
        self.phase = Phase::AnswerLocked {
            order,
            answer: answer.clone(),
        };
        info!(game_id = %self.game_id, order, "answer locked");

        let mut updates = vec![SessionUpdate::AnswerLocked { order, answer }];
        if let Some(correct) = self.revealed_answer() {
            updates.push(SessionUpdate::AnswerRevealed {
                order,
                correct_answer: correct.to_owned(),
            });
        }
        Ok(updates)
    }

    /// Leaves the match. The server is not told; it sees the connection
    /// activity stop.
    ///
    /// # Errors
    /// Returns [`SessionError::Ended`] if the session already ended.
    pub fn abandon(&mut self) -> Result<Vec<SessionUpdate>, SessionError> {
        self.ensure_live()?;
        Ok(vec![self.end(Ending::Abandoned(AbandonReason::Local))])
    }

    // -- inputs -------------------------------------------------------------

    /// Applies one input.
    ///
    /// # Errors
    /// Any error means the input was ignored and nothing changed.
    pub fn handle(
        &mut self,
        input: SessionInput,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        if self.is_ended() {
            // Countdowns were stopped on the way out; a late one is a no-op.
            return match input {
                SessionInput::Timer { .. } => Ok(Vec::new()),
                _ => Err(SessionError::Ended),
            };
        }
        match input {
            SessionInput::AnswerFeedback(feedback) => self.on_feedback(feedback),
            SessionInput::ScoreUpdate(update) => self.on_score_update(update),
            SessionInput::NextQuestion(next) => self.on_next_question(next),
            SessionInput::GameEnded(ended) => Ok(self.on_game_ended(ended)),
            SessionInput::PlayerDisconnected(p) => self.on_disconnected(p),
            SessionInput::PlayerReconnected(p) => self.on_reconnected(p),
            SessionInput::OpponentProfile(profile) => self.on_profile(profile),
            SessionInput::ConnectionLost => Ok(self.on_connection_lost()),
            SessionInput::ConnectionRestored => Ok(self.on_connection_restored()),
            SessionInput::Timer { kind, timer, event } => {
                Ok(self.on_timer(kind, timer, event))
            }
        }
    }

    fn on_feedback(
        &mut self,
        AnswerFeedback { user_id, is_correct }: AnswerFeedback,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        let player = if user_id == self.local {
            self.feedback.local = Some(is_correct);
            Player::Local
        } else if user_id == self.opponent {
            self.feedback.opponent = Some(is_correct);
            Player::Opponent
        } else {
            return Err(SessionError::UnknownPlayer(user_id));
        };
        debug!(game_id = %self.game_id, ?player, correct = is_correct, "answer feedback");
        Ok(vec![SessionUpdate::Feedback {
            player,
            correct: is_correct,
        }])
    }

    fn on_score_update(
        &mut self,
        ScoreUpdate { scores }: ScoreUpdate,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        let board = self.resolve_slots(scores)?;
        self.scores = board;
        debug!(
            game_id = %self.game_id,
            local = board.local,
            opponent = board.opponent,
            "scores updated"
        );
        Ok(vec![SessionUpdate::ScoresChanged(board)])
    }

    fn on_next_question(
        &mut self,
        NextQuestion { question }: NextQuestion,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        let DecodedQuestion {
            question,
            options_error,
        } = question.decode()?;

        if let Some(current) = self.current_order() {
            if question.order <= current {
                return Err(SessionError::StaleEvent {
                    current,
                    got: question.order,
                });
            }
        }

        let mut updates = Vec::new();
        if let Some(e) = options_error {
            warn!(game_id = %self.game_id, order = question.order, error = %e, "unreadable options");
            updates.push(SessionUpdate::OptionsUnreadable {
                order: question.order,
            });
        }
        self.open_question(question, &mut updates);
        Ok(updates)
    }

    fn on_game_ended(&mut self, ended: GameEnded) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();

        match ended.slot_scores().map(|slots| self.resolve_slots(slots)) {
            Some(Ok(board)) => {
                if board != self.scores {
                    self.scores = board;
                    updates.push(SessionUpdate::ScoresChanged(board));
                }
            }
            Some(Err(e)) => {
                warn!(game_id = %self.game_id, error = %e, "final scores ignored");
            }
            None => {
                debug!(game_id = %self.game_id, "no slot scores in game_ended, keeping scoreboard");
            }
        }

        let outcome = match &ended.winner {
            None => Outcome::Draw,
            Some(winner) if *winner == self.local => Outcome::Won,
            Some(winner) => {
                if *winner != self.opponent {
                    warn!(game_id = %self.game_id, %winner, "winner is not in this match");
                }
                Outcome::Lost
            }
        };
        let result = GameResult {
            winner: ended.winner,
            outcome,
            scores: self.scores,
        };

        let order = self.current_order();
        let was_locked = matches!(self.phase, Phase::AnswerLocked { .. });
        let ending = self.end(Ending::Finished(result));
        if !was_locked {
            if let (Some(order), Some(correct)) = (order, self.revealed_answer()) {
                updates.push(SessionUpdate::AnswerRevealed {
                    order,
                    correct_answer: correct.to_owned(),
                });
            }
        }
        updates.push(ending);
        updates
    }

    fn on_disconnected(
        &mut self,
        PlayerPresence { opponent_id }: PlayerPresence,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        if opponent_id != self.opponent {
            return Err(SessionError::UnknownPlayer(opponent_id));
        }
        if let OpponentPresence::Disconnected { .. } = self.presence {
            debug!(game_id = %self.game_id, "opponent already disconnected, grace not restarted");
            return Ok(Vec::new());
        }

        let grace = self.config.disconnect_grace;
        let grace_secs = grace.as_secs();
        self.grace_timer = Some(start_session_timer(
            TimerKind::OpponentGrace,
            grace,
            &self.inputs,
        ));
        self.presence = OpponentPresence::Disconnected {
            grace_remaining: Some(grace_secs),
        };
        info!(game_id = %self.game_id, grace_secs, "opponent disconnected");
        Ok(vec![SessionUpdate::OpponentDisconnected { grace_secs }])
    }

    fn on_reconnected(
        &mut self,
        PlayerPresence { opponent_id }: PlayerPresence,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        if opponent_id != self.opponent {
            return Err(SessionError::UnknownPlayer(opponent_id));
        }
        if self.presence == OpponentPresence::Connected {
            debug!(game_id = %self.game_id, "opponent already connected");
            return Ok(Vec::new());
        }

        if let Some(timer) = self.grace_timer.take() {
            timer.cancel();
        }
        self.presence = OpponentPresence::Connected;
        info!(game_id = %self.game_id, "opponent reconnected");
        Ok(vec![SessionUpdate::OpponentReconnected])
    }

    fn on_profile(
        &mut self,
        profile: PlayerProfile,
    ) -> Result<Vec<SessionUpdate>, SessionError> {
        if profile.id != self.opponent {
            return Err(SessionError::UnknownPlayer(profile.id));
        }
        debug!(game_id = %self.game_id, username = %profile.username, "opponent profile resolved");
        self.opponent_profile = Some(profile.clone());
        Ok(vec![SessionUpdate::OpponentProfile(profile)])
    }

    fn on_connection_lost(&mut self) -> Vec<SessionUpdate> {
        if self.connection_timer.is_some() {
            return Vec::new();
        }
        let grace = self.config.connection_grace;
        self.connection_timer = Some(start_session_timer(
            TimerKind::ConnectionGrace,
            grace,
            &self.inputs,
        ));
        warn!(game_id = %self.game_id, grace_secs = grace.as_secs(), "connection lost during match");
        vec![SessionUpdate::ConnectionLost {
            grace_secs: grace.as_secs(),
        }]
    }

    fn on_connection_restored(&mut self) -> Vec<SessionUpdate> {
        let Some(timer) = self.connection_timer.take() else {
            return Vec::new();
        };
        timer.cancel();
        info!(game_id = %self.game_id, "connection restored during match");
        vec![SessionUpdate::ConnectionRestored]
    }

    fn on_timer(
        &mut self,
        kind: TimerKind,
        timer: TimerId,
        event: TimerEvent,
    ) -> Vec<SessionUpdate> {
        let held = match kind {
            TimerKind::Question => &self.question_timer,
            TimerKind::OpponentGrace => &self.grace_timer,
            TimerKind::ConnectionGrace => &self.connection_timer,
        };
        if held.as_ref().map(TimerHandle::id) != Some(timer) {
            debug!(?kind, %timer, "ignoring stale timer delivery");
            return Vec::new();
        }

        match (kind, event) {
            (TimerKind::Question, TimerEvent::Tick(remaining)) => {
                vec![SessionUpdate::QuestionCountdown { remaining }]
            }
            (TimerKind::Question, TimerEvent::Expired) => {
                self.question_timer = None;
                let Some(order) = self.current_order() else {
                    return Vec::new();
                };
                debug!(game_id = %self.game_id, order, "question time up");
                vec![SessionUpdate::QuestionTimeUp { order }]
            }
            (TimerKind::OpponentGrace, TimerEvent::Tick(remaining)) => {
                self.presence = OpponentPresence::Disconnected {
                    grace_remaining: Some(remaining),
                };
                vec![SessionUpdate::OpponentGraceCountdown { remaining }]
            }
            (TimerKind::OpponentGrace, TimerEvent::Expired) => {
                self.grace_timer = None;
                self.presence = OpponentPresence::Disconnected {
                    grace_remaining: None,
                };
                warn!(game_id = %self.game_id, "opponent grace period elapsed");
                vec![SessionUpdate::OpponentUnreachable]
            }
            (TimerKind::ConnectionGrace, TimerEvent::Tick(remaining)) => {
                vec![SessionUpdate::ConnectionGraceCountdown { remaining }]
            }
            (TimerKind::ConnectionGrace, TimerEvent::Expired) => {
                self.connection_timer = None;
                warn!(game_id = %self.game_id, "connection grace elapsed, abandoning match");
                vec![self.end(Ending::Abandoned(AbandonReason::ConnectionLost))]
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.is_ended() {
            Err(SessionError::Ended)
        } else {
            Ok(())
        }
    }

    fn resolve_slots(&self, slots: SlotScores) -> Result<Scoreboard, SessionError> {
        match slots.resolve(&self.local) {
            Some((local, opponent)) => Ok(Scoreboard { local, opponent }),
            None => Err(SessionError::SlotMismatch {
                player1: slots.player1_id,
                player2: slots.player2_id,
            }),
        }
    }

    /// Makes `question` current, clears per-question state and restarts
    /// the answer countdown.
    fn open_question(&mut self, question: Question, updates: &mut Vec<SessionUpdate>) {
        let order = question.order;
        let limit = self.config.question_time_limit;

        updates.push(SessionUpdate::QuestionOpened(QuestionPrompt::from(&question)));
        updates.push(SessionUpdate::QuestionCountdown {
            remaining: limit.as_secs(),
        });

        self.current = Some(question);
        self.feedback = Feedback::default();
        self.phase = Phase::AnswerOpen;
        self.stop_question_timer();
        self.question_timer = Some(start_session_timer(
            TimerKind::Question,
            limit,
            &self.inputs,
        ));
        info!(game_id = %self.game_id, order, "question open");
    }

    fn stop_question_timer(&mut self) {
        if let Some(timer) = self.question_timer.take() {
            timer.cancel();
        }
    }

    /// Moves to `Ended` and stops every countdown.
    fn end(&mut self, ending: Ending) -> SessionUpdate {
        for timer in [
            self.question_timer.take(),
            self.grace_timer.take(),
            self.connection_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            timer.cancel();
        }
        info!(game_id = %self.game_id, ?ending, "match session ended");
        self.phase = Phase::Ended(ending.clone());
        SessionUpdate::Ended(ending)
    }
}

/// Decodes a question from `match_found`, where a missing order falls back
/// to the question's position.
fn decode_announced(
    wire: WireQuestion,
    fallback_order: u32,
    updates: &mut Vec<SessionUpdate>,
) -> Question {
    let wire = if wire.order().is_none() {
        warn!(fallback_order, "announced question has no order, using its position");
        WireQuestion {
            order: Some(fallback_order),
            ..wire
        }
    } else {
        wire
    };
    match wire.decode() {
        Ok(DecodedQuestion {
            question,
            options_error,
        }) => {
            if let Some(e) = options_error {
                warn!(order = question.order, error = %e, "unreadable options");
                updates.push(SessionUpdate::OptionsUnreadable {
                    order: question.order,
                });
            }
            question
        }
        // The order was filled in above, so decoding cannot miss it.
        Err(_) => Question::new(fallback_order, "", "", Vec::new(), None),
    }
}

impl fmt::Debug for MatchSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchSession")
            .field("game_id", &self.game_id)
            .field("local", &self.local)
            .field("opponent", &self.opponent)
            .field("phase", &self.phase)
            .field("current_order", &self.current_order())
            .field("scores", &self.scores)
            .field("presence", &self.presence)
            .finish_non_exhaustive()
    }
}
