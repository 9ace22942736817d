//! Inputs to the match state machines, and the outbound side they share.
//!
//! Server events, timer callbacks and connection changes all arrive as a
//! [`MatchInput`] on one channel. The owner of the state machines reads
//! that channel from a single task, so a timer firing and a frame arriving
//! can never interleave inside a transition.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use quizduel_protocol::{
    AnswerFeedback, ClientMessage, Codec, GameEnded, JsonCodec, MatchFound,
    NextQuestion, PlayerPresence, ProtocolError, ScoreUpdate,
};
use quizduel_timer::{Countdown, TimerHandle, TimerId};
use quizduel_transport::{FrameSink, TransportError};
use tokio::sync::mpsc;

use crate::{PlayerProfile, RequestId};

/// Where timer callbacks and event handlers deliver their inputs.
pub type InputSender = mpsc::UnboundedSender<MatchInput>;

/// Receiving end of an [`InputSender`].
pub type InputReceiver = mpsc::UnboundedReceiver<MatchInput>;

/// Everything that can drive a transition.
#[derive(Debug)]
pub enum MatchInput {
    /// For the [`Matchmaker`](crate::Matchmaker).
    Matchmaking(MatchmakingInput),
    /// For the active [`MatchSession`](crate::MatchSession).
    Session(SessionInput),
}

impl From<MatchmakingInput> for MatchInput {
    fn from(input: MatchmakingInput) -> Self {
        Self::Matchmaking(input)
    }
}

impl From<SessionInput> for MatchInput {
    fn from(input: SessionInput) -> Self {
        Self::Session(input)
    }
}

/// Inputs for the matchmaker.
#[derive(Debug)]
pub enum MatchmakingInput {
    /// The server paired us with an opponent.
    MatchFound(MatchFound),
    /// The search countdown of `request` ran out.
    SearchTimedOut {
        /// The search the countdown belonged to.
        request: RequestId,
        /// The countdown that fired.
        timer: TimerId,
    },
}

/// Which of a session's countdowns a [`SessionInput::Timer`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// The per-question answer window.
    Question,
    /// The opponent's reconnect grace period.
    OpponentGrace,
    /// The local connection's grace period.
    ConnectionGrace,
}

/// A countdown callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Whole seconds left.
    Tick(u64),
    /// The countdown ran out.
    Expired,
}

/// Inputs for a running match session.
#[derive(Debug)]
pub enum SessionInput {
    /// `answer_feedback`
    AnswerFeedback(AnswerFeedback),
    /// `score_update`
    ScoreUpdate(ScoreUpdate),
    /// `next_question`
    NextQuestion(NextQuestion),
    /// `game_ended`
    GameEnded(GameEnded),
    /// `player_disconnected`
    PlayerDisconnected(PlayerPresence),
    /// `player_reconnected`
    PlayerReconnected(PlayerPresence),
    /// The opponent's display identity was looked up.
    OpponentProfile(PlayerProfile),
    /// Our own connection to the server dropped.
    ConnectionLost,
    /// Our own connection is back.
    ConnectionRestored,
    /// One of the session's countdowns ticked or expired.
    Timer {
        /// Which countdown.
        kind: TimerKind,
        /// The countdown instance, for discarding stale deliveries.
        timer: TimerId,
        /// Tick or expiry.
        event: TimerEvent,
    },
}

/// Starts a session countdown that reports into `inputs`.
pub(crate) fn start_session_timer(
    kind: TimerKind,
    duration: Duration,
    inputs: &InputSender,
) -> TimerHandle {
    let countdown = Countdown::new(duration);
    let timer = countdown.id();
    let tick_tx = inputs.clone();
    let expire_tx = inputs.clone();
    countdown.spawn(
        move |remaining| {
            let _ = tick_tx.send(
                SessionInput::Timer {
                    kind,
                    timer,
                    event: TimerEvent::Tick(remaining),
                }
                .into(),
            );
        },
        move || {
            let _ = expire_tx.send(
                SessionInput::Timer {
                    kind,
                    timer,
                    event: TimerEvent::Expired,
                }
                .into(),
            );
        },
    )
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Encodes [`ClientMessage`]s and hands them to the connection.
///
/// Cheap to clone; the matchmaker and the session each hold one.
#[derive(Clone)]
pub struct Outbox {
    sink: Arc<dyn FrameSink>,
}

impl Outbox {
    /// Wraps the sink frames are queued on.
    pub fn new(sink: Arc<dyn FrameSink>) -> Self {
        Self { sink }
    }

    /// Encodes and queues `message`. Does not wait for delivery.
    ///
    /// # Errors
    /// Encoding failures convert from [`ProtocolError`]; a closed
    /// connection converts from [`TransportError`].
    pub fn send<E>(&self, message: &ClientMessage) -> Result<(), E>
    where
        E: From<ProtocolError> + From<TransportError>,
    {
        let frame = JsonCodec.encode(message)?;
        tracing::trace!(kind = message.kind(), "sending frame");
        self.sink.send_frame(frame)?;
        Ok(())
    }
}

impl fmt::Debug for Outbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbox").finish_non_exhaustive()
    }
}
