//! Error types for the match layer.
//!
//! Most of these do not mean something broke. The state machines return
//! `Err` for any input they ignore, so the caller can log why, and the
//! session's state is unchanged.

use quizduel_protocol::{ProtocolError, UserId};
use quizduel_transport::TransportError;

/// Errors from matchmaking calls.
#[derive(Debug, thiserror::Error)]
pub enum MatchmakingError {
    /// A search is already running.
    #[error("already searching for a match")]
    AlreadySearching,

    /// There is no search to cancel.
    #[error("not searching for a match")]
    NotSearching,

    /// A match is in progress on this connection.
    #[error("a match session is already active")]
    SessionActive,

    /// The request frame could not be sent.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request frame could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Reasons a match session ignored an input.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A question event does not move past the current question.
    #[error("stale event: question {got} is not after current question {current}")]
    StaleEvent {
        /// Order of the question the session is on.
        current: u32,
        /// Order the event referred to.
        got: u32,
    },

    /// An answer for the current question was already sent.
    #[error("answer already locked for question {0}")]
    AnswerLocked(u32),

    /// No question is open for answering yet.
    #[error("no question is open")]
    NoOpenQuestion,

    /// The session is over.
    #[error("session has ended")]
    Ended,

    /// The event names a player who is not in this match.
    #[error("player {0} is not in this match")]
    UnknownPlayer(UserId),

    /// Neither score slot names the local player.
    #[error("score slots {player1} / {player2} do not include the local player")]
    SlotMismatch {
        /// The `player1Id` of the update.
        player1: UserId,
        /// The `player2Id` of the update.
        player2: UserId,
    },

    /// The answer frame could not be sent. The answer is not locked.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The event payload could not be used.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
