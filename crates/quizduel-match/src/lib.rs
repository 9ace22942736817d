//! Matchmaking and match session state machines for QuizDuel.
//!
//! Both machines are synchronous: they take one input at a time, queue
//! outbound frames on an [`Outbox`] without waiting, and report what
//! changed. Timers report back through an [`InputSender`], so the owner can
//! drive everything from a single task.
//!
//! # Key types
//!
//! - [`Matchmaker`] - join/leave the pool, search timeout
//! - [`MatchSession`] - questions, answer lock, scores, opponent liveness
//! - [`MatchInput`] - everything that can drive a transition
//! - [`SessionUpdate`] - UI-facing changes a transition produced
//! - [`MatchConfig`] - timeouts and grace periods

mod config;
mod error;
mod input;
mod matchmaking;
mod session;

pub use config::MatchConfig;
pub use error::{MatchmakingError, SessionError};
pub use input::{
    InputReceiver, InputSender, MatchInput, MatchmakingInput, Outbox,
    SessionInput, TimerEvent, TimerKind,
};
pub use matchmaking::{
    Matchmaker, MatchmakingEvent, MatchmakingStatus, RequestId,
};
pub use session::{
    AbandonReason, Ending, Feedback, GameResult, MatchSession,
    OpponentPresence, Outcome, Phase, Player, PlayerProfile, QuestionPrompt,
    Scoreboard, SessionUpdate,
};
