//! Wire protocol for the QuizDuel match client.
//!
//! This crate defines what the client and the match server say to each
//! other, and routes what the server says to whoever is listening:
//!
//! - **Types** ([`UserId`], [`GameId`], [`Question`], [`SlotScores`]) -
//!   the identity and question values shared by many messages.
//! - **Messages** ([`ClientMessage`], [`Frame`], [`MatchFound`], ...) -
//!   one struct per payload in the message catalogue.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) - how whole frames are
//!   converted to and from text.
//! - **Dispatcher** ([`Dispatcher`]) - the publish/subscribe registry that
//!   fans inbound frames out by type.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (opaque text frames) and the
//! match state machines. It does not know about connections or sessions.
//!
//! ```text
//! Transport (text) → Dispatcher (type, payload) → Matchmaker / MatchSession
//! ```

mod codec;
mod dispatcher;
mod error;
pub mod messages;
mod types;

pub use codec::{Codec, JsonCodec};
pub use dispatcher::{Dispatch, Dispatcher, SubscriptionId};
pub use error::ProtocolError;
pub use messages::{
    AnswerFeedback, AnswerQuestion, ClientMessage, Frame, GameEnded,
    MatchFound, NextQuestion, PlayerPresence, ScoreUpdate, kind,
};
pub use types::{
    DecodedQuestion, GameId, Question, SlotScores, UserId, WireId,
    WireOptions, WireQuestion,
};
