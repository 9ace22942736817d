//! Identity and question types shared by every message.
//!
//! The match server is not consistent about id types: depending on the
//! table they come from, ids arrive as JSON numbers or strings. [`WireId`]
//! keeps whichever form the server used so an id echoed back (for example
//! the `gameId` of an answer) is byte-for-byte what the server sent, but
//! compares `5` and `"5"` as the same id.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A server-assigned identifier in its original JSON form.
///
/// Equality and hashing go through the textual form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// `42`
    Number(u64),
    /// `"42"` or `"a7f3"`
    Text(String),
}

impl WireId {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl PartialEq for WireId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl Eq for WireId {}

impl Hash for WireId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_text().hash(state);
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! wire_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub WireId);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(WireId::Number(id))
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(WireId::Text(id.to_owned()))
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(WireId::Text(id))
            }
        }
    };
}

wire_id!(
    /// Identifies a player account.
    UserId
);

wire_id!(
    /// Identifies one ranked match on the server.
    GameId
);

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// One trivia question, as the client uses it.
///
/// `order` is the server's correlation key for answers. It is not assumed
/// to equal the question's position in any local list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Server-assigned position of the question in the match.
    pub order: u32,
    /// The question text.
    pub text: String,
    /// Trivia category name.
    pub category: String,
    /// Answer choices shown to the player.
    pub options: Vec<String>,
    correct_answer: Option<String>,
}

impl Question {
    /// Builds a question.
    pub fn new(
        order: u32,
        text: impl Into<String>,
        category: impl Into<String>,
        options: Vec<String>,
        correct_answer: Option<String>,
    ) -> Self {
        Self {
            order,
            text: text.into(),
            category: category.into(),
            options,
            correct_answer,
        }
    }

    /// The correct answer, if the server sent it.
    ///
    /// Callers showing questions to a player should only reveal this once
    /// the player's answer is locked.
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }
}

/// The `options` field of a question on the wire.
///
/// Usually a JSON list, but some server paths store the list as a JSON
/// string and forward it without decoding it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOptions {
    /// `["a", "b"]`
    List(Vec<String>),
    /// `"[\"a\", \"b\"]"`
    Encoded(String),
}

impl Default for WireOptions {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl WireOptions {
    /// Returns the option list, decoding the string form if needed.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidOptions`] if the string form is not
    /// a JSON list of strings.
    pub fn decode(self) -> Result<Vec<String>, ProtocolError> {
        match self {
            Self::List(options) => Ok(options),
            Self::Encoded(text) => {
                serde_json::from_str(&text).map_err(ProtocolError::InvalidOptions)
            }
        }
    }
}

/// A question as the server sends it.
///
/// `match_found` questions carry `order`; `next_question` carries
/// `questionOrder`. Both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireQuestion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<WireOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Result of decoding a [`WireQuestion`].
#[derive(Debug)]
pub struct DecodedQuestion {
    /// The usable question. Its option list is empty if the options could
    /// not be decoded.
    pub question: Question,
    /// Set when the options were malformed. Recoverable: the question is
    /// still shown, just without choices.
    pub options_error: Option<ProtocolError>,
}

impl WireQuestion {
    /// The question's order, whichever field carried it.
    pub fn order(&self) -> Option<u32> {
        self.question_order.or(self.order)
    }

    /// Converts the wire form into a [`Question`].
    ///
    /// # Errors
    /// Returns [`ProtocolError::MissingField`] if neither `questionOrder`
    /// nor `order` is present. Malformed options are not an error here;
    /// see [`DecodedQuestion::options_error`].
    pub fn decode(self) -> Result<DecodedQuestion, ProtocolError> {
        let order = self
            .order()
            .ok_or(ProtocolError::MissingField("questionOrder"))?;
        let options = self.options.unwrap_or_default();
        let (options, options_error) = match options.decode() {
            Ok(options) => (options, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        Ok(DecodedQuestion {
            question: Question::new(
                order,
                self.question,
                self.category,
                options,
                self.correct_answer,
            ),
            options_error,
        })
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Scores keyed by the server's arbitrary player1/player2 slots.
///
/// Which slot is the local player differs from match to match; use
/// [`SlotScores::resolve`] rather than reading the slots positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotScores {
    pub player1_id: UserId,
    pub player1_score: i64,
    pub player2_id: UserId,
    pub player2_score: i64,
}

impl SlotScores {
    /// Returns `(local, opponent)` scores for `local`, or `None` if neither
    /// slot names the local player.
    pub fn resolve(&self, local: &UserId) -> Option<(i64, i64)> {
        if &self.player1_id == local {
            Some((self.player1_score, self.player2_score))
        } else if &self.player2_id == local {
            Some((self.player2_score, self.player1_score))
        } else {
            None
        }
    }
}
