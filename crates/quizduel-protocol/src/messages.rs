//! The message catalogue of the ranked match protocol.
//!
//! Every frame on the wire is `{"type": <string>, "payload": <object>}`.
//! Outbound messages are one adjacently-tagged enum, [`ClientMessage`].
//! Inbound frames are parsed loosely into a [`Frame`] first; each
//! subscriber then decodes the payload into the struct for its type, so an
//! unknown or malformed message never affects the others.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GameId, SlotScores, UserId, WireQuestion};

/// Message type names, as they appear in the `type` field.
pub mod kind {
    pub const JOIN_MATCHMAKING: &str = "join_matchmaking";
    pub const LEAVE_MATCHMAKING: &str = "leave_matchmaking";
    pub const MATCH_FOUND: &str = "match_found";
    pub const ANSWER_QUESTION: &str = "answer_question";
    pub const ANSWER_FEEDBACK: &str = "answer_feedback";
    pub const SCORE_UPDATE: &str = "score_update";
    pub const NEXT_QUESTION: &str = "next_question";
    pub const GAME_ENDED: &str = "game_ended";
    pub const PLAYER_DISCONNECTED: &str = "player_disconnected";
    pub const PLAYER_RECONNECTED: &str = "player_reconnected";
}

// ---------------------------------------------------------------------------
// Inbound envelope
// ---------------------------------------------------------------------------

/// An inbound frame with its payload still undecoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The message type, e.g. `"score_update"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The raw payload. A frame without one is treated as `{}`.
    #[serde(default = "empty_object")]
    pub payload: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything the client sends.
///
/// `#[serde(tag = "type", content = "payload")]` produces the envelope
/// directly, and the empty struct variants encode as `"payload": {}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the matchmaking pool.
    JoinMatchmaking {},
    /// Leave the matchmaking pool.
    LeaveMatchmaking {},
    /// Answer a question of a running match.
    AnswerQuestion(AnswerQuestion),
}

impl ClientMessage {
    /// `join_matchmaking`
    pub fn join_matchmaking() -> Self {
        Self::JoinMatchmaking {}
    }

    /// `leave_matchmaking`
    pub fn leave_matchmaking() -> Self {
        Self::LeaveMatchmaking {}
    }

    /// The `type` string this message is sent under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinMatchmaking {} => kind::JOIN_MATCHMAKING,
            Self::LeaveMatchmaking {} => kind::LEAVE_MATCHMAKING,
            Self::AnswerQuestion(_) => kind::ANSWER_QUESTION,
        }
    }
}

/// Payload of `answer_question`.
///
/// `question_order` is what the server correlates the answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerQuestion {
    pub game_id: GameId,
    pub question_order: u32,
    pub answer: String,
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Payload of `match_found`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFound {
    pub game_id: GameId,
    #[serde(alias = "opponentId")]
    pub opponent: UserId,
    #[serde(default)]
    pub questions: Vec<WireQuestion>,
}

/// Payload of `answer_feedback`: whether `user_id` answered correctly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub user_id: UserId,
    pub is_correct: bool,
}

/// Payload of `score_update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub scores: SlotScores,
}

/// Payload of `next_question`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextQuestion {
    pub question: WireQuestion,
}

/// Payload of `game_ended`.
///
/// `winner` is absent or `null` for a draw. The shape of `scores` is not
/// pinned down by the server, so it is kept raw; see
/// [`GameEnded::slot_scores`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEnded {
    #[serde(default)]
    pub winner: Option<UserId>,
    #[serde(default)]
    pub scores: Option<Value>,
}

impl GameEnded {
    /// Final scores, if they are in the same slot form as `score_update`
    /// (either directly or nested under another `scores` key).
    pub fn slot_scores(&self) -> Option<SlotScores> {
        let scores = self.scores.as_ref()?;
        SlotScores::deserialize(scores)
            .ok()
            .or_else(|| SlotScores::deserialize(scores.get("scores")?).ok())
    }
}

/// Payload of `player_disconnected` and `player_reconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPresence {
    pub opponent_id: UserId,
}

#[cfg(test)]
mod tests {
    //! The wire format is fixed by the server. These tests pin the exact
    //! JSON shapes the serde attributes produce and accept.

    use serde_json::json;

    use super::*;

    #[test]
    fn test_join_and_leave_encode_with_empty_payload() {
        let join = serde_json::to_value(ClientMessage::join_matchmaking()).unwrap();
        let leave = serde_json::to_value(ClientMessage::leave_matchmaking()).unwrap();
        assert_eq!(join, json!({"type": "join_matchmaking", "payload": {}}));
        assert_eq!(leave, json!({"type": "leave_matchmaking", "payload": {}}));
    }

    #[test]
    fn test_answer_question_json_format() {
        let msg = ClientMessage::AnswerQuestion(AnswerQuestion {
            game_id: GameId::from(12),
            question_order: 0,
            answer: "Paris".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "answer_question",
                "payload": {"gameId": 12, "questionOrder": 0, "answer": "Paris"}
            })
        );
        assert_eq!(msg.kind(), kind::ANSWER_QUESTION);
    }

    #[test]
    fn test_frame_without_payload_defaults_to_empty_object() {
        let frame: Frame = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert_eq!(frame.kind, "ping");
        assert_eq!(frame.payload, json!({}));
    }

    #[test]
    fn test_frame_without_type_is_rejected() {
        let result: Result<Frame, _> = serde_json::from_str(r#"{"payload": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_match_found_accepts_opponent_id_alias() {
        let found: MatchFound = serde_json::from_value(json!({
            "gameId": "g1",
            "opponentId": 7,
            "questions": [{"order": 0, "question": "Q?", "options": ["a"]}]
        }))
        .unwrap();
        assert_eq!(found.opponent, UserId::from(7));
        assert_eq!(found.questions.len(), 1);
    }

    #[test]
    fn test_score_update_json_shape() {
        let update: ScoreUpdate = serde_json::from_value(json!({
            "scores": {
                "player1Id": "B", "player1Score": 3,
                "player2Id": "A", "player2Score": 2
            }
        }))
        .unwrap();
        assert_eq!(update.scores.player1_id, UserId::from("B"));
        assert_eq!(update.scores.player2_score, 2);
    }

    #[test]
    fn test_game_ended_with_null_winner_is_draw() {
        let ended: GameEnded =
            serde_json::from_value(json!({"winner": null, "scores": {}})).unwrap();
        assert!(ended.winner.is_none());
        assert!(ended.slot_scores().is_none());
    }

    #[test]
    fn test_game_ended_slot_scores_direct_and_nested() {
        let slots = json!({
            "player1Id": 1, "player1Score": 5,
            "player2Id": 2, "player2Score": 4
        });
        let direct: GameEnded =
            serde_json::from_value(json!({"winner": 1, "scores": slots.clone()}))
                .unwrap();
        let nested: GameEnded = serde_json::from_value(
            json!({"winner": 1, "scores": {"scores": slots}}),
        )
        .unwrap();
        assert_eq!(direct.slot_scores().unwrap().player1_score, 5);
        assert_eq!(nested.slot_scores().unwrap().player2_score, 4);
    }

    #[test]
    fn test_player_presence_json_shape() {
        let presence: PlayerPresence =
            serde_json::from_value(json!({"opponentId": "B"})).unwrap();
        assert_eq!(presence.opponent_id, UserId::from("B"));
    }
}
