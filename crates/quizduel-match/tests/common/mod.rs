//! Shared helpers for the match state machine tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use quizduel_match::{
    InputReceiver, InputSender, MatchInput, MatchSession, Matchmaker,
    MatchmakingEvent, MatchmakingInput, Outbox, SessionInput, SessionUpdate,
};
use quizduel_protocol::MatchFound;
use quizduel_transport::{FrameSink, TransportError};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// A [`FrameSink`] that records every frame and can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingSink {
    /// Every frame sent so far, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    /// The `type` of every frame sent so far.
    pub fn kinds(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|v| v["type"].as_str().unwrap().to_owned())
            .collect()
    }

    /// How many frames of `kind` were sent.
    pub fn count(&self, kind: &str) -> usize {
        self.kinds().iter().filter(|k| *k == kind).count()
    }

    /// Makes every following send fail with `NotConnected`.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.frames.lock().unwrap().push(frame);
        Ok(())
    }
}

pub struct Harness {
    pub sink: Arc<RecordingSink>,
    pub outbox: Outbox,
    pub inputs: InputSender,
    pub rx: InputReceiver,
}

pub fn harness() -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let outbox = Outbox::new(sink.clone());
    let (inputs, rx) = mpsc::unbounded_channel();
    Harness {
        sink,
        outbox,
        inputs,
        rx,
    }
}

/// Drains queued inputs, feeding session inputs to `session`. Returns the
/// updates produced; ignored inputs produce nothing.
pub fn pump_session(
    session: &mut MatchSession,
    rx: &mut InputReceiver,
) -> Vec<SessionUpdate> {
    let mut updates = Vec::new();
    while let Ok(input) = rx.try_recv() {
        if let MatchInput::Session(input) = input {
            if let Ok(mut u) = session.handle(input) {
                updates.append(&mut u);
            }
        }
    }
    updates
}

/// Drains queued inputs, feeding matchmaking inputs to `matchmaker`.
pub fn pump_matchmaker(
    matchmaker: &mut Matchmaker,
    rx: &mut InputReceiver,
) -> Vec<MatchmakingEvent> {
    let mut events = Vec::new();
    while let Ok(input) = rx.try_recv() {
        if let MatchInput::Matchmaking(input) = input {
            events.extend(matchmaker.handle(input));
        }
    }
    events
}

/// A `match_found` payload with questions of order 0 and 1.
pub fn match_found(local_vs: &str) -> MatchFound {
    serde_json::from_value(json!({
        "gameId": 42,
        "opponent": local_vs,
        "questions": [
            {
                "order": 0,
                "question": "Capital of France?",
                "category": "Geography",
                "options": ["Paris", "Rome", "Oslo"],
                "correctAnswer": "Paris"
            },
            {
                "order": 1,
                "question": "2 + 2?",
                "category": "Math",
                "options": "[\"3\",\"4\"]",
                "correctAnswer": "4"
            }
        ]
    }))
    .unwrap()
}

pub fn found_input(found: MatchFound) -> MatchmakingInput {
    MatchmakingInput::MatchFound(found)
}

pub fn next_question(order: u32, options: Value) -> SessionInput {
    SessionInput::NextQuestion(
        serde_json::from_value(json!({
            "question": {
                "questionOrder": order,
                "question": format!("Question {order}"),
                "category": "Trivia",
                "options": options,
                "correctAnswer": "b"
            }
        }))
        .unwrap(),
    )
}

pub fn score_update(p1: &str, s1: i64, p2: &str, s2: i64) -> SessionInput {
    SessionInput::ScoreUpdate(
        serde_json::from_value(json!({
            "scores": {
                "player1Id": p1, "player1Score": s1,
                "player2Id": p2, "player2Score": s2
            }
        }))
        .unwrap(),
    )
}

pub fn feedback(user: &str, correct: bool) -> SessionInput {
    SessionInput::AnswerFeedback(
        serde_json::from_value(json!({"userId": user, "isCorrect": correct}))
            .unwrap(),
    )
}

pub fn game_ended(payload: Value) -> SessionInput {
    SessionInput::GameEnded(serde_json::from_value(payload).unwrap())
}

pub fn disconnected(id: &str) -> SessionInput {
    SessionInput::PlayerDisconnected(
        serde_json::from_value(json!({"opponentId": id})).unwrap(),
    )
}

pub fn reconnected(id: &str) -> SessionInput {
    SessionInput::PlayerReconnected(
        serde_json::from_value(json!({"opponentId": id})).unwrap(),
    )
}
