//! End-to-end tests: a `DuelClient` against a scripted loopback WebSocket
//! match server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quizduel::prelude::*;
use quizduel::transport::TransportError;
use quizduel::StaticDirectory;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Scripted server
// =========================================================================

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

/// One accepted client connection.
struct ServerConn {
    ws: ServerWs,
    /// The `Sec-WebSocket-Protocol` value the client offered.
    subprotocol: Option<String>,
}

impl ServerConn {
    /// Next text frame from the client, parsed. `None` once the client is
    /// gone.
    async fn recv(&mut self) -> Option<Value> {
        loop {
            let msg = timeout(WAIT, self.ws.next()).await.ok()??.ok()?;
            match msg {
                Message::Text(text) => return Some(serde_json::from_str(&text).unwrap()),
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    async fn expect(&mut self, kind: &str) -> Value {
        let frame = self.recv().await.expect("client sent nothing");
        assert_eq!(frame["type"], kind, "unexpected frame {frame}");
        frame["payload"].clone()
    }

    async fn send(&mut self, kind: &str, payload: Value) {
        let frame = json!({"type": kind, "payload": payload}).to_string();
        self.ws.send(Message::text(frame)).await.unwrap();
    }
}

/// Accepts connections on a random loopback port. Returns the `ws://` URL
/// and the accepted connections, in order.
async fn start_server() -> (String, mpsc::UnboundedReceiver<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let mut subprotocol = None;
            let ws = tokio_tungstenite::accept_hdr_async(
                stream,
                |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
                    if let Some(value) = req.headers().get("sec-websocket-protocol") {
                        subprotocol = value.to_str().ok().map(str::to_owned);
                        resp.headers_mut()
                            .insert("sec-websocket-protocol", value.clone());
                    }
                    Ok(resp)
                },
            )
            .await
            .unwrap();
            if conn_tx.send(ServerConn { ws, subprotocol }).is_err() {
                break;
            }
        }
    });

    (format!("ws://{addr}"), conn_rx)
}

// =========================================================================
// Client helpers
// =========================================================================

fn profile(id: u64, name: &str) -> PlayerProfile {
    PlayerProfile {
        id: UserId::from(id),
        username: name.into(),
        avatar: None,
    }
}

async fn connect(url: &str, match_config: MatchConfig) -> DuelClient {
    let config = ClientConfig::new(url, "http://api.invalid/").with_match_config(match_config);
    let directory = StaticDirectory::new(profile(1, "ada")).with_user(profile(2, "bob"));
    DuelClient::builder(config)
        .directory(directory)
        .connect(&StaticCredentials::new("tok-1"))
        .await
        .expect("client should connect")
}

fn match_found_payload() -> Value {
    json!({
        "gameId": 42,
        "opponent": 2,
        "questions": [
            {"order": 0, "question": "Capital of France?", "category": "Geo",
             "options": ["Paris", "Rome"], "correctAnswer": "Paris"},
            {"order": 1, "question": "2 + 2?", "category": "Math",
             "options": "[\"3\",\"4\"]", "correctAnswer": "4"}
        ]
    })
}

/// Reads updates until `stop` matches one. Returns every update read.
async fn updates_until(
    game: &mut MatchHandle,
    mut stop: impl FnMut(&SessionUpdate) -> bool,
) -> Vec<SessionUpdate> {
    let mut seen = Vec::new();
    loop {
        let update = timeout(WAIT, game.next_update())
            .await
            .expect("timed out waiting for update")
            .expect("update stream ended");
        let done = stop(&update);
        seen.push(update);
        if done {
            return seen;
        }
    }
}

fn opened(order: u32) -> impl FnMut(&SessionUpdate) -> bool {
    move |u| matches!(u, SessionUpdate::QuestionOpened(p) if p.order == order)
}

/// Connects, searches and has the server pair us. Returns the client, the
/// server side of the connection, and the running match.
async fn start_match() -> (DuelClient, ServerConn, MatchHandle) {
    let (url, mut conns) = start_server().await;
    let client = connect(&url, MatchConfig::default()).await;
    let mut server = conns.recv().await.unwrap();

    let pending = client.find_match().await.unwrap();
    server.expect("join_matchmaking").await;
    server.send("match_found", match_found_payload()).await;

    let outcome = timeout(WAIT, pending.outcome()).await.unwrap().unwrap();
    let MatchOutcome::Found(game) = outcome else {
        panic!("expected a match, got {outcome:?}");
    };
    (client, server, game)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_credential_reaches_server_as_subprotocol() {
    let (url, mut conns) = start_server().await;
    let client = connect(&url, MatchConfig::default()).await;
    let server = conns.recv().await.unwrap();

    assert_eq!(server.subprotocol.as_deref(), Some("tok-1"));
    assert_eq!(client.connection_state(), ConnectionState::Open);
    assert_eq!(client.local_player().username, "ada");
}

#[tokio::test]
async fn test_blank_token_is_rejected_before_connecting() {
    let config = ClientConfig::new("ws://127.0.0.1:9", "http://api.invalid/");
    let directory = StaticDirectory::new(profile(1, "ada"));
    let result = DuelClient::builder(config)
        .directory(directory)
        .connect(&StaticCredentials::new("  "))
        .await;

    assert!(matches!(
        result,
        Err(QuizDuelError::Transport(TransportError::InvalidCredential(_)))
    ));
}

#[tokio::test]
async fn test_full_match_sends_one_answer_per_question() {
    let (client, mut server, mut game) = start_match().await;
    assert_eq!(game.game_id(), &GameId::from(42));
    assert_eq!(game.opponent(), &UserId::from("2"));

    // --- Question 0 ---
    updates_until(&mut game, opened(0)).await;
    game.submit_answer("Paris").await.unwrap();
    assert!(matches!(
        game.submit_answer("Rome").await,
        Err(QuizDuelError::Session(_))
    ));

    let answer = server.expect("answer_question").await;
    assert_eq!(answer, json!({"gameId": 42, "questionOrder": 0, "answer": "Paris"}));

    server
        .send("answer_feedback", json!({"userId": 1, "isCorrect": true}))
        .await;
    server
        .send(
            "score_update",
            json!({"scores": {"player1Id": 2, "player1Score": 0,
                              "player2Id": 1, "player2Score": 1}}),
        )
        .await;
    server
        .send(
            "next_question",
            json!({"question": {"questionOrder": 1, "question": "2 + 2?",
                                "options": ["3", "4"], "correctAnswer": "4"}}),
        )
        .await;

    // --- Question 1 ---
    let seen = updates_until(&mut game, opened(1)).await;
    assert!(seen.contains(&SessionUpdate::Feedback {
        player: Player::Local,
        correct: true
    }));
    assert!(seen.contains(&SessionUpdate::ScoresChanged(Scoreboard {
        local: 1,
        opponent: 0
    })));

    game.submit_answer("4").await.unwrap();
    let answer = server.expect("answer_question").await;
    assert_eq!(answer["questionOrder"], 1);

    // --- End ---
    server
        .send(
            "game_ended",
            json!({"winner": 1, "scores": {"player1Id": 2, "player1Score": 0,
                                           "player2Id": 1, "player2Score": 2}}),
        )
        .await;

    let seen = updates_until(&mut game, |u| matches!(u, SessionUpdate::Ended(_))).await;
    let Some(SessionUpdate::Ended(Ending::Finished(result))) = seen.last() else {
        panic!("expected a finished match, got {seen:?}");
    };
    assert_eq!(result.outcome, Outcome::Won);
    assert_eq!(result.scores, Scoreboard { local: 2, opponent: 0 });

    // The update stream closes with the session.
    let rest = timeout(WAIT, async {
        let mut rest = Vec::new();
        while let Some(update) = game.next_update().await {
            rest.push(update);
        }
        rest
    })
    .await
    .unwrap();
    assert!(rest.iter().all(|u| matches!(u, SessionUpdate::OpponentProfile(_))));

    // No further answers reach the server.
    client.close().await;
    while let Some(frame) = server.recv().await {
        assert_ne!(frame["type"], "answer_question");
    }
}

#[tokio::test]
async fn test_opponent_profile_is_resolved() {
    let (_client, _server, mut game) = start_match().await;

    let seen = updates_until(&mut game, |u| {
        matches!(u, SessionUpdate::OpponentProfile(_))
    })
    .await;
    assert_eq!(
        seen.last(),
        Some(&SessionUpdate::OpponentProfile(profile(2, "bob")))
    );
}

#[tokio::test]
async fn test_search_times_out_and_leaves() {
    let (url, mut conns) = start_server().await;
    let config = MatchConfig::default().with_matchmaking_timeout(Duration::from_secs(1));
    let client = connect(&url, config).await;
    let mut server = conns.recv().await.unwrap();

    let pending = client.find_match().await.unwrap();
    server.expect("join_matchmaking").await;

    let outcome = timeout(WAIT, pending.outcome()).await.unwrap().unwrap();
    assert!(matches!(outcome, MatchOutcome::TimedOut));
    server.expect("leave_matchmaking").await;
}

#[tokio::test]
async fn test_cancel_match_resolves_pending_and_leaves() {
    let (url, mut conns) = start_server().await;
    let client = connect(&url, MatchConfig::default()).await;
    let mut server = conns.recv().await.unwrap();

    let pending = client.find_match().await.unwrap();
    assert!(matches!(
        client.find_match().await,
        Err(QuizDuelError::Matchmaking(_))
    ));

    let request = client.cancel_match().await.unwrap();
    assert_eq!(request, pending.request());
    assert!(matches!(
        pending.outcome().await.unwrap(),
        MatchOutcome::Cancelled
    ));

    server.expect("join_matchmaking").await;
    server.expect("leave_matchmaking").await;
    assert!(matches!(
        client.cancel_match().await,
        Err(QuizDuelError::Matchmaking(_))
    ));
}

#[tokio::test]
async fn test_dropping_pending_match_leaves_the_pool() {
    let (url, mut conns) = start_server().await;
    let client = connect(&url, MatchConfig::default()).await;
    let mut server = conns.recv().await.unwrap();

    let pending = client.find_match().await.unwrap();
    let first = pending.request();
    server.expect("join_matchmaking").await;
    drop(pending);
    server.expect("leave_matchmaking").await;

    // The search is over, so a new one may start.
    let again = client.find_match().await.unwrap();
    server.expect("join_matchmaking").await;
    assert!(again.request() > first);
}

#[tokio::test]
async fn test_find_match_during_session_is_rejected() {
    let (client, _server, _game) = start_match().await;
    assert!(matches!(
        client.find_match().await,
        Err(QuizDuelError::Matchmaking(_))
    ));
}

#[tokio::test]
async fn test_abandon_ends_match_and_allows_new_search() {
    let (client, mut server, mut game) = start_match().await;

    game.abandon().await.unwrap();
    let seen = updates_until(&mut game, |u| matches!(u, SessionUpdate::Ended(_))).await;
    assert_eq!(
        seen.last(),
        Some(&SessionUpdate::Ended(Ending::Abandoned(AbandonReason::Local)))
    );
    assert!(game.submit_answer("Paris").await.is_err());

    // The first join was sent by start_match.
    let _pending = client.find_match().await.unwrap();
    server.expect("join_matchmaking").await;
}

#[tokio::test]
async fn test_subscribers_see_frames_alongside_session() {
    let (client, mut server, mut game) = start_match().await;
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let id = client
        .subscribe("score_update", move |payload: &Value| {
            let _ = seen_tx.send(payload.clone());
        })
        .await
        .unwrap();

    server
        .send(
            "score_update",
            json!({"scores": {"player1Id": 1, "player1Score": 3,
                              "player2Id": 2, "player2Score": 0}}),
        )
        .await;

    let payload = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(payload["scores"]["player1Score"], 3);
    updates_until(&mut game, |u| {
        *u == SessionUpdate::ScoresChanged(Scoreboard { local: 3, opponent: 0 })
    })
    .await;

    assert!(client.unsubscribe(id).await.unwrap());
    assert!(!client.unsubscribe(id).await.unwrap());
}

#[tokio::test]
async fn test_lost_connection_then_reconnect_restores_session() {
    let (url, mut conns) = start_server().await;
    let client = connect(&url, MatchConfig::default()).await;
    let mut server = conns.recv().await.unwrap();

    let pending = client.find_match().await.unwrap();
    server.expect("join_matchmaking").await;
    server.send("match_found", match_found_payload()).await;
    let MatchOutcome::Found(mut game) = pending.outcome().await.unwrap() else {
        panic!("expected a match");
    };

    // --- Server drops the socket ---
    drop(server);
    let seen = updates_until(&mut game, |u| {
        matches!(u, SessionUpdate::ConnectionLost { .. })
    })
    .await;
    assert_eq!(
        seen.last(),
        Some(&SessionUpdate::ConnectionLost { grace_secs: 30 })
    );
    assert!(matches!(
        game.submit_answer("Paris").await,
        Err(QuizDuelError::Session(_))
    ));

    // --- Reconnect ---
    client.reconnect().await.unwrap();
    let mut server = conns.recv().await.unwrap();
    updates_until(&mut game, |u| *u == SessionUpdate::ConnectionRestored).await;
    assert_eq!(client.connection_state(), ConnectionState::Open);

    // The open question can be answered on the new connection.
    game.submit_answer("Paris").await.unwrap();
    let answer = server.expect("answer_question").await;
    assert_eq!(answer["questionOrder"], 0);
}
