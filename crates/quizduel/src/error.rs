//! Unified error type for the QuizDuel client.

use quizduel_match::{MatchmakingError, SessionError};
use quizduel_protocol::ProtocolError;
use quizduel_transport::TransportError;

use crate::DirectoryError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant generates the `From` impls, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizDuelError {
    /// A transport-level error (connect, send, closed).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, malformed frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A matchmaking request was rejected.
    #[error(transparent)]
    Matchmaking(#[from] MatchmakingError),

    /// A match session ignored the action.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A user lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// No usable credential or configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The client was closed, so the request could not be served.
    #[error("client is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let quiz_err: QuizDuelError = err.into();
        assert!(matches!(quiz_err, QuizDuelError::Transport(_)));
        assert!(quiz_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MissingField("questionOrder");
        let quiz_err: QuizDuelError = err.into();
        assert!(matches!(quiz_err, QuizDuelError::Protocol(_)));
    }

    #[test]
    fn test_from_matchmaking_error() {
        let quiz_err: QuizDuelError = MatchmakingError::AlreadySearching.into();
        assert!(matches!(quiz_err, QuizDuelError::Matchmaking(_)));
        assert_eq!(quiz_err.to_string(), "already searching for a match");
    }

    #[test]
    fn test_from_session_error() {
        let quiz_err: QuizDuelError = SessionError::AnswerLocked(2).into();
        assert!(matches!(quiz_err, QuizDuelError::Session(_)));
    }

    #[test]
    fn test_from_directory_error() {
        let err = DirectoryError::Status {
            status: 404,
            body: "no such user".into(),
        };
        let quiz_err: QuizDuelError = err.into();
        assert!(matches!(quiz_err, QuizDuelError::Directory(_)));
        assert!(quiz_err.to_string().contains("404"));
    }
}
