//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means "this frame (or part of it) could not be
//! understood". None of them is fatal: the dispatcher logs and drops the
//! frame, and the connection stays up.

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a `{"type": ..., "payload": ...}` JSON envelope.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// The envelope parsed, but its payload does not have the shape the
    /// subscriber expects for this message type.
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        /// The message type of the frame.
        kind: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A question's `options` arrived as a string that is not an encoded
    /// list of strings.
    #[error("invalid encoded options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}
