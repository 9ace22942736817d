//! Codec trait and the JSON implementation used on the wire.
//!
//! Every frame is a JSON text message. The [`Codec`] trait keeps the
//! conversion in one place so the dispatcher and the state machines never
//! call `serde_json` directly for whole frames.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between Rust values and text frames.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedFrame`] if the text is not valid
    /// JSON or does not match `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use quizduel_protocol::{ClientMessage, Codec, JsonCodec};
///
/// let frame = JsonCodec.encode(&ClientMessage::join_matchmaking()).unwrap();
/// assert_eq!(frame, r#"{"type":"join_matchmaking","payload":{}}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::MalformedFrame)
    }
}
