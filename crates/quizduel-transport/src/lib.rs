//! Client transport layer for QuizDuel.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the persistent socket to the match server, a WebSocket implementation,
//! and the [`ConnectionManager`] that owns the single live connection of a
//! user session.
//!
//! The transport moves opaque text frames. It never looks inside them; that
//! is the protocol layer's job.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod manager;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use manager::{
    ConnectionManager, ConnectionState, TransportEvent, TransportEvents,
};
#[cfg(feature = "websocket")]
pub use websocket::{
    ConnectConfig, CredentialPlacement, WebSocketConnection,
    WebSocketConnector,
};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The bearer credential presented during the connection handshake.
///
/// The token is never printed: `Debug` redacts it so it cannot leak into
/// logs through a `?credential` field.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a bearer token.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidCredential`] if the token is empty
    /// or only whitespace.
    pub fn bearer(token: impl Into<String>) -> Result<Self, TransportError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TransportError::InvalidCredential(
                "bearer token is empty".into(),
            ));
        }
        Ok(Self(token))
    }

    /// Returns the raw token for placing it into a handshake request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Opens authenticated connections to the match server.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Performs the handshake, presenting `credential` to the server.
    fn connect(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single open connection that exchanges text frames.
///
/// `send` and `recv` may be called concurrently from different tasks: the
/// manager runs one reader and one writer per connection.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text frame to the server.
    fn send(
        &self,
        frame: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next text frame from the server.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Something that accepts outbound frames without waiting for delivery.
///
/// The match state machines talk to the server only through this trait, so
/// they can be driven in tests with a recording sink instead of a socket.
pub trait FrameSink: Send + Sync {
    /// Queues `frame` for delivery.
    ///
    /// # Errors
    /// Returns [`TransportError::NotConnected`] if no connection is open.
    fn send_frame(&self, frame: String) -> Result<(), TransportError>;
}
