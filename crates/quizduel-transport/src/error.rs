/// Errors that can occur in the transport layer.
///
/// None of these are retried inside the transport. A failed connect or a
/// lost connection is reported to the caller, who decides whether to call
/// [`ConnectionManager::connect`](crate::ConnectionManager::connect) again.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The handshake with the match server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The bearer credential cannot be used for a handshake.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// A frame was sent while the connection was not `Open`.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called while a connection is open or being opened.
    #[error("already connected")]
    AlreadyConnected,

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
