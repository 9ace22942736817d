//! WebSocket transport implementation using `tokio-tungstenite`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{
    AUTHORIZATION, SEC_WEBSOCKET_PROTOCOL,
};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Connector, Credential, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where the bearer credential goes in the WebSocket upgrade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPlacement {
    /// `Authorization: Bearer <token>`.
    AuthorizationHeader,
    /// The token is offered as the `Sec-WebSocket-Protocol` value. Browser
    /// clients cannot set headers, so the match server reads it from here.
    /// The server must echo the value back or the handshake is rejected.
    #[default]
    Subprotocol,
}

/// Settings for reaching the match server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// `ws://` or `wss://` URL of the match server.
    pub url: String,
    /// How the bearer credential is presented.
    pub credential_placement: CredentialPlacement,
}

impl ConnectConfig {
    /// Creates a config for `url` with the credential offered as the
    /// subprotocol.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credential_placement: CredentialPlacement::default(),
        }
    }

    /// Sets where the credential is placed in the handshake.
    #[must_use]
    pub fn with_credential_placement(
        mut self,
        placement: CredentialPlacement,
    ) -> Self {
        self.credential_placement = placement;
        self
    }
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self::new("ws://127.0.0.1:3000")
    }
}

/// A [`Connector`] that dials the match server over WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    config: ConnectConfig,
}

impl WebSocketConnector {
    /// Creates a connector for the given server settings.
    pub fn new(config: ConnectConfig) -> Self {
        Self { config }
    }
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    fn connect(
        &self,
        credential: &Credential,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send
    {
        async move {
            let mut request = self
                .config
                .url
                .as_str()
                .into_client_request()
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

            let (name, value) = match self.config.credential_placement {
                CredentialPlacement::AuthorizationHeader => (
                    AUTHORIZATION,
                    format!("Bearer {}", credential.expose()),
                ),
                CredentialPlacement::Subprotocol => {
                    (SEC_WEBSOCKET_PROTOCOL, credential.expose().to_owned())
                }
            };
            let value = HeaderValue::from_str(&value).map_err(|_| {
                TransportError::InvalidCredential(
                    "token is not a valid header value".into(),
                )
            })?;
            request.headers_mut().insert(name, value);

            let (ws, _response) = tokio_tungstenite::connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

            let id = ConnectionId::new(
                NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            );
            tracing::debug!(%id, url = %self.config.url, "WebSocket connected");

            let (sink, stream) = ws.split();
            Ok(WebSocketConnection {
                id,
                sink: Mutex::new(sink),
                stream: Mutex::new(stream),
            })
        }
    }
}

/// A single client WebSocket connection.
///
/// The socket is split so the reader can wait for the next frame while
/// the writer is sending.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    fn send(
        &self,
        frame: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let msg = Message::text(frame.to_owned());
        async move {
            self.sink.lock().await.send(msg).await.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
        }
    }

    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send
    {
        async move {
            let mut stream = self.stream.lock().await;
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Ok(Some(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        match String::from_utf8(data.to_vec()) {
                            Ok(text) => return Ok(Some(text)),
                            Err(_) => {
                                tracing::warn!(
                                    id = %self.id,
                                    "dropping non-UTF-8 binary frame"
                                );
                                continue;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(None),
                    Some(Ok(_)) => continue, // skip ping/pong/raw frame
                    Some(Err(
                        tungstenite::Error::ConnectionClosed
                        | tungstenite::Error::AlreadyClosed,
                    )) => return Ok(None),
                    Some(Err(e)) => {
                        return Err(TransportError::ReceiveFailed(
                            std::io::Error::new(
                                std::io::ErrorKind::ConnectionReset,
                                e,
                            ),
                        ));
                    }
                }
            }
        }
    }

    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move {
            match self.sink.lock().await.close().await {
                Ok(())
                | Err(
                    tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed,
                ) => Ok(()),
                Err(e) => Err(TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))),
            }
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
