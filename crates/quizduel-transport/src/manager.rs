//! The connection manager: owns the one live connection of a user session.
//!
//! A connection goes through three states:
//!
//! ```text
//!   Closed ──connect()──→ Connecting ──handshake ok──→ Open
//!     ↑                       │                          │
//!     └──────handshake err────┘      close() / server ───┘
//!                                    close / socket error
//! ```
//!
//! Once open, two Tokio tasks serve the connection: a reader that forwards
//! every inbound frame, in arrival order, onto the [`TransportEvents`]
//! stream, and a writer that drains the outbound queue fed by
//! [`ConnectionManager::send`]. When the reader stops it emits one final
//! [`TransportEvent::Closed`], which is the lifecycle signal dependent
//! components react to.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};

use crate::{
    Connection, ConnectionId, Connector, Credential, FrameSink, TransportError,
};

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The handshake is in flight.
    Connecting,
    /// Frames can be sent and received.
    Open,
    /// No connection. The initial state, and the state after any close.
    Closed,
}

/// Something that happened on the connection, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One opaque inbound frame.
    Frame(String),
    /// The connection ended. Always the last event of a stream.
    Closed {
        /// Human-readable cause, for logging.
        reason: String,
    },
}

/// Ordered stream of inbound frames and lifecycle events for one connection.
pub type TransportEvents = mpsc::UnboundedReceiver<TransportEvent>;

enum Outbound {
    Frame(String),
    Close,
}

struct Inner {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    connection_id: Option<ConnectionId>,
    /// Bumped on every successful connect so tasks of an older connection
    /// cannot close a newer one.
    epoch: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panic elsewhere; the data is still
        // a consistent snapshot of plain values.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// Marks the connection of `epoch` closed, if it is still the current one.
    fn mark_closed(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch == epoch && inner.state != ConnectionState::Closed {
            inner.outbound = None;
            self.set_state(&mut inner, ConnectionState::Closed);
        }
    }
}

/// Owns the persistent, authenticated connection to the match server.
///
/// The manager does not interpret frames. It transports them, tracks the
/// [`ConnectionState`], and reports close/error through the event stream
/// returned by [`connect`](Self::connect). Sending is fire-and-forget: the
/// caller never waits for the frame to reach the wire.
pub struct ConnectionManager<K: Connector> {
    connector: K,
    shared: Arc<Shared>,
}

impl<K: Connector> ConnectionManager<K> {
    /// Creates a manager in the `Closed` state.
    pub fn new(connector: K) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        Self {
            connector,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: ConnectionState::Closed,
                    outbound: None,
                    connection_id: None,
                    epoch: 0,
                }),
                state_tx,
            }),
        }
    }

    /// Opens the connection, presenting `credential` at handshake time.
    ///
    /// On success the returned stream yields every inbound frame in
    /// arrival order, then a single [`TransportEvent::Closed`].
    ///
    /// # Errors
    /// - [`TransportError::AlreadyConnected`] if a connection is open or
    ///   being opened.
    /// - [`TransportError::ConnectFailed`] / [`TransportError::InvalidCredential`]
    ///   if the handshake fails. The state returns to `Closed`.
    /// - [`TransportError::ConnectionClosed`] if [`close`](Self::close) was
    ///   called while the handshake was in flight.
    pub async fn connect(
        &self,
        credential: &Credential,
    ) -> Result<TransportEvents, TransportError> {
        {
            let mut inner = self.shared.lock();
            if inner.state != ConnectionState::Closed {
                return Err(TransportError::AlreadyConnected);
            }
            self.shared.set_state(&mut inner, ConnectionState::Connecting);
        }
        tracing::debug!("connecting to match server");

        let conn = match self.connector.connect(credential).await {
            Ok(conn) => conn,
            Err(e) => {
                let mut inner = self.shared.lock();
                self.shared.set_state(&mut inner, ConnectionState::Closed);
                tracing::warn!(error = %e, "connect failed");
                return Err(e);
            }
        };

        let conn = Arc::new(conn);
        let conn_id = conn.id();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let epoch = {
            let mut inner = self.shared.lock();
            if inner.state == ConnectionState::Connecting {
                inner.epoch += 1;
                inner.outbound = Some(out_tx);
                inner.connection_id = Some(conn_id);
                self.shared.set_state(&mut inner, ConnectionState::Open);
                Some(inner.epoch)
            } else {
                None
            }
        };
        let Some(epoch) = epoch else {
            // close() won the race against the handshake.
            let _ = conn.close().await;
            return Err(TransportError::ConnectionClosed(
                "closed during handshake".into(),
            ));
        };

        tracing::info!(%conn_id, "connection open");

        tokio::spawn(read_loop(
            Arc::clone(&conn),
            events_tx,
            Arc::clone(&self.shared),
            epoch,
        ));
        tokio::spawn(write_loop(conn, out_rx, Arc::clone(&self.shared), epoch));

        Ok(events_rx)
    }

    /// Queues one frame for the server.
    ///
    /// # Errors
    /// Returns [`TransportError::NotConnected`] unless the state is `Open`.
    pub fn send(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        let inner = self.shared.lock();
        match (&inner.state, &inner.outbound) {
            (ConnectionState::Open, Some(outbound)) => outbound
                .send(Outbound::Frame(frame.into()))
                .map_err(|_| TransportError::NotConnected),
            _ => Err(TransportError::NotConnected),
        }
    }

    /// Closes the connection. Calling it again, or on a closed manager, is
    /// a no-op.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if inner.state == ConnectionState::Closed {
            return;
        }
        if let Some(outbound) = inner.outbound.take() {
            let _ = outbound.send(Outbound::Close);
        }
        tracing::info!(conn_id = ?inner.connection_id, "closing connection");
        self.shared.set_state(&mut inner, ConnectionState::Closed);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Watches lifecycle state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Identifier of the current (or last) connection.
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.shared.lock().connection_id
    }
}

impl<K: Connector> FrameSink for ConnectionManager<K> {
    fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        self.send(frame)
    }
}

impl<K: Connector> Drop for ConnectionManager<K> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop<C: Connection>(
    conn: Arc<C>,
    events: mpsc::UnboundedSender<TransportEvent>,
    shared: Arc<Shared>,
    epoch: u64,
) {
    let conn_id = conn.id();
    let reason = loop {
        match conn.recv().await {
            Ok(Some(frame)) => {
                tracing::trace!(%conn_id, len = frame.len(), "frame received");
                if events.send(TransportEvent::Frame(frame)).is_err() {
                    break "event stream dropped".to_string();
                }
            }
            Ok(None) => break "connection closed".to_string(),
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "receive failed");
                break e.to_string();
            }
        }
    };

    shared.mark_closed(epoch);
    tracing::info!(%conn_id, %reason, "connection ended");
    let _ = events.send(TransportEvent::Closed { reason });
}

async fn write_loop<C: Connection>(
    conn: Arc<C>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
    epoch: u64,
) {
    let conn_id = conn.id();
    while let Some(cmd) = outbound.recv().await {
        match cmd {
            Outbound::Frame(frame) => {
                if let Err(e) = conn.send(&frame).await {
                    tracing::warn!(%conn_id, error = %e, "send failed");
                    shared.mark_closed(epoch);
                    let _ = conn.close().await;
                    return;
                }
            }
            Outbound::Close => break,
        }
    }
    // Either close() was requested or every sender is gone.
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    /// In-memory connection: the test pushes inbound frames through a
    /// channel (`None` = server closes) and inspects what was sent.
    struct MockConnection {
        inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Option<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl Connection for MockConnection {
        fn send(
            &self,
            frame: &str,
        ) -> impl Future<Output = Result<(), TransportError>> + Send {
            let frame = frame.to_owned();
            async move {
                self.sent.lock().unwrap().push(frame);
                Ok(())
            }
        }

        fn recv(
            &self,
        ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send
        {
            async move {
                if self.closed.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                Ok(self.inbound.lock().await.recv().await.flatten())
            }
        }

        fn close(
            &self,
        ) -> impl Future<Output = Result<(), TransportError>> + Send {
            async move {
                self.closed.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(1)
        }
    }

    struct MockConnector {
        pending: Mutex<Option<MockConnection>>,
    }

    impl Connector for MockConnector {
        type Connection = MockConnection;

        fn connect(
            &self,
            _credential: &Credential,
        ) -> impl Future<Output = Result<MockConnection, TransportError>> + Send
        {
            let conn = self.pending.lock().unwrap().take();
            async move {
                conn.ok_or_else(|| {
                    TransportError::ConnectFailed("server unreachable".into())
                })
            }
        }
    }

    struct Harness {
        manager: ConnectionManager<MockConnector>,
        server_tx: mpsc::UnboundedSender<Option<String>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    fn harness() -> Harness {
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let conn = MockConnection {
            inbound: tokio::sync::Mutex::new(server_rx),
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        Harness {
            manager: ConnectionManager::new(MockConnector {
                pending: Mutex::new(Some(conn)),
            }),
            server_tx,
            sent,
            closed,
        }
    }

    fn credential() -> Credential {
        Credential::bearer("token").unwrap()
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_new_manager_is_closed() {
        let h = harness();
        assert_eq!(h.manager.state(), ConnectionState::Closed);
        assert!(h.manager.connection_id().is_none());
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_connected() {
        let h = harness();
        let result = h.manager.send("{}");
        assert!(matches!(result, Err(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_opens_and_sends_frames() {
        let h = harness();
        let _events = h.manager.connect(&credential()).await.unwrap();
        assert_eq!(h.manager.state(), ConnectionState::Open);

        h.manager.send("first").unwrap();
        h.manager.send_frame("second".into()).unwrap();

        let sent = Arc::clone(&h.sent);
        wait_until(|| sent.lock().unwrap().len() == 2).await;
        assert_eq!(*h.sent.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_inbound_frames_arrive_in_order() {
        let h = harness();
        let mut events = h.manager.connect(&credential()).await.unwrap();

        h.server_tx.send(Some("a".into())).unwrap();
        h.server_tx.send(Some("b".into())).unwrap();

        assert_eq!(events.recv().await, Some(TransportEvent::Frame("a".into())));
        assert_eq!(events.recv().await, Some(TransportEvent::Frame("b".into())));
    }

    #[tokio::test]
    async fn test_server_close_emits_closed_and_blocks_send() {
        let h = harness();
        let mut events = h.manager.connect(&credential()).await.unwrap();
        let mut state = h.manager.watch_state();

        h.server_tx.send(None).unwrap();

        assert!(matches!(
            events.recv().await,
            Some(TransportEvent::Closed { .. })
        ));
        state
            .wait_for(|s| *s == ConnectionState::Closed)
            .await
            .unwrap();
        assert!(matches!(
            h.manager.send("late"),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let h = harness();
        let _events = h.manager.connect(&credential()).await.unwrap();

        h.manager.close();
        h.manager.close();

        assert_eq!(h.manager.state(), ConnectionState::Closed);
        let closed = Arc::clone(&h.closed);
        wait_until(|| closed.load(Ordering::SeqCst)).await;
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected() {
        let h = harness();
        let _events = h.manager.connect(&credential()).await.unwrap();
        let second = h.manager.connect(&credential()).await;
        assert!(matches!(second, Err(TransportError::AlreadyConnected)));
        assert_eq!(h.manager.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_failed_connect_returns_to_closed() {
        let manager = ConnectionManager::new(MockConnector {
            pending: Mutex::new(None),
        });
        let result = manager.connect(&credential()).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
        assert_eq!(manager.state(), ConnectionState::Closed);
    }
}
