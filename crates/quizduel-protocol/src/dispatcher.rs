//! Publish/subscribe routing of inbound frames by message type.
//!
//! The [`Dispatcher`] is the one place raw text frames are parsed. Each
//! frame's `type` selects the handlers to run; they run synchronously, in
//! the order they subscribed, on the caller's task. Nothing here spawns or
//! locks, so the owner of the dispatcher decides the scheduling.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Codec, Frame, JsonCodec, ProtocolError};

/// Stable handle for one subscription.
///
/// Handles are never reused within a dispatcher, so unsubscribing an old
/// handle can never remove somebody else's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What happened to a well-formed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// This many handlers were subscribed to the frame's type.
    Delivered(usize),
    /// Nobody listens for this type. Not an error.
    Unhandled,
}

type Handler = Box<dyn FnMut(&Value) + Send>;

struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

/// Routes inbound frames to the handlers subscribed to their type.
pub struct Dispatcher<C: Codec = JsonCodec> {
    codec: C,
    routes: HashMap<String, Vec<Subscriber>>,
    // Reverse index so unsubscribe does not scan every route.
    index: HashMap<SubscriptionId, String>,
    next_id: u64,
}

impl Dispatcher<JsonCodec> {
    /// Creates an empty dispatcher using JSON frames.
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for Dispatcher<JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> Dispatcher<C> {
    /// Creates an empty dispatcher parsing frames with `codec`.
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            routes: HashMap::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers `handler` for frames of type `kind`.
    ///
    /// The handler receives the raw payload. Handlers for the same type run
    /// in subscription order.
    pub fn subscribe(
        &mut self,
        kind: impl Into<String>,
        handler: impl FnMut(&Value) + Send + 'static,
    ) -> SubscriptionId {
        let kind = kind.into();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        tracing::debug!(%id, kind = %kind, "subscribed");
        self.routes.entry(kind.clone()).or_default().push(Subscriber {
            id,
            handler: Box::new(handler),
        });
        self.index.insert(id, kind);
        id
    }

    /// Registers a handler that receives the payload decoded as `T`.
    ///
    /// A payload that does not fit `T` is logged and this handler is
    /// skipped for that frame; other handlers for the type still run.
    pub fn subscribe_typed<T, F>(
        &mut self,
        kind: impl Into<String>,
        mut handler: F,
    ) -> SubscriptionId
    where
        T: DeserializeOwned,
        F: FnMut(T) + Send + 'static,
    {
        let kind = kind.into();
        let label = kind.clone();
        self.subscribe(kind, move |payload| {
            match T::deserialize(payload) {
                Ok(value) => handler(value),
                Err(source) => {
                    let err = ProtocolError::MalformedPayload {
                        kind: label.clone(),
                        source,
                    };
                    tracing::warn!(error = %err, "dropping payload");
                }
            }
        })
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(kind) = self.index.remove(&id) else {
            return false;
        };
        if let Some(subscribers) = self.routes.get_mut(&kind) {
            subscribers.retain(|s| s.id != id);
            if subscribers.is_empty() {
                self.routes.remove(&kind);
            }
        }
        tracing::debug!(%id, kind = %kind, "unsubscribed");
        true
    }

    /// Parses one raw frame and runs every handler subscribed to its type.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MalformedFrame`] if `raw` is not a
    /// `{"type", "payload"}` envelope. The frame is dropped; the caller
    /// should log and carry on.
    pub fn on_frame(&mut self, raw: &str) -> Result<Dispatch, ProtocolError> {
        let frame: Frame = match self.codec.decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed frame");
                return Err(e);
            }
        };

        let Some(subscribers) = self.routes.get_mut(&frame.kind) else {
            tracing::debug!(kind = %frame.kind, "no subscribers for frame type");
            return Ok(Dispatch::Unhandled);
        };

        tracing::trace!(kind = %frame.kind, count = subscribers.len(), "dispatching");
        for subscriber in subscribers.iter_mut() {
            (subscriber.handler)(&frame.payload);
        }
        Ok(Dispatch::Delivered(subscribers.len()))
    }

    /// Number of handlers currently subscribed to `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.routes.get(kind).map_or(0, Vec::len)
    }

    /// Returns `true` if there are no subscriptions at all.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl<C: Codec> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .routes
            .iter()
            .map(|(kind, subs)| (kind.as_str(), subs.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("routes", &counts)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
