use crate::actor::SessionHandle;
use crate::protocol::SessionId;
use crate::session::events::SubscriptionId;
use bytes::Bytes;
use std::sync::Arc;

/// Handle on the client's current session: its id plus the event surface.
///
/// Server state machines publish named events to sessions; listeners
/// registered here observe them in publication order. Listeners run on the
/// session's event loop, so they must not block.
pub struct RaftSession {
    session_id: SessionId,
    handle: SessionHandle,
}

impl RaftSession {
    pub(super) fn new(session_id: SessionId, handle: SessionHandle) -> Self {
        RaftSession { session_id, handle }
    }

    pub fn id(&self) -> SessionId {
        self.session_id
    }

    /// Registers a listener for events published under `name`. Returns None
    /// if the client was torn down before the registration landed.
    pub async fn on_event(
        &self,
        name: impl Into<String>,
        listener: impl Fn(Bytes) + Send + Sync + 'static,
    ) -> Option<EventSubscription> {
        let name = name.into();
        let subscription = self.handle.subscribe(name.clone(), Arc::new(listener)).await?;

        Some(EventSubscription {
            name,
            subscription,
            handle: self.handle.clone(),
        })
    }

    /// Runs when a session opens. Useful with opens that compose after a
    /// close; a listener registered on an already-open session waits for
    /// the next open, which never comes on this session instance.
    pub fn on_open(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.handle.add_open_listener(Arc::new(listener));
    }

    /// Runs once when the session closes or expires.
    pub fn on_close(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.handle.add_close_listener(Arc::new(listener));
    }
}

/// One event-listener registration. Dropping it does nothing; call
/// `unsubscribe` to stop receiving events.
pub struct EventSubscription {
    name: String,
    subscription: SubscriptionId,
    handle: SessionHandle,
}

impl EventSubscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unsubscribe(self) {
        self.handle.unsubscribe(self.name, self.subscription);
    }
}
