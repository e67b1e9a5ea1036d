use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type EventListenerFn = Arc<dyn Fn(Bytes) + Send + Sync>;
pub(crate) type LifecycleListenerFn = Arc<dyn Fn() + Send + Sync>;

/// Identifies one event listener registration, for later removal.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn val(&self) -> u64 {
        self.0
    }
}

/// EventRegistry holds the session's listeners: named session-event callbacks
/// plus open/close lifecycle callbacks. Listeners are plain callback values;
/// they run on the session event loop and must not block it.
pub(crate) struct EventRegistry {
    next_subscription: u64,
    by_name: HashMap<String, Vec<(SubscriptionId, EventListenerFn)>>,
    open_listeners: Vec<LifecycleListenerFn>,
    close_listeners: Vec<LifecycleListenerFn>,
}

impl EventRegistry {
    pub fn new() -> Self {
        EventRegistry {
            next_subscription: 1,
            by_name: HashMap::new(),
            open_listeners: Vec::new(),
            close_listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, name: String, listener: EventListenerFn) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        self.by_name.entry(name).or_default().push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, name: &str, subscription: SubscriptionId) {
        if let Some(listeners) = self.by_name.get_mut(name) {
            listeners.retain(|(id, _)| *id != subscription);
            if listeners.is_empty() {
                self.by_name.remove(name);
            }
        }
    }

    pub fn add_open_listener(&mut self, listener: LifecycleListenerFn) {
        self.open_listeners.push(listener);
    }

    pub fn add_close_listener(&mut self, listener: LifecycleListenerFn) {
        self.close_listeners.push(listener);
    }

    /// Invokes every listener registered under `name`. Returns how many ran.
    pub fn dispatch(&self, name: &str, payload: &Bytes) -> usize {
        match self.by_name.get(name) {
            Some(listeners) => {
                for (_, listener) in listeners {
                    listener(payload.clone());
                }
                listeners.len()
            }
            None => 0,
        }
    }

    pub fn notify_open(&self) {
        for listener in &self.open_listeners {
            listener();
        }
    }

    pub fn notify_close(&self) {
        for listener in &self.close_listeners {
            listener();
        }
    }
}
