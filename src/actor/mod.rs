use crate::api::{CloseError, OpenError, Operation, SubmitError};
use crate::protocol::PublishEvent;
use crate::session::connection::{ConnectAttemptOutcome, ConnectionId};
use crate::session::events::{EventListenerFn, LifecycleListenerFn, SubscriptionId};
use crate::session::pipeline::RequestOutcome;
use crate::session::SessionCore;
use bytes::Bytes;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Formatter};
use tokio::sync::{mpsc, oneshot};

/// Everything that can happen to a session, funneled through one queue so the
/// session's state only ever changes on its own event loop.
pub(crate) enum Event {
    // Public operations.
    Open(Callback<(), OpenError>),
    Close(Callback<(), CloseError>),
    Submit(Operation, Callback<Bytes, SubmitError>),
    Subscribe {
        name: String,
        listener: EventListenerFn,
        reply: oneshot::Sender<SubscriptionId>,
    },
    Unsubscribe {
        name: String,
        subscription: SubscriptionId,
    },
    AddOpenListener(LifecycleListenerFn),
    AddCloseListener(LifecycleListenerFn),

    // Completions of work spawned by the session.
    ConnectAttemptResolved(ConnectAttemptOutcome),
    RequestResolved(RequestOutcome),
    UnregisterResolved,

    // Transport callbacks.
    ConnectionLost(ConnectionId),
    InboundEvent(PublishEvent),

    // Keep-alive timer.
    KeepAliveTick,
}

impl Debug for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Event::Open(_) => write!(f, "Open"),
            Event::Close(_) => write!(f, "Close"),
            Event::Submit(operation, _) => write!(f, "Submit({:?})", operation),
            Event::Subscribe { name, .. } => write!(f, "Subscribe({})", name),
            Event::Unsubscribe { name, subscription } => {
                write!(f, "Unsubscribe({}, {:?})", name, subscription)
            }
            Event::AddOpenListener(_) => write!(f, "AddOpenListener"),
            Event::AddCloseListener(_) => write!(f, "AddCloseListener"),
            Event::ConnectAttemptResolved(outcome) => {
                write!(f, "ConnectAttemptResolved({:?})", outcome)
            }
            Event::RequestResolved(outcome) => write!(f, "RequestResolved({:?})", outcome),
            Event::UnregisterResolved => write!(f, "UnregisterResolved"),
            Event::ConnectionLost(id) => write!(f, "ConnectionLost({:?})", id),
            Event::InboundEvent(event) => write!(f, "InboundEvent({:?})", event),
            Event::KeepAliveTick => write!(f, "KeepAliveTick"),
        }
    }
}

pub(crate) struct Callback<O: Debug, E: Error>(oneshot::Sender<Result<O, E>>);

impl<O: Debug, E: Error> Debug for Callback<O, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish()
    }
}

impl<O: Debug, E: Error> Callback<O, E> {
    pub fn send(self, message: Result<O, E>) {
        // A caller that stopped waiting is not an error.
        let _ = self.0.send(message);
    }
}

/// SessionHandle is the caller-facing half of the event loop: public
/// operations enqueue an event with a oneshot callback and await the result.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    sender: mpsc::UnboundedSender<Event>,
}

impl SessionHandle {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (SessionHandle { sender }, receiver)
    }

    pub fn weak(&self) -> WeakSessionHandle {
        WeakSessionHandle {
            sender: self.sender.downgrade(),
        }
    }

    pub async fn open(&self) -> Result<(), OpenError> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Event::Open(Callback(tx))).is_err() {
            return Err(OpenError::Closed);
        }
        rx.await.unwrap_or(Err(OpenError::Closed))
    }

    pub async fn close(&self) -> Result<(), CloseError> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Event::Close(Callback(tx))).is_err() {
            // The loop is gone; the client cannot get more closed than that.
            return Ok(());
        }
        rx.await.unwrap_or(Err(CloseError::TaskExited))
    }

    pub async fn submit(&self, operation: Operation) -> Result<Bytes, SubmitError> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Event::Submit(operation, Callback(tx))).is_err() {
            return Err(SubmitError::Closed);
        }
        rx.await.unwrap_or(Err(SubmitError::Closed))
    }

    pub async fn subscribe(&self, name: String, listener: EventListenerFn) -> Option<SubscriptionId> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(Event::Subscribe { name, listener, reply })
            .ok()?;
        rx.await.ok()
    }

    pub fn unsubscribe(&self, name: String, subscription: SubscriptionId) {
        let _ = self.sender.send(Event::Unsubscribe { name, subscription });
    }

    pub fn add_open_listener(&self, listener: LifecycleListenerFn) {
        let _ = self.sender.send(Event::AddOpenListener(listener));
    }

    pub fn add_close_listener(&self, listener: LifecycleListenerFn) {
        let _ = self.sender.send(Event::AddCloseListener(listener));
    }
}

/// WeakSessionHandle is what spawned tasks and transport callbacks hold. It
/// does not keep the event loop alive; notifications after the loop exits
/// are silently dropped.
#[derive(Clone)]
pub(crate) struct WeakSessionHandle {
    sender: mpsc::WeakUnboundedSender<Event>,
}

impl WeakSessionHandle {
    fn notify(&self, event: Event) -> bool {
        match self.sender.upgrade() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    pub fn notify_connect_attempt(&self, outcome: ConnectAttemptOutcome) {
        self.notify(Event::ConnectAttemptResolved(outcome));
    }

    pub fn notify_request_resolved(&self, outcome: RequestOutcome) {
        self.notify(Event::RequestResolved(outcome));
    }

    pub fn notify_unregister_resolved(&self) {
        self.notify(Event::UnregisterResolved);
    }

    pub fn notify_connection_lost(&self, connection: ConnectionId) {
        self.notify(Event::ConnectionLost(connection));
    }

    pub fn notify_inbound_event(&self, event: PublishEvent) {
        self.notify(Event::InboundEvent(event));
    }

    /// Returns false once the event loop is gone, so timers can stop.
    pub fn notify_keep_alive_tick(&self) -> bool {
        self.notify(Event::KeepAliveTick)
    }
}

/// SessionActor drains the event queue into the session core.
pub(crate) struct SessionActor {
    logger: slog::Logger,
    receiver: mpsc::UnboundedReceiver<Event>,
    core: SessionCore,
}

impl SessionActor {
    pub fn new(logger: slog::Logger, receiver: mpsc::UnboundedReceiver<Event>, core: SessionCore) -> Self {
        SessionActor {
            logger,
            receiver,
            core,
        }
    }

    pub async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            slog::trace!(self.logger, "Received: {:?}", event);
            self.handle_event(event);
        }
    }

    // This must NOT be async. Anything slow is spawned elsewhere and comes
    // back to this loop as another event.
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Open(callback) => self.core.handle_open(callback),
            Event::Close(callback) => self.core.handle_close(callback),
            Event::Submit(operation, callback) => self.core.handle_submit(operation, callback),
            Event::Subscribe { name, listener, reply } => {
                let subscription = self.core.handle_subscribe(name, listener);
                let _ = reply.send(subscription);
            }
            Event::Unsubscribe { name, subscription } => self.core.handle_unsubscribe(&name, subscription),
            Event::AddOpenListener(listener) => self.core.handle_add_open_listener(listener),
            Event::AddCloseListener(listener) => self.core.handle_add_close_listener(listener),
            Event::ConnectAttemptResolved(outcome) => self.core.handle_connect_attempt(outcome),
            Event::RequestResolved(outcome) => self.core.handle_request_resolved(outcome),
            Event::UnregisterResolved => self.core.handle_unregister_resolved(),
            Event::ConnectionLost(connection) => self.core.handle_connection_lost(connection),
            Event::InboundEvent(event) => self.core.handle_inbound_event(event),
            Event::KeepAliveTick => self.core.handle_keep_alive_tick(),
        }
    }
}
