use crate::actor::{Callback, WeakSessionHandle};
use crate::api::{CloseError, OpenError, Operation, SubmitError};
use crate::cluster::{Address, AddressSelector, SelectorState};
use crate::protocol::{
    ClientId, CommandRequest, EventIndex, KeepAliveRequest, PublishEvent, QueryRequest, RaftErrorCode,
    RegisterRequest, ResponseStatus, Sequence, SessionId, SessionRequest, SessionResponse, StateIndex,
};
use crate::session::connection::{self, ConnectAttemptOutcome, ConnectionId, EstablishedConnection};
use crate::session::events::{EventListenerFn, EventRegistry, LifecycleListenerFn, SubscriptionId};
use crate::session::keep_alive::KeepAliveTimerHandle;
use crate::session::pipeline::{
    CompletedRequest, FailureKind, RequestCompletion, RequestKind, RequestOutcome, RequestPipeline,
    RequestResolution,
};
use crate::transport::Transport;
use bytes::Bytes;
use std::cmp;
use std::mem;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// Client lifecycle as seen by synchronous observers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClientState {
    Idle,
    Opening,
    Open(SessionId),
    Closing,
    Closed,
    Expired,
}

impl ClientState {
    pub fn is_open(&self) -> bool {
        matches!(self, ClientState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ClientState::Idle | ClientState::Closed | ClientState::Expired)
    }
}

pub(crate) struct SessionConfig {
    pub logger: slog::Logger,
    pub transport: Arc<dyn Transport>,
    pub bootstrap_members: Vec<Address>,
    pub session_timeout_hint: Duration,
    pub unregister_timeout: Duration,
    pub handle: WeakSessionHandle,
    pub state_tx: watch::Sender<ClientState>,
}

/// SessionCore is the single-threaded brain of the client: selector,
/// connection bookkeeping, request pipeline, session lease, and event
/// delivery all live here and are only touched from the event loop.
pub(crate) struct SessionCore {
    logger: slog::Logger,
    transport: Arc<dyn Transport>,
    bootstrap_members: Vec<Address>,
    session_timeout_hint: Duration,
    unregister_timeout: Duration,
    handle: WeakSessionHandle,
    state_tx: watch::Sender<ClientState>,

    lifecycle: Lifecycle,
    selector: AddressSelector,
    connection: Option<EstablishedConnection>,
    // At most one connect attempt is in flight; its id guards against
    // outcomes from attempts belonging to an abandoned sweep.
    pending_attempt: Option<ConnectionId>,
    next_connection_id: u64,
    pipeline: RequestPipeline,
    session: Option<SessionData>,
    registry: EventRegistry,
    keep_alive_timer: Option<KeepAliveTimerHandle>,
}

enum Lifecycle {
    Idle,
    Opening {
        waiters: Vec<Callback<(), OpenError>>,
        close_after: Vec<Callback<(), CloseError>>,
    },
    Open,
    Closing {
        waiters: Vec<Callback<(), CloseError>>,
        open_after: Vec<Callback<(), OpenError>>,
    },
    Closed,
    Expired,
}

struct SessionData {
    client_id: ClientId,
    session_id: Option<SessionId>,
    // Hint until registration; the cluster's answer afterwards.
    timeout: Duration,
    last_event_index: EventIndex,
    last_state_index: StateIndex,
    keep_alive_failing_since: Option<Instant>,
}

impl SessionData {
    fn fresh(client_id: ClientId, timeout_hint: Duration) -> Self {
        SessionData {
            client_id,
            session_id: None,
            timeout: timeout_hint,
            last_event_index: EventIndex::new(0),
            last_state_index: StateIndex::new(0),
            keep_alive_failing_since: None,
        }
    }
}

impl SessionCore {
    pub fn new(config: SessionConfig) -> Self {
        let selector = AddressSelector::new(config.bootstrap_members.clone());

        SessionCore {
            logger: config.logger,
            transport: config.transport,
            bootstrap_members: config.bootstrap_members,
            session_timeout_hint: config.session_timeout_hint,
            unregister_timeout: config.unregister_timeout,
            handle: config.handle,
            state_tx: config.state_tx,
            lifecycle: Lifecycle::Idle,
            selector,
            connection: None,
            pending_attempt: None,
            next_connection_id: 0,
            pipeline: RequestPipeline::new(),
            session: None,
            registry: EventRegistry::new(),
            keep_alive_timer: None,
        }
    }

    // ------- Open / close -------

    pub fn handle_open(&mut self, callback: Callback<(), OpenError>) {
        match &mut self.lifecycle {
            Lifecycle::Open => callback.send(Ok(())),
            Lifecycle::Opening { waiters, .. } => waiters.push(callback),
            // An open during close runs after the close finishes.
            Lifecycle::Closing { open_after, .. } => open_after.push(callback),
            Lifecycle::Idle | Lifecycle::Closed | Lifecycle::Expired => self.begin_open(vec![callback]),
        }
    }

    fn begin_open(&mut self, waiters: Vec<Callback<(), OpenError>>) {
        let client_id = ClientId::random();
        slog::info!(self.logger, "Opening session as client {:?}", client_id);

        self.session = Some(SessionData::fresh(client_id.clone(), self.session_timeout_hint));
        self.pipeline = RequestPipeline::new();
        self.registry = EventRegistry::new();
        // Reconnect from the seed list; any learned view died with the
        // previous session.
        self.selector = AddressSelector::new(self.bootstrap_members.clone());
        self.lifecycle = Lifecycle::Opening {
            waiters,
            close_after: Vec::new(),
        };
        self.publish_state();

        let timeout_hint = self.session_timeout_hint;
        self.pipeline.enqueue(
            move |_| {
                SessionRequest::Register(RegisterRequest {
                    client_id,
                    timeout: timeout_hint,
                })
            },
            RequestCompletion::Register,
        );
        self.ensure_connection();
    }

    pub fn handle_close(&mut self, callback: Callback<(), CloseError>) {
        match &mut self.lifecycle {
            Lifecycle::Idle | Lifecycle::Closed | Lifecycle::Expired => callback.send(Ok(())),
            Lifecycle::Closing { waiters, .. } => waiters.push(callback),
            // A close during open runs after the open finishes.
            Lifecycle::Opening { close_after, .. } => close_after.push(callback),
            Lifecycle::Open => self.begin_close(vec![callback]),
        }
    }

    fn begin_close(&mut self, waiters: Vec<Callback<(), CloseError>>) {
        slog::info!(self.logger, "Closing session");
        self.lifecycle = Lifecycle::Closing {
            waiters,
            open_after: Vec::new(),
        };
        self.publish_state();
        self.keep_alive_timer = None;

        let completed = self.pipeline.fail_all(FailureKind::Closed);
        self.finish_completions(completed);

        let session_id = self.session.as_ref().and_then(|s| s.session_id);
        let unregister_target = match (&self.connection, session_id) {
            (Some(established), Some(session_id)) => Some((established.connection.clone(), session_id)),
            _ => None,
        };
        match unregister_target {
            Some((conn, session_id)) => {
                connection::spawn_unregister(conn, session_id, self.unregister_timeout, self.handle.clone());
            }
            // Nothing to say goodbye to.
            None => self.finish_close(),
        }
    }

    pub fn handle_unregister_resolved(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Closing { .. }) {
            self.finish_close();
        }
    }

    fn finish_close(&mut self) {
        self.drop_connection();
        self.pending_attempt = None;

        let lifecycle = mem::replace(&mut self.lifecycle, Lifecycle::Closed);
        self.publish_state();

        if let Lifecycle::Closing { waiters, open_after } = lifecycle {
            self.registry.notify_close();
            slog::info!(self.logger, "Session closed");
            for waiter in waiters {
                waiter.send(Ok(()));
            }
            if !open_after.is_empty() {
                self.begin_open(open_after);
            }
        }
    }

    // ------- Submission -------

    pub fn handle_submit(&mut self, operation: Operation, callback: Callback<Bytes, SubmitError>) {
        if !matches!(self.lifecycle, Lifecycle::Open) {
            callback.send(Err(SubmitError::NotOpen));
            return;
        }

        let (session_id, state_index) = match self.session.as_ref() {
            Some(session) => match session.session_id {
                Some(session_id) => (session_id, session.last_state_index),
                None => {
                    callback.send(Err(SubmitError::NotOpen));
                    return;
                }
            },
            None => {
                callback.send(Err(SubmitError::NotOpen));
                return;
            }
        };

        let sequence = match operation {
            Operation::Command { payload, consistency } => self.pipeline.enqueue(
                move |sequence| {
                    SessionRequest::Command(CommandRequest {
                        session_id,
                        sequence,
                        consistency,
                        payload,
                    })
                },
                RequestCompletion::Submit(callback),
            ),
            Operation::Query { payload, consistency } => self.pipeline.enqueue(
                move |sequence| {
                    SessionRequest::Query(QueryRequest {
                        session_id,
                        sequence,
                        consistency,
                        index: state_index,
                        payload,
                    })
                },
                RequestCompletion::Submit(callback),
            ),
        };

        slog::debug!(self.logger, "Enqueued submission {:?}", sequence);
        self.ensure_connection();
    }

    // ------- Connection management -------

    /// Resolves "I need a connection" for everything sitting in the pipeline.
    /// Either dispatches on the current connection, piggybacks on the connect
    /// already in flight, or starts a fresh sweep.
    fn ensure_connection(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Idle | Lifecycle::Closed | Lifecycle::Expired) {
            return;
        }

        // A superseded membership view makes the live connection stale, even
        // if it happens to point at the new leader. Drop and reconnect with
        // the bias the new view carries.
        if self.selector.state() == SelectorState::Reset && self.connection.is_some() {
            slog::debug!(
                self.logger,
                "Membership view changed (leader {:?}); reconnecting",
                self.selector.leader()
            );
            self.drop_connection();
            self.begin_sweep(true);
            return;
        }

        if self.connection.is_some() {
            self.flush_dispatchable();
            return;
        }

        if self.pending_attempt.is_some() {
            // Piggyback: the in-flight connect serves everyone.
            return;
        }

        self.begin_sweep(false);
    }

    fn begin_sweep(&mut self, keep_view: bool) {
        if !keep_view && self.selector.state() != SelectorState::Reset {
            self.selector.reset();
        }
        self.connect_next_candidate();
    }

    fn connect_next_candidate(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Opening { .. } | Lifecycle::Open) {
            self.pending_attempt = None;
            return;
        }

        if !self.selector.has_next() {
            self.pending_attempt = None;
            self.on_sweep_exhausted();
            return;
        }

        let address = match self.selector.next() {
            Some(address) => address,
            None => {
                self.pending_attempt = None;
                return;
            }
        };

        let client_id = match self.session.as_ref() {
            Some(session) => session.client_id.clone(),
            // A sweep can only be driven by a session's requests.
            None => {
                self.pending_attempt = None;
                return;
            }
        };

        self.next_connection_id += 1;
        let id = ConnectionId::new(self.next_connection_id);
        self.pending_attempt = Some(id);

        slog::debug!(self.logger, "Connecting to {:?}", address);
        tokio::task::spawn(connection::run_connect_attempt(
            self.transport.clone(),
            address,
            id,
            client_id,
            self.handle.clone(),
        ));
    }

    pub fn handle_connect_attempt(&mut self, outcome: ConnectAttemptOutcome) {
        if self.pending_attempt != Some(outcome.id()) {
            // An abandoned sweep's attempt resolved late.
            if let ConnectAttemptOutcome::Connected { connection, .. } = outcome {
                tokio::task::spawn(connection.close());
            }
            return;
        }

        match outcome {
            ConnectAttemptOutcome::Connected {
                id,
                address,
                connection,
                leader,
                members,
            } => {
                self.pending_attempt = None;

                if !matches!(self.lifecycle, Lifecycle::Opening { .. } | Lifecycle::Open) {
                    tokio::task::spawn(connection.close());
                    return;
                }

                slog::debug!(self.logger, "Connected to {:?} (leader {:?})", address, leader);
                self.selector.reset_with(leader, members);
                self.connection = Some(EstablishedConnection {
                    id,
                    address,
                    connection,
                });
                self.flush_dispatchable();
            }
            ConnectAttemptOutcome::Unreachable { address, error, .. } => {
                slog::debug!(self.logger, "Failed to connect to {:?} - {}", address, error);
                self.connect_next_candidate();
            }
            ConnectAttemptOutcome::HandshakeRejected { address, .. } => {
                slog::debug!(self.logger, "Server {:?} rejected the handshake", address);
                self.connect_next_candidate();
            }
        }
    }

    /// One full pass over the candidates found no usable server. Session
    /// bookkeeping requests and queries surface the failure; commands stay
    /// queued and ride the sweep the next keep-alive tick starts, until the
    /// session expires. Failing a command here would double-apply risk onto
    /// the caller for an operation the cluster never acknowledged refusing.
    fn on_sweep_exhausted(&mut self) {
        slog::debug!(
            self.logger,
            "No reachable server among {} candidate(s) this sweep",
            self.selector.servers().len()
        );

        let mut queued_commands = 0;
        for sequence in self.pipeline.awaiting_sequences() {
            match self.pipeline.request_kind(sequence) {
                Some(RequestKind::Command) => queued_commands += 1,
                _ => self.resolve_and_effect(sequence, RequestResolution::Failed(FailureKind::ConnectFailed)),
            }
        }

        if queued_commands > 0 {
            slog::debug!(
                self.logger,
                "{} command(s) held for the next sweep",
                queued_commands
            );
        }
    }

    pub fn handle_connection_lost(&mut self, connection: ConnectionId) {
        // Only null out the connection the callback actually belongs to; a
        // callback from a connection we already replaced must not touch the
        // replacement.
        let lost_current = matches!(&self.connection, Some(established) if established.id == connection);
        if lost_current {
            slog::debug!(self.logger, "Connection {:?} lost", connection);
            self.connection = None;
            // In-flight requests on it fail on their own and retry.
        }
    }

    fn drop_connection(&mut self) {
        if let Some(established) = self.connection.take() {
            tokio::task::spawn(established.connection.close());
        }
    }

    fn flush_dispatchable(&mut self) {
        let (connection_id, connection) = match &self.connection {
            Some(established) => (established.id, established.connection.clone()),
            None => return,
        };

        // Ascending sequence order; the transport contract transmits in the
        // order we create the futures.
        for sequence in self.pipeline.awaiting_sequences() {
            if let Some(request) = self.pipeline.begin_dispatch(sequence, connection_id) {
                slog::trace!(self.logger, "Dispatching {:?}", request);
                let response = connection.send_and_receive(request);
                connection::spawn_request_dispatch(response, connection_id, sequence, self.handle.clone());
            }
        }
    }

    // ------- Request outcomes -------

    pub fn handle_request_resolved(&mut self, outcome: RequestOutcome) {
        let RequestOutcome {
            sequence,
            connection,
            result,
        } = outcome;

        if !self.pipeline.accepts_outcome(sequence, connection) {
            slog::trace!(self.logger, "Discarding stale outcome for {:?}", sequence);
            return;
        }

        match result {
            Err(error) => {
                slog::debug!(self.logger, "Request {:?} failed in transport: {}", sequence, error);
                self.resend_after_failure(sequence, connection);
            }
            Ok(response) => {
                let error = response_error(&response);
                if error.map(|code| code.is_retriable()).unwrap_or(false) {
                    slog::debug!(
                        self.logger,
                        "Request {:?} rejected with retriable {:?}",
                        sequence,
                        error
                    );
                    self.resend_after_failure(sequence, connection);
                } else if error == Some(RaftErrorCode::UnknownSession) {
                    slog::warn!(self.logger, "Cluster no longer knows this session");
                    self.resolve_and_effect(sequence, RequestResolution::Failed(FailureKind::SessionExpired));
                    self.expire_session();
                } else {
                    if let SessionResponse::Operation(op) = &response {
                        if op.status == ResponseStatus::Ok {
                            if let Some(session) = self.session.as_mut() {
                                session.last_state_index = cmp::max(session.last_state_index, op.index);
                            }
                        }
                    }
                    self.resolve_and_effect(sequence, RequestResolution::Response(response));
                }
            }
        }
    }

    /// A dispatched request came back without a usable answer. If it rode the
    /// connection we still consider current, that connection is bad: close it
    /// and move to the next candidate in the sweep. Otherwise a reconnect
    /// already happened; just re-enter the normal connection path.
    fn resend_after_failure(&mut self, sequence: Sequence, failed_connection: ConnectionId) {
        self.pipeline.mark_awaiting(sequence);

        let still_current = self
            .connection
            .as_ref()
            .map(|established| established.id == failed_connection)
            .unwrap_or(false);

        if still_current {
            self.drop_connection();
            if self.pending_attempt.is_none() {
                self.connect_next_candidate();
            }
        } else {
            self.ensure_connection();
        }
    }

    /// Resolves one request, drains the ready completion prefix, and then
    /// applies the session-internal effect of register/keep-alive results.
    /// Internal effects run here, at resolution time, rather than waiting in
    /// the ordered prefix: expiry detection must not sit blocked behind a
    /// command that is itself waiting for the cluster to come back.
    fn resolve_and_effect(&mut self, sequence: Sequence, resolution: RequestResolution) {
        let kind = self.pipeline.request_kind(sequence);
        let completed = self.pipeline.resolve(sequence, resolution.clone());
        self.finish_completions(completed);

        match kind {
            Some(RequestKind::Register) => self.on_register_resolved(resolution),
            Some(RequestKind::KeepAlive) => self.on_keep_alive_resolved(resolution),
            _ => {}
        }
    }

    fn finish_completions(&mut self, completed: Vec<CompletedRequest>) {
        for request in completed {
            // Register and keep-alive take effect when they resolve; only
            // caller-facing submissions complete through the ordered prefix.
            if let RequestCompletion::Submit(callback) = request.completion {
                callback.send(submit_result(request.resolution));
            }
        }
    }

    // ------- Registration -------

    fn on_register_resolved(&mut self, resolution: RequestResolution) {
        let (waiters, close_after) = match mem::replace(&mut self.lifecycle, Lifecycle::Idle) {
            Lifecycle::Opening { waiters, close_after } => (waiters, close_after),
            other => {
                // Close raced ahead (e.g. expiration); leave state untouched.
                self.lifecycle = other;
                return;
            }
        };

        match resolution {
            RequestResolution::Response(SessionResponse::Register(response))
                if response.status == ResponseStatus::Ok =>
            {
                let keep_alive_interval = response.timeout / 2;
                if let Some(session) = self.session.as_mut() {
                    session.session_id = Some(response.session_id);
                    session.timeout = response.timeout;
                }
                self.selector.reset_with(response.leader, response.members);

                self.lifecycle = Lifecycle::Open;
                self.publish_state();
                self.keep_alive_timer = Some(KeepAliveTimerHandle::spawn_background_task(
                    keep_alive_interval,
                    self.handle.clone(),
                ));

                slog::info!(
                    self.logger,
                    "Session {:?} open; keep-alive every {:?}",
                    response.session_id,
                    keep_alive_interval
                );
                self.registry.notify_open();
                for waiter in waiters {
                    waiter.send(Ok(()));
                }
                if !close_after.is_empty() {
                    self.begin_close(close_after);
                }
            }
            other => {
                let error = match other {
                    RequestResolution::Failed(FailureKind::ConnectFailed) => OpenError::ConnectFailed,
                    RequestResolution::Failed(FailureKind::Closed) => OpenError::Closed,
                    _ => OpenError::Rejected,
                };
                slog::warn!(self.logger, "Session registration failed: {}", error);

                self.lifecycle = Lifecycle::Closed;
                self.publish_state();
                self.drop_connection();
                self.pending_attempt = None;
                for waiter in waiters {
                    waiter.send(Err(error.clone()));
                }
                for closer in close_after {
                    closer.send(Ok(()));
                }
            }
        }
    }

    // ------- Keep-alive -------

    pub fn handle_keep_alive_tick(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Open) {
            return;
        }
        if self.pipeline.has_unresolved_keep_alive() {
            // A slow sweep must not pile keep-alives up behind itself.
            slog::trace!(self.logger, "Keep-alive still in flight; skipping tick");
            return;
        }

        let (session_id, event_index) = match self.session.as_ref() {
            Some(session) => match session.session_id {
                Some(session_id) => (session_id, session.last_event_index),
                None => return,
            },
            None => return,
        };
        let command_sequence = self.pipeline.highest_completed();

        self.pipeline.enqueue(
            move |_| {
                SessionRequest::KeepAlive(KeepAliveRequest {
                    session_id,
                    command_sequence,
                    event_index,
                })
            },
            RequestCompletion::KeepAlive,
        );
        self.ensure_connection();
    }

    fn on_keep_alive_resolved(&mut self, resolution: RequestResolution) {
        match resolution {
            RequestResolution::Response(SessionResponse::KeepAlive(response))
                if response.status == ResponseStatus::Ok =>
            {
                if let Some(session) = self.session.as_mut() {
                    session.keep_alive_failing_since = None;
                }
                self.selector.reset_with(response.leader, response.members);
                if let Some(timer) = &self.keep_alive_timer {
                    timer.reset();
                }
            }
            RequestResolution::Failed(FailureKind::Closed)
            | RequestResolution::Failed(FailureKind::SessionExpired) => {
                // Session already tearing down.
            }
            _ => {
                let now = Instant::now();
                let (failing_for, timeout) = match self.session.as_mut() {
                    Some(session) => {
                        let since = *session.keep_alive_failing_since.get_or_insert(now);
                        (now.duration_since(since), session.timeout)
                    }
                    None => return,
                };

                slog::warn!(self.logger, "Keep-alive failed; lease at risk for {:?}", failing_for);
                if failing_for > timeout {
                    self.expire_session();
                }
            }
        }
    }

    fn expire_session(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Open) {
            return;
        }

        slog::warn!(self.logger, "Session expired");
        self.lifecycle = Lifecycle::Expired;
        self.publish_state();
        self.keep_alive_timer = None;

        let completed = self.pipeline.fail_all(FailureKind::SessionExpired);
        self.finish_completions(completed);

        self.registry.notify_close();
        self.drop_connection();
        self.pending_attempt = None;
    }

    // ------- Session events -------

    pub fn handle_inbound_event(&mut self, event: PublishEvent) {
        if !matches!(self.lifecycle, Lifecycle::Open) {
            return;
        }

        let deliver = match self.session.as_mut() {
            Some(session) => {
                if session.session_id != Some(event.session_id) {
                    slog::trace!(self.logger, "Event for foreign session {:?}", event.session_id);
                    false
                } else if event.event_index <= session.last_event_index {
                    slog::trace!(self.logger, "Duplicate event {:?}", event.event_index);
                    false
                } else if event.previous_index > session.last_event_index {
                    // A gap: an earlier event is missing. The next keep-alive
                    // acknowledges our actual position and the cluster
                    // resends everything past it, this event included.
                    slog::debug!(
                        self.logger,
                        "Event gap: have {:?}, got {:?} (follows {:?})",
                        session.last_event_index,
                        event.event_index,
                        event.previous_index
                    );
                    false
                } else {
                    session.last_event_index = event.event_index;
                    true
                }
            }
            None => false,
        };

        if deliver {
            let delivered = self.registry.dispatch(&event.name, &event.payload);
            slog::trace!(
                self.logger,
                "Delivered event {:?} ({}) to {} listeners",
                event.event_index,
                event.name,
                delivered
            );
        }
    }

    pub fn handle_subscribe(&mut self, name: String, listener: EventListenerFn) -> SubscriptionId {
        self.registry.subscribe(name, listener)
    }

    pub fn handle_unsubscribe(&mut self, name: &str, subscription: SubscriptionId) {
        self.registry.unsubscribe(name, subscription);
    }

    pub fn handle_add_open_listener(&mut self, listener: LifecycleListenerFn) {
        self.registry.add_open_listener(listener);
    }

    pub fn handle_add_close_listener(&mut self, listener: LifecycleListenerFn) {
        self.registry.add_close_listener(listener);
    }

    // ------- Observers -------

    fn publish_state(&self) {
        let snapshot = match &self.lifecycle {
            Lifecycle::Idle => ClientState::Idle,
            Lifecycle::Opening { .. } => ClientState::Opening,
            Lifecycle::Open => match self.session.as_ref().and_then(|s| s.session_id) {
                Some(session_id) => ClientState::Open(session_id),
                None => ClientState::Opening,
            },
            Lifecycle::Closing { .. } => ClientState::Closing,
            Lifecycle::Closed => ClientState::Closed,
            Lifecycle::Expired => ClientState::Expired,
        };
        let _ = self.state_tx.send(snapshot);
    }
}

fn response_error(response: &SessionResponse) -> Option<RaftErrorCode> {
    let (status, error) = match response {
        SessionResponse::Connect(r) => (r.status, r.error),
        SessionResponse::Register(r) => (r.status, r.error),
        SessionResponse::KeepAlive(r) => (r.status, r.error),
        SessionResponse::Unregister(r) => (r.status, r.error),
        SessionResponse::Operation(r) => (r.status, r.error),
    };

    match status {
        ResponseStatus::Ok => None,
        ResponseStatus::Error => error.or(Some(RaftErrorCode::InternalError)),
    }
}

fn submit_result(resolution: RequestResolution) -> Result<Bytes, SubmitError> {
    match resolution {
        RequestResolution::Response(SessionResponse::Operation(response)) => match response.status {
            ResponseStatus::Ok => Ok(response.result),
            ResponseStatus::Error => Err(match response.error {
                Some(RaftErrorCode::CommandError) => SubmitError::Command,
                Some(RaftErrorCode::QueryError) => SubmitError::Query,
                Some(RaftErrorCode::ApplicationError) => SubmitError::Application,
                _ => SubmitError::Internal,
            }),
        },
        // A response of the wrong kind is a broken server, not a retry.
        RequestResolution::Response(_) => Err(SubmitError::Internal),
        RequestResolution::Failed(FailureKind::ConnectFailed) => Err(SubmitError::ConnectFailed),
        RequestResolution::Failed(FailureKind::SessionExpired) => Err(SubmitError::SessionExpired),
        RequestResolution::Failed(FailureKind::Closed) => Err(SubmitError::Closed),
    }
}
