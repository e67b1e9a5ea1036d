use crate::actor::WeakSessionHandle;
use crate::cluster::Address;
use crate::protocol::{ClientId, ConnectRequest, ResponseStatus, Sequence, SessionId, SessionRequest, SessionResponse, UnregisterRequest};
use crate::session::pipeline::RequestOutcome;
use crate::transport::{Connection, ResponseFuture, Transport, TransportError};
use std::fmt;
use std::sync::Arc;
use tokio::time::Duration;

/// ConnectionId tags each connection attempt. Transport callbacks and
/// dispatch outcomes carry the id instead of a connection reference, and the
/// session compares it against its current connection before acting; stale
/// callbacks from a superseded connection fall on the floor.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub(crate) struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        ConnectionId(id)
    }
}

/// The session's current connection, if any. At most one exists per client.
pub(crate) struct EstablishedConnection {
    pub id: ConnectionId,
    pub address: Address,
    pub connection: Arc<dyn Connection>,
}

impl fmt::Debug for EstablishedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstablishedConnection")
            .field("id", &self.id)
            .field("address", &self.address)
            .finish()
    }
}

pub(crate) enum ConnectAttemptOutcome {
    /// Transport connected and the server accepted the handshake; its view
    /// of the cluster rides along.
    Connected {
        id: ConnectionId,
        address: Address,
        connection: Arc<dyn Connection>,
        leader: Option<Address>,
        members: Vec<Address>,
    },
    /// Transport could not reach the server.
    Unreachable {
        id: ConnectionId,
        address: Address,
        error: TransportError,
    },
    /// Transport connected but the handshake failed; the connection has
    /// already been closed.
    HandshakeRejected { id: ConnectionId, address: Address },
}

impl ConnectAttemptOutcome {
    pub fn id(&self) -> ConnectionId {
        match self {
            ConnectAttemptOutcome::Connected { id, .. } => *id,
            ConnectAttemptOutcome::Unreachable { id, .. } => *id,
            ConnectAttemptOutcome::HandshakeRejected { id, .. } => *id,
        }
    }
}

impl fmt::Debug for ConnectAttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectAttemptOutcome::Connected { id, address, .. } => f
                .debug_struct("Connected")
                .field("id", id)
                .field("address", address)
                .finish(),
            ConnectAttemptOutcome::Unreachable { id, address, error } => f
                .debug_struct("Unreachable")
                .field("id", id)
                .field("address", address)
                .field("error", error)
                .finish(),
            ConnectAttemptOutcome::HandshakeRejected { id, address } => f
                .debug_struct("HandshakeRejected")
                .field("id", id)
                .field("address", address)
                .finish(),
        }
    }
}

/// One connection attempt: connect, wire up callbacks, handshake, report.
/// Runs as its own task; the session decides what to do with the outcome.
pub(crate) async fn run_connect_attempt(
    transport: Arc<dyn Transport>,
    address: Address,
    id: ConnectionId,
    client_id: ClientId,
    handle: WeakSessionHandle,
) {
    let connection = match transport.connect(address.clone()).await {
        Ok(connection) => connection,
        Err(error) => {
            handle.notify_connect_attempt(ConnectAttemptOutcome::Unreachable { id, address, error });
            return;
        }
    };

    // Callbacks are installed before the handshake so nothing published by
    // the server is lost between handshake and first use.
    install_session_handlers(&connection, id, &handle);

    let handshake = SessionRequest::Connect(ConnectRequest { client_id });
    match connection.send_and_receive(handshake).await {
        Ok(SessionResponse::Connect(response)) if response.status == ResponseStatus::Ok => {
            handle.notify_connect_attempt(ConnectAttemptOutcome::Connected {
                id,
                address,
                connection,
                leader: response.leader,
                members: response.members,
            });
        }
        Ok(_) | Err(_) => {
            connection.close().await;
            handle.notify_connect_attempt(ConnectAttemptOutcome::HandshakeRejected { id, address });
        }
    }
}

fn install_session_handlers(connection: &Arc<dyn Connection>, id: ConnectionId, handle: &WeakSessionHandle) {
    let publish_handle = handle.clone();
    connection.on_publish(Arc::new(move |event| {
        publish_handle.notify_inbound_event(event);
    }));

    let close_handle = handle.clone();
    connection.on_close(Arc::new(move || {
        close_handle.notify_connection_lost(id);
    }));

    let exception_handle = handle.clone();
    connection.on_exception(Arc::new(move || {
        exception_handle.notify_connection_lost(id);
    }));
}

/// Awaits one dispatched request and reports its outcome. The request itself
/// was already accepted for transmission when the future was created.
pub(crate) fn spawn_request_dispatch(
    response: ResponseFuture,
    connection: ConnectionId,
    sequence: Sequence,
    handle: WeakSessionHandle,
) {
    tokio::task::spawn(async move {
        let result = response.await;
        handle.notify_request_resolved(RequestOutcome {
            sequence,
            connection,
            result,
        });
    });
}

/// Best-effort session teardown: one attempt, bounded wait, no failover.
pub(crate) fn spawn_unregister(
    connection: Arc<dyn Connection>,
    session_id: SessionId,
    unregister_timeout: Duration,
    handle: WeakSessionHandle,
) {
    tokio::task::spawn(async move {
        let request = SessionRequest::Unregister(UnregisterRequest { session_id });
        let _ = tokio::time::timeout(unregister_timeout, connection.send_and_receive(request)).await;
        handle.notify_unregister_resolved();
    });
}
