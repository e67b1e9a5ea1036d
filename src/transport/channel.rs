use crate::cluster::Address;
use crate::protocol::{PublishEvent, SessionRequest, SessionResponse};
use crate::transport::{
    CloseFuture, Connection, LifecycleHandler, PublishHandler, ResponseFuture, Transport, TransportError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// ChannelNetwork is an in-process transport: servers `listen()` on an
/// address, clients connect through the `Transport` impl, and messages move
/// over tokio channels. Responses ride a per-request oneshot, so a server
/// that sits on a request produces a transport-level timeout on the client,
/// the same way a black-holed socket would.
///
/// This is the transport the crate's own tests script fake servers with; it
/// is also usable for embedding a cluster and client in one process.
pub struct ChannelNetwork {
    request_timeout: Duration,
    listeners: Mutex<HashMap<Address, mpsc::UnboundedSender<ServerConnection>>>,
}

impl ChannelNetwork {
    pub fn new() -> Arc<Self> {
        Self::with_request_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_request_timeout(request_timeout: Duration) -> Arc<Self> {
        Arc::new(ChannelNetwork {
            request_timeout,
            listeners: Mutex::new(HashMap::new()),
        })
    }

    /// Starts accepting connections on `address`, replacing any previous
    /// listener there. Dropping the returned listener refuses new connects.
    pub fn listen(&self, address: Address) -> ChannelListener {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        self.lock_listeners().insert(address, accept_tx);

        ChannelListener { incoming: accept_rx }
    }

    /// Stops accepting connections on `address`. Connections already
    /// established stay up until either side closes them.
    pub fn stop_listening(&self, address: &Address) {
        self.lock_listeners().remove(address);
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, HashMap<Address, mpsc::UnboundedSender<ServerConnection>>> {
        self.listeners.lock().expect("ChannelNetwork listeners mutex poison")
    }
}

#[async_trait::async_trait]
impl Transport for ChannelNetwork {
    async fn connect(&self, address: Address) -> Result<Arc<dyn Connection>, TransportError> {
        let accept_tx = self
            .lock_listeners()
            .get(&address)
            .cloned()
            .ok_or_else(|| TransportError::ConnectionRefused(address.clone()))?;

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (publish_tx, publish_rx) = mpsc::unbounded_channel();

        let connection = Arc::new(ChannelConnection {
            request_timeout: self.request_timeout,
            requests: Mutex::new(Some(request_tx)),
            handlers: Mutex::new(Handlers::default()),
        });

        let server_side = ServerConnection {
            requests: request_rx,
            publisher: publish_tx,
        };

        // The listener may have been dropped between lookup and send.
        accept_tx
            .send(server_side)
            .map_err(|_| TransportError::ConnectionRefused(address))?;

        tokio::task::spawn(ChannelConnection::pump_inbound(
            Arc::downgrade(&connection),
            publish_rx,
        ));

        Ok(connection)
    }
}

#[derive(Default)]
struct Handlers {
    publish: Option<PublishHandler>,
    close: Option<LifecycleHandler>,
    exception: Option<LifecycleHandler>,
}

struct ChannelConnection {
    request_timeout: Duration,
    // Taken on close so the server side observes the disconnect.
    requests: Mutex<Option<mpsc::UnboundedSender<ServedRequest>>>,
    handlers: Mutex<Handlers>,
}

impl ChannelConnection {
    fn request_sender(&self) -> Result<mpsc::UnboundedSender<ServedRequest>, TransportError> {
        self.lock_requests().clone().ok_or(TransportError::ChannelClosed)
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Option<mpsc::UnboundedSender<ServedRequest>>> {
        self.requests.lock().expect("ChannelConnection requests mutex poison")
    }

    fn lock_handlers(&self) -> std::sync::MutexGuard<'_, Handlers> {
        self.handlers.lock().expect("ChannelConnection handlers mutex poison")
    }

    async fn pump_inbound(connection: Weak<ChannelConnection>, mut publish_rx: mpsc::UnboundedReceiver<PublishEvent>) {
        while let Some(event) = publish_rx.recv().await {
            let handler = match connection.upgrade() {
                Some(conn) => conn.lock_handlers().publish.clone(),
                // Client side is gone; nothing left to deliver to.
                None => return,
            };

            if let Some(handler) = handler {
                handler(event);
            }
        }

        // Server dropped its end of the connection.
        if let Some(conn) = connection.upgrade() {
            conn.lock_requests().take();
            let close = conn.lock_handlers().close.clone();
            if let Some(close) = close {
                close();
            }
        }
    }
}

impl Connection for ChannelConnection {
    fn send(&self, request: SessionRequest) -> Result<(), TransportError> {
        let sender = self.request_sender()?;
        sender
            .send(ServedRequest {
                request,
                responder: None,
            })
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn send_and_receive(&self, request: SessionRequest) -> ResponseFuture {
        let (response_tx, response_rx) = oneshot::channel();

        // Enqueue before returning; this is what upholds the trait's
        // call-order transmission contract.
        let enqueued = self.request_sender().and_then(|sender| {
            sender
                .send(ServedRequest {
                    request,
                    responder: Some(response_tx),
                })
                .map_err(|_| TransportError::ChannelClosed)
        });

        let request_timeout = self.request_timeout;
        Box::pin(async move {
            enqueued?;
            match tokio::time::timeout(request_timeout, response_rx).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(_)) => Err(TransportError::ChannelClosed),
                Err(_) => Err(TransportError::Timeout(request_timeout)),
            }
        })
    }

    fn on_publish(&self, handler: PublishHandler) {
        self.lock_handlers().publish = Some(handler);
    }

    fn on_close(&self, handler: LifecycleHandler) {
        self.lock_handlers().close = Some(handler);
    }

    fn on_exception(&self, handler: LifecycleHandler) {
        self.lock_handlers().exception = Some(handler);
    }

    fn close(&self) -> CloseFuture {
        self.lock_requests().take();
        // A connection closed locally must not call back into its owner.
        let mut handlers = self.lock_handlers();
        handlers.publish = None;
        handlers.close = None;
        handlers.exception = None;

        Box::pin(async {})
    }
}

/// Server half of the accept loop. Tests drive this directly.
pub struct ChannelListener {
    incoming: mpsc::UnboundedReceiver<ServerConnection>,
}

impl ChannelListener {
    /// Next inbound connection, or `None` once the network entry is gone and
    /// all pending connects have drained.
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.incoming.recv().await
    }
}

/// One accepted connection, seen from the server side. Dropping it closes the
/// connection under the client (its requests fail and `on_close` fires).
pub struct ServerConnection {
    requests: mpsc::UnboundedReceiver<ServedRequest>,
    publisher: mpsc::UnboundedSender<PublishEvent>,
}

impl ServerConnection {
    /// Next request from the client, or `None` once the client closed.
    pub async fn next_request(&mut self) -> Option<ServedRequest> {
        self.requests.recv().await
    }

    /// Pushes a session event to the client. Returns false if the client is
    /// no longer connected.
    pub fn publish(&self, event: PublishEvent) -> bool {
        self.publisher.send(event).is_ok()
    }
}

/// A request captured by a `ServerConnection`, paired with its response slot.
/// Dropping it without responding fails the client's request; holding it
/// without responding times the client out.
pub struct ServedRequest {
    request: SessionRequest,
    responder: Option<oneshot::Sender<SessionResponse>>,
}

impl ServedRequest {
    pub fn request(&self) -> &SessionRequest {
        &self.request
    }

    pub fn respond(mut self, response: SessionResponse) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientId, ConnectRequest, ConnectResponse, ResponseStatus};

    fn addr() -> Address {
        Address::new("127.0.0.1", 7000)
    }

    fn connect_request() -> SessionRequest {
        SessionRequest::Connect(ConnectRequest {
            client_id: ClientId::new("test-client"),
        })
    }

    fn ok_connect_response() -> SessionResponse {
        SessionResponse::Connect(ConnectResponse {
            status: ResponseStatus::Ok,
            error: None,
            leader: None,
            members: vec![addr()],
        })
    }

    #[tokio::test]
    async fn connect_without_listener_is_refused() {
        let network = ChannelNetwork::new();

        let result = network.connect(addr()).await;

        assert!(matches!(result, Err(TransportError::ConnectionRefused(_))));
    }

    #[tokio::test]
    async fn request_and_response_round_trip() {
        // -- setup --
        let network = ChannelNetwork::new();
        let mut listener = network.listen(addr());

        // -- execute & verify --
        let connection = network.connect(addr()).await.unwrap();
        let mut served = listener.accept().await.unwrap();

        let client = tokio::spawn(async move { connection.send_and_receive(connect_request()).await });

        let request = served.next_request().await.unwrap();
        assert!(matches!(request.request(), SessionRequest::Connect(_)));
        request.respond(ok_connect_response());

        let response = client.await.unwrap().unwrap();
        assert!(matches!(response, SessionResponse::Connect(_)));
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        // -- setup --
        let network = ChannelNetwork::with_request_timeout(Duration::from_millis(50));
        let mut listener = network.listen(addr());
        let connection = network.connect(addr()).await.unwrap();
        let mut served = listener.accept().await.unwrap();

        // -- execute & verify --
        let client = tokio::spawn(async move { connection.send_and_receive(connect_request()).await });

        // Hold the request without responding; the client must time out.
        let held = served.next_request().await.unwrap();
        let result = client.await.unwrap();
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        drop(held);
    }

    #[tokio::test]
    async fn server_drop_fails_requests_and_fires_on_close() {
        // -- setup --
        let network = ChannelNetwork::new();
        let mut listener = network.listen(addr());
        let connection = network.connect(addr()).await.unwrap();
        let served = listener.accept().await.unwrap();

        let (closed_tx, closed_rx) = oneshot::channel();
        let closed_tx = Mutex::new(Some(closed_tx));
        connection.on_close(Arc::new(move || {
            if let Some(tx) = closed_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
        }));

        // -- execute & verify --
        drop(served);
        closed_rx.await.expect("close handler should fire");

        let result = connection.send_and_receive(connect_request()).await;
        assert!(matches!(result, Err(TransportError::ChannelClosed)));
    }

    #[tokio::test]
    async fn published_events_reach_the_handler() {
        // -- setup --
        let network = ChannelNetwork::new();
        let mut listener = network.listen(addr());
        let connection = network.connect(addr()).await.unwrap();
        let served = listener.accept().await.unwrap();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        connection.on_publish(Arc::new(move |event| {
            let _ = event_tx.send(event);
        }));

        // -- execute & verify --
        use crate::protocol::{EventIndex, SessionId};
        use bytes::Bytes;

        assert!(served.publish(PublishEvent {
            session_id: SessionId::new(1),
            event_index: EventIndex::new(10),
            previous_index: EventIndex::new(9),
            name: "change".to_string(),
            payload: Bytes::from_static(b"v1"),
        }));

        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.event_index, EventIndex::new(10));
        assert_eq!(event.name, "change");
    }
}
