mod channel;

pub use channel::ChannelListener;
pub use channel::ChannelNetwork;
pub use channel::ServedRequest;
pub use channel::ServerConnection;

use crate::cluster::Address;
use crate::protocol::{PublishEvent, SessionRequest, SessionResponse};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::Duration;

pub type PublishHandler = Arc<dyn Fn(PublishEvent) + Send + Sync>;
pub type LifecycleHandler = Arc<dyn Fn() + Send + Sync>;
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<SessionResponse, TransportError>> + Send>>;
pub type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Transport produces connections to individual servers. Implementations own
/// framing, encoding, and socket lifecycle; the client core only sees typed
/// messages moving through `Connection`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn connect(&self, address: Address) -> Result<Arc<dyn Connection>, TransportError>;
}

/// Connection is one live transport session with one server.
///
/// Ordering contract: `send` and `send_and_receive` accept the request for
/// transmission before returning, in call order. Callers that must not
/// reorder their requests can therefore dispatch from a single thread and
/// await the returned futures concurrently.
///
/// Handlers installed through `on_publish` / `on_close` / `on_exception` may
/// be invoked from the transport's own tasks; implementations must tolerate
/// handlers being (re)installed while traffic is in flight.
pub trait Connection: Send + Sync + 'static {
    /// Fire-and-forget dispatch.
    fn send(&self, request: SessionRequest) -> Result<(), TransportError>;

    /// Request/response dispatch. The future resolves with the response or a
    /// transport-level failure.
    fn send_and_receive(&self, request: SessionRequest) -> ResponseFuture;

    fn on_publish(&self, handler: PublishHandler);

    fn on_close(&self, handler: LifecycleHandler);

    fn on_exception(&self, handler: LifecycleHandler);

    fn close(&self) -> CloseFuture;
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection refused by {0}")]
    ConnectionRefused(Address),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection channel closed")]
    ChannelClosed,

    #[error("transport failure: {0}")]
    Exception(String),
}
