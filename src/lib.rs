mod actor;
mod api;
mod cluster;
mod protocol;
mod session;
mod transport;

pub use api::ClientBuildError;
pub use api::ClientBuilder;
pub use api::ClientOptions;
pub use api::CloseError;
pub use api::EventSubscription;
pub use api::OpenError;
pub use api::Operation;
pub use api::RaftClient;
pub use api::RaftSession;
pub use api::SubmitError;

pub use cluster::Address;

pub use protocol::ClientId;
pub use protocol::CommandConsistency;
pub use protocol::CommandRequest;
pub use protocol::ConnectRequest;
pub use protocol::ConnectResponse;
pub use protocol::EventIndex;
pub use protocol::KeepAliveRequest;
pub use protocol::KeepAliveResponse;
pub use protocol::OperationResponse;
pub use protocol::PublishEvent;
pub use protocol::QueryConsistency;
pub use protocol::QueryRequest;
pub use protocol::RaftErrorCode;
pub use protocol::RegisterRequest;
pub use protocol::RegisterResponse;
pub use protocol::ResponseStatus;
pub use protocol::Sequence;
pub use protocol::SessionId;
pub use protocol::SessionRequest;
pub use protocol::SessionResponse;
pub use protocol::StateIndex;
pub use protocol::UnregisterRequest;
pub use protocol::UnregisterResponse;

pub use session::events::SubscriptionId;
pub use session::ClientState;

pub use transport::ChannelListener;
pub use transport::ChannelNetwork;
pub use transport::CloseFuture;
pub use transport::Connection;
pub use transport::LifecycleHandler;
pub use transport::PublishHandler;
pub use transport::ResponseFuture;
pub use transport::ServedRequest;
pub use transport::ServerConnection;
pub use transport::Transport;
pub use transport::TransportError;

// Keep the crate root to `mod` and `pub use` statements only; modules own
// their organization and export through here.
