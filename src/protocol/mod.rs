mod error_code;
mod ids;
mod messages;

pub use error_code::RaftErrorCode;
pub use error_code::ResponseStatus;
pub use ids::ClientId;
pub use ids::EventIndex;
pub use ids::Sequence;
pub use ids::SessionId;
pub use ids::StateIndex;
pub use messages::CommandConsistency;
pub use messages::CommandRequest;
pub use messages::ConnectRequest;
pub use messages::ConnectResponse;
pub use messages::KeepAliveRequest;
pub use messages::KeepAliveResponse;
pub use messages::OperationResponse;
pub use messages::PublishEvent;
pub use messages::QueryConsistency;
pub use messages::QueryRequest;
pub use messages::RegisterRequest;
pub use messages::RegisterResponse;
pub use messages::SessionRequest;
pub use messages::SessionResponse;
pub use messages::UnregisterRequest;
pub use messages::UnregisterResponse;
