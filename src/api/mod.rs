//! This mod holds the library's client-facing API.
mod builder;
mod client;
mod errors;
mod events;
mod options;
mod types;

pub use builder::ClientBuilder;
pub use client::RaftClient;
pub use errors::ClientBuildError;
pub use errors::CloseError;
pub use errors::OpenError;
pub use errors::SubmitError;
pub use events::EventSubscription;
pub use events::RaftSession;
pub use options::ClientOptions;
pub use types::Operation;
