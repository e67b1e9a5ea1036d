use crate::actor::{SessionActor, SessionHandle};
use crate::api::client::RaftClient;
use crate::api::options::{ClientOptions, ClientOptionsValidated};
use crate::api::ClientBuildError;
use crate::cluster::Address;
use crate::session::{ClientState, SessionConfig, SessionCore};
use crate::transport::Transport;
use std::convert::TryFrom;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

/// Builds a `RaftClient` from a bootstrap member list and a transport.
///
/// The member list does not have to be the whole cluster; one reachable
/// member that can talk to the leader is enough, and the client learns the
/// rest when its session registers.
pub struct ClientBuilder {
    members: Vec<Address>,
    transport: Option<Arc<dyn Transport>>,
    logger: Option<slog::Logger>,
    options: ClientOptions,
}

impl ClientBuilder {
    pub fn new(members: impl IntoIterator<Item = Address>) -> Self {
        ClientBuilder {
            members: members.into_iter().collect(),
            transport: None,
            logger: None,
            options: ClientOptions::default(),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_logger(mut self, logger: slog::Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_session_timeout_hint(mut self, timeout: Duration) -> Self {
        self.options.session_timeout_hint = Some(timeout);
        self
    }

    pub fn with_unregister_timeout(mut self, timeout: Duration) -> Self {
        self.options.unregister_timeout = Some(timeout);
        self
    }

    /// Spawns the session event loop and returns the client handle. Must be
    /// called from within a tokio runtime.
    pub fn build(self) -> Result<RaftClient, ClientBuildError> {
        let transport = self.transport.ok_or(ClientBuildError::TransportNotConfigured)?;
        if self.members.is_empty() {
            return Err(ClientBuildError::NoMembers);
        }

        let options = ClientOptionsValidated::try_from(self.options)
            .map_err(|e| ClientBuildError::IllegalOptions(e.to_string()))?;

        let logger = self
            .logger
            .unwrap_or_else(|| slog::Logger::root(slog::Discard, slog::o!()));

        let (handle, event_queue_rx) = SessionHandle::new();
        let (state_tx, state_rx) = watch::channel(ClientState::Idle);

        let core = SessionCore::new(SessionConfig {
            logger: logger.clone(),
            transport,
            bootstrap_members: self.members,
            session_timeout_hint: options.session_timeout_hint,
            unregister_timeout: options.unregister_timeout,
            handle: handle.weak(),
            state_tx,
        });

        let actor = SessionActor::new(logger, event_queue_rx, core);
        tokio::task::spawn(actor.run_event_loop());

        Ok(RaftClient::new(handle, state_rx))
    }
}
