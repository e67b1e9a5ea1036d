use crate::actor::SessionHandle;
use crate::api::events::RaftSession;
use crate::api::{ClientBuilder, CloseError, OpenError, Operation, SubmitError};
use crate::cluster::Address;
use crate::session::ClientState;
use bytes::Bytes;
use tokio::sync::watch;

/// RaftClient submits commands and queries to a Raft cluster over a session,
/// riding out server failures, leader changes, and partitions.
///
/// All methods are usable from any task; internally everything funnels
/// through the session's own event loop, which serializes completions in
/// submission order.
pub struct RaftClient {
    handle: SessionHandle,
    state: watch::Receiver<ClientState>,
}

impl RaftClient {
    pub fn builder(members: impl IntoIterator<Item = Address>) -> ClientBuilder {
        ClientBuilder::new(members)
    }

    pub(super) fn new(handle: SessionHandle, state: watch::Receiver<ClientState>) -> Self {
        RaftClient { handle, state }
    }

    /// Opens a session with the cluster. Idempotent: opening an open client
    /// succeeds immediately, concurrent opens share one attempt, and an open
    /// issued during close runs after the close finishes.
    pub async fn open(&self) -> Result<(), OpenError> {
        self.handle.open().await
    }

    /// Closes the session. Idempotent, and composes after an in-flight open.
    /// The cluster is told best-effort; close completes regardless.
    pub async fn close(&self) -> Result<(), CloseError> {
        self.handle.close().await
    }

    /// Submits an operation and resolves with the state machine's result.
    ///
    /// Completions are delivered in submission order: a submission's result
    /// never arrives before the results of submissions that preceded it,
    /// retries and failovers included.
    pub async fn submit(&self, operation: Operation) -> Result<Bytes, SubmitError> {
        if !self.state.borrow().is_open() {
            return Err(SubmitError::NotOpen);
        }
        self.handle.submit(operation).await
    }

    /// The current session, or None when no session is open. Use it to
    /// subscribe to named session events and lifecycle notifications.
    pub fn session(&self) -> Option<RaftSession> {
        match &*self.state.borrow() {
            ClientState::Open(session_id) => Some(RaftSession::new(*session_id, self.handle.clone())),
            _ => None,
        }
    }

    pub fn state(&self) -> ClientState {
        self.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().is_closed()
    }
}
