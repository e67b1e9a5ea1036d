use crate::cluster::Address;
use crate::protocol::{ClientId, EventIndex, RaftErrorCode, ResponseStatus, Sequence, SessionId, StateIndex};
use bytes::Bytes;
use std::fmt;
use tokio::time::Duration;

/// SessionRequest is every message a client sends to a server. The transport
/// frames and encodes these; this crate only decides what to send and when.
#[derive(Clone, Debug)]
pub enum SessionRequest {
    Connect(ConnectRequest),
    Register(RegisterRequest),
    KeepAlive(KeepAliveRequest),
    Unregister(UnregisterRequest),
    Command(CommandRequest),
    Query(QueryRequest),
}

#[derive(Clone, Debug)]
pub enum SessionResponse {
    Connect(ConnectResponse),
    Register(RegisterResponse),
    KeepAlive(KeepAliveResponse),
    Unregister(UnregisterResponse),
    Operation(OperationResponse),
}

/// Sent on every freshly opened transport connection before anything else, so
/// the server can associate the physical connection with the client.
#[derive(Clone, Debug)]
pub struct ConnectRequest {
    pub client_id: ClientId,
}

#[derive(Clone, Debug)]
pub struct ConnectResponse {
    pub status: ResponseStatus,
    pub error: Option<RaftErrorCode>,
    pub leader: Option<Address>,
    pub members: Vec<Address>,
}

#[derive(Clone, Debug)]
pub struct RegisterRequest {
    pub client_id: ClientId,
    // A hint only. The cluster replies with the authoritative timeout.
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct RegisterResponse {
    pub status: ResponseStatus,
    pub error: Option<RaftErrorCode>,
    pub session_id: SessionId,
    pub timeout: Duration,
    pub leader: Option<Address>,
    pub members: Vec<Address>,
}

/// KeepAlive renews the session lease and acknowledges progress: the highest
/// sequence both submitted and responded to, and the highest event index
/// delivered to listeners. The server resends events past `event_index`.
#[derive(Clone, Debug)]
pub struct KeepAliveRequest {
    pub session_id: SessionId,
    pub command_sequence: Sequence,
    pub event_index: EventIndex,
}

#[derive(Clone, Debug)]
pub struct KeepAliveResponse {
    pub status: ResponseStatus,
    pub error: Option<RaftErrorCode>,
    pub leader: Option<Address>,
    pub members: Vec<Address>,
}

#[derive(Clone, Debug)]
pub struct UnregisterRequest {
    pub session_id: SessionId,
}

#[derive(Clone, Debug)]
pub struct UnregisterResponse {
    pub status: ResponseStatus,
    pub error: Option<RaftErrorCode>,
}

/// CommandConsistency selects how events published while the command applies
/// are observed relative to the command's completion. Commands always route
/// to the leader.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandConsistency {
    Causal,
    Sequential,
    Linearizable,
}

/// QueryConsistency selects which replicas may serve the read. The stronger
/// levels pin to the leader; the weaker ones may read from followers under
/// read-index and sequence constraints.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QueryConsistency {
    Causal,
    Sequential,
    BoundedLinearizable,
    Linearizable,
}

#[derive(Clone)]
pub struct CommandRequest {
    pub session_id: SessionId,
    pub sequence: Sequence,
    pub consistency: CommandConsistency,
    pub payload: Bytes,
}

#[derive(Clone)]
pub struct QueryRequest {
    pub session_id: SessionId,
    pub sequence: Sequence,
    pub consistency: QueryConsistency,
    pub index: StateIndex,
    pub payload: Bytes,
}

#[derive(Clone)]
pub struct OperationResponse {
    pub status: ResponseStatus,
    pub error: Option<RaftErrorCode>,
    pub index: StateIndex,
    pub event_index: EventIndex,
    pub result: Bytes,
}

/// Server-to-client push carrying one named session event. `previous_index`
/// lets the receiver detect gaps without waiting for the next keep-alive.
#[derive(Clone)]
pub struct PublishEvent {
    pub session_id: SessionId,
    pub event_index: EventIndex,
    pub previous_index: EventIndex,
    pub name: String,
    pub payload: Bytes,
}

impl fmt::Debug for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRequest")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence)
            .field("consistency", &self.consistency)
            .field("payload.len()", &self.payload.len())
            .finish()
    }
}

impl fmt::Debug for QueryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence)
            .field("consistency", &self.consistency)
            .field("index", &self.index)
            .field("payload.len()", &self.payload.len())
            .finish()
    }
}

impl fmt::Debug for OperationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationResponse")
            .field("status", &self.status)
            .field("error", &self.error)
            .field("index", &self.index)
            .field("event_index", &self.event_index)
            .field("result.len()", &self.result.len())
            .finish()
    }
}

impl fmt::Debug for PublishEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishEvent")
            .field("session_id", &self.session_id)
            .field("event_index", &self.event_index)
            .field("previous_index", &self.previous_index)
            .field("name", &self.name)
            .field("payload.len()", &self.payload.len())
            .finish()
    }
}
