// Shared plumbing for the integration tests: a terminal logger, response
// constructors, and a compliant scripted cluster member.
#![allow(dead_code)]

use bytes::Bytes;
use raft_client::{
    Address, ChannelNetwork, ConnectResponse, KeepAliveResponse, OperationResponse, RaftErrorCode,
    RegisterResponse, ResponseStatus, SessionId, SessionRequest, SessionResponse, StateIndex,
    UnregisterResponse,
};
use slog::Drain;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

pub fn test_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}

pub fn addr(port: u16) -> Address {
    Address::new("10.1.1.1", port)
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(100);

pub fn next_session_id() -> SessionId {
    SessionId::new(NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst))
}

#[derive(Clone)]
pub struct ClusterView {
    pub leader: Option<Address>,
    pub members: Vec<Address>,
}

impl ClusterView {
    pub fn new(leader: Option<Address>, members: Vec<Address>) -> Self {
        ClusterView { leader, members }
    }
}

pub fn ok_connect(view: &ClusterView) -> SessionResponse {
    SessionResponse::Connect(ConnectResponse {
        status: ResponseStatus::Ok,
        error: None,
        leader: view.leader.clone(),
        members: view.members.clone(),
    })
}

pub fn ok_register(session_id: SessionId, timeout: Duration, view: &ClusterView) -> SessionResponse {
    SessionResponse::Register(RegisterResponse {
        status: ResponseStatus::Ok,
        error: None,
        session_id,
        timeout,
        leader: view.leader.clone(),
        members: view.members.clone(),
    })
}

pub fn ok_keep_alive(view: &ClusterView) -> SessionResponse {
    SessionResponse::KeepAlive(KeepAliveResponse {
        status: ResponseStatus::Ok,
        error: None,
        leader: view.leader.clone(),
        members: view.members.clone(),
    })
}

pub fn ok_unregister() -> SessionResponse {
    SessionResponse::Unregister(UnregisterResponse {
        status: ResponseStatus::Ok,
        error: None,
    })
}

pub fn ok_operation(index: u64, result: impl Into<Bytes>) -> SessionResponse {
    SessionResponse::Operation(OperationResponse {
        status: ResponseStatus::Ok,
        error: None,
        index: StateIndex::new(index),
        event_index: raft_client::EventIndex::new(0),
        result: result.into(),
    })
}

pub fn error_operation(error: RaftErrorCode) -> SessionResponse {
    SessionResponse::Operation(OperationResponse {
        status: ResponseStatus::Error,
        error: Some(error),
        index: StateIndex::new(0),
        event_index: raft_client::EventIndex::new(0),
        result: Bytes::new(),
    })
}

#[derive(Copy, Clone)]
pub enum Role {
    Leader,
    Follower,
}

#[derive(Clone)]
pub struct MemberConfig {
    pub view: ClusterView,
    pub role: Role,
    pub session_timeout: Duration,
}

#[derive(Default)]
pub struct MemberStats {
    pub connections: AtomicUsize,
    pub registers: AtomicUsize,
    pub keep_alives: AtomicUsize,
    pub commands: Mutex<Vec<u64>>,
    pub queries: Mutex<Vec<u64>>,
}

impl MemberStats {
    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

/// Runs a well-behaved cluster member at `address` until its listener is
/// dropped. Leaders apply operations by echoing the payload; followers
/// redirect with a not-leader error.
pub fn spawn_member(network: &Arc<ChannelNetwork>, address: Address, config: MemberConfig) -> Arc<MemberStats> {
    let mut listener = network.listen(address);
    let stats = Arc::new(MemberStats::default());

    let accept_stats = stats.clone();
    tokio::spawn(async move {
        while let Some(mut connection) = listener.accept().await {
            accept_stats.connections.fetch_add(1, Ordering::SeqCst);

            let config = config.clone();
            let stats = accept_stats.clone();
            tokio::spawn(async move {
                while let Some(served) = connection.next_request().await {
                    let response = respond(&config, &stats, served.request());
                    served.respond(response);
                }
            });
        }
    });

    stats
}

fn respond(config: &MemberConfig, stats: &MemberStats, request: &SessionRequest) -> SessionResponse {
    match request {
        SessionRequest::Connect(_) => ok_connect(&config.view),
        SessionRequest::Register(_) => {
            stats.registers.fetch_add(1, Ordering::SeqCst);
            ok_register(next_session_id(), config.session_timeout, &config.view)
        }
        SessionRequest::KeepAlive(_) => {
            stats.keep_alives.fetch_add(1, Ordering::SeqCst);
            ok_keep_alive(&config.view)
        }
        SessionRequest::Unregister(_) => ok_unregister(),
        SessionRequest::Command(command) => {
            stats.commands.lock().unwrap().push(command.sequence.val());
            match config.role {
                Role::Leader => ok_operation(command.sequence.val(), command.payload.clone()),
                Role::Follower => error_operation(RaftErrorCode::NotLeader),
            }
        }
        SessionRequest::Query(query) => {
            stats.queries.lock().unwrap().push(query.sequence.val());
            match config.role {
                Role::Leader => ok_operation(query.sequence.val(), query.payload.clone()),
                Role::Follower => error_operation(RaftErrorCode::NotLeader),
            }
        }
    }
}
