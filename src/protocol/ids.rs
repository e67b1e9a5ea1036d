use std::fmt;

/// ClientId is the cluster-wide identity a client presents when connecting
/// and registering. A fresh one is minted for every new session.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        ClientId(id.into())
    }

    pub fn random() -> Self {
        ClientId(format!("{:032x}", rand::random::<u128>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SessionId is assigned by the cluster when a session registers.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    pub fn val(&self) -> u64 {
        self.0
    }
}

/// Sequence numbers every request submitted through a session, in submission
/// order. Retries reuse the sequence originally assigned.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Sequence(u64);

impl Sequence {
    pub fn new(seq: u64) -> Self {
        Sequence(seq)
    }

    pub fn val(&self) -> u64 {
        self.0
    }

    pub fn incr(&mut self) {
        self.0 += 1;
    }
}

/// EventIndex orders server-published session events. Monotone per session.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct EventIndex(u64);

impl EventIndex {
    pub fn new(index: u64) -> Self {
        EventIndex(index)
    }

    pub fn val(&self) -> u64 {
        self.0
    }
}

/// StateIndex is the cluster state-machine version observed in operation
/// responses, echoed back on queries for read-index bookkeeping.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct StateIndex(u64);

impl StateIndex {
    pub fn new(index: u64) -> Self {
        StateIndex(index)
    }

    pub fn val(&self) -> u64 {
        self.0
    }
}
