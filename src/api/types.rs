use crate::protocol::{CommandConsistency, QueryConsistency};
use bytes::Bytes;
use std::fmt;

/// An operation to run against the replicated state machine. Commands mutate
/// state and always route to the leader; queries are read-only and may be
/// served by followers depending on their consistency level.
///
/// Payloads are opaque to this crate: encode them with whatever codec your
/// state machine speaks.
pub enum Operation {
    Command {
        payload: Bytes,
        consistency: CommandConsistency,
    },
    Query {
        payload: Bytes,
        consistency: QueryConsistency,
    },
}

impl Operation {
    /// A linearizable command.
    pub fn command(payload: impl Into<Bytes>) -> Self {
        Operation::Command {
            payload: payload.into(),
            consistency: CommandConsistency::Linearizable,
        }
    }

    pub fn command_with_consistency(payload: impl Into<Bytes>, consistency: CommandConsistency) -> Self {
        Operation::Command {
            payload: payload.into(),
            consistency,
        }
    }

    /// A linearizable query.
    pub fn query(payload: impl Into<Bytes>) -> Self {
        Operation::Query {
            payload: payload.into(),
            consistency: QueryConsistency::Linearizable,
        }
    }

    pub fn query_with_consistency(payload: impl Into<Bytes>, consistency: QueryConsistency) -> Self {
        Operation::Query {
            payload: payload.into(),
            consistency,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Command { payload, consistency } => f
                .debug_struct("Command")
                .field("consistency", consistency)
                .field("payload.len()", &payload.len())
                .finish(),
            Operation::Query { payload, consistency } => f
                .debug_struct("Query")
                .field("consistency", consistency)
                .field("payload.len()", &payload.len())
                .finish(),
        }
    }
}
