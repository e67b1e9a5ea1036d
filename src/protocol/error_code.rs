#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// RaftErrorCode is the protocol-level error carried by an `Error` response.
///
/// The split matters to the sender: retriable codes mean "this server cannot
/// serve the request right now, another might" and are absorbed by failover.
/// Terminal codes travel back to the submitter untouched. `UnknownSession`
/// is terminal and additionally expires the session that received it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RaftErrorCode {
    NoLeader,
    NotLeader,
    IllegalMemberState,
    CommandError,
    QueryError,
    ApplicationError,
    UnknownSession,
    InternalError,
}

impl RaftErrorCode {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            RaftErrorCode::NoLeader | RaftErrorCode::NotLeader | RaftErrorCode::IllegalMemberState
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leadership_codes_are_retriable() {
        assert!(RaftErrorCode::NoLeader.is_retriable());
        assert!(RaftErrorCode::NotLeader.is_retriable());
        assert!(RaftErrorCode::IllegalMemberState.is_retriable());
    }

    #[test]
    fn per_request_and_session_codes_are_terminal() {
        assert!(!RaftErrorCode::CommandError.is_retriable());
        assert!(!RaftErrorCode::QueryError.is_retriable());
        assert!(!RaftErrorCode::ApplicationError.is_retriable());
        assert!(!RaftErrorCode::UnknownSession.is_retriable());
        assert!(!RaftErrorCode::InternalError.is_retriable());
    }
}
