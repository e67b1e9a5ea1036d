#[derive(Clone, Debug, thiserror::Error)]
pub enum OpenError {
    #[error("failed to connect to any cluster member")]
    ConnectFailed,

    // The cluster answered but would not register the session. Likely a
    // protocol or configuration mismatch; retrying rarely helps.
    #[error("session registration was rejected by the cluster")]
    Rejected,

    #[error("client closed before the session opened")]
    Closed,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum CloseError {
    #[error("client task exited before close completed")]
    TaskExited,
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("client session is not open")]
    NotOpen,

    // One full pass over the known members found no usable server. The
    // submission was not acknowledged; it is safe to submit again.
    #[error("failed to connect to any cluster member")]
    ConnectFailed,

    #[error("session expired")]
    SessionExpired,

    #[error("client closed")]
    Closed,

    #[error("cluster rejected the command")]
    Command,

    #[error("cluster rejected the query")]
    Query,

    #[error("application error while applying the operation")]
    Application,

    #[error("protocol error")]
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("transport not configured")]
    TransportNotConfigured,

    #[error("at least one cluster member address is required")]
    NoMembers,

    #[error("illegal client options: {0}")]
    IllegalOptions(String),
}
