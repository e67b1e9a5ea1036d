use crate::actor::Callback;
use crate::api::SubmitError;
use crate::protocol::{Sequence, SessionRequest, SessionResponse};
use crate::session::connection::ConnectionId;
use crate::transport::TransportError;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// RequestPipeline owns the session's sequence space and the submission-order
/// completion guarantee: however responses arrive, a request's completion
/// never runs before the completion of every lower sequence.
pub(crate) struct RequestPipeline {
    next_sequence: Sequence,
    highest_completed: Sequence,
    pending: BTreeMap<Sequence, PendingRequest>,
}

struct PendingRequest {
    // Kept verbatim so a retry resends the exact original request.
    request: SessionRequest,
    disposition: Disposition,
    completion: RequestCompletion,
}

enum Disposition {
    AwaitingConnection,
    Dispatched(ConnectionId),
    Resolved(RequestResolution),
}

pub(crate) enum RequestCompletion {
    Submit(Callback<Bytes, SubmitError>),
    Register,
    KeepAlive,
}

/// What a pipelined request is, derived from its wire message. Failover
/// policy differs by kind: commands outlive an exhausted sweep, everything
/// else surfaces the failure.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RequestKind {
    Register,
    KeepAlive,
    Command,
    Query,
    Other,
}

#[derive(Clone, Debug)]
pub(crate) enum RequestResolution {
    Response(SessionResponse),
    Failed(FailureKind),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FailureKind {
    ConnectFailed,
    SessionExpired,
    Closed,
}

/// Outcome of one dispatch attempt, reported back by the dispatch task.
pub(crate) struct RequestOutcome {
    pub sequence: Sequence,
    pub connection: ConnectionId,
    pub result: Result<SessionResponse, TransportError>,
}

impl fmt::Debug for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOutcome")
            .field("sequence", &self.sequence)
            .field("connection", &self.connection)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// A request whose completion is ready to run, handed back in sequence order.
pub(crate) struct CompletedRequest {
    pub sequence: Sequence,
    pub completion: RequestCompletion,
    pub resolution: RequestResolution,
}

impl RequestPipeline {
    pub fn new() -> Self {
        RequestPipeline {
            next_sequence: Sequence::new(1),
            highest_completed: Sequence::new(0),
            pending: BTreeMap::new(),
        }
    }

    /// Assigns the next sequence and records the request as waiting for a
    /// connection. `make_request` receives the assigned sequence so wire
    /// messages can carry it.
    pub fn enqueue(
        &mut self,
        make_request: impl FnOnce(Sequence) -> SessionRequest,
        completion: RequestCompletion,
    ) -> Sequence {
        let sequence = self.next_sequence;
        self.next_sequence.incr();

        self.pending.insert(
            sequence,
            PendingRequest {
                request: make_request(sequence),
                disposition: Disposition::AwaitingConnection,
                completion,
            },
        );

        sequence
    }

    /// Sequences currently waiting for a connection, lowest first.
    pub fn awaiting_sequences(&self) -> Vec<Sequence> {
        self.pending
            .iter()
            .filter(|(_, p)| matches!(p.disposition, Disposition::AwaitingConnection))
            .map(|(&seq, _)| seq)
            .collect()
    }

    pub fn request_kind(&self, sequence: Sequence) -> Option<RequestKind> {
        self.pending.get(&sequence).map(|pending| match &pending.request {
            SessionRequest::Register(_) => RequestKind::Register,
            SessionRequest::KeepAlive(_) => RequestKind::KeepAlive,
            SessionRequest::Command(_) => RequestKind::Command,
            SessionRequest::Query(_) => RequestKind::Query,
            _ => RequestKind::Other,
        })
    }

    /// Marks `sequence` as in flight on `connection` and returns the request
    /// to put on the wire. Returns None if the record is not awaiting.
    pub fn begin_dispatch(&mut self, sequence: Sequence, connection: ConnectionId) -> Option<SessionRequest> {
        let pending = self.pending.get_mut(&sequence)?;
        if !matches!(pending.disposition, Disposition::AwaitingConnection) {
            return None;
        }

        pending.disposition = Disposition::Dispatched(connection);
        Some(pending.request.clone())
    }

    /// Puts `sequence` back into the waiting state for a retry.
    pub fn mark_awaiting(&mut self, sequence: Sequence) {
        if let Some(pending) = self.pending.get_mut(&sequence) {
            if matches!(pending.disposition, Disposition::Dispatched(_)) {
                pending.disposition = Disposition::AwaitingConnection;
            }
        }
    }

    /// True only if `sequence` is still in flight on exactly `connection`.
    /// Guards against outcomes from a dispatch that was already superseded.
    pub fn accepts_outcome(&self, sequence: Sequence, connection: ConnectionId) -> bool {
        match self.pending.get(&sequence) {
            Some(pending) => matches!(pending.disposition, Disposition::Dispatched(c) if c == connection),
            None => false,
        }
    }

    pub fn resolve(&mut self, sequence: Sequence, resolution: RequestResolution) -> Vec<CompletedRequest> {
        if let Some(pending) = self.pending.get_mut(&sequence) {
            pending.disposition = Disposition::Resolved(resolution);
        }
        self.drain_completed_prefix()
    }

    /// Fails every unresolved request, e.g. on expiration or close.
    pub fn fail_all(&mut self, kind: FailureKind) -> Vec<CompletedRequest> {
        for pending in self.pending.values_mut() {
            if !matches!(pending.disposition, Disposition::Resolved(_)) {
                pending.disposition = Disposition::Resolved(RequestResolution::Failed(kind));
            }
        }
        self.drain_completed_prefix()
    }

    pub fn has_unresolved_keep_alive(&self) -> bool {
        self.pending
            .values()
            .any(|p| matches!(p.completion, RequestCompletion::KeepAlive) && !matches!(p.disposition, Disposition::Resolved(_)))
    }

    /// Highest sequence that was submitted and answered by the cluster.
    /// Monotone: it only moves forward as the completion prefix drains.
    pub fn highest_completed(&self) -> Sequence {
        self.highest_completed
    }

    fn drain_completed_prefix(&mut self) -> Vec<CompletedRequest> {
        let mut completed = Vec::new();

        while let Some((&sequence, front)) = self.pending.iter().next() {
            if !matches!(front.disposition, Disposition::Resolved(_)) {
                break;
            }

            // Unwrap is safe: we just looked the key up.
            let pending = self.pending.remove(&sequence).expect("pipeline front disappeared");
            let resolution = match pending.disposition {
                Disposition::Resolved(resolution) => resolution,
                _ => unreachable!("front checked as resolved"),
            };

            if matches!(resolution, RequestResolution::Response(_)) {
                self.highest_completed = sequence;
            }

            completed.push(CompletedRequest {
                sequence,
                completion: pending.completion,
                resolution,
            });
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientId, ConnectRequest, ConnectResponse, ResponseStatus};

    fn request() -> SessionRequest {
        SessionRequest::Connect(ConnectRequest {
            client_id: ClientId::new("test"),
        })
    }

    fn response() -> RequestResolution {
        RequestResolution::Response(SessionResponse::Connect(ConnectResponse {
            status: ResponseStatus::Ok,
            error: None,
            leader: None,
            members: Vec::new(),
        }))
    }

    fn enqueue(pipeline: &mut RequestPipeline) -> Sequence {
        pipeline.enqueue(|_| request(), RequestCompletion::KeepAlive)
    }

    #[test]
    fn sequences_are_strictly_increasing() {
        let mut pipeline = RequestPipeline::new();

        let first = enqueue(&mut pipeline);
        let second = enqueue(&mut pipeline);
        let third = enqueue(&mut pipeline);

        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn out_of_order_resolutions_complete_in_sequence_order() {
        // -- setup --
        let mut pipeline = RequestPipeline::new();
        let first = enqueue(&mut pipeline);
        let second = enqueue(&mut pipeline);
        let third = enqueue(&mut pipeline);

        // -- execute & verify --

        // Resolving later sequences first releases nothing.
        assert!(pipeline.resolve(third, response()).is_empty());
        assert!(pipeline.resolve(second, response()).is_empty());

        // Resolving the front releases everything, in order.
        let completed = pipeline.resolve(first, response());
        let order: Vec<Sequence> = completed.iter().map(|c| c.sequence).collect();
        assert_eq!(order, vec![first, second, third]);
    }

    #[test]
    fn dispatch_guard_rejects_superseded_connections() {
        let mut pipeline = RequestPipeline::new();
        let sequence = enqueue(&mut pipeline);
        let old_conn = ConnectionId::new(1);
        let new_conn = ConnectionId::new(2);

        assert!(pipeline.begin_dispatch(sequence, old_conn).is_some());
        pipeline.mark_awaiting(sequence);
        assert!(pipeline.begin_dispatch(sequence, new_conn).is_some());

        assert!(!pipeline.accepts_outcome(sequence, old_conn));
        assert!(pipeline.accepts_outcome(sequence, new_conn));
    }

    #[test]
    fn retry_reuses_the_original_request() {
        let mut pipeline = RequestPipeline::new();
        let sequence = enqueue(&mut pipeline);
        let conn = ConnectionId::new(1);

        let first = pipeline.begin_dispatch(sequence, conn).unwrap();
        pipeline.mark_awaiting(sequence);
        let second = pipeline.begin_dispatch(sequence, conn).unwrap();

        // Same message both times; sequence was assigned once.
        match (first, second) {
            (SessionRequest::Connect(a), SessionRequest::Connect(b)) => {
                assert_eq!(a.client_id, b.client_id)
            }
            _ => panic!("unexpected request kinds"),
        }
    }

    #[test]
    fn failed_resolution_buffers_behind_the_front() {
        // -- setup --
        let mut pipeline = RequestPipeline::new();
        let in_flight = enqueue(&mut pipeline);
        let waiting = enqueue(&mut pipeline);
        let conn = ConnectionId::new(7);
        pipeline.begin_dispatch(in_flight, conn).unwrap();

        // -- execute & verify --

        // The later request fails, but its completion is blocked behind the
        // in-flight request at the front.
        assert!(pipeline
            .resolve(waiting, RequestResolution::Failed(FailureKind::ConnectFailed))
            .is_empty());

        let completed = pipeline.resolve(in_flight, response());
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].sequence, in_flight);
        assert_eq!(completed[1].sequence, waiting);
        assert!(matches!(
            completed[1].resolution,
            RequestResolution::Failed(FailureKind::ConnectFailed)
        ));
    }

    #[test]
    fn request_kind_follows_the_wire_message() {
        let mut pipeline = RequestPipeline::new();
        let sequence = enqueue(&mut pipeline);

        assert_eq!(pipeline.request_kind(sequence), Some(RequestKind::Other));
        assert_eq!(pipeline.request_kind(Sequence::new(99)), None);
    }

    #[test]
    fn highest_completed_counts_only_answered_requests() {
        let mut pipeline = RequestPipeline::new();
        let answered = enqueue(&mut pipeline);
        let failed = enqueue(&mut pipeline);

        pipeline.resolve(answered, response());
        pipeline.resolve(failed, RequestResolution::Failed(FailureKind::ConnectFailed));

        assert_eq!(pipeline.highest_completed(), answered);
    }

    #[test]
    fn fail_all_completes_everything_in_order() {
        let mut pipeline = RequestPipeline::new();
        let first = enqueue(&mut pipeline);
        let second = enqueue(&mut pipeline);
        pipeline.begin_dispatch(first, ConnectionId::new(1)).unwrap();

        let completed = pipeline.fail_all(FailureKind::SessionExpired);
        let order: Vec<Sequence> = completed.iter().map(|c| c.sequence).collect();
        assert_eq!(order, vec![first, second]);
    }
}
