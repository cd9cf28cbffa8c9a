//! Callback ingress
//!
//! Entry point for fragments delivered by the engine. Runs on engine-owned
//! threads: it must not block beyond the table lock and must never panic.

use super::{CorrelationTable, PendingCall, RequestId, ResponseFragment};
use crate::ffi::ResponseStatus;
use std::sync::Arc;

/// What happened to a delivered fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Fragment appended to the call's sink
    Delivered,
    /// Stream ended without payload; sink closed
    Terminated,
    /// Call was cancelled, shut down, or lost its consumer; entry dropped
    Abandoned,
    /// No call registered under this id
    UnknownRequest,
}

/// Routes engine callbacks to pending calls
#[derive(Debug, Clone)]
pub struct Ingress {
    table: Arc<CorrelationTable>,
}

impl Ingress {
    pub fn new(table: Arc<CorrelationTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// Deliver one fragment for `request_id`.
    ///
    /// Terminal fragments (`finished`, or a stream-terminated status) remove
    /// the call in the same lookup, so exactly one terminal delivery can ever
    /// find it.
    pub fn deliver(
        &self,
        request_id: RequestId,
        payload: Vec<u8>,
        status_code: u32,
        finished: bool,
    ) -> Delivery {
        let status = ResponseStatus::from_code(status_code);
        let terminal = finished || status == ResponseStatus::StreamTerminated;

        let call = match self.table.resolve(request_id, terminal) {
            Some(call) => call,
            None => {
                tracing::trace!(
                    request_id,
                    status = status_code,
                    "response for unknown request dropped"
                );
                return Delivery::UnknownRequest;
            }
        };

        if call.control.is_cancelled() {
            return self.abandon(request_id, &call);
        }

        if finished && !call.control.claim_completion() {
            return self.abandon(request_id, &call);
        }

        if status == ResponseStatus::StreamTerminated {
            call.sink.close();
            tracing::debug!(request_id, "stream terminated");
            return Delivery::Terminated;
        }

        if let ResponseStatus::Unknown(code) = status {
            tracing::warn!(request_id, status = code, "unrecognized response status");
        }

        let pushed = call.sink.push(ResponseFragment {
            request_id,
            payload,
            status,
            finished,
        });

        if terminal {
            call.sink.close();
        }

        if !pushed {
            return self.abandon(request_id, &call);
        }

        tracing::trace!(request_id, status = status_code, finished, "fragment delivered");
        Delivery::Delivered
    }

    fn abandon(&self, request_id: RequestId, call: &PendingCall) -> Delivery {
        call.sink.close();
        self.table.remove(request_id);
        tracing::debug!(request_id, "delivery abandoned");
        Delivery::Abandoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{sink, CallControl, Signal, SinkReceiver};
    use pretty_assertions::assert_eq;

    struct Fixture {
        ingress: Ingress,
        shutdown: Signal,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ingress: Ingress::new(Arc::new(CorrelationTable::new())),
                shutdown: Signal::new(),
            }
        }

        fn register(&self) -> (RequestId, SinkReceiver, Arc<CallControl>) {
            let (sink, receiver) = sink::channel();
            let control = CallControl::new(self.shutdown.clone());
            let id = self.ingress.table().register(sink, control.clone());
            (id, receiver, control)
        }
    }

    #[tokio::test]
    async fn test_non_final_keeps_entry() {
        let fixture = Fixture::new();
        let (id, mut receiver, _) = fixture.register();

        assert_eq!(
            fixture.ingress.deliver(id, b"{\"a\":1}".to_vec(), 100, false),
            Delivery::Delivered
        );
        assert!(fixture.ingress.table().contains(id));

        let fragment = receiver.recv().await.unwrap();
        assert_eq!(fragment.status, ResponseStatus::StreamEvent);
        assert!(!fragment.finished);
    }

    #[tokio::test]
    async fn test_final_removes_entry_and_closes() {
        let fixture = Fixture::new();
        let (id, mut receiver, _) = fixture.register();

        assert_eq!(
            fixture.ingress.deliver(id, b"\"ok\"".to_vec(), 0, true),
            Delivery::Delivered
        );
        assert!(!fixture.ingress.table().contains(id));

        assert_eq!(receiver.recv().await.unwrap().payload, b"\"ok\"");
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_terminated_pushes_nothing() {
        let fixture = Fixture::new();
        let (id, mut receiver, _) = fixture.register();

        assert_eq!(
            fixture.ingress.deliver(id, Vec::new(), 2, false),
            Delivery::Terminated
        );
        assert!(!fixture.ingress.table().contains(id));
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_unknown_id_is_harmless() {
        let fixture = Fixture::new();
        let (id, _receiver, _) = fixture.register();

        assert_eq!(
            fixture.ingress.deliver(id + 1000, b"x".to_vec(), 0, true),
            Delivery::UnknownRequest
        );
        assert_eq!(fixture.ingress.table().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_call_is_abandoned() {
        let fixture = Fixture::new();
        let (id, mut receiver, control) = fixture.register();
        assert!(control.claim_cancellation());

        assert_eq!(
            fixture.ingress.deliver(id, b"late".to_vec(), 100, false),
            Delivery::Abandoned
        );
        assert!(!fixture.ingress.table().contains(id));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_abandons_delivery() {
        let fixture = Fixture::new();
        let (id, mut receiver, _) = fixture.register();
        fixture.shutdown.fire();

        assert_eq!(
            fixture.ingress.deliver(id, b"late".to_vec(), 0, true),
            Delivery::Abandoned
        );
        assert!(receiver.recv().await.is_none());
    }

    #[test]
    fn test_dropped_consumer_releases_entry() {
        let fixture = Fixture::new();
        let (id, receiver, _) = fixture.register();
        drop(receiver);

        assert_eq!(
            fixture.ingress.deliver(id, b"orphan".to_vec(), 100, false),
            Delivery::Abandoned
        );
        assert!(fixture.ingress.table().is_empty());
    }

    #[test]
    fn test_second_final_finds_nothing() {
        let fixture = Fixture::new();
        let (id, _receiver, _) = fixture.register();

        assert_eq!(fixture.ingress.deliver(id, b"1".to_vec(), 0, true), Delivery::Delivered);
        assert_eq!(
            fixture.ingress.deliver(id, b"2".to_vec(), 0, true),
            Delivery::UnknownRequest
        );
    }
}
