//! Correlation table: request id to pending call
//!
//! The table is shared between the threads that issue requests and the
//! engine's callback threads. Every operation takes the lock for a single map
//! mutation and never calls out while holding it.

use super::{RequestId, Signal, Sink};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

const OPEN: u8 = 0;
const COMPLETING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared control state of one pending call.
///
/// A call ends exactly one way. The callback that carries the final fragment
/// claims completion; a consumer that gives up (timeout, unsubscribe) claims
/// cancellation. Whichever claim lands first wins and the other side backs off.
#[derive(Debug)]
pub struct CallControl {
    state: AtomicU8,
    cancel: Signal,
    shutdown: Signal,
}

impl CallControl {
    pub fn new(shutdown: Signal) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(OPEN),
            cancel: Signal::new(),
            shutdown,
        })
    }

    /// Claim the call for final delivery
    pub fn claim_completion(&self) -> bool {
        self.state
            .compare_exchange(OPEN, COMPLETING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the call for cancellation and fire its cancel signal.
    ///
    /// Returns `true` if the call is cancelled after this returns, including
    /// when an earlier cancellation already won. Returns `false` when final
    /// delivery was claimed first.
    pub fn claim_cancellation(&self) -> bool {
        match self
            .state
            .compare_exchange(OPEN, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.cancel.fire();
                true
            }
            Err(current) => current == CANCELLED,
        }
    }

    /// Whether delivery to this call should be abandoned
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
            || self.cancel.is_fired()
            || self.shutdown.is_fired()
    }

    pub fn cancel_signal(&self) -> &Signal {
        &self.cancel
    }

    pub fn shutdown_signal(&self) -> &Signal {
        &self.shutdown
    }
}

/// A registered, not yet finished call
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub sink: Arc<Sink>,
    pub control: Arc<CallControl>,
}

#[derive(Debug, Default)]
struct TableInner {
    last_id: RequestId,
    calls: HashMap<RequestId, PendingCall>,
}

/// Map from request id to pending call
#[derive(Debug, Default)]
pub struct CorrelationTable {
    inner: Mutex<TableInner>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table whose next allocated id is `last_id + 1` (wrapping)
    pub fn starting_after(last_id: RequestId) -> Self {
        Self {
            inner: Mutex::new(TableInner {
                last_id,
                calls: HashMap::new(),
            }),
        }
    }

    /// Allocate a fresh id and record the call under it.
    ///
    /// Ids increase and wrap around, skipping 0 and any id still outstanding.
    pub fn register(&self, sink: Arc<Sink>, control: Arc<CallControl>) -> RequestId {
        let mut inner = self.lock();

        let mut id = inner.last_id;
        loop {
            id = id.wrapping_add(1);
            if id != 0 && !inner.calls.contains_key(&id) {
                break;
            }
        }

        inner.last_id = id;
        inner.calls.insert(id, PendingCall { sink, control });
        id
    }

    /// Look up a call, removing it in the same critical section when asked.
    pub fn resolve(&self, id: RequestId, remove_on_found: bool) -> Option<PendingCall> {
        let mut inner = self.lock();
        if remove_on_found {
            inner.calls.remove(&id)
        } else {
            inner.calls.get(&id).cloned()
        }
    }

    /// Remove a call. Returns `false` if it was already gone.
    pub fn remove(&self, id: RequestId) -> bool {
        self.lock().calls.remove(&id).is_some()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().calls.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every call matching `predicate` and return them
    pub fn remove_matching<F>(&self, mut predicate: F) -> Vec<PendingCall>
    where
        F: FnMut(&PendingCall) -> bool,
    {
        let mut inner = self.lock();
        let ids: Vec<RequestId> = inner
            .calls
            .iter()
            .filter(|&(_, call)| predicate(call))
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| inner.calls.remove(id)).collect()
    }

    /// Ids still registered, in ascending order
    pub fn outstanding_ids(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self.lock().calls.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::sink;

    fn pending(shutdown: &Signal) -> (Arc<Sink>, Arc<CallControl>) {
        let (sink, _receiver) = sink::channel();
        (sink, CallControl::new(shutdown.clone()))
    }

    #[test]
    fn test_ids_start_at_one() {
        let table = CorrelationTable::new();
        let shutdown = Signal::new();

        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), 1);
        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.outstanding_ids(), vec![1, 2]);
    }

    #[test]
    fn test_wraparound_skips_zero() {
        let table = CorrelationTable::starting_after(RequestId::MAX - 1);
        let shutdown = Signal::new();

        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), RequestId::MAX);
        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), 1);
    }

    #[test]
    fn test_wraparound_skips_outstanding_id() {
        let table = CorrelationTable::starting_after(RequestId::MAX);
        let shutdown = Signal::new();

        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), 1);

        // Rewind the cursor so the next candidate collides with id 1
        table.lock().last_id = 0;

        let (s, c) = pending(&shutdown);
        assert_eq!(table.register(s, c), 2);
    }

    #[test]
    fn test_remove_matching_by_shutdown_signal() {
        let table = CorrelationTable::new();
        let mine = Signal::new();
        let theirs = Signal::new();

        let (s, c) = pending(&mine);
        table.register(s, c);
        let (s, c) = pending(&theirs);
        let kept = table.register(s, c);
        let (s, c) = pending(&mine);
        table.register(s, c);

        let removed = table.remove_matching(|call| call.control.shutdown_signal().same_as(&mine));

        assert_eq!(removed.len(), 2);
        assert_eq!(table.outstanding_ids(), vec![kept]);
    }

    #[test]
    fn test_resolve_without_removal() {
        let table = CorrelationTable::new();
        let shutdown = Signal::new();
        let (s, c) = pending(&shutdown);
        let id = table.register(s, c);

        assert!(table.resolve(id, false).is_some());
        assert!(table.contains(id));
        assert!(table.resolve(id, true).is_some());
        assert!(!table.contains(id));
        assert!(table.resolve(id, true).is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let table = CorrelationTable::new();
        let shutdown = Signal::new();
        let (s, c) = pending(&shutdown);
        let id = table.register(s, c);

        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert!(table.is_empty());
    }

    #[test]
    fn test_completion_beats_cancellation() {
        let control = CallControl::new(Signal::new());

        assert!(control.claim_completion());
        assert!(!control.claim_cancellation());
        assert!(!control.cancel_signal().is_fired());
        assert!(!control.is_cancelled());
    }

    #[test]
    fn test_cancellation_beats_completion() {
        let control = CallControl::new(Signal::new());

        assert!(control.claim_cancellation());
        assert!(control.claim_cancellation());
        assert!(!control.claim_completion());
        assert!(control.cancel_signal().is_fired());
        assert!(control.is_cancelled());
    }

    #[test]
    fn test_shutdown_counts_as_cancelled() {
        let shutdown = Signal::new();
        let control = CallControl::new(shutdown.clone());

        shutdown.fire();
        assert!(control.is_cancelled());
        assert!(control.shutdown_signal().is_fired());
    }
}
