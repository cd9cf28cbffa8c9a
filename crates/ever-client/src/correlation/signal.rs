//! Fire-once broadcast signals

use std::sync::Arc;
use tokio::sync::watch;

/// A signal that fires at most once and wakes every waiter, present and future.
///
/// Clones share the same underlying state. Firing twice is a no-op.
#[derive(Debug, Clone)]
pub struct Signal {
    sender: Arc<watch::Sender<bool>>,
}

impl Signal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fire the signal. Returns `true` only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        !self.sender.send_replace(true)
    }

    pub fn is_fired(&self) -> bool {
        *self.sender.borrow()
    }

    /// Whether `other` is a clone of this signal
    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }

    /// Resolve once the signal has fired (immediately if it already has)
    pub async fn fired(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel
        let _ = receiver.wait_for(|fired| *fired).await;
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
