//! Per-call response sink
//!
//! A sink is the producer half of an unbounded FIFO. The engine's callback
//! thread pushes fragments into it and never blocks; the consumer half is held
//! by whoever reads the call's responses.

use super::ResponseFragment;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Producer half of a call's fragment queue
#[derive(Debug)]
pub struct Sink {
    sender: Mutex<Option<mpsc::UnboundedSender<ResponseFragment>>>,
}

/// Consumer half of a call's fragment queue
#[derive(Debug)]
pub struct SinkReceiver {
    receiver: mpsc::UnboundedReceiver<ResponseFragment>,
}

/// Create a connected sink pair
pub fn channel() -> (Arc<Sink>, SinkReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Arc::new(Sink {
            sender: Mutex::new(Some(sender)),
        }),
        SinkReceiver { receiver },
    )
}

impl Sink {
    /// Append a fragment. Returns `false` if the sink is closed or the
    /// consumer has gone away.
    pub fn push(&self, fragment: ResponseFragment) -> bool {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(fragment).is_ok(),
            None => false,
        }
    }

    /// Close the sink. Buffered fragments stay readable; closing twice is a no-op.
    pub fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_closed(&self) -> bool {
        match self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}

impl SinkReceiver {
    /// Next fragment in push order, or `None` once the sink is closed and drained
    pub async fn recv(&mut self) -> Option<ResponseFragment> {
        self.receiver.recv().await
    }

    /// Stop accepting fragments. Later pushes fail and buffered fragments are kept.
    pub fn close(&mut self) {
        self.receiver.close();
    }
}
