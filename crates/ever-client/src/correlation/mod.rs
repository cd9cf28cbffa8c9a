//! Request/response correlation
//!
//! The engine answers every request through one process-wide callback that
//! carries only a request id. This module matches those callbacks back to the
//! caller waiting on them:
//! - `table` maps request ids to pending calls
//! - `sink` is the per-call fragment queue the callback writes into
//! - `ingress` is what the callback calls
//! - `signal` provides the cancel and shutdown broadcasts

pub mod ingress;
pub mod signal;
pub mod sink;
pub mod table;

use crate::ffi::ResponseStatus;

pub use ingress::{Delivery, Ingress};
pub use signal::Signal;
pub use sink::{Sink, SinkReceiver};
pub use table::{CallControl, CorrelationTable, PendingCall};

/// Identifier the engine echoes back with every response to a request
pub type RequestId = u32;

/// One callback delivery, with the payload copied out of engine memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFragment {
    pub request_id: RequestId,
    pub payload: Vec<u8>,
    pub status: ResponseStatus,
    pub finished: bool,
}
