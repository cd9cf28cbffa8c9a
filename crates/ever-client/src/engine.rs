//! The engine seam
//!
//! `Engine` is the narrow surface the client needs from the foreign engine:
//! create and destroy a context, and fire a request whose responses come back
//! through an [`Ingress`]. The native implementation lives in `ffi::native`;
//! tests drive the client through scripted implementations.

use crate::correlation::{CorrelationTable, Ingress, RequestId};
use std::sync::Arc;

/// Opaque engine context handle. Zero is never a valid context.
pub type ContextHandle = u32;

pub trait Engine: Send + Sync + 'static {
    /// Create a context from a JSON configuration blob.
    ///
    /// Returns the engine's raw JSON response: `{"result": <handle>}` or
    /// `{"error": {...}}`.
    fn create_context(&self, config_json: &str) -> Vec<u8>;

    fn destroy_context(&self, context: ContextHandle);

    /// Start a request. Must return without waiting for responses.
    ///
    /// Every response fragment for `request_id` is delivered through `ingress`,
    /// possibly from other threads and possibly before this call returns.
    /// Empty `params_json` means the method takes no parameters.
    fn request(
        &self,
        context: ContextHandle,
        method: &str,
        params_json: &[u8],
        request_id: RequestId,
        ingress: &Ingress,
    );

    /// The table a client using this engine must register its calls in.
    ///
    /// Engines whose callback can reach per-client state get a fresh table per
    /// client. Engines with a single global callback return a shared one.
    fn correlation_table(&self) -> Arc<CorrelationTable> {
        Arc::new(CorrelationTable::new())
    }
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn create_context(&self, config_json: &str) -> Vec<u8> {
        (**self).create_context(config_json)
    }

    fn destroy_context(&self, context: ContextHandle) {
        (**self).destroy_context(context)
    }

    fn request(
        &self,
        context: ContextHandle,
        method: &str,
        params_json: &[u8],
        request_id: RequestId,
        ingress: &Ingress,
    ) {
        (**self).request(context, method, params_json, request_id, ingress)
    }

    fn correlation_table(&self) -> Arc<CorrelationTable> {
        (**self).correlation_table()
    }
}
