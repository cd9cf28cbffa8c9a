//! Native engine backed by the ton_client shared library
//!
//! The library reports every response through one `extern "C"` handler that
//! carries no user data, only the request id. All native clients in the
//! process therefore share a single correlation table, and the handler routes
//! into it.

use super::loader::{LibraryLoader, LoadError, ENGINE_LIBRARY};
use super::types::{tc_response_handler_t, tc_string_data_t, tc_string_handle_t, ResponseStatus};
use crate::correlation::{CorrelationTable, Ingress, RequestId};
use crate::engine::{ContextHandle, Engine};
use libloading::Library;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

type CreateContextFn = unsafe extern "C" fn(config: tc_string_data_t) -> *const tc_string_handle_t;
type DestroyContextFn = unsafe extern "C" fn(context: u32);
type RequestFn = unsafe extern "C" fn(
    context: u32,
    function_name: tc_string_data_t,
    function_params_json: tc_string_data_t,
    request_id: u32,
    response_handler: tc_response_handler_t,
);
type ReadStringFn = unsafe extern "C" fn(handle: *const tc_string_handle_t) -> tc_string_data_t;
type DestroyStringFn = unsafe extern "C" fn(handle: *const tc_string_handle_t);

static RESPONSE_INGRESS: OnceLock<Ingress> = OnceLock::new();

/// Ingress over the process-wide table used by every native client
fn response_ingress() -> &'static Ingress {
    RESPONSE_INGRESS.get_or_init(|| Ingress::new(Arc::new(CorrelationTable::new())))
}

/// Engine-shaped error object for input the engine cannot be handed
fn oversized_input(what: &str, len: usize) -> serde_json::Value {
    serde_json::json!({
        "code": 0,
        "message": format!("{what} of {len} bytes exceeds the engine's length limit"),
    })
}

extern "C" fn response_handler(
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
) {
    // Unwinding into the engine is undefined behavior
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let payload = unsafe { params_json.to_vec() };
        response_ingress().deliver(request_id, payload, response_type, finished);
    }));

    if outcome.is_err() {
        tracing::error!(request_id, "panic while delivering engine response");
    }
}

/// Resolved engine entry points. Valid only while `_library` is loaded.
pub struct NativeEngine {
    create_context: CreateContextFn,
    destroy_context: DestroyContextFn,
    request: RequestFn,
    read_string: ReadStringFn,
    destroy_string: DestroyStringFn,
    _library: Library,
}

impl NativeEngine {
    /// Load `ton_client` from the default search paths
    pub fn load() -> Result<Self, LoadError> {
        Self::load_with(&LibraryLoader::new(), ENGINE_LIBRARY)
    }

    /// Load the engine by name or absolute path using a custom loader
    pub fn load_with(loader: &LibraryLoader, name: &str) -> Result<Self, LoadError> {
        let library = loader.open(name)?;

        // Symbols are copied out as plain fn pointers; `_library` keeps them valid
        unsafe {
            Ok(Self {
                create_context: symbol(&library, name, "tc_create_context")?,
                destroy_context: symbol(&library, name, "tc_destroy_context")?,
                request: symbol(&library, name, "tc_request")?,
                read_string: symbol(&library, name, "tc_read_string")?,
                destroy_string: symbol(&library, name, "tc_destroy_string")?,
                _library: library,
            })
        }
    }
}

/// # Safety
///
/// `T` must match the symbol's actual signature.
unsafe fn symbol<T: Copy>(
    library: &Library,
    library_name: &str,
    symbol: &str,
) -> Result<T, LoadError> {
    library
        .get::<T>(symbol.as_bytes())
        .map(|sym| *sym)
        .map_err(|_| LoadError::SymbolNotFound {
            library: library_name.to_string(),
            symbol: symbol.to_string(),
        })
}

impl Engine for NativeEngine {
    fn create_context(&self, config_json: &str) -> Vec<u8> {
        let Some(config) = tc_string_data_t::borrowed(config_json.as_bytes()) else {
            let error = oversized_input("config", config_json.len());
            return serde_json::json!({ "error": error }).to_string().into_bytes();
        };

        unsafe {
            let handle = (self.create_context)(config);
            if handle.is_null() {
                return Vec::new();
            }
            let response = (self.read_string)(handle).to_vec();
            (self.destroy_string)(handle);
            response
        }
    }

    fn destroy_context(&self, context: ContextHandle) {
        unsafe { (self.destroy_context)(context) }
    }

    fn request(
        &self,
        context: ContextHandle,
        method: &str,
        params_json: &[u8],
        request_id: RequestId,
        ingress: &Ingress,
    ) {
        let (Some(method_data), Some(params_data)) = (
            tc_string_data_t::borrowed(method.as_bytes()),
            tc_string_data_t::borrowed(params_json),
        ) else {
            let error = oversized_input("request", method.len().max(params_json.len()));
            ingress.deliver(
                request_id,
                error.to_string().into_bytes(),
                ResponseStatus::Error.code(),
                true,
            );
            return;
        };

        unsafe {
            (self.request)(context, method_data, params_data, request_id, response_handler)
        }
    }

    fn correlation_table(&self) -> Arc<CorrelationTable> {
        Arc::clone(response_ingress().table())
    }
}
