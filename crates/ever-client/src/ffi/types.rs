//! C-compatible types of the ton_client interface
//!
//! Layouts mirror `tonclient.h`:
//! - `tc_string_data_t`: borrowed `(pointer, length)` UTF-8 slice
//! - `tc_string_handle_t`: opaque engine-owned string
//! - `tc_response_handler_t`: the response callback

use std::os::raw::c_char;
use std::ptr;

/// Borrowed string slice passed across the boundary in both directions
#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[allow(non_camel_case_types)]
pub struct tc_string_data_t {
    pub content: *const c_char,
    pub len: u32,
}

/// Opaque string owned by the engine; read with `tc_read_string`, free with
/// `tc_destroy_string`
#[repr(C)]
#[allow(non_camel_case_types)]
pub struct tc_string_handle_t {
    _private: [u8; 0],
}

/// Response callback: `(request_id, params_json, response_type, finished)`
#[allow(non_camel_case_types)]
pub type tc_response_handler_t = extern "C" fn(
    request_id: u32,
    params_json: tc_string_data_t,
    response_type: u32,
    finished: bool,
);

/// A byte length as the engine's `u32` length field, if it fits
pub fn wire_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

impl tc_string_data_t {
    /// Borrow `bytes` for the duration of one foreign call.
    ///
    /// The engine copies input strings before returning, so the slice only
    /// needs to outlive the call it is passed to. `None` if the slice is too
    /// long for the length field.
    pub fn borrowed(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return Some(Self::empty());
        }
        Some(Self {
            content: bytes.as_ptr().cast(),
            len: wire_len(bytes.len())?,
        })
    }

    pub fn empty() -> Self {
        Self {
            content: ptr::null(),
            len: 0,
        }
    }

    /// Copy the referenced bytes into owned memory
    ///
    /// # Safety
    ///
    /// `content` must be null or point to at least `len` readable bytes for
    /// the duration of this call.
    pub unsafe fn to_vec(&self) -> Vec<u8> {
        if self.content.is_null() || self.len == 0 {
            return Vec::new();
        }
        std::slice::from_raw_parts(self.content.cast::<u8>(), self.len as usize).to_vec()
    }
}

/// Status code carried by each response fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// 0: success payload
    Success,
    /// 1: error payload
    Error,
    /// 2: stream ended, no payload
    StreamTerminated,
    /// 100: intermediate stream event
    StreamEvent,
    /// Any other code; payload is delivered as-is
    Unknown(u32),
}

impl ResponseStatus {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ResponseStatus::Success,
            1 => ResponseStatus::Error,
            2 => ResponseStatus::StreamTerminated,
            100 => ResponseStatus::StreamEvent,
            other => ResponseStatus::Unknown(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            ResponseStatus::Success => 0,
            ResponseStatus::Error => 1,
            ResponseStatus::StreamTerminated => 2,
            ResponseStatus::StreamEvent => 100,
            ResponseStatus::Unknown(code) => code,
        }
    }
}
