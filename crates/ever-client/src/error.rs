//! Error types for client operations

use crate::client::ClientState;
use crate::ffi::LoadError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error reported by the engine itself, decoded from an error-status payload.
///
/// The engine sends `{"code": ..., "message": ..., "data": ...}`. Payloads that
/// are not JSON objects keep their text as the message with code 0.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ForeignError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ForeignError {
    /// Decode an error payload delivered with status 1
    pub fn from_payload(payload: &[u8]) -> Self {
        serde_json::from_slice(payload).unwrap_or_else(|_| Self {
            code: 0,
            message: String::from_utf8_lossy(payload).into_owned(),
            data: serde_json::Value::Null,
        })
    }
}

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// The client shut down while the call was still waiting
    #[error("transport closed: client was destroyed while waiting for a response")]
    TransportClosed,

    #[error("engine error: {0}")]
    Foreign(#[from] ForeignError),

    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request params: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("cannot {operation} while client is {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },

    #[error("no final response within {0:?}")]
    Timeout(Duration),

    /// Input longer than the engine's `u32` length field
    #[error("payload of {0} bytes is too large for the engine")]
    PayloadTooLarge(usize),

    #[error("failed to create client context: {0}")]
    ContextCreation(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl ClientError {
    /// The engine error code, if the engine reported this failure
    pub fn foreign_code(&self) -> Option<i64> {
        match self {
            ClientError::Foreign(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
