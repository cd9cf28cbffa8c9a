//! Async Rust binding for the ton_client engine
//!
//! The engine exposes a callback-based C interface: every request is answered
//! by zero or more fragments delivered on engine-owned threads, tagged with the
//! request id and a status code, the last one flagged `finished`. This crate
//! turns that into futures and streams:
//!
//! - [`Client`] owns an engine context and sends requests
//! - [`PendingResponse`] aggregates one call's fragments into a result
//! - [`Subscription`] reads a streaming call's payloads one by one
//! - [`correlation`] routes callbacks back to the call that is waiting
//!
//! # Example
//!
//! ```no_run
//! use ever_client::Client;
//! use ever_config::{devnet_endpoints, ClientConfig};
//!
//! # async fn run() -> ever_client::ClientResult<()> {
//! let client = Client::connect_native(&ClientConfig::with_endpoints(devnet_endpoints()))?;
//! let version = client.version().await?;
//! println!("engine {}", version.version);
//! client.destroy();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod modules;
pub mod reader;

pub use client::{Client, ClientState, BINDING_LIBRARY};
pub use correlation::{Delivery, Ingress, RequestId, ResponseFragment};
pub use engine::{ContextHandle, Engine};
pub use error::{ClientError, ClientResult, ForeignError};
pub use ffi::{LibraryLoader, LoadError, NativeEngine, ResponseStatus};
pub use reader::{PendingResponse, Subscription};

pub use ever_config::ClientConfig;
