//! Typed wrappers over engine methods
//!
//! Each module pairs the engine's request and response shapes with methods
//! on [`Client`](crate::Client) or a borrowed module handle.

pub mod abi;
pub mod client;
pub mod net;
pub mod processing;
pub mod utils;
