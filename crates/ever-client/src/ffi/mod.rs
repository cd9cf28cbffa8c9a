//! Foreign interface to the ton_client engine
//!
//! - `types`: C layouts and response status codes
//! - `loader`: locating and opening the shared library
//! - `native`: the `Engine` implementation over the loaded library
//!
//! All unsafe code of the crate is isolated in this module.

pub mod loader;
pub mod native;
pub mod types;

pub use loader::{LibraryLoader, LoadError, ENGINE_LIBRARY, LIBRARY_DIR_ENV};
pub use native::NativeEngine;
pub use types::{tc_string_data_t, wire_len, ResponseStatus};
