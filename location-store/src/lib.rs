#![deny(rust_2018_idioms)]

//! Durable last-known position per vessel.
//!
//! Mutations are applied in memory by a single worker task and persisted as
//! one JSON snapshot after a debounce window, so callers never wait on storage.

mod error;
mod file;
#[cfg(feature = "test")]
mod memory;
mod store;

pub use error::*;
pub use file::*;
#[cfg(feature = "test")]
pub use memory::*;
pub use store::*;
