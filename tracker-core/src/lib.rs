#![deny(rust_2018_idioms)]

//! Domain types and ports shared by the vessel tracking crates.

mod domain;
mod environment;
pub mod error;
mod ports;
mod timer;

pub use domain::*;
pub use environment::*;
pub use error::{Error, Result};
pub use ports::*;
pub use timer::*;
