//! Ghostwire - Core traits, constants, and error types.
//!
//! Everything here is I/O-free; the transport and session layers build
//! on these definitions.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
