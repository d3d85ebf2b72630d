//! Ghostwire - Session layer.
//!
//! The bidirectional sync core: the per-connection state machine
//! ([`SyncSession`]), the echo-suppression guard ([`EchoGuard`]), and
//! session lifecycle accounting ([`SessionRegistry`]).

mod guard;
mod registry;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use guard::*;
pub use registry::*;
pub use sync::*;
