//! Ghostwire - Wire protocol.
//!
//! JSON message codec and the discovery handshake body types. Pure
//! data, no side effects; the transport layer owns the sockets.

mod message;

pub use message::*;
