//! Ghostwire - Transport layer.
//!
//! Owns the sockets: the discovery handshake endpoint, the per-peer
//! WebSocket channels, and the [`Connection`] abstraction the session
//! layer consumes. The session layer never sees a socket; it sees an
//! ordered event stream and a send handle.

mod connection;
mod listener;

pub use connection::*;
pub use listener::*;
