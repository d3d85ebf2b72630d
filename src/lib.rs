//! # Ghostwire
//!
//! A server-side engine for the GhostText protocol: it bridges a text
//! field in a remote browser with a local text-editing surface,
//! keeping both copies of the document synchronized in near-real-time
//! over a persistent WebSocket channel.
//!
//! - **Discovery**: a small HTTP endpoint on a well-known port answers
//!   `{"ProtocolVersion": 1, "WebSocketPort": <port>}`, telling the
//!   peer where to open its channel.
//! - **Full-replace sync**: every update carries the complete document
//!   text plus selection ranges; the protocol is last-writer-wins, not
//!   operational transform.
//! - **Echo suppression**: remotely applied edits are never reflected
//!   back to the peer as if they were local edits.
//!
//! The engine never talks to a concrete editor. Hosts implement the
//! [`EditorSurface`](core::EditorSurface) capability (open a document,
//! surface change/close notifications) and hand it to a
//! [`GhostServer`](server::GhostServer); everything between the wire
//! and that capability is owned here.
//!
//! ## Modules
//!
//! - [`core`]: capability traits, constants, and error types
//! - [`protocol`]: JSON wire messages and the handshake body
//! - [`transport`]: handshake endpoint, WebSocket channels, [`transport::Connection`]
//! - [`session`]: the sync state machine, echo guard, and lifecycle registry
//! - [`server`]: high-level server API
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ghostwire::server::{GhostServer, GhostServerBuilder};
//!
//! // `MyEditor` implements ghostwire::core::EditorSurface.
//! let config = GhostServerBuilder::new(Arc::new(MyEditor::new())).build();
//! let server = GhostServer::bind(config).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::protocol::*;
    pub use crate::server::*;
    pub use crate::session::*;
    pub use crate::transport::*;
}

// Re-export commonly used items at crate root
pub use crate::core::{
    ConnectionCounter, DecodeError, DocumentError, DocumentHandle, DocumentInit,
    EditorSurface, ListenerError, PROTOCOL_VERSION,
};
pub use crate::protocol::{HandshakeReply, Message, Selection};
pub use crate::server::{GhostServer, GhostServerBuilder, ServerConfig};
pub use crate::session::{EchoGuard, SessionRegistry, SyncSession};
pub use crate::transport::{Connection, ConnectionEvent, SendHandle, TransportListener};
