//! Protocol constants for the GhostText wire protocol.
//!
//! These values are fixed by the protocol as spoken by the browser-side
//! extensions and MUST NOT be changed.

/// Protocol version advertised in the discovery handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default TCP port for the discovery handshake endpoint.
///
/// Browser extensions poll `http://localhost:4001` by convention.
pub const DEFAULT_HTTP_PORT: u16 = 4001;

/// Per-connection inbound event queue depth.
///
/// A session drains its queue one message at a time; the bound only
/// matters when a peer floods faster than the editor surface can apply
/// edits, in which case the reader applies backpressure to the socket.
pub const EVENT_QUEUE_DEPTH: usize = 64;

/// File name (under the home directory) of the diagnostic counter file.
pub const COUNTER_FILE_NAME: &str = ".ghost-text";
