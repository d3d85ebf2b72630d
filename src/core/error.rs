//! Error types for the Ghostwire protocol engine.

use thiserror::Error;

/// Errors that can occur when decoding an inbound wire message.
///
/// A decode failure drops the offending frame; it is never fatal to the
/// session or the listener.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not well-formed JSON.
    #[error("malformed message payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed but lacks the required `text` field.
    #[error("message is missing the required `text` field")]
    MissingText,
}

/// Errors from the local editor surface.
///
/// Any of these received mid-session is a signal to begin teardown,
/// never something to re-raise to the peer.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document was already closed by the user or the surface.
    #[error("document is closed")]
    Closed,

    /// The surface rejected the operation.
    #[error("editor surface error: {0}")]
    Surface(String),
}

/// Errors that can occur in the transport listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind the handshake socket.
    ///
    /// `AddrInUse` is intercepted before this is ever constructed; any
    /// other bind failure is fatal to the caller.
    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    /// I/O error while accepting or negotiating a peer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a sync session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The editor surface failed.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The connection event stream ended unexpectedly.
    #[error("connection event stream closed")]
    ChannelClosed,
}
