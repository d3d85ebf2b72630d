//! Capability traits the sync engine is written against.
//!
//! The engine never talks to a concrete editor. The host injects an
//! [`EditorSurface`] (the thing that can open documents) and optionally
//! a [`ConnectionCounter`] (the diagnostic session-count sink); the
//! engine owns everything in between.

use std::sync::Arc;

use super::error::DocumentError;
use crate::protocol::Selection;

/// Metadata carried by the first inbound message of a session.
///
/// Everything except `text` is informational; surfaces may use it to
/// title the view or pick a syntax mode, or ignore it entirely.
#[derive(Debug, Clone, Default)]
pub struct DocumentInit {
    /// Initial full document contents.
    pub text: String,
    /// Page title of the originating browser tab, if sent.
    pub title: Option<String>,
    /// URL of the originating page, if sent.
    pub url: Option<String>,
    /// Syntax hint (e.g. "markdown"), if sent.
    pub syntax: Option<String>,
}

/// Callback invoked by a surface when the document content changes.
pub type ChangedCallback = Box<dyn Fn() + Send + Sync>;

/// Callback invoked by a surface when the document is closed.
pub type ClosedCallback = Box<dyn Fn() + Send + Sync>;

/// Handle to one open document on the editor surface.
///
/// # Callback dispatch
///
/// Implementations MUST invoke the registered [`ChangedCallback`]
/// synchronously, before `replace_all` or any other mutating call
/// returns, for mutations made *through this handle*, and at the point
/// of mutation for edits made by the user. The engine's echo
/// suppression relies on this: a replace driven by a remote message
/// happens while the session holds its re-entrancy guard, so the
/// change notification observes the guard as held and is not reflected
/// back to the peer.
pub trait DocumentHandle: Send + Sync {
    /// Replace the entire document contents.
    fn replace_all(&self, text: &str) -> Result<(), DocumentError>;

    /// Set the cursor/selection ranges. Offsets are UTF-16 code-unit
    /// offsets into the current text, already clamped by the caller.
    fn set_selections(&self, selections: &[Selection]) -> Result<(), DocumentError>;

    /// Read the full current document text.
    fn text(&self) -> Result<String, DocumentError>;

    /// Read the current selection ranges as UTF-16 code-unit offsets.
    fn selections(&self) -> Result<Vec<Selection>, DocumentError>;

    /// Close the document. Idempotent; a second call is a no-op.
    fn close(&self);

    /// Register the change-notification callback.
    fn on_changed(&self, cb: ChangedCallback);

    /// Register the closed-notification callback. Fired at most once.
    fn on_closed(&self, cb: ClosedCallback);
}

/// The editor surface capability: opens local documents.
pub trait EditorSurface: Send + Sync {
    /// Open a new document pre-populated with the given contents.
    fn open(&self, init: DocumentInit) -> Result<Arc<dyn DocumentHandle>, DocumentError>;
}

/// Diagnostic sink for the live connection count.
///
/// Every method is best-effort: implementations log failures and
/// return; nothing here may ever block or fail a sync session.
pub trait ConnectionCounter: Send + Sync {
    /// Write the initial (zero) count at startup.
    fn init(&self);

    /// Record one more live session.
    fn increment(&self);

    /// Record one fewer live session.
    fn decrement(&self);

    /// Force any buffered count out to the backing store.
    fn flush(&self);
}

/// A [`ConnectionCounter`] that discards everything. Useful in tests
/// and for hosts that do not care about the diagnostic file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCounter;

impl ConnectionCounter for NoopCounter {
    fn init(&self) {}
    fn increment(&self) {}
    fn decrement(&self) {}
    fn flush(&self) {}
}
