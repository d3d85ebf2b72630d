//! The per-connection sync state machine.
//!
//! One [`SyncSession`] pairs one peer channel with at most one local
//! document and keeps the two synchronized until either side goes
//! away:
//!
//! ```text
//! Unbound ──first inbound message──▶ Bound ──either side closes──▶ Closed
//!    │                                                               ▲
//!    └──────────────peer closes before any message──────────────────┘
//! ```
//!
//! While `Bound`, inbound messages replace the whole document (the
//! protocol is full-replace, never a diff) under the session's
//! [`EchoGuard`], and document change notifications made while the
//! guard is free are sent back out as full-text messages. Teardown is
//! one-shot no matter which side triggers it, or how many times.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::guard::EchoGuard;
use super::registry::SessionTicket;
use crate::core::{DocumentError, DocumentHandle, EditorSurface};
use crate::protocol::{Message, Selection, utf16_len};
use crate::transport::{Connection, ConnectionEvent, SendHandle};

/// Signal from a document callback into the session loop.
enum Signal {
    /// The local document was closed (by the user or the surface).
    DocumentClosed,
}

/// Session state. The document handle exists only while `Bound`.
enum State {
    /// No local document yet; waiting for the first inbound message.
    Unbound,
    /// Two-way sync is active.
    Bound(Arc<dyn DocumentHandle>),
    /// Terminal. All resources released.
    Closed,
}

/// The lifetime-bound pairing of one peer channel and one local
/// document.
pub struct SyncSession {
    connection: Connection,
    surface: Arc<dyn EditorSurface>,
    guard: EchoGuard,
    state: State,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    /// Held for the session's lifetime; deregisters on drop.
    ticket: Option<SessionTicket>,
}

impl SyncSession {
    /// Create a session bound to the given connection.
    ///
    /// The local document is not opened here; it is created lazily by
    /// the first inbound message.
    pub fn new(
        connection: Connection,
        surface: Arc<dyn EditorSurface>,
        ticket: Option<SessionTicket>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            connection,
            surface,
            guard: EchoGuard::new(),
            state: State::Unbound,
            signal_tx,
            signal_rx,
            ticket,
        }
    }

    /// Drive the session until either side closes, then tear down.
    ///
    /// Inbound messages are handled one at a time, in arrival order; a
    /// new message is only taken up after the previous one's document
    /// mutation has fully completed.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.connection.recv() => match event {
                    Some(ConnectionEvent::Message(msg)) => {
                        if let Err(e) = self.handle_message(msg) {
                            debug!("document rejected update, closing session: {e}");
                            break;
                        }
                    }
                    Some(ConnectionEvent::Closed) | None => {
                        debug!("peer channel closed");
                        break;
                    }
                },
                signal = self.signal_rx.recv() => match signal {
                    Some(Signal::DocumentClosed) => {
                        debug!("local document closed");
                        break;
                    }
                    // Impossible: the session holds a sender.
                    None => break,
                },
            }
        }
        self.teardown();
    }

    /// Apply one inbound message in the current state.
    fn handle_message(&mut self, msg: Message) -> Result<(), DocumentError> {
        match &self.state {
            State::Unbound => self.bind(msg),
            State::Bound(doc) => {
                let doc = doc.clone();
                self.apply_remote(&doc, msg)
            }
            // The session is dead; do not resurrect state.
            State::Closed => Ok(()),
        }
    }

    /// Unbound → Bound: open the local document with the initial text
    /// and wire up its change and close notifications.
    fn bind(&mut self, msg: Message) -> Result<(), DocumentError> {
        let selections = clamp_all(&msg.selections, utf16_len(&msg.text));
        let doc = self.surface.open(msg.into_init())?;

        // Callbacks registered after the initial population, so the
        // open itself never echoes back to the peer.
        doc.on_changed(changed_callback(
            Arc::downgrade(&doc),
            self.guard.clone(),
            self.connection.sender(),
        ));

        let signal_tx = self.signal_tx.clone();
        doc.on_closed(Box::new(move || {
            let _ = signal_tx.send(Signal::DocumentClosed);
        }));

        // Bound from here on: if applying the initial selections
        // fails below, teardown still owns and closes the document.
        self.state = State::Bound(doc.clone());

        // An empty list means "no selection to apply", not "collapse
        // to a default cursor".
        if !selections.is_empty() {
            doc.set_selections(&selections)?;
        }

        Ok(())
    }

    /// Bound → Bound: full-buffer replace under the echo guard.
    fn apply_remote(
        &mut self,
        doc: &Arc<dyn DocumentHandle>,
        msg: Message,
    ) -> Result<(), DocumentError> {
        let _scope = self.guard.enter();
        doc.replace_all(&msg.text)?;
        let selections = clamp_all(&msg.selections, utf16_len(&msg.text));
        if !selections.is_empty() {
            doc.set_selections(&selections)?;
        }
        Ok(())
        // Guard scope drops here, and on the error paths above.
    }

    /// One-shot teardown: close the connection, close the document if
    /// one was ever opened, release the registration.
    ///
    /// Safe against duplicate triggers: the first call moves the state
    /// to `Closed` and every later call sees `Closed` and returns.
    fn teardown(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Closed);
        if matches!(state, State::Closed) {
            return;
        }
        self.connection.close();
        if let State::Bound(doc) = state {
            doc.close();
        }
        self.ticket.take();
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Clamp every selection into the just-applied text.
fn clamp_all(selections: &[Selection], len: u64) -> Vec<Selection> {
    selections.iter().map(|s| s.clamp(len)).collect()
}

/// Change handler for the local document.
///
/// Runs synchronously at mutation time. A held guard means the change
/// is the echo of a remote update and is ignored entirely; otherwise
/// the full text and current selections go out on the wire.
fn changed_callback(
    doc: std::sync::Weak<dyn DocumentHandle>,
    guard: EchoGuard,
    sender: SendHandle,
) -> Box<dyn Fn() + Send + Sync> {
    Box::new(move || {
        if guard.is_held() {
            return;
        }
        let Some(doc) = doc.upgrade() else {
            return;
        };
        match (doc.text(), doc.selections()) {
            (Ok(text), Ok(selections)) => sender.send(&text, selections),
            (Err(e), _) | (_, Err(e)) => {
                warn!("could not read document for outbound sync: {e}");
            }
        }
    })
}
