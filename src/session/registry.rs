//! Session lifecycle accounting.
//!
//! The registry tracks how many sessions are live and mirrors the
//! count into an injected [`ConnectionCounter`]. Registration is RAII:
//! a [`SessionTicket`] decrements exactly once on drop, which is what
//! makes the count immune to the "teardown from both sides" race.
//!
//! Counter writes are diagnostics. They are fire-and-forget and
//! best-effort; a failing counter never blocks or fails a session.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::core::{COUNTER_FILE_NAME, ConnectionCounter};

/// Tracks live sessions and drives the diagnostic counter.
#[derive(Clone)]
pub struct SessionRegistry {
    active: Arc<AtomicUsize>,
    counter: Arc<dyn ConnectionCounter>,
}

impl SessionRegistry {
    /// Create a registry backed by the given counter. The counter's
    /// `init` runs once, here.
    pub fn new(counter: Arc<dyn ConnectionCounter>) -> Self {
        counter.init();
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            counter,
        }
    }

    /// Register one live session. The returned ticket deregisters on
    /// drop, exactly once.
    pub fn register(&self) -> SessionTicket {
        self.active.fetch_add(1, Ordering::AcqRel);
        self.counter.increment();
        SessionTicket {
            active: self.active.clone(),
            counter: self.counter.clone(),
        }
    }

    /// Number of currently live sessions.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Push any buffered diagnostic count out to the backing store.
    pub fn flush(&self) {
        self.counter.flush();
    }
}

/// RAII registration for one session.
pub struct SessionTicket {
    active: Arc<AtomicUsize>,
    counter: Arc<dyn ConnectionCounter>,
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        self.counter.decrement();
    }
}

/// [`ConnectionCounter`] writing the live count to a small file
/// (`~/.ghost-text` by default), for external diagnostics.
///
/// Writes happen off the caller's path when a tokio runtime is
/// available, synchronously otherwise. Failures are logged at debug
/// and swallowed.
pub struct CounterFile {
    path: PathBuf,
    count: AtomicUsize,
}

impl CounterFile {
    /// Counter file at the conventional home-directory location.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::with_path(home.join(COUNTER_FILE_NAME))
    }

    /// Counter file at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            count: AtomicUsize::new(0),
        }
    }

    fn persist(&self) {
        let path = self.path.clone();
        let value = self.count.load(Ordering::Acquire).to_string();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = tokio::fs::write(&path, value).await {
                    debug!("counter file write failed: {e}");
                }
            });
        } else if let Err(e) = std::fs::write(&path, value) {
            debug!("counter file write failed: {e}");
        }
    }
}

impl Default for CounterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionCounter for CounterFile {
    fn init(&self) {
        self.count.store(0, Ordering::Release);
        self.persist();
    }

    fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
        self.persist();
    }

    fn decrement(&self) {
        // Saturating: a stray decrement must not wrap the diagnostic.
        let _ = self.count.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |n| n.checked_sub(1),
        );
        self.persist();
    }

    fn flush(&self) {
        self.persist();
    }
}
