//! Re-entrancy guard for echo suppression.
//!
//! When a session applies a remote message to its local document, the
//! surface fires the same change notification a user edit would. The
//! guard is how the change handler tells the two apart: the session
//! holds the guard across the mutation, the handler checks it, and a
//! held guard means "this change came from the wire - do not send it
//! back".

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared re-entrancy counter. Cheap to clone; all clones observe the
/// same count.
///
/// Acquisition is scoped: [`enter`](EchoGuard::enter) returns an RAII
/// scope that releases on drop, so the count returns to zero on every
/// exit path, including failed document operations.
#[derive(Debug, Clone, Default)]
pub struct EchoGuard {
    count: Arc<AtomicUsize>,
}

impl EchoGuard {
    /// A fresh guard with a count of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for the duration of the returned scope.
    pub fn enter(&self) -> EchoGuardScope {
        self.count.fetch_add(1, Ordering::AcqRel);
        EchoGuardScope {
            count: self.count.clone(),
        }
    }

    /// Whether any scope is currently held.
    pub fn is_held(&self) -> bool {
        self.depth() > 0
    }

    /// Current nesting depth. Zero whenever no remote-driven mutation
    /// is in flight.
    pub fn depth(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

/// RAII scope holding an [`EchoGuard`] acquisition.
#[derive(Debug)]
pub struct EchoGuardScope {
    count: Arc<AtomicUsize>,
}

impl Drop for EchoGuardScope {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}
