//! In-memory editor surface for tests.
//!
//! [`FakeDocument`] dispatches change and close callbacks
//! synchronously at mutation time, exactly as the [`DocumentHandle`]
//! contract requires, and records every operation so tests can assert
//! on them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::{
    ChangedCallback, ClosedCallback, DocumentError, DocumentHandle, DocumentInit,
    EditorSurface,
};
use crate::protocol::Selection;

#[derive(Default)]
struct DocState {
    text: String,
    selections: Vec<Selection>,
}

/// Recording in-memory document.
pub(crate) struct FakeDocument {
    state: Mutex<DocState>,
    changed_cbs: Mutex<Vec<ChangedCallback>>,
    closed_cbs: Mutex<Vec<ClosedCallback>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
    fail_next_replace: AtomicBool,
    fail_next_set_selections: AtomicBool,
}

impl FakeDocument {
    fn new(text: String) -> Self {
        Self {
            state: Mutex::new(DocState {
                text,
                selections: Vec::new(),
            }),
            changed_cbs: Mutex::new(Vec::new()),
            closed_cbs: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            fail_next_replace: AtomicBool::new(false),
            fail_next_set_selections: AtomicBool::new(false),
        }
    }

    /// Simulate an edit made by the user on the surface.
    pub(crate) fn user_edit(&self, text: &str, selections: Vec<Selection>) {
        {
            let mut state = self.state.lock().unwrap();
            state.text = text.to_string();
            state.selections = selections;
        }
        self.fire_changed();
    }

    /// Simulate the user closing the document view.
    pub(crate) fn user_close(&self) {
        self.close();
    }

    /// Make the next `replace_all` fail with a surface error.
    pub(crate) fn fail_next_replace(&self) {
        self.fail_next_replace.store(true, Ordering::SeqCst);
    }

    /// Make the next `set_selections` fail with a surface error.
    pub(crate) fn fail_next_set_selections(&self) {
        self.fail_next_set_selections.store(true, Ordering::SeqCst);
    }

    pub(crate) fn current_text(&self) -> String {
        self.state.lock().unwrap().text.clone()
    }

    pub(crate) fn current_selections(&self) -> Vec<Selection> {
        self.state.lock().unwrap().selections.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of *effective* closes (idempotent repeats not counted).
    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn fire_changed(&self) {
        // Callbacks run without the state lock held; they read the
        // document back through the handle.
        let cbs = self.changed_cbs.lock().unwrap();
        for cb in cbs.iter() {
            cb();
        }
    }
}

impl DocumentHandle for FakeDocument {
    fn replace_all(&self, text: &str) -> Result<(), DocumentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocumentError::Closed);
        }
        if self.fail_next_replace.swap(false, Ordering::SeqCst) {
            return Err(DocumentError::Surface("replace rejected".into()));
        }
        self.state.lock().unwrap().text = text.to_string();
        self.fire_changed();
        Ok(())
    }

    fn set_selections(&self, selections: &[Selection]) -> Result<(), DocumentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocumentError::Closed);
        }
        if self.fail_next_set_selections.swap(false, Ordering::SeqCst) {
            return Err(DocumentError::Surface("selections rejected".into()));
        }
        self.state.lock().unwrap().selections = selections.to_vec();
        Ok(())
    }

    fn text(&self) -> Result<String, DocumentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocumentError::Closed);
        }
        Ok(self.current_text())
    }

    fn selections(&self) -> Result<Vec<Selection>, DocumentError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DocumentError::Closed);
        }
        Ok(self.current_selections())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let cbs = self.closed_cbs.lock().unwrap();
        for cb in cbs.iter() {
            cb();
        }
    }

    fn on_changed(&self, cb: ChangedCallback) {
        self.changed_cbs.lock().unwrap().push(cb);
    }

    fn on_closed(&self, cb: ClosedCallback) {
        self.closed_cbs.lock().unwrap().push(cb);
    }
}

/// Surface that opens [`FakeDocument`]s and records each open.
pub(crate) struct FakeSurface {
    docs: Mutex<Vec<Arc<FakeDocument>>>,
    inits: Mutex<Vec<DocumentInit>>,
    fail_first_set_selections: AtomicBool,
}

impl FakeSurface {
    pub(crate) fn new() -> Self {
        Self {
            docs: Mutex::new(Vec::new()),
            inits: Mutex::new(Vec::new()),
            fail_first_set_selections: AtomicBool::new(false),
        }
    }

    /// Arm the next opened document to reject its first
    /// `set_selections` call.
    pub(crate) fn fail_first_set_selections(&self) {
        self.fail_first_set_selections.store(true, Ordering::SeqCst);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub(crate) fn document(&self, index: usize) -> Option<Arc<FakeDocument>> {
        self.docs.lock().unwrap().get(index).cloned()
    }

    pub(crate) fn init(&self, index: usize) -> Option<DocumentInit> {
        self.inits.lock().unwrap().get(index).cloned()
    }
}

impl EditorSurface for FakeSurface {
    fn open(&self, init: DocumentInit) -> Result<Arc<dyn DocumentHandle>, DocumentError> {
        let doc = Arc::new(FakeDocument::new(init.text.clone()));
        if self.fail_first_set_selections.swap(false, Ordering::SeqCst) {
            doc.fail_next_set_selections();
        }
        self.inits.lock().unwrap().push(init);
        self.docs.lock().unwrap().push(doc.clone());
        Ok(doc)
    }
}
