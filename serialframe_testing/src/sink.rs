//! Diagnostic sink that keeps every event for later assertions.

use std::sync::Mutex;

use serialframe::{Diagnostic, DiagnosticSink};

/// Records diagnostics in arrival order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<Diagnostic> { self.events.lock().expect("sink poisoned").clone() }

    /// Remove and return the events recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.lock().expect("sink poisoned"))
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Diagnostic) -> bool) -> usize {
        self.events
            .lock()
            .expect("sink poisoned")
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: &Diagnostic) {
        self.events.lock().expect("sink poisoned").push(event.clone());
    }
}
