//! Error and warning reporting.
//!
//! Every non-fatal failure in the engine is reported through a
//! [`Diagnostics`] sink, tagged with the component that raised it. Nothing
//! reported here is ever returned to the host as an error.
//!
//! Repeated user-facing warnings (the same message for every pass) go through
//! [`warn_once`] so a page with many pinned elements does not flood the log.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::{Mutex, PoisonError};

use log::Level;

/// A sink for non-fatal failures.
///
/// `tag` names the reporting component (e.g. `"FixedLayer"`).
pub trait Diagnostics {
    /// Report a failure that abandoned some work.
    fn error(&self, tag: &str, message: &str);

    /// Report a recoverable problem, usually an authoring mistake.
    fn warn(&self, tag: &str, message: &str);
}

impl<T: Diagnostics + ?Sized> Diagnostics for Rc<T> {
    fn error(&self, tag: &str, message: &str) {
        (**self).error(tag, message);
    }

    fn warn(&self, tag: &str, message: &str) {
        (**self).warn(tag, message);
    }
}

/// Forwards diagnostics to the [`log`] facade, using the tag as the log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn error(&self, tag: &str, message: &str) {
        log::error!(target: tag, "{message}");
    }

    fn warn(&self, tag: &str, message: &str) {
        log::warn!(target: tag, "{message}");
    }
}

/// One reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// `Level::Error` or `Level::Warn`.
    pub level: Level,
    /// The reporting component.
    pub tag: String,
    /// The message.
    pub message: String,
}

/// Keeps every diagnostic in memory. Used by tests to assert on reports.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    entries: RefCell<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics reported so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.borrow().clone()
    }

    /// Messages reported at `level`.
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|d| d.level == level)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Whether any message at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|d| d.level == level && d.message.contains(needle))
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    fn push(&self, level: Level, tag: &str, message: &str) {
        self.entries.borrow_mut().push(Diagnostic {
            level,
            tag: tag.to_string(),
            message: message.to_string(),
        });
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn error(&self, tag: &str, message: &str) {
        self.push(Level::Error, tag, message);
    }

    fn warn(&self, tag: &str, message: &str) {
        self.push(Level::Warn, tag, message);
    }
}

/// Global set of warnings already reported (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn through `sink`, but only the first time this exact message is seen.
///
/// Returns whether the warning was forwarded.
///
/// # Example
/// ```ignore
/// warn_once(&LogDiagnostics, "FixedLayer", "moving element to the fixed layer");
/// ```
pub fn warn_once(sink: &dyn Diagnostics, tag: &str, message: &str) -> bool {
    let key = format!("[{tag}] {message}");
    let first = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if first {
        sink.warn(tag, message);
    }
    first
}

/// Clear all recorded warnings (call when a new document is attached)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
