//! Common utilities for the pinlayer engine.
//!
//! This crate provides shared infrastructure used by all engine components:
//! - **Diagnostics** - the error/warning sink every component reports through,
//!   with de-duplication for repeated user-facing warnings

pub mod diagnostics;

pub use diagnostics::{
    Diagnostic, Diagnostics, LogDiagnostics, RecordingDiagnostics, clear_warnings, warn_once,
};
