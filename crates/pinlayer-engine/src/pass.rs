//! A single deferred run, rescheduled rather than queued.
//!
//! The host owns the clock: times are offsets from any fixed origin, passed
//! in by the caller, and a due run only fires when the host polls.

use std::time::Duration;

/// At most one pending run of some pass.
///
/// Scheduling while a run is pending replaces it, so a burst of triggers
/// fires once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pass {
    delay: Duration,
    due: Option<Duration>,
}

impl Pass {
    /// A pass that fires `delay` after being scheduled.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay, due: None }
    }

    /// Schedule a run `delay` after `now`, superseding a pending one.
    pub fn schedule(&mut self, now: Duration) {
        self.due = Some(now + self.delay);
    }

    /// Whether a run is scheduled and has not fired.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Drop the pending run, if any.
    pub fn cancel(&mut self) {
        self.due = None;
    }

    /// When the pending run fires.
    #[must_use]
    pub const fn due(&self) -> Option<Duration> {
        self.due
    }

    /// Consume the pending run if it is due at `now`. Returns whether the
    /// caller should run the pass.
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.due {
            Some(due) if due <= now => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
