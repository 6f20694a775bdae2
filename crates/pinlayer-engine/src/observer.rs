//! Mutation observer bridge.
//!
//! An element hidden or shown through an attribute (rather than a style
//! change the host already reports) would otherwise keep its stale
//! correction until something unrelated triggers a pass. The bridge watches
//! attribute records while candidates exist and schedules a debounced pass
//! when a visibility attribute changes.

use std::time::Duration;

use pinlayer_dom::{DomTree, MutationRecord};

use crate::config::FixedLayerConfig;
use crate::pass::Pass;

/// Attribute observation plus the pass it schedules.
#[derive(Debug, Clone)]
pub struct MutationBridge {
    update_pass: Pass,
}

impl MutationBridge {
    /// A bridge whose pass fires `debounce` after a relevant mutation.
    #[must_use]
    pub const fn new(debounce: Duration) -> Self {
        Self {
            update_pass: Pass::new(debounce),
        }
    }

    /// [§ 4.3.1 observe()](https://dom.spec.whatwg.org/#dom-mutationobserver-observe)
    ///
    /// Start observing attributes of the whole document. Idempotent.
    pub fn observe(&self, tree: &mut DomTree) {
        if !tree.is_observing() {
            log::trace!(target: crate::TAG, "observing attribute mutations");
        }
        tree.observe_attributes();
    }

    /// Stop observing, dropping the pending pass and queued records.
    pub fn unobserve(&mut self, tree: &mut DomTree) {
        self.clear(tree);
        tree.disconnect_observer();
    }

    /// Drop the pending pass and queued records. Called when a pass runs
    /// for another reason, since it does the same work.
    pub fn clear(&mut self, tree: &mut DomTree) {
        self.update_pass.cancel();
        let _ = tree.take_records();
    }

    /// Handle a batch of records delivered at `now`.
    ///
    /// Records are ignored while a pass is pending; it will see their effect.
    pub fn on_records(&mut self, records: &[MutationRecord], config: &FixedLayerConfig, now: Duration) {
        if self.update_pass.is_pending() {
            return;
        }
        if records
            .iter()
            .any(|record| config.is_visibility_attribute(&record.attribute_name))
        {
            self.update_pass.schedule(now);
        }
    }

    /// Whether a pass is scheduled.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.update_pass.is_pending()
    }

    /// Consume the pending pass if it is due.
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        self.update_pass.fire_if_due(now)
    }
}
