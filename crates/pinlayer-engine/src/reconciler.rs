//! Measure/mutate reconciler.
//!
//! One pass over all candidates, split the way the host batches work:
//!
//! 1. [`measure`] probes every candidate's auto-top baseline, then reads
//!    computed styles and boxes. Nothing it leaves behind is observable: the
//!    probe styles are removed before it returns, even on failure.
//! 2. [`Reconciler::mutate`] writes the corrected `top`, and relocates or
//!    returns candidates when relocation is enabled.

use std::collections::HashMap;

use pinlayer_common::Diagnostics;
use pinlayer_dom::{DomError, DomTree};
use serde::Serialize;

use crate::config::FixedLayerConfig;
use crate::host::LayoutProbe;
use crate::padding::{ViewportPadding, px, same_px};
use crate::registry::{Candidate, PositionKind};
use crate::transfer::{BodyTransferLayer, TransferLayer};
use crate::{LayoutError, PassError, TAG};

/// What the measure phase learned about one candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CandidateState {
    /// Computed `position: fixed` with a layout box (or forced).
    pub fixed: bool,
    /// Computed `position: sticky` or a prefixed variant.
    pub sticky: bool,
    /// Eligible for relocation.
    pub transferrable: bool,
    /// The `top` to anchor to, or empty when the element has none.
    pub top: String,
    /// Computed `z-index`.
    pub z_index: String,
    /// Computed `transform`.
    pub transform: String,
}

/// Result of the measure phase, keyed by candidate id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MeasureState {
    /// Per-candidate state.
    pub states: HashMap<String, CandidateState>,
    /// Whether any candidate is transferrable.
    pub has_transferables: bool,
}

impl MeasureState {
    /// The state measured for candidate `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CandidateState> {
        self.states.get(id)
    }
}

/// The read phase.
///
/// The auto-top probe pushes every candidate far below the viewport with
/// an important `bottom` and no `top`, reads the resulting computed `top`,
/// then restores `bottom` and `transition`. An element whose computed `top`
/// equals that baseline never declared one. All probe styles are written
/// before any is read so the host performs a single layout.
///
/// A layout query that fails for one candidate is reported through
/// `diagnostics` and leaves that candidate neither fixed nor sticky for
/// this pass; the others are measured normally.
///
/// # Errors
///
/// Propagates the first tree error. The probe styles are cleared from every
/// candidate even when a probe write failed.
pub fn measure(
    tree: &mut DomTree,
    candidates: &[Candidate],
    layout: &dyn LayoutProbe,
    padding: &ViewportPadding,
    config: &FixedLayerConfig,
    diagnostics: &dyn Diagnostics,
) -> Result<MeasureState, PassError> {
    let probed = probe(tree, candidates, config);
    let auto_tops: Vec<Result<Option<String>, LayoutError>> = if probed.is_ok() {
        candidates
            .iter()
            .map(|candidate| {
                layout
                    .computed_style(tree, candidate.element)
                    .map(|style| style.map(|style| style.top))
            })
            .collect()
    } else {
        Vec::new()
    };
    let restored = unprobe(tree, candidates);
    probed?;
    restored?;

    let mut state = MeasureState::default();
    for (candidate, auto_top) in candidates.iter().zip(auto_tops) {
        let measured = auto_top
            .and_then(|auto_top| measure_candidate(tree, candidate, auto_top.as_deref(), layout, padding, config))
            .unwrap_or_else(|err| {
                diagnostics.warn(TAG, &format!("Failed to measure {}: {err}", candidate.id));
                CandidateState::default()
            });
        state.has_transferables |= measured.transferrable;
        let _ = state.states.insert(candidate.id.clone(), measured);
    }
    Ok(state)
}

fn probe(tree: &mut DomTree, candidates: &[Candidate], config: &FixedLayerConfig) -> Result<(), DomError> {
    for candidate in candidates {
        tree.set_important_style(candidate.element, "bottom", &config.probe_bottom)?;
        tree.set_style(candidate.element, "top", "")?;
        tree.set_important_style(candidate.element, "transition", "none")?;
    }
    Ok(())
}

/// Clear the probe styles of every candidate, returning the first failure.
fn unprobe(tree: &mut DomTree, candidates: &[Candidate]) -> Result<(), DomError> {
    let mut result = Ok(());
    for candidate in candidates {
        result = result.and(tree.set_style(candidate.element, "bottom", ""));
        result = result.and(tree.set_style(candidate.element, "transition", ""));
    }
    result
}

fn measure_candidate(
    tree: &DomTree,
    candidate: &Candidate,
    auto_top: Option<&str>,
    layout: &dyn LayoutProbe,
    padding: &ViewportPadding,
    config: &FixedLayerConfig,
) -> Result<CandidateState, LayoutError> {
    // Some hosts return no style for elements of hidden frames.
    let Some(style) = layout.computed_style(tree, candidate.element)? else {
        return Ok(CandidateState::default());
    };
    let metrics = layout.box_metrics(tree, candidate.element)?;

    // A fixed element without a box (e.g. an empty container) is not worth
    // correcting unless relocation is forced. Only fixed registrations count.
    let fixed = candidate.kind == PositionKind::Fixed
        && style.position == "fixed"
        && (candidate.force_transfer == Some(true) || metrics.has_area());
    let sticky = style.position.ends_with("sticky");
    if style.display == "none" || !(fixed || sticky) {
        return Ok(CandidateState::default());
    }

    let implicit_top = style.top == "auto" || auto_top != Some(style.top.as_str());
    let top = if !implicit_top {
        style.top.clone()
    } else if fixed && same_px(metrics.offset_top, padding.committed() + config.border_top) {
        // Flush with the top of the viewport: anchor it there.
        "0px".to_string()
    } else {
        String::new()
    };

    let transferrable = fixed
        && candidate.force_transfer.unwrap_or_else(|| {
            style.opacity.trim().parse::<f64>().unwrap_or(0.0) > 0.0
                && metrics.offset_height < config.transfer_height_cap
                && (is_zero_length(&top) || is_zero_length(&style.bottom))
        });

    Ok(CandidateState {
        fixed,
        sticky,
        transferrable,
        top,
        z_index: style.z_index,
        transform: style.transform,
    })
}

/// Whether `value` is a zero length or percentage (`0`, `0px`, `-0.0vh`).
fn is_zero_length(value: &str) -> bool {
    value
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%')
        .parse::<f64>()
        .is_ok_and(|n| n.abs() < f64::EPSILON)
}

/// Owns the transfer layer and runs the write phase.
pub struct Reconciler {
    transfer: bool,
    z_index_base: u32,
    layer: Option<Box<dyn TransferLayer>>,
    visible: bool,
    lightbox: bool,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("transfer", &self.transfer)
            .field("z_index_base", &self.z_index_base)
            .field("layer", &self.layer.as_ref().map(|layer| layer.root()))
            .field("visible", &self.visible)
            .field("lightbox", &self.lightbox)
            .finish()
    }
}

impl Reconciler {
    /// A reconciler that relocates eligible fixed elements when `transfer`
    /// is set. The body layer is created on the first pass that needs it.
    #[must_use]
    pub const fn new(transfer: bool, z_index_base: u32) -> Self {
        Self {
            transfer,
            z_index_base,
            layer: None,
            visible: true,
            lightbox: false,
        }
    }

    /// Use `layer` instead of a lazily created body layer.
    #[must_use]
    pub fn with_layer(mut self, layer: Box<dyn TransferLayer>) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Whether relocation is enabled.
    #[must_use]
    pub const fn is_transfer_enabled(&self) -> bool {
        self.transfer
    }

    /// The transfer layer, once created.
    #[must_use]
    pub fn layer(&self) -> Option<&dyn TransferLayer> {
        self.layer.as_deref()
    }

    /// Show or hide the transfer layer. Remembered for a layer created later.
    /// The layer stays hidden while in lightbox mode.
    ///
    /// # Errors
    ///
    /// Fails when the layer root cannot be styled.
    pub fn set_visible(&mut self, tree: &mut DomTree, visible: bool) -> Result<(), PassError> {
        self.visible = visible;
        let shown = self.is_layer_shown();
        if let Some(layer) = self.layer.as_mut() {
            layer.set_visible(tree, shown)?;
        }
        Ok(())
    }

    /// Enter or leave lightbox mode. Remembered for a layer created later.
    ///
    /// # Errors
    ///
    /// Fails when the layer root cannot be updated.
    pub fn set_lightbox_mode(&mut self, tree: &mut DomTree, on: bool) -> Result<(), PassError> {
        self.lightbox = on;
        let shown = self.is_layer_shown();
        if let Some(layer) = self.layer.as_mut() {
            layer.set_lightbox_mode(tree, on)?;
            layer.set_visible(tree, shown)?;
        }
        Ok(())
    }

    /// Whether the layer is currently shown.
    #[must_use]
    pub const fn is_layer_shown(&self) -> bool {
        self.visible && !self.lightbox
    }

    /// Undo the relocation of `candidate`, if there is a layer.
    ///
    /// # Errors
    ///
    /// Fails when a tree operation fails.
    pub fn return_from(&mut self, tree: &mut DomTree, candidate: &Candidate) -> Result<(), PassError> {
        match self.layer.as_mut() {
            Some(layer) => layer.return_from(tree, candidate),
            None => Ok(()),
        }
    }

    fn ensure_layer(&mut self, tree: &mut DomTree) -> Result<&mut (dyn TransferLayer + 'static), PassError> {
        if self.layer.is_none() {
            let mut layer = BodyTransferLayer::new(tree, self.z_index_base)?;
            if self.lightbox {
                layer.set_lightbox_mode(tree, true)?;
            }
            if !self.is_layer_shown() {
                layer.set_visible(tree, false)?;
            }
            self.layer = Some(Box::new(layer));
        }
        self.layer.as_deref_mut().ok_or(PassError::MissingBody)
    }

    /// The write phase.
    ///
    /// Candidates without a measured state are left alone.
    ///
    /// # Errors
    ///
    /// Propagates the first tree error. Writes already made are kept.
    pub fn mutate(
        &mut self,
        tree: &mut DomTree,
        candidates: &mut [Candidate],
        state: &MeasureState,
        padding: &ViewportPadding,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), PassError> {
        if state.has_transferables && self.transfer {
            let _ = self.ensure_layer(tree)?;
        }
        if let Some(layer) = self.layer.as_mut() {
            layer.sync(tree)?;
        }

        // An important transition only clears after a plain one is set.
        for candidate in candidates.iter().filter(|c| state.get(&c.id).is_some()) {
            tree.set_style(candidate.element, "transition", "none")?;
            tree.set_style(candidate.element, "transition", "")?;
        }

        for (index, candidate) in candidates.iter_mut().enumerate() {
            let Some(measured) = state.get(&candidate.id) else {
                continue;
            };
            self.mutate_candidate(tree, candidate, index, measured, padding, diagnostics)?;
        }
        Ok(())
    }

    fn mutate_candidate(
        &mut self,
        tree: &mut DomTree,
        candidate: &mut Candidate,
        index: usize,
        measured: &CandidateState,
        padding: &ViewportPadding,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), PassError> {
        let was_fixed = candidate.fixed_now;
        candidate.fixed_now = measured.fixed;
        candidate.sticky_now = measured.sticky;
        candidate.transform.clone_from(&measured.transform);
        candidate.top.clone_from(&measured.top);

        // Sticky candidates are never relocated. Returning one would undo
        // the relocation of a fixed candidate sharing its element.
        if was_fixed && (!measured.fixed || !measured.transferrable) && candidate.kind == PositionKind::Fixed {
            self.return_from(tree, candidate)?;
        }

        if !measured.top.is_empty() {
            let top = if measured.fixed || !self.transfer {
                format!("calc({} + {})", measured.top, px(padding.live()))
            } else if padding.is_settled() {
                // Relocation already moved the viewport origin below the
                // committed padding.
                measured.top.clone()
            } else {
                format!("calc({} - {})", measured.top, px(padding.committed()))
            };
            tree.set_style(candidate.element, "top", &top)?;
        }

        if self.transfer && measured.fixed && measured.transferrable {
            log::trace!(target: TAG, "relocating {} at index {index}", candidate.id);
            let layer = self.ensure_layer(tree)?;
            layer.transfer_to(tree, candidate, index, measured, diagnostics)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pinlayer_common::RecordingDiagnostics;
    use pinlayer_dom::{NodeId, NodeType};

    use super::*;
    use crate::host::{BoxMetrics, ComputedStyle};

    struct NoLayout;

    impl LayoutProbe for NoLayout {
        fn computed_style(&self, _tree: &DomTree, _node: NodeId) -> Result<Option<ComputedStyle>, LayoutError> {
            Ok(None)
        }

        fn box_metrics(&self, _tree: &DomTree, _node: NodeId) -> Result<BoxMetrics, LayoutError> {
            Ok(BoxMetrics::default())
        }
    }

    fn candidate(id: &str, element: NodeId) -> Candidate {
        Candidate {
            id: id.to_string(),
            element,
            kind: PositionKind::Fixed,
            selectors: vec!["*".to_string()],
            fixed_now: false,
            sticky_now: false,
            top: String::new(),
            transform: String::new(),
            force_transfer: None,
            placeholder: None,
        }
    }

    /// `<html>` holding a `<div>` and a text node, without a body.
    fn bodyless_tree() -> (DomTree, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        tree.append_child(NodeId::ROOT, html).unwrap();
        let div = tree.create_element("div");
        tree.append_child(html, div).unwrap();
        let text = tree.alloc(NodeType::Text("x".to_string()));
        tree.append_child(html, text).unwrap();
        (tree, div, text)
    }

    #[test]
    fn failed_bottom_write_still_clears_earlier_elements() {
        let (mut tree, div, text) = bodyless_tree();
        let candidates = [candidate("F0", div), candidate("F1", text)];

        let result = measure(
            &mut tree,
            &candidates,
            &NoLayout,
            &ViewportPadding::new(0.0),
            &FixedLayerConfig::default(),
            &RecordingDiagnostics::new(),
        );

        assert!(matches!(result, Err(PassError::Dom(_))));
        assert!(tree.style(div).unwrap().is_empty());
    }

    #[test]
    fn failed_candidate_mutation_leaves_no_transition() {
        let (mut tree, div, _) = bodyless_tree();
        tree.set_important_style(div, "transition", "none").unwrap();
        let mut candidates = [candidate("F0", div)];
        let mut state = MeasureState::default();
        let _ = state.states.insert(
            "F0".to_string(),
            CandidateState {
                fixed: true,
                transferrable: true,
                top: "0px".to_string(),
                ..CandidateState::default()
            },
        );

        let mut reconciler = Reconciler::new(true, 10_000);
        let result = reconciler.mutate(
            &mut tree,
            &mut candidates,
            &state,
            &ViewportPadding::new(0.0),
            &RecordingDiagnostics::new(),
        );

        assert_eq!(result, Err(PassError::MissingBody));
        let style = tree.style(div).unwrap();
        assert_eq!(style.property_value("transition"), "");
        assert_eq!(style.property_value("top"), "calc(0px + 0px)");
    }

    #[test]
    fn zero_lengths() {
        assert!(is_zero_length("0"));
        assert!(is_zero_length("0px"));
        assert!(is_zero_length("-0.0vh"));
        assert!(is_zero_length("0%"));
        assert!(!is_zero_length(""));
        assert!(!is_zero_length("auto"));
        assert!(!is_zero_length("11px"));
        assert!(!is_zero_length("calc(0px)"));
    }
}
