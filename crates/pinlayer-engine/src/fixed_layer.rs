//! The facade hosts drive.
//!
//! [`FixedLayer`] owns the document and every engine component. Hosts call
//! [`FixedLayer::setup`] once, then [`FixedLayer::update`] whenever layout may
//! have changed, and [`FixedLayer::poll`] from their timer loop so debounced
//! passes fire. No method returns an error: failures are reported through
//! the host's diagnostics sink and the engine carries on.

use std::rc::Rc;
use std::time::Duration;

use pinlayer_common::{Diagnostics, clear_warnings};
use pinlayer_dom::NodeId;
use strum_macros::Display;

use crate::config::FixedLayerConfig;
use crate::host::{Document, Host, LayoutProbe, Transaction};
use crate::observer::MutationBridge;
use crate::padding::ViewportPadding;
use crate::reconciler::{MeasureState, Reconciler, measure};
use crate::registry::{Candidate, DIRECT_SELECTOR, PositionKind, Registry};
use crate::scanner::{ScanResult, scan_style_sheets};
use crate::transfer::ShadowTransferLayer;
use crate::{PassError, TAG};

/// How a call to [`FixedLayer::update`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PassOutcome {
    /// Nothing is tracked; the observer was stopped.
    NoCandidates,
    /// Both phases ran.
    Completed,
    /// A phase failed and the error was reported.
    Abandoned,
}

/// Fixed and sticky position correction for one document.
pub struct FixedLayer {
    document: Document,
    host: Host,
    config: FixedLayerConfig,
    registry: Registry,
    reconciler: Reconciler,
    padding: ViewportPadding,
    bridge: MutationBridge,
    selectors: ScanResult,
}

impl std::fmt::Debug for FixedLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedLayer")
            .field("registry", &self.registry)
            .field("reconciler", &self.reconciler)
            .field("padding", &self.padding)
            .field("bridge", &self.bridge)
            .field("selectors", &self.selectors)
            .finish_non_exhaustive()
    }
}

impl FixedLayer {
    /// Attach to `document`.
    ///
    /// Relocation is enabled only when the platform renders fixed elements
    /// incorrectly inside embedded frames and the document is alone in its
    /// window. When the body hosts a shadow root, the shadow layer is
    /// created right away; otherwise the body layer is created by the first
    /// pass that needs it.
    ///
    /// One-time warnings are re-armed for the new document.
    #[must_use]
    pub fn new(mut document: Document, host: Host, config: FixedLayerConfig, padding_top: f64) -> Self {
        clear_warnings();
        let transfer = host.platform.has_fixed_in_iframe_bug() && document.single_doc;
        let mut reconciler = Reconciler::new(transfer, config.z_index_base);

        let shadow_root = document.tree.body().and_then(|body| document.tree.shadow_root(body));
        if let (true, Some(shadow_root)) = (transfer, shadow_root) {
            match ShadowTransferLayer::new(&mut document.tree, shadow_root) {
                Ok(layer) => reconciler = reconciler.with_layer(Box::new(layer)),
                Err(err) => host
                    .diagnostics
                    .error(TAG, &format!("Failed to create the shadow fixed layer: {err}")),
            }
        }

        let bridge = MutationBridge::new(config.debounce);
        Self {
            document,
            host,
            config,
            registry: Registry::new(),
            reconciler,
            padding: ViewportPadding::new(padding_top),
            bridge,
            selectors: ScanResult::default(),
        }
    }

    /// Scan the stylesheets, register every matching element and run the
    /// first pass.
    ///
    /// A scan failure (e.g. a cross-origin author sheet) is reported as a
    /// warning and leaves nothing registered from stylesheets.
    pub fn setup(&mut self) -> PassOutcome {
        let diagnostics = Rc::clone(&self.host.diagnostics);
        self.selectors = scan_style_sheets(&self.document.style_sheets, &self.document.tree, &self.config)
            .unwrap_or_else(|err| {
                diagnostics.warn(TAG, &format!("Failed to discover fixed elements: {err}"));
                ScanResult::default()
            });
        log::debug!(
            target: TAG,
            "discovered {} fixed and {} sticky selectors",
            self.selectors.fixed.len(),
            self.selectors.sticky.len()
        );

        let fixed = self.selectors.fixed.clone();
        let sticky = self.selectors.sticky.clone();
        self.register_selectors(&fixed, PositionKind::Fixed, Some(self.config.fixed_selector_cap));
        self.register_selectors(&sticky, PositionKind::Sticky, None);
        self.registry.sort_in_document_order(&self.document.tree);

        let outcome = self.update();
        if !self.registry.is_empty() {
            self.bridge.observe(&mut self.document.tree);
            if !self.reconciler.is_transfer_enabled() && self.host.platform.is_ios() {
                diagnostics.warn(
                    TAG,
                    "Please test this page inside of a viewer such as Google Search. \
                     Fixed or sticky positioning might have slightly different layout.",
                );
            }
        }
        outcome
    }

    fn register_selectors(&mut self, selectors: &[String], kind: PositionKind, cap: Option<usize>) {
        for selector in selectors {
            if let Err(err) = self.registry.register_from_selector(
                &mut self.document.tree,
                selector,
                kind,
                cap,
                self.host.diagnostics.as_ref(),
            ) {
                self.host
                    .diagnostics
                    .warn(TAG, &format!("Failed to setup {kind} elements from {selector:?}: {err}"));
            }
        }
    }

    /// Reconcile every candidate.
    ///
    /// Candidates whose element left the document are dropped first. With
    /// nothing left, observation stops and no transaction runs. Otherwise a
    /// pending debounced pass is cancelled, since this one supersedes it.
    pub fn update(&mut self) -> PassOutcome {
        for element in self.registry.disconnected_elements(&self.document.tree) {
            if let Err(err) = self.tear_down(element) {
                self.host
                    .diagnostics
                    .error(TAG, &format!("Failed to remove a detached element: {err}"));
            }
        }

        if self.registry.is_empty() {
            self.bridge.unobserve(&mut self.document.tree);
            return PassOutcome::NoCandidates;
        }
        self.bridge.clear(&mut self.document.tree);

        let vsync = Rc::clone(&self.host.vsync);
        let mut task = PassTask {
            document: &mut self.document,
            registry: &mut self.registry,
            reconciler: &mut self.reconciler,
            layout: self.host.layout.as_ref(),
            padding: &self.padding,
            config: &self.config,
            diagnostics: self.host.diagnostics.as_ref(),
        };
        match vsync.run_transaction(&mut task) {
            Ok(()) => PassOutcome::Completed,
            Err(err) => {
                self.host
                    .diagnostics
                    .error(TAG, &format!("Failed to mutate fixed elements: {err}"));
                PassOutcome::Abandoned
            }
        }
    }

    /// Run only the read phase, without writing corrections. The probe
    /// styles are still written and removed.
    ///
    /// # Errors
    ///
    /// Propagates a tree error. Layout failures only reset the candidate
    /// they concern.
    pub fn measure(&mut self) -> Result<MeasureState, PassError> {
        measure(
            &mut self.document.tree,
            self.registry.candidates(),
            self.host.layout.as_ref(),
            &self.padding,
            &self.config,
            self.host.diagnostics.as_ref(),
        )
    }

    /// Set the viewport's top padding and reconcile. A `transient` padding
    /// is used for offsets but not committed.
    pub fn update_padding_top(&mut self, padding_top: f64, transient: bool) -> PassOutcome {
        self.padding.update(padding_top, transient);
        self.update()
    }

    /// Track `element` as fixed even if no stylesheet says so, and
    /// reconcile. `force_transfer` overrides the relocation heuristics.
    pub fn add_element(&mut self, element: NodeId, force_transfer: Option<bool>) -> PassOutcome {
        if let Err(err) = self.registry.register(
            &mut self.document.tree,
            element,
            DIRECT_SELECTOR,
            PositionKind::Fixed,
            force_transfer,
            self.host.diagnostics.as_ref(),
        ) {
            self.host
                .diagnostics
                .error(TAG, &format!("Failed to add a fixed element: {err}"));
            return PassOutcome::Abandoned;
        }
        self.registry.sort_in_document_order(&self.document.tree);
        self.bridge.observe(&mut self.document.tree);
        self.update()
    }

    /// Stop tracking `element`, returning it from the transfer layer.
    pub fn remove_element(&mut self, element: NodeId) {
        if let Err(err) = self.tear_down(element) {
            self.host
                .diagnostics
                .error(TAG, &format!("Failed to remove a fixed element: {err}"));
        }
        if self.registry.is_empty() {
            self.bridge.unobserve(&mut self.document.tree);
        }
    }

    fn tear_down(&mut self, element: NodeId) -> Result<(), PassError> {
        let removed = self.registry.unregister(&mut self.document.tree, element)?;
        for candidate in removed.iter().filter(|c| c.kind == PositionKind::Fixed) {
            self.reconciler.return_from(&mut self.document.tree, candidate)?;
        }
        Ok(())
    }

    /// Apply `transform` on top of the measured transform of every fixed
    /// element anchored by its top, e.g. to follow a viewer's header as it
    /// slides. `None` restores the stylesheet transform. Sticky elements
    /// scroll with their container and are left alone.
    pub fn transform_mutate(&mut self, transform: Option<&str>) {
        let tree = &mut self.document.tree;
        let result: Result<(), PassError> = self
            .registry
            .candidates()
            .iter()
            .filter(|c| c.fixed_now && !c.top.is_empty())
            .try_for_each(|candidate| {
                match transform {
                    Some(transform) => {
                        tree.set_style(candidate.element, "transition", "none")?;
                        let value = if candidate.transform.is_empty() || candidate.transform == "none" {
                            transform.to_string()
                        } else {
                            format!("{} {transform}", candidate.transform)
                        };
                        tree.set_style(candidate.element, "transform", &value)?;
                    }
                    None => {
                        tree.set_style(candidate.element, "transform", "")?;
                        tree.set_style(candidate.element, "transition", "")?;
                    }
                }
                Ok(())
            });
        if let Err(err) = result {
            self.host
                .diagnostics
                .error(TAG, &format!("Failed to transform fixed elements: {err}"));
        }
    }

    /// Show or hide the transfer layer.
    pub fn set_visible(&mut self, visible: bool) {
        if let Err(err) = self.reconciler.set_visible(&mut self.document.tree, visible) {
            self.host
                .diagnostics
                .error(TAG, &format!("Failed to toggle the fixed layer: {err}"));
        }
    }

    /// A lightbox is opening: hide the transfer layer so relocated elements
    /// do not cover it, and mark the body layer so author styles can tell.
    pub fn enter_lightbox(&mut self) {
        self.set_lightbox_mode(true);
    }

    /// The lightbox closed: undo [`FixedLayer::enter_lightbox`].
    pub fn leave_lightbox(&mut self) {
        self.set_lightbox_mode(false);
    }

    fn set_lightbox_mode(&mut self, on: bool) {
        if let Err(err) = self.reconciler.set_lightbox_mode(&mut self.document.tree, on) {
            self.host
                .diagnostics
                .error(TAG, &format!("Failed to toggle lightbox mode: {err}"));
        }
    }

    /// Deliver queued mutation records and fire the debounced pass if it is
    /// due at `now`. Returns the outcome of the pass, if one ran.
    pub fn poll(&mut self, now: Duration) -> Option<PassOutcome> {
        let records = self.document.tree.take_records();
        self.bridge.on_records(&records, &self.config, now);
        self.bridge.fire_if_due(now).then(|| self.update())
    }

    /// Whether `element` was registered as fixed.
    #[must_use]
    pub fn is_declared_fixed(&self, element: NodeId) -> bool {
        self.registry.is_declared_fixed(element)
    }

    /// Whether `element` was registered as sticky.
    #[must_use]
    pub fn is_declared_sticky(&self, element: NodeId) -> bool {
        self.registry.is_declared_sticky(element)
    }

    /// Tracked candidates in document order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        self.registry.candidates()
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The document being corrected.
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access to the document, for hosts applying their own changes
    /// between passes.
    pub const fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// The padding coordinator.
    #[must_use]
    pub const fn padding(&self) -> &ViewportPadding {
        &self.padding
    }

    /// The selectors found by [`FixedLayer::setup`].
    #[must_use]
    pub const fn selectors(&self) -> &ScanResult {
        &self.selectors
    }

    /// Whether eligible fixed elements are relocated.
    #[must_use]
    pub const fn is_transfer_enabled(&self) -> bool {
        self.reconciler.is_transfer_enabled()
    }

    /// Root element of the transfer layer, once it exists.
    #[must_use]
    pub fn transfer_layer_root(&self) -> Option<NodeId> {
        self.reconciler.layer().map(|layer| layer.root())
    }

    /// Whether a debounced pass is scheduled.
    #[must_use]
    pub const fn is_pass_pending(&self) -> bool {
        self.bridge.is_pending()
    }
}

/// One reconciliation, borrowed out of the facade for the host's vsync.
struct PassTask<'a> {
    document: &'a mut Document,
    registry: &'a mut Registry,
    reconciler: &'a mut Reconciler,
    layout: &'a dyn LayoutProbe,
    padding: &'a ViewportPadding,
    config: &'a FixedLayerConfig,
    diagnostics: &'a dyn Diagnostics,
}

impl Transaction for PassTask<'_> {
    fn measure(&mut self) -> Result<MeasureState, PassError> {
        measure(
            &mut self.document.tree,
            self.registry.candidates(),
            self.layout,
            self.padding,
            self.config,
            self.diagnostics,
        )
    }

    fn mutate(&mut self, state: MeasureState) -> Result<(), PassError> {
        self.reconciler.mutate(
            &mut self.document.tree,
            self.registry.candidates_mut(),
            &state,
            self.padding,
            self.diagnostics,
        )
    }
}
