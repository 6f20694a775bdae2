//! The collaborators the engine consumes.
//!
//! The engine never computes layout or schedules frames itself. It reads
//! computed styles and box metrics through a [`LayoutProbe`], runs its
//! read/write phases through a [`Vsync`], asks a [`Platform`] whether
//! relocation is needed at all and reports through a [`Diagnostics`] sink.

use std::rc::Rc;

use pinlayer_common::{Diagnostics, LogDiagnostics};
use pinlayer_css::{CssError, StyleSheet, parse_stylesheet};
use pinlayer_dom::{DomError, DomTree, NodeId, NodeType};
use thiserror::Error;

use crate::reconciler::MeasureState;
use crate::{LayoutError, PassError};

/// [CSSOM § 9 getComputedStyle()](https://drafts.csswg.org/cssom/#dom-window-getcomputedstyle)
///
/// The resolved values the reconciler reads. Values are kept as CSS text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedStyle {
    /// `position`, e.g. `fixed`, `sticky`, `-webkit-sticky`.
    pub position: String,
    /// `display`.
    pub display: String,
    /// `top`, e.g. `0px` or `auto`.
    pub top: String,
    /// `bottom`.
    pub bottom: String,
    /// `z-index`.
    pub z_index: String,
    /// `opacity`.
    pub opacity: String,
    /// `transform`, already resolved to the vendor-prefixed property the
    /// host supports.
    pub transform: String,
}

impl Default for ComputedStyle {
    /// Initial values of a statically positioned block.
    fn default() -> Self {
        Self {
            position: "static".to_string(),
            display: "block".to_string(),
            top: "auto".to_string(),
            bottom: "auto".to_string(),
            z_index: "auto".to_string(),
            opacity: "1".to_string(),
            transform: "none".to_string(),
        }
    }
}

/// [CSSOM View § 7 offset attributes](https://drafts.csswg.org/cssom-view/#extensions-to-the-htmlelement-interface)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxMetrics {
    /// `offsetWidth`.
    pub offset_width: f64,
    /// `offsetHeight`.
    pub offset_height: f64,
    /// `offsetTop`.
    pub offset_top: f64,
}

impl BoxMetrics {
    /// Whether the box occupies any layout area.
    #[must_use]
    pub fn has_area(&self) -> bool {
        self.offset_width > 0.0 && self.offset_height > 0.0
    }
}

/// Reads computed layout. Implementations see the tree as mutated so far,
/// including the probe styles written during the measure phase.
pub trait LayoutProbe {
    /// The computed style of `node`, or `None` when the host cannot produce
    /// one (some engines return null for elements inside hidden frames).
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] when the query itself fails.
    fn computed_style(&self, tree: &DomTree, node: NodeId) -> Result<Option<ComputedStyle>, LayoutError>;

    /// The layout box of `node`.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] when the query fails.
    fn box_metrics(&self, tree: &DomTree, node: NodeId) -> Result<BoxMetrics, LayoutError>;
}

/// A measure-then-mutate unit of work.
pub trait Transaction {
    /// Read phase. Must not write anything the host could observe.
    ///
    /// # Errors
    ///
    /// Any error abandons the transaction before [`Transaction::mutate`].
    fn measure(&mut self) -> Result<MeasureState, PassError>;

    /// Write phase, given the state produced by [`Transaction::measure`].
    ///
    /// # Errors
    ///
    /// Writes already performed are kept.
    fn mutate(&mut self, state: MeasureState) -> Result<(), PassError>;
}

/// The host's batching primitive. All reads of a transaction complete before
/// any of its writes.
pub trait Vsync {
    /// Run one transaction.
    ///
    /// # Errors
    ///
    /// Propagates the first error of either phase.
    fn run_transaction(&self, task: &mut dyn Transaction) -> Result<(), PassError>;
}

/// Runs both phases immediately, back to back.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateVsync;

impl Vsync for ImmediateVsync {
    fn run_transaction(&self, task: &mut dyn Transaction) -> Result<(), PassError> {
        let state = task.measure()?;
        task.mutate(state)
    }
}

/// Platform capabilities.
pub trait Platform {
    /// Whether `position: fixed` renders incorrectly inside a scrolling
    /// embedded frame, which is what makes relocation necessary.
    fn has_fixed_in_iframe_bug(&self) -> bool;

    /// Whether the host is iOS.
    fn is_ios(&self) -> bool;
}

/// A [`Platform`] with fixed answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticPlatform {
    /// Answer for [`Platform::has_fixed_in_iframe_bug`].
    pub fixed_in_iframe_bug: bool,
    /// Answer for [`Platform::is_ios`].
    pub ios: bool,
}

impl Platform for StaticPlatform {
    fn has_fixed_in_iframe_bug(&self) -> bool {
        self.fixed_in_iframe_bug
    }

    fn is_ios(&self) -> bool {
        self.ios
    }
}

/// The collaborators of one [`FixedLayer`](crate::FixedLayer).
#[derive(Clone)]
pub struct Host {
    /// Computed style and box reader.
    pub layout: Rc<dyn LayoutProbe>,
    /// Batching primitive.
    pub vsync: Rc<dyn Vsync>,
    /// Capability probe.
    pub platform: Rc<dyn Platform>,
    /// Error and warning sink.
    pub diagnostics: Rc<dyn Diagnostics>,
}

impl Host {
    /// A host with immediate transactions, no relocation bug and log output.
    #[must_use]
    pub fn new(layout: Rc<dyn LayoutProbe>) -> Self {
        Self {
            layout,
            vsync: Rc::new(ImmediateVsync),
            platform: Rc::new(StaticPlatform::default()),
            diagnostics: Rc::new(LogDiagnostics),
        }
    }

    /// Replace the batching primitive.
    #[must_use]
    pub fn with_vsync(mut self, vsync: Rc<dyn Vsync>) -> Self {
        self.vsync = vsync;
        self
    }

    /// Replace the capability probe.
    #[must_use]
    pub fn with_platform(mut self, platform: Rc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the diagnostics sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Rc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Errors raised while assembling a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// The `<style>` element could not be inserted.
    #[error(transparent)]
    Dom(#[from] DomError),
    /// The stylesheet text did not parse.
    #[error(transparent)]
    Css(#[from] CssError),
}

/// [HTML § 3.1 The Document object](https://html.spec.whatwg.org/multipage/dom.html#document)
///
/// The root document the engine corrects: its tree, its stylesheets in
/// document order and whether it is the only document of its window.
#[derive(Debug, Clone)]
pub struct Document {
    /// The node tree.
    pub tree: DomTree,

    /// [CSSOM § 6.2](https://drafts.csswg.org/cssom/#dom-documentorshadowroot-stylesheets)
    /// "The styleSheets attribute must return a StyleSheetList collection
    /// representing the document or shadow root CSS style sheets."
    pub style_sheets: Vec<StyleSheet>,

    /// Whether this is a single-document window. Relocation is only ever
    /// attempted in single-document mode.
    pub single_doc: bool,
}

impl Document {
    /// A single-document-mode document without stylesheets.
    #[must_use]
    pub const fn new(tree: DomTree) -> Self {
        Self {
            tree,
            style_sheets: Vec::new(),
            single_doc: true,
        }
    }

    /// [DOM § 4.4 contains()](https://dom.spec.whatwg.org/#dom-node-contains)
    ///
    /// Shadow-including: a node slotted from a shadow tree still counts.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.tree.is_connected(node)
    }

    /// Append a `<style>` element holding `css` to the head (or the document
    /// element when there is no head) and register its sheet. `attributes`
    /// are set on the element, e.g. `[("pin-runtime", "")]`.
    ///
    /// # Errors
    ///
    /// Fails when the CSS has an unterminated construct, or when the tree has
    /// no document element.
    pub fn add_style_element(&mut self, css: &str, attributes: &[(&str, &str)]) -> Result<NodeId, DocumentError> {
        let rules = parse_stylesheet(css)?;
        let parent = self
            .tree
            .head()
            .or_else(|| self.tree.document_element())
            .ok_or(DomError::InvalidNode(NodeId::ROOT))?;

        let style = self.tree.create_element("style");
        for (name, value) in attributes {
            self.tree.set_attribute(style, name, value)?;
        }
        let text = self.tree.alloc(NodeType::Text(css.to_string()));
        self.tree.append_child(style, text)?;
        self.tree.append_child(parent, style)?;

        self.style_sheets.push(StyleSheet::new(Some(style), rules));
        Ok(style)
    }
}
