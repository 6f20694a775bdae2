//! Shared fixtures: a stub layout reader, a counting vsync and a standard
//! page with author and framework stylesheets.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use pinlayer_common::RecordingDiagnostics;
use pinlayer_css::StyleSheet;
use pinlayer_dom::{DomTree, NodeId};
use pinlayer_engine::{
    BoxMetrics, Candidate, ComputedStyle, Document, FixedLayer, FixedLayerConfig, Host, ImmediateVsync, LayoutError,
    LayoutProbe, MeasureState, PassError, StaticPlatform, Transaction, Vsync,
};

/// Layout reader driven by the test.
///
/// Emulates the auto-top probe: while an element carries an inline
/// `bottom`, its computed `top` is the configured auto-top (falling back to
/// the configured `top`).
#[derive(Debug, Default)]
pub struct StubLayout {
    styles: RefCell<HashMap<NodeId, ComputedStyle>>,
    metrics: RefCell<HashMap<NodeId, BoxMetrics>>,
    auto_tops: RefCell<HashMap<NodeId, String>>,
    null_style: Cell<bool>,
    failing: RefCell<HashSet<NodeId>>,
}

impl StubLayout {
    pub fn style(&self, node: NodeId, edit: impl FnOnce(&mut ComputedStyle)) {
        edit(self.styles.borrow_mut().entry(node).or_default());
    }

    pub fn metrics(&self, node: NodeId, width: f64, height: f64, offset_top: f64) {
        let _ = self.metrics.borrow_mut().insert(
            node,
            BoxMetrics {
                offset_width: width,
                offset_height: height,
                offset_top,
            },
        );
    }

    /// `position: fixed` with a 10x10 box at the top of the page.
    pub fn fixed(&self, node: NodeId) {
        self.style(node, |s| s.position = "fixed".to_string());
        self.metrics(node, 10.0, 10.0, 0.0);
    }

    pub fn sticky(&self, node: NodeId) {
        self.style(node, |s| s.position = "sticky".to_string());
    }

    pub fn top(&self, node: NodeId, top: &str) {
        self.style(node, |s| s.top = top.to_string());
    }

    pub fn auto_top(&self, node: NodeId, top: &str) {
        let _ = self.auto_tops.borrow_mut().insert(node, top.to_string());
    }

    /// Answer `None` for every computed style query.
    pub fn set_null_style(&self, null: bool) {
        self.null_style.set(null);
    }

    /// Fail every query about `node`.
    pub fn fail_on(&self, node: NodeId) {
        let _ = self.failing.borrow_mut().insert(node);
    }
}

impl LayoutProbe for StubLayout {
    fn computed_style(&self, tree: &DomTree, node: NodeId) -> Result<Option<ComputedStyle>, LayoutError> {
        if self.failing.borrow().contains(&node) {
            return Err(LayoutError::Unavailable("stub layout failure".to_string()));
        }
        if self.null_style.get() {
            return Ok(None);
        }
        let mut style = self.styles.borrow().get(&node).cloned().unwrap_or_default();
        let probing = tree
            .style(node)
            .is_some_and(|inline| !inline.property_value("bottom").is_empty());
        if probing {
            if let Some(auto_top) = self.auto_tops.borrow().get(&node) {
                style.top.clone_from(auto_top);
            }
        }
        Ok(Some(style))
    }

    fn box_metrics(&self, _tree: &DomTree, node: NodeId) -> Result<BoxMetrics, LayoutError> {
        if self.failing.borrow().contains(&node) {
            return Err(LayoutError::Unavailable("stub layout failure".to_string()));
        }
        Ok(self.metrics.borrow().get(&node).copied().unwrap_or_default())
    }
}

/// Runs transactions immediately and counts them.
#[derive(Debug, Default)]
pub struct RecordingVsync {
    runs: Cell<usize>,
}

impl RecordingVsync {
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl Vsync for RecordingVsync {
    fn run_transaction(&self, task: &mut dyn Transaction) -> Result<(), PassError> {
        self.runs.set(self.runs.get() + 1);
        ImmediateVsync.run_transaction(task)
    }
}

/// Stylesheet text that must never be scanned.
pub const SKIPPED_CSS: &str = ".u { position: fixed }";

/// Author sheet with fixed, sticky, nested and unrelated rules.
pub const AUTHOR_CSS: &str = "
    .a { position: fixed }
    #doc-body-id .a { position: fixed }
    .b { position: fixed }
    .u { color: red }
    .st { position: sticky }
    .wk { position: -webkit-sticky }
    @media (min-width: 1px) { .m { position: fixed } }
    @supports (position: sticky) { .s { position: fixed } }
    @font-face { font-family: x; src: url(x.woff) }
";

/// Second author sheet, without a marker attribute.
pub const OTHER_CSS: &str = "
    .o1 { position: fixed }
    .o2 { position: fixed }
    .u, .o1 { color: blue }
";

/// Create `<tag>` under `parent` with the given attributes.
pub fn element(tree: &mut DomTree, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
    let id = tree.create_element(tag);
    for (name, value) in attributes {
        tree.set_attribute(id, name, value).unwrap();
    }
    tree.append_child(parent, id).unwrap();
    id
}

/// A document skeleton: `<html><head></head><body id="doc-body-id"></body></html>`.
pub fn skeleton() -> (DomTree, NodeId) {
    let mut tree = DomTree::new();
    let html = element(&mut tree, NodeId::ROOT, "html", &[]);
    let _ = element(&mut tree, html, "head", &[]);
    let body = element(&mut tree, html, "body", &[("id", "doc-body-id")]);
    (tree, body)
}

/// The standard page.
///
/// ```text
/// body#doc-body-id
///   div#e1.a.b.m.o1.u   fixed
///   div#e2.b.s.o2.st    fixed and sticky
///   div#e3.u            only in skipped sheets
///   div#e4.st           sticky
///   div#e5.wk           -webkit-sticky
///   div#e6              unstyled
/// ```
///
/// Skipped sheets: a `<link>` sheet, a disabled sheet and one sheet per
/// framework marker.
pub fn standard_page() -> (Document, NodeId, Vec<NodeId>) {
    let (mut tree, body) = skeleton();
    let elements = [
        ("e1", "a b m o1 u"),
        ("e2", "b s o2 st"),
        ("e3", "u"),
        ("e4", "st"),
        ("e5", "wk"),
        ("e6", ""),
    ]
    .iter()
    .map(|&(id, class)| element(&mut tree, body, "div", &[("id", id), ("class", class)]))
    .collect();

    let head = tree.head().unwrap();
    let link = element(&mut tree, head, "link", &[("rel", "stylesheet")]);
    let mut document = Document::new(tree);
    document
        .style_sheets
        .push(StyleSheet::parse(Some(link), SKIPPED_CSS).unwrap());

    let _ = document.add_style_element(SKIPPED_CSS, &[]).unwrap();
    document.style_sheets.last_mut().unwrap().disabled = true;
    for marker in ["pin-boilerplate", "pin-runtime", "pin-extension"] {
        let _ = document.add_style_element(SKIPPED_CSS, &[(marker, "")]).unwrap();
    }

    let _ = document.add_style_element(AUTHOR_CSS, &[("pin-custom", "")]).unwrap();
    let _ = document.add_style_element(OTHER_CSS, &[]).unwrap();
    (document, body, elements)
}

/// A page built by `build`, styled by `css`.
pub fn custom_page(css: &str, build: impl FnOnce(&mut DomTree, NodeId) -> Vec<NodeId>) -> (Document, NodeId, Vec<NodeId>) {
    let (mut tree, body) = skeleton();
    let elements = build(&mut tree, body);
    let mut document = Document::new(tree);
    let _ = document.add_style_element(css, &[]).unwrap();
    (document, body, elements)
}

/// How a [`Harness`] is assembled.
#[derive(Debug, Clone)]
pub struct Options {
    pub transfer: bool,
    pub ios: bool,
    pub shadow: bool,
    pub padding_top: f64,
    pub config: FixedLayerConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            transfer: false,
            ios: false,
            shadow: false,
            padding_top: 11.0,
            config: FixedLayerConfig::default(),
        }
    }
}

impl Options {
    pub fn transfer() -> Self {
        Self {
            transfer: true,
            ..Self::default()
        }
    }
}

/// A [`FixedLayer`] wired to stub collaborators.
pub struct Harness {
    pub fixed_layer: FixedLayer,
    pub layout: Rc<StubLayout>,
    pub vsync: Rc<RecordingVsync>,
    pub diagnostics: Rc<RecordingDiagnostics>,
    pub body: NodeId,
    pub elements: Vec<NodeId>,
}

impl Harness {
    /// Assemble without running setup.
    pub fn new(page: (Document, NodeId, Vec<NodeId>), options: Options) -> Self {
        let (mut document, body, elements) = page;
        if options.shadow {
            let _ = document.tree.attach_shadow(body).unwrap();
        }

        let layout = Rc::new(StubLayout::default());
        let vsync = Rc::new(RecordingVsync::default());
        let diagnostics = Rc::new(RecordingDiagnostics::new());
        let host = Host::new(layout.clone())
            .with_vsync(vsync.clone())
            .with_platform(Rc::new(StaticPlatform {
                fixed_in_iframe_bug: options.transfer,
                ios: options.ios,
            }))
            .with_diagnostics(diagnostics.clone());
        let fixed_layer = FixedLayer::new(document, host, options.config, options.padding_top);
        Self {
            fixed_layer,
            layout,
            vsync,
            diagnostics,
            body,
            elements,
        }
    }

    /// The standard page, set up.
    pub fn standard(options: Options) -> Self {
        let mut harness = Self::new(standard_page(), options);
        let _ = harness.fixed_layer.setup();
        harness
    }

    /// The `n`th element of the page, counting from 1.
    pub fn el(&self, n: usize) -> NodeId {
        self.elements[n - 1]
    }

    pub fn tree(&self) -> &DomTree {
        &self.fixed_layer.document().tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.fixed_layer.document_mut().tree
    }

    pub fn candidate(&self, id: &str) -> &Candidate {
        self.fixed_layer.registry().get(id).unwrap()
    }

    pub fn measure(&mut self) -> MeasureState {
        self.fixed_layer.measure().unwrap()
    }

    /// Inline style value of `node`.
    pub fn inline(&self, node: NodeId, property: &str) -> String {
        self.tree().style(node).unwrap().property_value(property).to_string()
    }
}
