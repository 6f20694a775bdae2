//! Candidate registry.
//!
//! Every element that may be fixed or sticky is tracked by a [`Candidate`]
//! keyed by a stable id (`F0`, `F1`, ...). The id is the only state written
//! onto the element itself, as the [`FIXED_ID_ATTR`] attribute; everything
//! else lives here.
//!
//! An element matching both fixed and sticky rules has two candidates, one
//! per [`PositionKind`].

use std::cmp::Ordering;
use std::collections::HashMap;

use pinlayer_common::Diagnostics;
use pinlayer_css::{CssError, query_selector_all};
use pinlayer_dom::{DocumentPosition, DomError, DomTree, NodeId};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::{FIXED_ID_ATTR, TAG};

/// Selector recorded for directly registered elements.
pub const DIRECT_SELECTOR: &str = "*";

/// The position an element was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum PositionKind {
    /// `position: fixed`
    Fixed,
    /// `position: sticky` or a vendor-prefixed variant
    Sticky,
}

/// One tracked element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub(crate) id: String,
    pub(crate) element: NodeId,
    pub(crate) kind: PositionKind,
    pub(crate) selectors: Vec<String>,
    pub(crate) fixed_now: bool,
    pub(crate) sticky_now: bool,
    pub(crate) top: String,
    pub(crate) transform: String,
    pub(crate) force_transfer: Option<bool>,
    pub(crate) placeholder: Option<NodeId>,
}

impl Candidate {
    /// The stable id, also written onto the element.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tracked element.
    #[must_use]
    pub const fn element(&self) -> NodeId {
        self.element
    }

    /// The kind it was registered for.
    #[must_use]
    pub const fn kind(&self) -> PositionKind {
        self.kind
    }

    /// Selectors that matched it, without duplicates. Directly registered
    /// elements carry [`DIRECT_SELECTOR`].
    #[must_use]
    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }

    /// Whether the last pass found it fixed.
    #[must_use]
    pub const fn is_fixed_now(&self) -> bool {
        self.fixed_now
    }

    /// Whether the last pass found it sticky.
    #[must_use]
    pub const fn is_sticky_now(&self) -> bool {
        self.sticky_now
    }

    /// The `top` resolved by the last pass, empty when none applies.
    #[must_use]
    pub fn top(&self) -> &str {
        &self.top
    }

    /// The computed transform seen by the last pass.
    #[must_use]
    pub fn transform(&self) -> &str {
        &self.transform
    }

    /// The relocation override: `Some(true)` forces it, `Some(false)`
    /// forbids it, `None` leaves it to the heuristics.
    #[must_use]
    pub const fn force_transfer(&self) -> Option<bool> {
        self.force_transfer
    }

    /// The stand-in left behind by the first relocation.
    #[must_use]
    pub const fn placeholder(&self) -> Option<NodeId> {
        self.placeholder
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Declared {
    fixed: bool,
    sticky: bool,
}

/// The tracked candidates, kept in document order after each batch of
/// registrations.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    candidates: Vec<Candidate>,
    declared: HashMap<NodeId, Declared>,
    counter: u64,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates in registry order.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub(crate) fn candidates_mut(&mut self) -> &mut [Candidate] {
        &mut self.candidates
    }

    /// The candidate with `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Whether `element` was registered as fixed.
    #[must_use]
    pub fn is_declared_fixed(&self, element: NodeId) -> bool {
        self.declared.get(&element).is_some_and(|d| d.fixed)
    }

    /// Whether `element` was registered as sticky.
    #[must_use]
    pub fn is_declared_sticky(&self, element: NodeId) -> bool {
        self.declared.get(&element).is_some_and(|d| d.sticky)
    }

    /// Register up to `cap` elements matching `selector` (all of them when
    /// `cap` is `None`). Returns how many matched.
    ///
    /// # Errors
    ///
    /// Fails when the selector does not parse or an id cannot be written.
    pub fn register_from_selector(
        &mut self,
        tree: &mut DomTree,
        selector: &str,
        kind: PositionKind,
        cap: Option<usize>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<usize, SelectorRegistrationError> {
        let matches = query_selector_all(tree, NodeId::ROOT, selector)?;
        let count = cap.map_or(matches.len(), |cap| matches.len().min(cap));
        for &element in &matches[..count] {
            self.register(tree, element, selector, kind, None, diagnostics)?;
        }
        Ok(count)
    }

    /// Track `element` for `kind`, recording `selector` on its candidate.
    ///
    /// A second registration of the same (element, kind) only adds the
    /// selector and updates the relocation override. Sticky candidates are
    /// never relocated, so their override is always `Some(false)`.
    ///
    /// Elements inside a lightbox are ignored: the engine would fight the
    /// lightbox's own open and close animations.
    ///
    /// # Errors
    ///
    /// Fails when the id attribute cannot be written.
    pub fn register(
        &mut self,
        tree: &mut DomTree,
        element: NodeId,
        selector: &str,
        kind: PositionKind,
        force_transfer: Option<bool>,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), DomError> {
        if is_lightbox(tree, element) || tree.ancestors(element).any(|a| is_lightbox(tree, a)) {
            return Ok(());
        }

        let index = if let Some(index) = self
            .candidates
            .iter()
            .position(|c| c.element == element && c.kind == kind)
        {
            let candidate = &mut self.candidates[index];
            if !candidate.selectors.iter().any(|s| s == selector) {
                candidate.selectors.push(selector.to_string());
            }
            index
        } else {
            warn_about_inline_offsets(tree, element, diagnostics);

            let id = format!("F{}", self.counter);
            self.counter += 1;
            tree.set_attribute(element, FIXED_ID_ATTR, &id)?;
            let declared = self.declared.entry(element).or_default();
            match kind {
                PositionKind::Fixed => declared.fixed = true,
                PositionKind::Sticky => declared.sticky = true,
            }
            log::trace!(target: TAG, "registered {id} as {kind} for {selector:?}");

            self.candidates.push(Candidate {
                id,
                element,
                kind,
                selectors: vec![selector.to_string()],
                fixed_now: false,
                sticky_now: false,
                top: String::new(),
                transform: String::new(),
                force_transfer: None,
                placeholder: None,
            });
            self.candidates.len() - 1
        };

        self.candidates[index].force_transfer = match kind {
            PositionKind::Fixed => force_transfer,
            PositionKind::Sticky => Some(false),
        };
        Ok(())
    }

    /// Stop tracking `element`: drop all its candidates, clear its injected
    /// `top` and its declared flags. Returns the dropped candidates so the
    /// caller can undo their relocation.
    ///
    /// # Errors
    ///
    /// Fails when `element` is not an element of `tree`.
    pub fn unregister(&mut self, tree: &mut DomTree, element: NodeId) -> Result<Vec<Candidate>, DomError> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.candidates)
            .into_iter()
            .partition(|c| c.element == element);
        self.candidates = kept;
        if !removed.is_empty() {
            let _ = self.declared.remove(&element);
            tree.set_style(element, "top", "")?;
        }
        Ok(removed)
    }

    /// Elements of candidates no longer in the document, each listed once.
    #[must_use]
    pub fn disconnected_elements(&self, tree: &DomTree) -> Vec<NodeId> {
        let mut elements: Vec<NodeId> = self
            .candidates
            .iter()
            .map(|c| c.element)
            .filter(|&e| !tree.is_connected(e))
            .collect();
        elements.sort_unstable();
        elements.dedup();
        elements
    }

    /// Sort candidates into document order. Candidates of the same element
    /// keep their registration order.
    pub fn sort_in_document_order(&mut self, tree: &DomTree) {
        self.candidates
            .sort_by(|a, b| document_order(tree, a.element, b.element));
    }
}

/// Errors of [`Registry::register_from_selector`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorRegistrationError {
    /// The selector did not parse.
    #[error(transparent)]
    Css(#[from] CssError),
    /// An id could not be written.
    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Compare two nodes by their position in the document, earlier first.
///
/// [§ 4.4 compareDocumentPosition()](https://dom.spec.whatwg.org/#dom-node-comparedocumentposition)
/// An ancestor sorts before its descendants.
#[must_use]
pub fn document_order(tree: &DomTree, a: NodeId, b: NodeId) -> Ordering {
    let position = tree.compare_document_position(a, b);
    if position.intersects(DocumentPosition::PRECEDING | DocumentPosition::CONTAINS) {
        Ordering::Greater
    } else if position.intersects(DocumentPosition::FOLLOWING | DocumentPosition::CONTAINED_BY) {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

fn is_lightbox(tree: &DomTree, element: NodeId) -> bool {
    tree.tag_name(element)
        .is_some_and(|tag| tag.to_ascii_lowercase().contains("lightbox"))
}

/// The engine overwrites `top` and probes `bottom`, so author inline values
/// for either would be lost.
fn warn_about_inline_offsets(tree: &DomTree, element: NodeId, diagnostics: &dyn Diagnostics) {
    let Some(style) = tree.style(element) else {
        return;
    };
    if !style.property_value("top").is_empty() || !style.property_value("bottom").is_empty() {
        diagnostics.error(
            TAG,
            "Inline styles with `top`, `bottom` and other CSS rules are not supported yet \
             for fixed or sticky elements. Unexpected behavior may occur.",
        );
    }
}
