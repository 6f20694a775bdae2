//! Overlay transfer layer.
//!
//! Relocated fixed elements are rendered relative to the top-level viewport
//! instead of a scrolling container. Two strategies exist, chosen once per
//! [`FixedLayer`](crate::FixedLayer):
//!
//! - [`BodyTransferLayer`] - a shallow clone of `<body>` appended to the
//!   document element. Elements are moved into it and a hidden placeholder
//!   holds their original position.
//! - [`ShadowTransferLayer`] - when the body hosts a shadow root, a `<div>`
//!   with a named `<slot>` inside it. Elements stay where they are and are
//!   distributed into the slot.

use pinlayer_common::{Diagnostics, warn_once};
use pinlayer_css::matches;
use pinlayer_dom::{DomTree, NodeId};

use crate::reconciler::CandidateState;
use crate::registry::Candidate;
use crate::{FIXED_ID_ATTR, PassError, TAG};

/// Tag of the stand-in left at a relocated element's original position.
pub const PLACEHOLDER_TAG: &str = "pinlayer-placeholder";

/// Attribute marking the body layer while a lightbox is open. It survives
/// attribute mirroring.
pub const LIGHTBOX_MODE_ATTR: &str = "pinlayer-lightbox";

/// Id of the shadow layer's root.
pub const SHADOW_LAYER_ID: &str = "pinlayer-fixed-layer";

/// Name of the slot fixed elements are distributed into.
pub const FIXED_LAYER_SLOT: &str = "pinlayer-fixed";

const TRANSFER_WARNING: &str = "In order to improve scrolling performance, \
     the element is moved to a fixed positioning layer.";

/// A surface relocated fixed elements are rendered in.
pub trait TransferLayer {
    /// The layer's root element.
    fn root(&self) -> NodeId;

    /// Mirror the body's attributes onto the layer so that selectors keyed
    /// on them keep matching relocated elements. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Fails when the layer or the body is not an element.
    fn sync(&mut self, tree: &mut DomTree) -> Result<(), PassError>;

    /// Show or hide everything relocated.
    ///
    /// # Errors
    ///
    /// Fails when the layer root is not an element.
    fn set_visible(&mut self, tree: &mut DomTree, visible: bool) -> Result<(), PassError>;

    /// Mark or unmark the layer as being under an open lightbox. Visibility
    /// is handled separately.
    ///
    /// # Errors
    ///
    /// Fails when the layer root is not an element.
    fn set_lightbox_mode(&mut self, _tree: &mut DomTree, _on: bool) -> Result<(), PassError> {
        Ok(())
    }

    /// Relocate `candidate`. `index` is its position in document order and
    /// feeds the synthesized z-index.
    ///
    /// # Errors
    ///
    /// Fails when a tree operation fails.
    fn transfer_to(
        &mut self,
        tree: &mut DomTree,
        candidate: &mut Candidate,
        index: usize,
        state: &CandidateState,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), PassError>;

    /// Undo the relocation of `candidate`, if any.
    ///
    /// # Errors
    ///
    /// Fails when a tree operation fails.
    fn return_from(&mut self, tree: &mut DomTree, candidate: &Candidate) -> Result<(), PassError>;
}

/// The parallel `<body>`: a sibling of the body, relocated elements are
/// moved into it.
#[derive(Debug, Clone)]
pub struct BodyTransferLayer {
    body: NodeId,
    layer: NodeId,
    z_index_base: u32,
}

impl BodyTransferLayer {
    /// Styles of the layer root. Everything the body's own styles could
    /// have set on the clone is reset.
    const STYLES: [(&str, &str); 22] = [
        ("position", "absolute"),
        ("top", "0"),
        ("left", "0"),
        ("height", "0"),
        ("width", "0"),
        ("pointer-events", "none"),
        ("overflow", "hidden"),
        ("animation", "none"),
        ("background", "none"),
        ("border", "none"),
        ("border-image", "none"),
        ("box-sizing", "border-box"),
        ("box-shadow", "none"),
        ("float", "none"),
        ("margin", "0"),
        ("opacity", "1"),
        ("outline", "none"),
        ("padding", "0"),
        ("transform", "none"),
        ("transition", "none"),
        ("visibility", "visible"),
        ("display", "block"),
    ];

    /// Clone the body (shallow, without its inline style), style the clone
    /// and append it to the document element.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::MissingBody`] when the document has no body.
    pub fn new(tree: &mut DomTree, z_index_base: u32) -> Result<Self, PassError> {
        let (Some(html), Some(body)) = (tree.document_element(), tree.body()) else {
            return Err(PassError::MissingBody);
        };
        let layer = tree.clone_element(body)?;
        tree.clear_style(layer)?;
        for (name, value) in Self::STYLES {
            tree.set_style(layer, name, value)?;
        }
        tree.append_child(html, layer)?;
        log::debug!(target: TAG, "created body transfer layer {layer:?}");
        Ok(Self {
            body,
            layer,
            z_index_base,
        })
    }

    fn selectors_still_match(tree: &DomTree, candidate: &Candidate, diagnostics: &dyn Diagnostics) -> bool {
        candidate.selectors.iter().any(|selector| {
            matches(tree, candidate.element, selector).unwrap_or_else(|err| {
                diagnostics.error(TAG, &format!("Failed to test query match: {err}"));
                false
            })
        })
    }
}

impl TransferLayer for BodyTransferLayer {
    fn root(&self) -> NodeId {
        self.layer
    }

    fn sync(&mut self, tree: &mut DomTree) -> Result<(), PassError> {
        let body_attrs: Vec<(String, String)> = tree
            .as_element(self.body)
            .map(|body| {
                body.attrs
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        // The layer's styles are precise and must not follow the body's.
        // Named-item transfer tolerates names setAttribute would reject,
        // such as `[class]`.
        for (name, value) in body_attrs.iter().filter(|(name, _)| name != "style") {
            tree.set_named_item(self.layer, name, value)?;
        }

        let stale: Vec<String> = tree
            .as_element(self.layer)
            .map(|layer| {
                layer
                    .attrs
                    .keys()
                    .filter(|name| {
                        name.as_str() != "style"
                            && name.as_str() != LIGHTBOX_MODE_ATTR
                            && !body_attrs.iter().any(|(body_name, _)| body_name == *name)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for name in stale {
            tree.remove_attribute(self.layer, &name)?;
        }
        Ok(())
    }

    fn set_visible(&mut self, tree: &mut DomTree, visible: bool) -> Result<(), PassError> {
        tree.set_style(self.layer, "visibility", if visible { "visible" } else { "hidden" })?;
        Ok(())
    }

    fn set_lightbox_mode(&mut self, tree: &mut DomTree, on: bool) -> Result<(), PassError> {
        if on {
            tree.set_attribute(self.layer, LIGHTBOX_MODE_ATTR, "")?;
        } else {
            tree.remove_attribute(self.layer, LIGHTBOX_MODE_ATTR)?;
        }
        Ok(())
    }

    fn transfer_to(
        &mut self,
        tree: &mut DomTree,
        candidate: &mut Candidate,
        index: usize,
        state: &CandidateState,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), PassError> {
        let element = candidate.element;
        if tree.parent(element) == Some(self.layer) {
            return Ok(());
        }

        log::debug!(target: TAG, "transfer to fixed: {}", candidate.id);
        let _ = warn_once(diagnostics, TAG, TRANSFER_WARNING);

        let placeholder = if let Some(placeholder) = candidate.placeholder {
            placeholder
        } else {
            // First relocation: the layer ignores pointer events, the
            // element must not.
            tree.set_style(element, "pointer-events", "initial")?;
            let placeholder = tree.create_element(PLACEHOLDER_TAG);
            tree.set_attribute(placeholder, "hidden", "")?;
            tree.set_attribute(placeholder, FIXED_ID_ATTR, &candidate.id)?;
            candidate.placeholder = Some(placeholder);
            placeholder
        };

        let declared = match state.z_index.as_str() {
            "" | "auto" => "0",
            z_index => z_index,
        };
        let z_index = u64::from(self.z_index_base) + index as u64;
        tree.set_style(element, "z-index", &format!("calc({z_index} + {declared})"))?;

        if let Some(parent) = tree.parent(element) {
            tree.replace_child(parent, placeholder, element)?;
        }
        tree.append_child(self.layer, element)?;

        // Selectors that depend on the original ancestors no longer apply.
        if !Self::selectors_still_match(tree, candidate, diagnostics) {
            diagnostics.warn(
                TAG,
                &format!(
                    "Failed to move the element to the fixed position layer. This is most \
                     likely due to the compound CSS selector: {}",
                    candidate.selectors.join(", ")
                ),
            );
            self.return_from(tree, candidate)?;
        }
        Ok(())
    }

    fn return_from(&mut self, tree: &mut DomTree, candidate: &Candidate) -> Result<(), PassError> {
        let Some(placeholder) = candidate.placeholder else {
            return Ok(());
        };
        if !tree.is_connected(placeholder) {
            return Ok(());
        }
        let Some(parent) = tree.parent(placeholder) else {
            return Ok(());
        };

        log::debug!(target: TAG, "return from fixed: {}", candidate.id);
        if tree.is_connected(candidate.element) {
            tree.set_style(candidate.element, "z-index", "")?;
            tree.replace_child(parent, candidate.element, placeholder)?;
        } else {
            tree.remove_child(parent, placeholder)?;
        }
        Ok(())
    }
}

/// A `<div>` inside the body's shadow root with one named slot.
#[derive(Debug, Clone)]
pub struct ShadowTransferLayer {
    layer: NodeId,
}

impl ShadowTransferLayer {
    /// Create the layer inside `shadow_root`.
    ///
    /// # Errors
    ///
    /// Fails when `shadow_root` cannot take children.
    pub fn new(tree: &mut DomTree, shadow_root: NodeId) -> Result<Self, PassError> {
        let layer = tree.create_element("div");
        tree.set_attribute(layer, "id", SHADOW_LAYER_ID)?;
        for (name, value) in [
            ("position", "absolute"),
            ("top", "0px"),
            ("left", "0px"),
            ("height", "0px"),
            ("width", "0px"),
            ("overflow", "hidden"),
        ] {
            tree.set_important_style(layer, name, value)?;
        }

        let slot = tree.create_element("slot");
        tree.set_attribute(slot, "name", FIXED_LAYER_SLOT)?;
        tree.append_child(layer, slot)?;
        tree.append_child(shadow_root, layer)?;
        log::debug!(target: TAG, "created shadow transfer layer {layer:?}");
        Ok(Self { layer })
    }
}

impl TransferLayer for ShadowTransferLayer {
    fn root(&self) -> NodeId {
        self.layer
    }

    fn sync(&mut self, _tree: &mut DomTree) -> Result<(), PassError> {
        // The layer lives under the body already.
        Ok(())
    }

    fn set_visible(&mut self, tree: &mut DomTree, visible: bool) -> Result<(), PassError> {
        tree.set_style(self.layer, "visibility", if visible { "visible" } else { "hidden" })?;
        Ok(())
    }

    fn transfer_to(
        &mut self,
        tree: &mut DomTree,
        candidate: &mut Candidate,
        _index: usize,
        _state: &CandidateState,
        diagnostics: &dyn Diagnostics,
    ) -> Result<(), PassError> {
        log::debug!(target: TAG, "transfer to fixed: {}", candidate.id);
        let _ = warn_once(diagnostics, TAG, TRANSFER_WARNING);
        tree.set_attribute(candidate.element, "slot", FIXED_LAYER_SLOT)?;
        Ok(())
    }

    fn return_from(&mut self, tree: &mut DomTree, candidate: &Candidate) -> Result<(), PassError> {
        log::debug!(target: TAG, "return from fixed: {}", candidate.id);
        tree.remove_attribute(candidate.element, "slot")?;
        Ok(())
    }
}
