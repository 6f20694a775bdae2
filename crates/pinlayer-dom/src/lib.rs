//! DOM tree implementation for the pinlayer engine.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/).
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. Nodes
//! are never freed: a removed node simply becomes disconnected and may be
//! re-inserted later, which is what the fixed layer relies on when it swaps
//! elements and placeholders back and forth.

use std::collections::HashMap;

use thiserror::Error;

/// Inline style declarations.
pub mod style;

pub use style::{StyleDeclaration, StyleProperty};

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// Errors raised by tree mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The id does not refer to a node of this tree.
    #[error("node {0:?} does not exist")]
    InvalidNode(NodeId),
    /// An element was required.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// [§ 4.2.3](https://dom.spec.whatwg.org/#concept-node-replace)
    /// "If child's parent is not parent, then throw a NotFoundError."
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The expected parent.
        parent: NodeId,
        /// The node that was not found among its children.
        child: NodeId,
    },
    /// [§ 4.2.3](https://dom.spec.whatwg.org/#concept-node-ensure-pre-insertion-validity)
    /// "If node is a host-including inclusive ancestor of parent, then throw a
    /// HierarchyRequestError."
    #[error("inserting {node:?} into {parent:?} would create a cycle")]
    HierarchyRequest {
        /// The would-be parent.
        parent: NodeId,
        /// The node being inserted.
        node: NodeId,
    },
    /// [§ 4.9](https://dom.spec.whatwg.org/#dom-element-setattribute)
    /// "If qualifiedName does not match the Name production in XML, then throw
    /// an InvalidCharacterError."
    #[error("invalid attribute name {0:?}")]
    InvalidCharacter(String),
    /// [§ 4.9](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    /// "If element is a shadow host, then throw a NotSupportedError."
    #[error("element {0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    pub parent: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    pub children: Vec<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
    /// [§ 4.8 Interface ShadowRoot](https://dom.spec.whatwg.org/#interface-shadowroot)
    /// "Shadow roots's associated host is never null."
    ShadowRoot {
        /// The element hosting this shadow tree.
        host: NodeId,
    },
}

/// Element-specific data.
///
/// Per [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element):
/// "Elements have an associated namespace, namespace prefix, local name..."
///
/// NOTE: Only the local name, the attribute list and the inline style are
/// stored. The `style` attribute is kept parsed in [`ElementData::style`]
/// rather than in `attrs`.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// "An element's local name"
    pub tag_name: String,
    /// "An element has an associated attribute list"
    pub attrs: AttributesMap,
    /// The declarations of the `style` attribute.
    pub style: StyleDeclaration,
    /// [§ 4.2.2 Shadow tree](https://dom.spec.whatwg.org/#concept-element-shadow-root)
    /// "An element has an associated shadow root (null or a shadow root)."
    pub shadow_root: Option<NodeId>,
}

impl ElementData {
    /// Create element data with no attributes.
    #[must_use]
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: AttributesMap::new(),
            style: StyleDeclaration::new(),
            shadow_root: None,
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        let _ = self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Returns the element's id attribute value if present.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The id attribute specifies its element's unique identifier (ID)."
    #[must_use]
    pub fn id(&self) -> Option<&String> {
        self.attrs.get("id")
    }

    /// Returns the class names from the class attribute, in order.
    ///
    /// "The class attribute, if specified, must have a value that is a set of
    /// space-separated tokens representing the various classes that the element belongs to."
    #[must_use]
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(String::as_str)
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    /// Whether the attribute is present.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}

/// [§ 4.4 compareDocumentPosition()](https://dom.spec.whatwg.org/#dom-node-comparedocumentposition)
///
/// The bitmask returned by [`DomTree::compare_document_position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentPosition(pub u16);

impl DocumentPosition {
    /// `DOCUMENT_POSITION_DISCONNECTED`
    pub const DISCONNECTED: u16 = 0x01;
    /// `DOCUMENT_POSITION_PRECEDING`
    pub const PRECEDING: u16 = 0x02;
    /// `DOCUMENT_POSITION_FOLLOWING`
    pub const FOLLOWING: u16 = 0x04;
    /// `DOCUMENT_POSITION_CONTAINS`
    pub const CONTAINS: u16 = 0x08;
    /// `DOCUMENT_POSITION_CONTAINED_BY`
    pub const CONTAINED_BY: u16 = 0x10;
    /// `DOCUMENT_POSITION_IMPLEMENTATION_SPECIFIC`
    pub const IMPLEMENTATION_SPECIFIC: u16 = 0x20;

    /// Whether any of the bits in `mask` are set.
    #[must_use]
    pub const fn intersects(self, mask: u16) -> bool {
        self.0 & mask != 0
    }
}

/// [§ 4.3.3 Interface MutationRecord](https://dom.spec.whatwg.org/#interface-mutationrecord)
///
/// Only `"attributes"` records are produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The element whose attribute changed.
    pub target: NodeId,
    /// "attributeName": the local name of the changed attribute.
    pub attribute_name: String,
    /// "oldValue": the previous value, when there was one.
    pub old_value: Option<String>,
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// "The DOM represents a document as a tree. A tree is a finite hierarchical
/// tree structure."
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by NodeId.
    /// The Document node is always at index 0 (NodeId::ROOT).
    nodes: Vec<Node>,
    /// Pending attribute records, `Some` while an observer is registered.
    records: Option<Vec<MutationRecord>>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                node_type: NodeType::Document,
                parent: None,
                children: Vec::new(),
                next_sibling: None,
                prev_sibling: None,
            }],
            records: None,
        }
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get the number of nodes in the arena (connected or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// [§ 4.5 createElement()](https://dom.spec.whatwg.org/#dom-document-createelement)
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeType::Element(ElementData::new(tag_name)))
    }

    /// [§ 4.4 cloneNode()](https://dom.spec.whatwg.org/#dom-node-clonenode)
    ///
    /// Shallow clone: "Copy attributes" but not children. The copy is detached.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] if `id` is not an element.
    pub fn clone_element(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let source = self.element(id)?;
        let data = ElementData {
            tag_name: source.tag_name.clone(),
            attrs: source.attrs.clone(),
            style: source.style.clone(),
            shadow_root: None,
        };
        Ok(self.alloc(NodeType::Element(data)))
    }

    /// Get the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// The parent if it is an element (`parentElement`).
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.as_element(p).is_some())
    }

    /// Get all children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Get the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before null."
    ///
    /// A node that already has a parent is removed from it first.
    ///
    /// # Errors
    /// Fails for unknown nodes or when `child` is an inclusive ancestor of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert(parent, child, None)
    }

    /// [§ 4.2.3 Pre-insert](https://dom.spec.whatwg.org/#concept-node-pre-insert)
    ///
    /// Inserts `child` into `parent` immediately before `reference`.
    ///
    /// # Errors
    /// Fails when `reference` is not a child of `parent`, or on a hierarchy error.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.insert(parent, child, Some(reference))
    }

    /// [§ 4.2.3 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// [§ 4.2.3 Replace](https://dom.spec.whatwg.org/#concept-node-replace)
    ///
    /// "To replace a child with node within a parent..."
    ///
    /// `node` takes `child`'s position; `child` becomes detached.
    ///
    /// # Errors
    /// Returns [`DomError::NotAChild`] if `child` is not a child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        node: NodeId,
        child: NodeId,
    ) -> Result<(), DomError> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        if node == child {
            return Ok(());
        }
        self.insert(parent, node, Some(child))?;
        self.detach(child);
        Ok(())
    }

    fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        // "If node is a host-including inclusive ancestor of parent, then throw
        // a HierarchyRequestError DOMException."
        if child == parent || self.is_shadow_including_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest {
                parent,
                node: child,
            });
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        if reference == Some(child) {
            return Ok(());
        }

        self.detach(child);

        let index = match reference {
            Some(reference) => self.nodes[parent.0]
                .children
                .iter()
                .position(|&c| c == reference)
                .ok_or(DomError::NotAChild {
                    parent,
                    child: reference,
                })?,
            None => self.nodes[parent.0].children.len(),
        };
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.relink_siblings(parent);
        Ok(())
    }

    /// Unlink a node from its parent, if any.
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child.0].parent else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != child);
        let node = &mut self.nodes[child.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        self.relink_siblings(parent);
    }

    /// Recompute sibling links of all children of `parent`.
    fn relink_siblings(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        for (i, &c) in children.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| children[p]);
            let next = children.get(i + 1).copied();
            let node = &mut self.nodes[c.0];
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::InvalidNode(id))
        }
    }

    /// The parent, or the host when `id` is a shadow root.
    fn shadow_including_parent(&self, id: NodeId) -> Option<NodeId> {
        match self.get(id)? {
            Node {
                node_type: NodeType::ShadowRoot { host },
                ..
            } => Some(*host),
            node => node.parent,
        }
    }

    fn is_shadow_including_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.shadow_including_parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.shadow_including_parent(node);
        }
        false
    }

    /// [§ 4.2.6 Descendant](https://dom.spec.whatwg.org/#concept-tree-descendant)
    ///
    /// Check if `descendant` is a descendant of `ancestor` (not crossing
    /// shadow boundaries).
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(descendant).any(|id| id == ancestor)
    }

    /// [§ 4.4 isConnected](https://dom.spec.whatwg.org/#dom-node-isconnected)
    ///
    /// "The isConnected getter steps are to return true, if this is
    /// connected; otherwise false." A node is connected when its
    /// shadow-including root is the document.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        let mut current = id;
        while let Some(next) = self.shadow_including_parent(current) {
            current = next;
        }
        current == NodeId::ROOT
    }

    /// Iterate over all ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Pre-order traversal of the subtree rooted at `id`, excluding `id`.
    ///
    /// Shadow trees are not entered.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// [§ 4.4 compareDocumentPosition()](https://dom.spec.whatwg.org/#dom-node-comparedocumentposition)
    ///
    /// Returns how `other` is positioned relative to `reference`. Shadow
    /// roots are ordered right after their host, before its light children.
    #[must_use]
    pub fn compare_document_position(&self, reference: NodeId, other: NodeId) -> DocumentPosition {
        // "If this is other, then return zero."
        if reference == other {
            return DocumentPosition(0);
        }
        let reference_path = self.path_from_root(reference);
        let other_path = self.path_from_root(other);

        // "If node1 or node2 is null, or node1's root is not node2's root, then
        // return the result of adding DOCUMENT_POSITION_DISCONNECTED,
        // DOCUMENT_POSITION_IMPLEMENTATION_SPECIFIC, and either
        // DOCUMENT_POSITION_PRECEDING or DOCUMENT_POSITION_FOLLOWING, with the
        // constraint that this is to be consistent, together."
        if reference_path.first() != other_path.first() {
            let direction = if other.0 < reference.0 {
                DocumentPosition::PRECEDING
            } else {
                DocumentPosition::FOLLOWING
            };
            return DocumentPosition(
                DocumentPosition::DISCONNECTED
                    | DocumentPosition::IMPLEMENTATION_SPECIFIC
                    | direction,
            );
        }

        // "If node1 is an ancestor of node2 ... return the result of adding
        // DOCUMENT_POSITION_CONTAINED_BY to DOCUMENT_POSITION_FOLLOWING."
        if other_path.len() > reference_path.len()
            && other_path[..reference_path.len()] == reference_path[..]
        {
            return DocumentPosition(DocumentPosition::CONTAINED_BY | DocumentPosition::FOLLOWING);
        }
        // "If node1 is a descendant of node2 ... return the result of adding
        // DOCUMENT_POSITION_CONTAINS to DOCUMENT_POSITION_PRECEDING."
        if reference_path.len() > other_path.len()
            && reference_path[..other_path.len()] == other_path[..]
        {
            return DocumentPosition(DocumentPosition::CONTAINS | DocumentPosition::PRECEDING);
        }

        // "If node1 is preceding node2, then return DOCUMENT_POSITION_PRECEDING."
        let common = reference_path
            .iter()
            .zip(&other_path)
            .take_while(|(a, b)| a == b)
            .count();
        let parent = reference_path[common - 1];
        let reference_index = self.child_order(parent, reference_path[common]);
        let other_index = self.child_order(parent, other_path[common]);
        if other_index < reference_index {
            DocumentPosition(DocumentPosition::PRECEDING)
        } else {
            DocumentPosition(DocumentPosition::FOLLOWING)
        }
    }

    /// Shadow-including ancestor chain, root first, ending with `id`.
    fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.shadow_including_parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Position of `child` under `parent`; the shadow root sorts first.
    fn child_order(&self, parent: NodeId, child: NodeId) -> usize {
        if self.as_element(parent).and_then(|e| e.shadow_root) == Some(child) {
            return 0;
        }
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .map_or(usize::MAX, |i| i + 1)
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        self.check(id)?;
        self.as_element(id).ok_or(DomError::NotAnElement(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        self.check(id)?;
        match &mut self.nodes[id.0].node_type {
            NodeType::Element(data) => Ok(data),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    /// Get text content if this node is a text node.
    #[must_use]
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The element's tag name, lowercased.
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.as_element(id).map(|e| e.tag_name.as_str())
    }

    /// [§ 4.9 getAttribute()](https://dom.spec.whatwg.org/#dom-element-getattribute)
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    /// [§ 4.9 hasAttribute()](https://dom.spec.whatwg.org/#dom-element-hasattribute)
    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.as_element(id).is_some_and(|e| e.has_attribute(name))
    }

    /// [§ 4.9 setAttribute()](https://dom.spec.whatwg.org/#dom-element-setattribute)
    ///
    /// # Errors
    /// "If qualifiedName does not match the Name production in XML, then throw
    /// an InvalidCharacterError." Also fails for non-elements.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        if !is_valid_attribute_name(name) {
            return Err(DomError::InvalidCharacter(name.to_string()));
        }
        self.set_named_item(id, name, value)
    }

    /// [§ 4.9.2 setNamedItem()](https://dom.spec.whatwg.org/#dom-namednodemap-setnameditem)
    ///
    /// Sets an attribute copied from an existing `Attr`. No name validation is
    /// performed: the name was already accepted by the element it came from.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn set_named_item(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let old = self
            .element_mut(id)?
            .attrs
            .insert(name.to_string(), value.to_string());
        if old.as_deref() != Some(value) {
            self.queue_record(id, name, old);
        }
        Ok(())
    }

    /// [§ 4.9 removeAttribute()](https://dom.spec.whatwg.org/#dom-element-removeattribute)
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let old = self.element_mut(id)?.attrs.remove(name);
        if old.is_some() {
            self.queue_record(id, name, old);
        }
        Ok(())
    }

    /// The element's inline style, if `id` is an element.
    #[must_use]
    pub fn style(&self, id: NodeId) -> Option<&StyleDeclaration> {
        self.as_element(id).map(|e| &e.style)
    }

    /// Set (or with an empty value, clear) an inline style property.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn set_style(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.write_style(id, name, value, false)
    }

    /// Set an inline style property with `!important` priority.
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn set_important_style(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        self.write_style(id, name, value, true)
    }

    fn write_style(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
        important: bool,
    ) -> Result<(), DomError> {
        let style = &mut self.element_mut(id)?.style;
        let before = style.css_text();
        style.set_property(name, value, important);
        let after = style.css_text();
        if before != after {
            let old = (!before.is_empty()).then_some(before);
            self.queue_record(id, "style", old);
        }
        Ok(())
    }

    /// Drop every inline declaration (`removeAttribute('style')`).
    ///
    /// # Errors
    /// Returns [`DomError::NotAnElement`] for non-elements.
    pub fn clear_style(&mut self, id: NodeId) -> Result<(), DomError> {
        let style = &mut self.element_mut(id)?.style;
        if style.is_empty() {
            return Ok(());
        }
        let old = std::mem::take(style).css_text();
        self.queue_record(id, "style", Some(old));
        Ok(())
    }

    /// [§ 4.9 attachShadow()](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    ///
    /// # Errors
    /// Fails for non-elements and for elements that are already shadow hosts.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        if self.element(host)?.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let shadow = self.alloc(NodeType::ShadowRoot { host });
        self.element_mut(host)?.shadow_root = Some(shadow);
        Ok(shadow)
    }

    /// [§ 4.9 shadowRoot](https://dom.spec.whatwg.org/#dom-element-shadowroot)
    #[must_use]
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.as_element(host).and_then(|e| e.shadow_root)
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is that
    /// document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    /// [§ 3.1.3 The body element](https://html.spec.whatwg.org/multipage/dom.html#the-body-element-2)
    ///
    /// "The body element of a document is the first of the html element's children
    /// that is either a body element or a frameset element, or null if there is
    /// no such element."
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .find(|&&id| {
                self.as_element(id)
                    .is_some_and(|e| e.tag_name == "body" || e.tag_name == "frameset")
            })
            .copied()
    }

    /// [§ 3.1.2 The head element](https://html.spec.whatwg.org/multipage/dom.html#the-head-element-2)
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .find(|&&id| self.tag_name(id) == Some("head"))
            .copied()
    }

    /// [§ 4.3.1 observe()](https://dom.spec.whatwg.org/#dom-mutationobserver-observe)
    ///
    /// Start queueing attribute records for the whole document.
    pub fn observe_attributes(&mut self) {
        if self.records.is_none() {
            self.records = Some(Vec::new());
        }
    }

    /// [§ 4.3.1 disconnect()](https://dom.spec.whatwg.org/#dom-mutationobserver-disconnect)
    ///
    /// "Empty this's record queue."
    pub fn disconnect_observer(&mut self) {
        self.records = None;
    }

    /// Whether attribute records are being queued.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.records.is_some()
    }

    /// [§ 4.3.1 takeRecords()](https://dom.spec.whatwg.org/#dom-mutationobserver-takerecords)
    ///
    /// "Let records be a clone of this's record queue. Empty this's record queue."
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        self.records.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn queue_record(&mut self, target: NodeId, name: &str, old_value: Option<String>) {
        if !self.is_connected(target) {
            return;
        }
        if let Some(records) = &mut self.records {
            records.push(MutationRecord {
                target,
                attribute_name: name.to_string(),
                old_value,
            });
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Rough XML `Name` check used by `setAttribute`.
fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || first == ':' || !first.is_ascii();
    start_ok
        && chars.all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':') || !c.is_ascii()
        })
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}
