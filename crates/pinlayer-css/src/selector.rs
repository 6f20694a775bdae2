//! CSS Selector parsing and matching
//!
//! This module implements selector parsing and matching per
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/), and the two
//! selector-based DOM APIs the fixed layer uses:
//! [`querySelectorAll()`](https://dom.spec.whatwg.org/#dom-parentnode-queryselectorall)
//! and [`matches()`](https://dom.spec.whatwg.org/#dom-element-matches).
//!
//! Pseudo-classes that depend on user interaction (`:hover`, `:focus`, ...),
//! functional pseudo-classes and pseudo-elements parse but never match.

use std::iter::{Peekable, successors};
use std::str::Chars;

use pinlayer_dom::{DomTree, ElementData, NodeId, NodeType};

use crate::CssError;

/// [§ 5 Elemental selectors](https://www.w3.org/TR/selectors-4/#elemental-selectors)
/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// A simple selector is a single condition on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    ///
    /// Examples: `div`, `header`, `nav`
    Type(String),

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    ///
    /// Examples: `.sticky`, `.top-bar`
    Class(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    ///
    /// Examples: `#header`, `#cookie-banner`
    Id(String),

    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    Universal,

    /// Pseudo-class or pseudo-element that always fails to match.
    ///
    /// Examples: `:hover`, `::before`, `:not(.x)`, `:nth-child(2)`
    NeverMatch,

    /// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    /// Structural pseudo-class that requires DOM tree context to match.
    PseudoClass(PseudoClass),

    /// [§ 6.4 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    Attribute(AttributeSelector),
}

/// Structural pseudo-classes per [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// [§ 4.4 :root](https://www.w3.org/TR/selectors-4/#the-root-pseudo)
    /// "The :root pseudo-class represents an element that is the root of the document."
    Root,
    /// [§ 4.12 :first-child](https://www.w3.org/TR/selectors-4/#the-first-child-pseudo)
    FirstChild,
    /// [§ 4.12 :last-child](https://www.w3.org/TR/selectors-4/#the-last-child-pseudo)
    LastChild,
    /// [§ 4.12 :only-child](https://www.w3.org/TR/selectors-4/#the-only-child-pseudo)
    OnlyChild,
    /// [§ 4.5 :empty](https://www.w3.org/TR/selectors-4/#the-empty-pseudo)
    Empty,
}

/// Attribute selectors per [§ 6.4](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSelector {
    /// `[attr]`
    Exists(String),
    /// `[attr=value]`
    Equals(String, String),
    /// `[attr~=value]` - one of the whitespace-separated words is `value`
    Includes(String, String),
    /// `[attr|=value]` - exactly `value` or `value-` prefixed
    DashMatch(String, String),
    /// `[attr^=value]`
    PrefixMatch(String, String),
    /// `[attr$=value]`
    SuffixMatch(String, String),
    /// `[attr*=value]`
    SubstringMatch(String, String),
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A compound selector is a sequence of simple selectors that are not
/// separated by a combinator."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    /// The simple selectors, all of which must match.
    pub simple_selectors: Vec<SimpleSelector>,
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// [§ 16.1](https://www.w3.org/TR/selectors-4/#descendant-combinators) `A B`
    Descendant,
    /// [§ 16.2](https://www.w3.org/TR/selectors-4/#child-combinators) `A > B`
    Child,
    /// [§ 16.3](https://www.w3.org/TR/selectors-4/#adjacent-sibling-combinators) `A + B`
    NextSibling,
    /// [§ 16.4](https://www.w3.org/TR/selectors-4/#general-sibling-combinators) `A ~ B`
    SubsequentSibling,
}

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// Example: `#page > header .bar` is stored as
/// ```text
/// subject: [.bar]
/// combinators: [(Descendant, [header]), (Child, [#page])]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    /// The rightmost compound selector (the subject of the selector).
    pub subject: CompoundSelector,
    /// (combinator, compound) pairs going left from the subject.
    pub combinators: Vec<(Combinator, CompoundSelector)>,
}

/// [§ 4.1 Selector lists](https://www.w3.org/TR/selectors-4/#grouping)
///
/// "A selector list is a comma-separated list of selectors."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    /// The selectors of the list, in source order.
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// "A selector list matches an element if any of the selectors in the
    /// list match the element."
    #[must_use]
    pub fn matches(&self, tree: &DomTree, node_id: NodeId) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches_in_tree(tree, node_id))
    }
}

impl ComplexSelector {
    /// [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
    ///
    /// Match against an element with full DOM tree context.
    #[must_use]
    pub fn matches_in_tree(&self, tree: &DomTree, node_id: NodeId) -> bool {
        compound_matches_in_tree(&self.subject, tree, node_id) && self.matches_from(tree, 0, node_id)
    }

    /// Match the combinator chain from `index` on, relative to `node_id`.
    /// Backtracks, so `a > b c` finds a `b` ancestor whose parent is `a`
    /// even when a nearer `b` does not have one.
    fn matches_from(&self, tree: &DomTree, index: usize, node_id: NodeId) -> bool {
        let Some((combinator, compound)) = self.combinators.get(index) else {
            return true;
        };
        let candidate_matches = |candidate: NodeId| {
            compound_matches_in_tree(compound, tree, candidate)
                && self.matches_from(tree, index + 1, candidate)
        };

        match combinator {
            // "A selector of the form 'A B' represents an element B that is an
            // arbitrary descendant of some ancestor element A."
            Combinator::Descendant => tree.ancestors(node_id).any(candidate_matches),
            // "A selector of the form 'A > B' represents an element B that is a
            // direct child of element A."
            Combinator::Child => tree.parent(node_id).is_some_and(candidate_matches),
            // "A selector of the form 'A + B' represents an element B that
            // immediately follows element A."
            Combinator::NextSibling => {
                preceding_element_siblings(tree, node_id)
                    .next()
                    .is_some_and(candidate_matches)
            }
            // "A selector of the form 'A ~ B' represents an element B that
            // follows element A (not necessarily immediately)."
            Combinator::SubsequentSibling => {
                preceding_element_siblings(tree, node_id).any(candidate_matches)
            }
        }
    }
}

/// Element siblings before `node_id`, nearest first.
fn preceding_element_siblings(tree: &DomTree, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    successors(tree.prev_sibling(node_id), |&id| tree.prev_sibling(id))
        .filter(|&id| tree.as_element(id).is_some())
}

/// Check if a compound selector matches an element, with tree context for
/// structural pseudo-classes.
fn compound_matches_in_tree(compound: &CompoundSelector, tree: &DomTree, node_id: NodeId) -> bool {
    let Some(element) = tree.as_element(node_id) else {
        return false;
    };
    compound.simple_selectors.iter().all(|simple| match simple {
        SimpleSelector::PseudoClass(pc) => pseudo_class_matches(*pc, tree, node_id),
        _ => simple.matches(element),
    })
}

/// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
fn pseudo_class_matches(pc: PseudoClass, tree: &DomTree, node_id: NodeId) -> bool {
    let element_children = |parent: NodeId| {
        tree.children(parent)
            .iter()
            .copied()
            .filter(|&c| tree.as_element(c).is_some())
            .collect::<Vec<_>>()
    };
    match pc {
        // "In HTML, this is the <html> element."
        PseudoClass::Root => tree.document_element() == Some(node_id),
        PseudoClass::FirstChild => tree
            .parent(node_id)
            .is_some_and(|parent| element_children(parent).first() == Some(&node_id)),
        PseudoClass::LastChild => tree
            .parent(node_id)
            .is_some_and(|parent| element_children(parent).last() == Some(&node_id)),
        PseudoClass::OnlyChild => tree
            .parent(node_id)
            .is_some_and(|parent| element_children(parent) == [node_id]),
        PseudoClass::Empty => tree.children(node_id).iter().all(|&c| {
            match tree.get(c).map(|n| &n.node_type) {
                Some(NodeType::Text(t)) => t.trim().is_empty(),
                Some(NodeType::Comment(_)) => true,
                _ => false,
            }
        }),
    }
}

impl SimpleSelector {
    /// Check if this simple selector matches the given element. Structural
    /// pseudo-classes need tree context and return `false` here.
    #[must_use]
    pub fn matches(&self, element: &ElementData) -> bool {
        match self {
            Self::Type(name) => element.tag_name.eq_ignore_ascii_case(name),
            Self::Class(class_name) => element.classes().any(|c| c == class_name.as_str()),
            Self::Id(id) => element.id().is_some_and(|el_id| el_id == id),
            Self::Universal => true,
            Self::NeverMatch | Self::PseudoClass(_) => false,
            Self::Attribute(attr_sel) => attr_sel.matches(element),
        }
    }
}

impl AttributeSelector {
    fn matches(&self, element: &ElementData) -> bool {
        let value = |name: &str| element.attrs.get(name).map(String::as_str);
        match self {
            Self::Exists(name) => element.has_attribute(name),
            Self::Equals(name, val) => value(name) == Some(val.as_str()),
            Self::Includes(name, val) => {
                value(name).is_some_and(|v| v.split_ascii_whitespace().any(|w| w == val.as_str()))
            }
            Self::DashMatch(name, val) => value(name).is_some_and(|v| {
                v == val.as_str() || v.strip_prefix(val.as_str()).is_some_and(|rest| rest.starts_with('-'))
            }),
            // "If 'val' is the empty string then the selector does not
            // represent anything."
            Self::PrefixMatch(name, val) => {
                !val.is_empty() && value(name).is_some_and(|v| v.starts_with(val.as_str()))
            }
            Self::SuffixMatch(name, val) => {
                !val.is_empty() && value(name).is_some_and(|v| v.ends_with(val.as_str()))
            }
            Self::SubstringMatch(name, val) => {
                !val.is_empty() && value(name).is_some_and(|v| v.contains(val.as_str()))
            }
        }
    }
}

/// [§ 4.2.5 querySelectorAll()](https://dom.spec.whatwg.org/#dom-parentnode-queryselectorall)
///
/// "Return the static result of running scope-match a selectors string
/// selectors against this." Results are inclusive descendants of `root`
/// other than `root` itself, in tree order.
///
/// # Errors
///
/// Returns [`CssError::InvalidSelector`] when `selectors` does not parse.
pub fn query_selector_all(tree: &DomTree, root: NodeId, selectors: &str) -> Result<Vec<NodeId>, CssError> {
    let list = parse_selector_list(selectors)?;
    Ok(tree
        .descendants(root)
        .into_iter()
        .filter(|&id| list.matches(tree, id))
        .collect())
}

/// [§ 4.9 matches()](https://dom.spec.whatwg.org/#dom-element-matches)
///
/// # Errors
///
/// Returns [`CssError::InvalidSelector`] when `selectors` does not parse.
pub fn matches(tree: &DomTree, node_id: NodeId, selectors: &str) -> Result<bool, CssError> {
    Ok(parse_selector_list(selectors)?.matches(tree, node_id))
}

/// [§ 4.1 Selector lists](https://www.w3.org/TR/selectors-4/#grouping)
///
/// Parse a comma-separated selector list. The whole list is invalid if any
/// of its selectors is.
///
/// # Errors
///
/// Returns [`CssError::InvalidSelector`] carrying the original text.
pub fn parse_selector_list(text: &str) -> Result<SelectorList, CssError> {
    let invalid = || CssError::InvalidSelector(text.to_string());
    let selectors = split_selector_list(text)
        .into_iter()
        .map(|part| parse_complex_selector(part).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()?;
    if selectors.is_empty() {
        return Err(invalid());
    }
    Ok(SelectorList { selectors })
}

/// Split on commas that are not inside brackets, parentheses or strings.
fn split_selector_list(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Check if a character can start an identifier.
/// [§ 4.3.10 ident-start code point](https://www.w3.org/TR/css-syntax-3/#ident-start-code-point)
const fn is_ident_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// Check if a character can continue an identifier.
/// [§ 4.3.9 ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
const fn is_ident_char(c: char) -> bool {
    is_ident_start_char(c) || c.is_ascii_digit() || c == '-'
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}
}

/// Consume identifier code points, honoring `\` escapes (`.md\:fixed`).
fn consume_ident(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut ident = String::new();
    loop {
        if chars.next_if_eq(&'\\').is_some() {
            ident.push(chars.next()?);
        } else if let Some(c) = chars.next_if(|&c| is_ident_char(c)) {
            ident.push(c);
        } else {
            break;
        }
    }
    if ident.is_empty() { None } else { Some(ident) }
}

/// Parse one complex selector. Returns `None` for invalid syntax.
///
/// [§ 4 Selector syntax](https://www.w3.org/TR/selectors-4/#syntax)
fn parse_complex_selector(raw: &str) -> Option<ComplexSelector> {
    let mut chars = raw.trim().chars().peekable();
    let mut compounds: Vec<CompoundSelector> = Vec::new();
    let mut combinators_between: Vec<Combinator> = Vec::new();
    let mut current: Vec<SimpleSelector> = Vec::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => current.push(SimpleSelector::Class(consume_ident(&mut chars)?)),
            '#' => current.push(SimpleSelector::Id(consume_ident(&mut chars)?)),
            '*' => current.push(SimpleSelector::Universal),
            ':' => current.push(parse_pseudo(&mut chars)?),
            '[' => current.push(SimpleSelector::Attribute(parse_attribute(&mut chars)?)),

            // [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
            // Whitespace is the descendant combinator unless an explicit
            // combinator follows it.
            _ if c.is_ascii_whitespace() || matches!(c, '>' | '+' | '~') => {
                skip_whitespace(&mut chars);
                let explicit = if c.is_ascii_whitespace() {
                    chars.next_if(|&n| matches!(n, '>' | '+' | '~'))
                } else {
                    Some(c)
                };
                skip_whitespace(&mut chars);
                let combinator = match explicit {
                    None => Combinator::Descendant,
                    Some('>') => Combinator::Child,
                    Some('+') => Combinator::NextSibling,
                    Some(_) => Combinator::SubsequentSibling,
                };
                // Invalid: combinator without a left or right-hand side.
                if current.is_empty() || chars.peek().is_none() {
                    return None;
                }
                compounds.push(CompoundSelector {
                    simple_selectors: std::mem::take(&mut current),
                });
                combinators_between.push(combinator);
            }

            // [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
            // Only valid at the start of a compound.
            _ if current.is_empty() && (is_ident_start_char(c) || c == '-') => {
                let mut name = String::from(c);
                if let Some(rest) = consume_ident(&mut chars) {
                    name.push_str(&rest);
                }
                current.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            }

            _ => return None,
        }
    }

    if current.is_empty() {
        return None;
    }
    let subject = CompoundSelector {
        simple_selectors: current,
    };

    // For "A > B C" we have compounds [A, B] and combinators [Child, Descendant];
    // matching walks up from the subject, so store [(Descendant, B), (Child, A)].
    let combinators = compounds
        .into_iter()
        .zip(combinators_between)
        .rev()
        .map(|(compound, combinator)| (combinator, compound))
        .collect();

    Some(ComplexSelector {
        subject,
        combinators,
    })
}

/// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
/// [§ 11 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
///
/// Called after the first `:`.
fn parse_pseudo(chars: &mut Peekable<Chars<'_>>) -> Option<SimpleSelector> {
    let is_pseudo_element = chars.next_if_eq(&':').is_some();
    let name = consume_ident(chars)?.to_ascii_lowercase();

    // Functional notation: consume balanced parentheses.
    if chars.next_if_eq(&'(').is_some() {
        let mut depth = 1u32;
        while depth > 0 {
            match chars.next()? {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }
        return Some(SimpleSelector::NeverMatch);
    }
    if is_pseudo_element {
        return Some(SimpleSelector::NeverMatch);
    }

    let pseudo = match name.as_str() {
        "root" => PseudoClass::Root,
        "first-child" => PseudoClass::FirstChild,
        "last-child" => PseudoClass::LastChild,
        "only-child" => PseudoClass::OnlyChild,
        "empty" => PseudoClass::Empty,
        // Interactive states and unknown names degrade gracefully.
        _ => return Some(SimpleSelector::NeverMatch),
    };
    Some(SimpleSelector::PseudoClass(pseudo))
}

/// [§ 6.4 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
///
/// Called after the opening `[`; consumes through the closing `]`.
fn parse_attribute(chars: &mut Peekable<Chars<'_>>) -> Option<AttributeSelector> {
    skip_whitespace(chars);
    let name = consume_ident(chars)?.to_ascii_lowercase();
    skip_whitespace(chars);

    if chars.next_if_eq(&']').is_some() {
        return Some(AttributeSelector::Exists(name));
    }

    let op = match chars.next()? {
        '=' => '=',
        op @ ('~' | '|' | '^' | '$' | '*') => {
            let _ = chars.next_if_eq(&'=')?;
            op
        }
        _ => return None,
    };

    skip_whitespace(chars);
    let value = parse_attr_value(chars)?;
    skip_whitespace(chars);
    // [§ 6.3 Case-sensitivity](https://www.w3.org/TR/selectors-4/#attribute-case)
    // The `i`/`s` flags are accepted and ignored.
    let _ = chars.next_if(|&c| matches!(c, 'i' | 'I' | 's' | 'S'));
    skip_whitespace(chars);
    let _ = chars.next_if_eq(&']')?;

    Some(match op {
        '=' => AttributeSelector::Equals(name, value),
        '~' => AttributeSelector::Includes(name, value),
        '|' => AttributeSelector::DashMatch(name, value),
        '^' => AttributeSelector::PrefixMatch(name, value),
        '$' => AttributeSelector::SuffixMatch(name, value),
        _ => AttributeSelector::SubstringMatch(name, value),
    })
}

/// Parse an attribute value inside `[attr=value]`.
/// Handles both quoted (`"val"`, `'val'`) and unquoted ident values.
fn parse_attr_value(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let Some(quote) = chars.next_if(|&c| c == '"' || c == '\'') else {
        return consume_ident(chars);
    };
    let mut value = String::new();
    loop {
        match chars.next()? {
            '\\' => value.push(chars.next()?),
            c if c == quote => return Some(value),
            c => value.push(c),
        }
    }
}
