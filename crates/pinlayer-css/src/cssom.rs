//! [CSSOM](https://drafts.csswg.org/cssom/) stylesheets and rules.
//!
//! Only the interfaces a stylesheet scan walks are modeled: the sheet's
//! owner node, its disabled and origin-clean flags, style rules and the two
//! conditional group rules (`@media`, `@supports`). Every other at-rule is
//! kept as an opaque [`CssRule::Other`].

use pinlayer_dom::{NodeId, StyleDeclaration};

use crate::CssError;
use crate::parser::parse_stylesheet;

/// [§ 6.1 The CSSStyleSheet interface](https://drafts.csswg.org/cssom/#the-cssstylesheet-interface)
#[derive(Debug, Clone)]
pub struct StyleSheet {
    /// [§ 6.1](https://drafts.csswg.org/cssom/#concept-css-style-sheet-owner-node)
    /// "owner node: The DOM node associated with the CSS style sheet or null
    /// if there is no associated DOM node."
    pub owner_node: Option<NodeId>,

    /// [§ 6.1](https://drafts.csswg.org/cssom/#concept-css-style-sheet-disabled-flag)
    /// "disabled flag: Either set or unset. Unset by default."
    pub disabled: bool,

    /// [§ 6.1](https://drafts.csswg.org/cssom/#concept-css-style-sheet-origin-clean-flag)
    /// "origin-clean flag: Specified when created. If set, the CSS rules can
    /// be accessed from the API."
    pub origin_clean: bool,

    rules: Vec<CssRule>,
}

impl StyleSheet {
    /// An origin-clean, enabled sheet holding `rules`.
    #[must_use]
    pub const fn new(owner_node: Option<NodeId>, rules: Vec<CssRule>) -> Self {
        Self {
            owner_node,
            disabled: false,
            origin_clean: true,
            rules,
        }
    }

    /// Parse `text` into an origin-clean sheet.
    ///
    /// # Errors
    ///
    /// Returns the parser's error when a block, comment or string is left
    /// open at the end of the input.
    pub fn parse(owner_node: Option<NodeId>, text: &str) -> Result<Self, CssError> {
        Ok(Self::new(owner_node, parse_stylesheet(text)?))
    }

    /// A sheet fetched from another origin. Its rules cannot be read.
    #[must_use]
    pub const fn cross_origin(owner_node: Option<NodeId>) -> Self {
        Self {
            owner_node,
            disabled: false,
            origin_clean: false,
            rules: Vec::new(),
        }
    }

    /// Builder-style setter for the disabled flag.
    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// [§ 6.1.2 cssRules](https://drafts.csswg.org/cssom/#dom-cssstylesheet-cssrules)
    ///
    /// # Errors
    ///
    /// "If the origin-clean flag is unset, throw a SecurityError exception."
    pub fn css_rules(&self) -> Result<&[CssRule], CssError> {
        if !self.origin_clean {
            return Err(CssError::InaccessibleRules);
        }
        Ok(&self.rules)
    }
}

/// [§ 6.4 CSS Rules](https://drafts.csswg.org/cssom/#css-rules)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssRule {
    /// [§ 6.4.3 CSSStyleRule](https://drafts.csswg.org/cssom/#the-cssstylerule-interface)
    Style(StyleRule),

    /// [§ 6.4.7 CSSMediaRule](https://drafts.csswg.org/cssom/#the-cssmediarule-interface)
    Media {
        /// The raw media query list.
        condition: String,
        /// Rules inside the group.
        rules: Vec<CssRule>,
    },

    /// [CSS Conditional § 9.3 CSSSupportsRule](https://drafts.csswg.org/css-conditional-3/#the-csssupportsrule-interface)
    Supports {
        /// The raw supports condition.
        condition: String,
        /// Rules inside the group.
        rules: Vec<CssRule>,
    },

    /// Any other at-rule (`@font-face`, `@keyframes`, `@import`, ...).
    Other {
        /// The at-keyword without the `@`, lowercased.
        name: String,
    },
}

impl CssRule {
    /// [§ 6.4.6 CSSGroupingRule](https://drafts.csswg.org/cssom/#the-cssgroupingrule-interface)
    ///
    /// The child rules of a conditional group, or `None` for leaf rules.
    #[must_use]
    pub fn child_rules(&self) -> Option<&[Self]> {
        match self {
            Self::Media { rules, .. } | Self::Supports { rules, .. } => Some(rules),
            Self::Style(_) | Self::Other { .. } => None,
        }
    }
}

/// [§ 6.4.3 CSSStyleRule](https://drafts.csswg.org/cssom/#the-cssstylerule-interface)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// "The selectorText attribute, on getting, must return the result of
    /// serializing the associated group of selectors."
    pub selector_text: String,
    /// The declaration block.
    pub style: StyleDeclaration,
}
