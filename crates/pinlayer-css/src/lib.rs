//! CSS support for the pinlayer engine.
//!
//! This crate implements the small part of CSS the fixed layer needs:
//! - **CSSOM** - stylesheets, rules and declaration blocks per
//!   [CSSOM](https://drafts.csswg.org/cssom/)
//! - **Parser** - turns stylesheet text into rules, nesting `@media` and
//!   `@supports` groups
//! - **Selectors** - parsing and matching per
//!   [Selectors Level 4](https://www.w3.org/TR/selectors-4/), plus
//!   `querySelectorAll` and `matches`

use thiserror::Error;

/// Stylesheets and rules.
pub mod cssom;
/// Stylesheet text parser.
pub mod parser;
/// Selector parsing and matching.
pub mod selector;

pub use cssom::{CssRule, StyleRule, StyleSheet};
pub use parser::parse_stylesheet;
pub use selector::{SelectorList, matches, parse_selector_list, query_selector_all};

/// Errors raised by stylesheet access, parsing and selector matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssError {
    /// [§ 3 Selectors API](https://dom.spec.whatwg.org/#scope-match-a-selectors-string)
    /// "If s is failure, then throw a SyntaxError."
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    /// [§ 6.1.2 cssRules](https://drafts.csswg.org/cssom/#dom-cssstylesheet-cssrules)
    /// "If the origin-clean flag is unset, throw a SecurityError."
    #[error("cannot access rules of a cross-origin stylesheet")]
    InaccessibleRules,

    /// A `{` block was still open at the end of the input.
    #[error("unterminated block opened at byte {0}")]
    UnterminatedBlock(usize),

    /// A `/*` comment was still open at the end of the input.
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    /// A quoted string was still open at the end of the input.
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
}
