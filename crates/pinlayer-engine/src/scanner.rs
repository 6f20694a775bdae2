//! Style rule scanner.
//!
//! Walks the author stylesheets of a document and collects the selectors of
//! rules declaring `position: fixed` or a (possibly vendor-prefixed)
//! `position: sticky`. Rules inside `@media` and `@supports` are collected
//! whether or not their condition holds; the measure phase re-checks every
//! candidate anyway.

use pinlayer_css::{CssError, CssRule, StyleSheet};
use pinlayer_dom::DomTree;
use serde::Serialize;

use crate::config::FixedLayerConfig;

/// Selectors found by a scan, in stylesheet order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Selectors of `position: fixed` rules.
    pub fixed: Vec<String>,
    /// Selectors of `position: sticky` and `-webkit-sticky` rules.
    pub sticky: Vec<String>,
}

impl ScanResult {
    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.sticky.is_empty()
    }

    fn scan_rules(&mut self, rules: &[CssRule]) {
        for rule in rules {
            match rule {
                CssRule::Style(style_rule) => {
                    if style_rule.selector_text == "*" {
                        continue;
                    }
                    let position = style_rule.style.property_value("position");
                    if position == "fixed" {
                        self.fixed.push(style_rule.selector_text.clone());
                    } else if position.ends_with("sticky") {
                        self.sticky.push(style_rule.selector_text.clone());
                    }
                }
                CssRule::Media { rules, .. } | CssRule::Supports { rules, .. } => self.scan_rules(rules),
                CssRule::Other { .. } => {}
            }
        }
    }
}

/// Whether `sheet` can carry author fixed/sticky declarations.
///
/// Disabled sheets, sheets without an owner node, link-based sheets and
/// sheets whose `<style>` carries one of the framework markers are skipped.
#[must_use]
pub fn is_author_style_sheet(sheet: &StyleSheet, tree: &DomTree, config: &FixedLayerConfig) -> bool {
    if sheet.disabled {
        return false;
    }
    let Some(owner) = sheet.owner_node else {
        return false;
    };
    if tree.tag_name(owner) != Some("style") {
        return false;
    }
    !config
        .skip_owner_markers
        .iter()
        .any(|marker| tree.has_attribute(owner, marker))
}

/// Scan `sheets` in order.
///
/// # Errors
///
/// Returns [`CssError::InaccessibleRules`] when an author sheet is
/// cross-origin. Callers treat any error as "no selectors".
pub fn scan_style_sheets(
    sheets: &[StyleSheet],
    tree: &DomTree,
    config: &FixedLayerConfig,
) -> Result<ScanResult, CssError> {
    let mut result = ScanResult::default();
    for sheet in sheets {
        if !is_author_style_sheet(sheet, tree, config) {
            continue;
        }
        // Rules are only dereferenced for sheets that pass the owner checks,
        // so a cross-origin font sheet behind a <link> never fails the scan.
        result.scan_rules(sheet.css_rules()?);
    }
    Ok(result)
}
