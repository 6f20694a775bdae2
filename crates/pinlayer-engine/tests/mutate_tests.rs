//! Tests for the mutate phase: `top` corrections, removal cleanup and
//! transform passthrough.

mod common;

use common::{Harness, Options};
use pinlayer_engine::PassOutcome;

/// A harness whose e1 (F0) is fixed and e5 (F4) sticky, both with an
/// explicit `top`.
fn anchored(options: Options, top: &str) -> Harness {
    let harness = Harness::standard(options);
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), top);
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), top);
    harness
}

// ========== top ==========

#[test]
fn test_fixed_without_top_leaves_top_unset() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));

    assert_eq!(harness.fixed_layer.update(), PassOutcome::Completed);
    let f0 = harness.candidate("F0");
    assert!(f0.is_fixed_now());
    assert!(!f0.is_sticky_now());
    assert_eq!(harness.inline(harness.el(1), "top"), "");
    assert_eq!(harness.fixed_layer.transfer_layer_root(), None);
}

#[test]
fn test_sticky_without_top_leaves_top_unset() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.sticky(harness.el(5));

    let _ = harness.fixed_layer.update();
    let f4 = harness.candidate("F4");
    assert!(!f4.is_fixed_now());
    assert!(f4.is_sticky_now());
    assert_eq!(harness.inline(harness.el(5), "top"), "");
}

#[test]
fn test_fixed_top_adds_live_padding() {
    let mut harness = anchored(Options::default(), "17px");
    let _ = harness.fixed_layer.update();

    assert!(harness.candidate("F0").is_fixed_now());
    assert_eq!(harness.candidate("F0").top(), "17px");
    assert_eq!(harness.inline(harness.el(1), "top"), "calc(17px + 11px)");
}

#[test]
fn test_sticky_top_adds_live_padding_without_relocation() {
    let mut harness = anchored(Options::default(), "17px");
    let _ = harness.fixed_layer.update();

    assert!(harness.candidate("F4").is_sticky_now());
    assert_eq!(harness.inline(harness.el(5), "top"), "calc(17px + 11px)");
}

#[test]
fn test_sticky_top_is_unpadded_when_relocating() {
    let mut harness = anchored(Options::transfer(), "17px");
    let _ = harness.fixed_layer.update();

    assert_eq!(harness.inline(harness.el(5), "top"), "17px");
}

#[test]
fn test_sticky_top_subtracts_committed_padding_while_transient() {
    let mut harness = anchored(Options::transfer(), "17px");
    let _ = harness.fixed_layer.update_padding_top(0.0, true);

    assert_eq!(harness.inline(harness.el(5), "top"), "calc(17px - 11px)");
}

#[test]
fn test_top_follows_live_padding() {
    let mut harness = anchored(Options::default(), "17px");
    let _ = harness.fixed_layer.update_padding_top(30.0, true);
    assert_eq!(harness.inline(harness.el(1), "top"), "calc(17px + 30px)");

    let _ = harness.fixed_layer.update_padding_top(0.0, false);
    assert_eq!(harness.inline(harness.el(1), "top"), "calc(17px + 0px)");
}

#[test]
fn test_update_is_idempotent() {
    let mut harness = anchored(Options::default(), "17px");
    let _ = harness.fixed_layer.update();
    let first = harness.tree().style(harness.el(1)).unwrap().css_text();

    let _ = harness.fixed_layer.update();
    let second = harness.tree().style(harness.el(1)).unwrap().css_text();
    assert_eq!(first, second);
}

// ========== removal ==========

#[test]
fn test_removing_fixed_element_resets_top() {
    let mut harness = Harness::standard(Options::default());
    let e6 = harness.el(6);
    harness.layout.fixed(e6);
    harness.layout.top(e6, "17px");

    let _ = harness.fixed_layer.add_element(e6, None);
    assert_eq!(harness.candidate("F5").selectors(), ["*"]);
    assert_eq!(harness.inline(e6, "top"), "calc(17px + 11px)");

    harness.fixed_layer.remove_element(e6);
    assert_eq!(harness.fixed_layer.candidates().len(), 5);
    assert_eq!(harness.inline(e6, "top"), "");
}

#[test]
fn test_removing_sticky_element_resets_top() {
    let mut harness = anchored(Options::default(), "17px");
    let e5 = harness.el(5);
    let _ = harness.fixed_layer.update();
    assert_eq!(harness.inline(e5, "top"), "calc(17px + 11px)");

    harness.fixed_layer.remove_element(e5);
    assert_eq!(harness.fixed_layer.candidates().len(), 4);
    assert_eq!(harness.inline(e5, "top"), "");
}

// ========== transform ==========

#[test]
fn test_transform_applies_to_anchored_fixed_elements() {
    let mut harness = anchored(Options::default(), "17px");
    let e1 = harness.el(1);
    let _ = harness.fixed_layer.update();

    harness.fixed_layer.transform_mutate(Some("translateY(-10px)"));
    assert_eq!(harness.inline(e1, "transform"), "translateY(-10px)");
    assert_eq!(harness.inline(e1, "transition"), "none");

    harness.fixed_layer.transform_mutate(None);
    assert_eq!(harness.inline(e1, "transform"), "");
    assert_eq!(harness.inline(e1, "transition"), "");
}

#[test]
fn test_transform_skips_sticky_elements() {
    let mut harness = anchored(Options::default(), "17px");
    let e5 = harness.el(5);
    let _ = harness.fixed_layer.update();

    harness.fixed_layer.transform_mutate(Some("translateY(-10px)"));
    assert_eq!(harness.inline(e5, "transform"), "");
    assert_eq!(harness.inline(e5, "transition"), "");

    harness.fixed_layer.transform_mutate(None);
    assert_eq!(harness.inline(e5, "transform"), "");
}

#[test]
fn test_transform_compounds_with_computed_transform() {
    let mut harness = anchored(Options::default(), "17px");
    let e1 = harness.el(1);
    harness.layout.style(e1, |s| s.transform = "scale(2)".to_string());
    let _ = harness.fixed_layer.update();

    harness.fixed_layer.transform_mutate(Some("translateY(-10px)"));
    assert_eq!(harness.inline(e1, "transform"), "scale(2) translateY(-10px)");
}

#[test]
fn test_transform_skips_fixed_elements_without_anchored_top() {
    let mut harness = Harness::standard(Options::default());
    let e1 = harness.el(1);
    harness.layout.fixed(e1);
    let _ = harness.fixed_layer.update();
    assert!(harness.candidate("F0").is_fixed_now());

    harness.fixed_layer.transform_mutate(Some("translateY(-10px)"));
    assert_eq!(harness.inline(e1, "transform"), "");
}
