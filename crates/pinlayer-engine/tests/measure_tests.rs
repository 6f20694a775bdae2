//! Tests for the measure phase: classification, top resolution and
//! relocation eligibility.

mod common;

use common::{Harness, Options, standard_page};
use log::Level;
use pinlayer_engine::{CandidateState, FixedLayerConfig, PassOutcome};

// ========== classification ==========

#[test]
fn test_collects_fixed_and_sticky() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.sticky(harness.el(5));

    let state = harness.measure();

    let f0 = state.get("F0").unwrap();
    assert!(f0.fixed);
    assert!(!f0.sticky);
    assert_eq!(f0.top, "");
    assert_eq!(f0.z_index, "auto");

    for id in ["F1", "F2", "F3"] {
        let candidate = state.get(id).unwrap();
        assert!(!candidate.fixed, "{id}");
        assert!(!candidate.sticky, "{id}");
    }

    let f4 = state.get("F4").unwrap();
    assert!(!f4.fixed);
    assert!(f4.sticky);
    assert_eq!(f4.top, "");
}

#[test]
fn test_vendor_prefixed_sticky() {
    let mut harness = Harness::standard(Options::default());
    harness
        .layout
        .style(harness.el(5), |s| s.position = "-webkit-sticky".to_string());

    assert!(harness.measure().get("F4").unwrap().sticky);
}

#[test]
fn test_static_position_is_neither() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.metrics(harness.el(1), 10.0, 10.0, 0.0);

    let state = harness.measure();
    assert!(!state.get("F0").unwrap().fixed);
    assert!(!state.get("F1").unwrap().fixed);
    assert!(!state.get("F4").unwrap().sticky);
}

#[test]
fn test_fixed_without_area_is_ignored_but_sticky_is_not() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.style(harness.el(1), |s| s.position = "fixed".to_string());
    harness.layout.metrics(harness.el(1), 0.0, 0.0, 0.0);
    harness.layout.sticky(harness.el(5));
    harness.layout.metrics(harness.el(5), 0.0, 0.0, 0.0);

    let state = harness.measure();
    assert!(!state.get("F0").unwrap().fixed);
    assert!(state.get("F4").unwrap().sticky);
}

#[test]
fn test_display_none_is_neither() {
    let mut harness = Harness::standard(Options::default());
    for n in [1, 5] {
        let element = harness.el(n);
        harness.layout.fixed(element);
        harness.layout.style(element, |s| s.display = "none".to_string());
    }
    harness.layout.sticky(harness.el(5));

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap(), &CandidateState::default());
    assert!(!state.get("F4").unwrap().sticky);
}

#[test]
fn test_null_computed_style_is_tolerated() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.set_null_style(true);

    let state = harness.measure();
    let f0 = state.get("F0").unwrap();
    assert!(!f0.fixed);
    assert!(!f0.sticky);
    assert!(!f0.transferrable);
    assert_eq!(f0.top, "");
    assert_eq!(f0.z_index, "");
    assert!(!state.has_transferables);
    assert_eq!(harness.fixed_layer.update(), PassOutcome::Completed);
}

#[test]
fn test_layout_failure_only_drops_that_element() {
    let mut harness = Harness::standard(Options::default());
    let (e1, e5) = (harness.el(1), harness.el(5));
    harness.layout.fixed(e1);
    harness.layout.fail_on(e1);
    harness.layout.sticky(e5);
    harness.layout.top(e5, "5px");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap(), &CandidateState::default());
    assert!(state.get("F4").unwrap().sticky);
    assert!(harness.diagnostics.contains(Level::Warn, "Failed to measure F0"));

    assert_eq!(harness.fixed_layer.update(), PassOutcome::Completed);
    assert!(!harness.candidate("F0").is_fixed_now());
    assert!(harness.candidate("F4").is_sticky_now());
    assert_eq!(harness.inline(e5, "top"), "calc(5px + 11px)");
    for n in [1, 2, 4, 5] {
        assert_eq!(harness.inline(harness.el(n), "bottom"), "", "element {n}");
    }
}

#[test]
fn test_computed_fixed_on_sticky_only_element_is_not_fixed() {
    let mut harness = Harness::standard(Options::transfer());
    let e5 = harness.el(5);
    harness.layout.fixed(e5);
    harness.layout.top(e5, "0px");

    let f4 = harness.measure().get("F4").cloned().unwrap();
    assert!(!f4.fixed);
    assert!(!f4.sticky);
    assert!(!f4.transferrable);

    let _ = harness.fixed_layer.update();
    assert!(!harness.candidate("F4").is_fixed_now());
}

#[test]
fn test_collects_z_index() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.style(harness.el(1), |s| s.z_index = "101".to_string());

    assert_eq!(harness.measure().get("F0").unwrap().z_index, "101");
}

// ========== top resolution ==========

#[test]
fn test_explicit_top_is_kept() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "11px");
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "11px");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "11px");
    assert_eq!(state.get("F4").unwrap().top, "11px");
}

#[test]
fn test_auto_top_is_not_anchored() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "auto");
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "auto");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "");
    assert_eq!(state.get("F4").unwrap().top, "");
}

#[test]
fn test_sticky_zero_top_differing_from_probe_is_implicit() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "0px");
    harness.layout.auto_top(harness.el(5), "12px");

    let f4 = harness.measure().get("F4").cloned().unwrap();
    assert!(f4.sticky);
    assert_eq!(f4.top, "");
}

#[test]
fn test_sticky_zero_top_matching_probe_is_explicit() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "0px");
    harness.layout.auto_top(harness.el(5), "0px");

    assert_eq!(harness.measure().get("F4").unwrap().top, "0px");
}

#[test]
fn test_implicit_top_away_from_padding_is_not_anchored() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.auto_top(harness.el(1), "12px");
    harness.layout.sticky(harness.el(5));
    harness.layout.auto_top(harness.el(5), "12px");

    let state = harness.measure();
    assert!(state.get("F0").unwrap().fixed);
    assert_eq!(state.get("F0").unwrap().top, "");
    assert!(state.get("F4").unwrap().sticky);
    assert_eq!(state.get("F4").unwrap().top, "");
}

#[test]
fn test_implicit_top_at_padding_is_anchored_to_zero() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "11px");
    harness.layout.auto_top(harness.el(1), "0px");
    harness.layout.metrics(harness.el(1), 10.0, 10.0, 11.0);
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "11px");
    harness.layout.auto_top(harness.el(5), "11px");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "0px");
    assert_eq!(state.get("F4").unwrap().top, "11px");
}

#[test]
fn test_implicit_top_at_padding_plus_border_is_anchored_to_zero() {
    let options = Options {
        config: FixedLayerConfig {
            border_top: 1.0,
            ..FixedLayerConfig::default()
        },
        ..Options::default()
    };
    let mut harness = Harness::new(standard_page(), options);
    let _ = harness.fixed_layer.setup();
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "12px");
    harness.layout.auto_top(harness.el(1), "0px");
    harness.layout.metrics(harness.el(1), 10.0, 10.0, 12.0);
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "12px");
    harness.layout.auto_top(harness.el(5), "12px");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "0px");
    assert_eq!(state.get("F4").unwrap().top, "12px");
}

#[test]
fn test_flush_top_follows_committed_padding() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "11px");
    harness.layout.auto_top(harness.el(1), "0px");
    harness.layout.metrics(harness.el(1), 10.0, 10.0, 11.0);
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "11px");
    harness.layout.auto_top(harness.el(5), "11px");
    assert_eq!(harness.measure().get("F0").unwrap().top, "0px");

    // Transient: the live padding moves, the committed one does not.
    let _ = harness.fixed_layer.update_padding_top(22.0, true);
    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "0px");
    assert_eq!(state.get("F4").unwrap().top, "11px");
    assert!((harness.fixed_layer.padding().live() - 22.0).abs() < 1e-9);
    assert!((harness.fixed_layer.padding().committed() - 11.0).abs() < 1e-9);

    // Committed: the element is no longer flush with the padding.
    let _ = harness.fixed_layer.update_padding_top(22.0, false);
    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "");
    assert_eq!(state.get("F4").unwrap().top, "11px");
    assert!((harness.fixed_layer.padding().committed() - 22.0).abs() < 1e-9);
}

#[test]
fn test_zero_top_is_always_anchored() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.auto_top(harness.el(1), "0px");
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "0px");
    harness.layout.auto_top(harness.el(5), "0px");

    let state = harness.measure();
    assert_eq!(state.get("F0").unwrap().top, "0px");
    assert_eq!(state.get("F4").unwrap().top, "0px");
}

#[test]
fn test_measure_leaves_no_inline_styles_behind() {
    let mut harness = Harness::standard(Options::default());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    let (e1, e5) = (harness.el(1), harness.el(5));

    let _ = harness.measure();
    for element in [e1, e5] {
        let style = harness.tree().style(element).unwrap();
        assert_eq!(style.property_value("transition"), "");
        assert!(!style.is_important("transition"));
        assert_eq!(style.property_value("bottom"), "");
    }

    let _ = harness.fixed_layer.update();
    assert_eq!(harness.inline(e1, "transition"), "");
    assert_eq!(harness.inline(e5, "transition"), "");
}

// ========== relocation eligibility ==========

#[test]
fn test_auto_top_and_bottom_are_not_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.sticky(harness.el(5));

    let state = harness.measure();
    assert!(state.get("F0").unwrap().fixed);
    assert!(!state.get("F0").unwrap().transferrable);
    assert!(!state.get("F1").unwrap().fixed);
    assert!(state.get("F4").unwrap().sticky);
    assert!(!state.get("F4").unwrap().transferrable);
    assert!(!state.has_transferables);
}

#[test]
fn test_zero_top_is_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.sticky(harness.el(5));
    harness.layout.top(harness.el(5), "0px");

    let state = harness.measure();
    assert!(state.get("F0").unwrap().transferrable);
    assert_eq!(state.get("F0").unwrap().top, "0px");
    assert!(!state.get("F4").unwrap().transferrable);
    assert_eq!(state.get("F4").unwrap().top, "0px");
    assert!(state.has_transferables);
}

#[test]
fn test_non_zero_top_is_not_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "2px");

    let f0 = harness.measure().get("F0").cloned().unwrap();
    assert!(f0.fixed);
    assert_eq!(f0.top, "2px");
    assert!(!f0.transferrable);
}

#[test]
fn test_zero_bottom_is_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.style(harness.el(1), |s| s.bottom = "0px".to_string());
    harness.layout.sticky(harness.el(5));
    harness.layout.style(harness.el(5), |s| s.bottom = "0px".to_string());

    let state = harness.measure();
    assert!(state.get("F0").unwrap().transferrable);
    assert!(!state.get("F4").unwrap().transferrable);
}

#[test]
fn test_transparent_element_is_not_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.style(harness.el(1), |s| s.opacity = "0".to_string());

    let f0 = harness.measure().get("F0").cloned().unwrap();
    assert!(f0.fixed);
    assert!(!f0.transferrable);
}

#[test]
fn test_tall_element_is_not_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.metrics(harness.el(1), 10.0, 300.0, 0.0);

    assert!(!harness.measure().get("F0").unwrap().transferrable);
}

#[test]
fn test_forced_transfer_overrides_missing_area() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.style(harness.el(1), |s| s.position = "fixed".to_string());
    harness.layout.metrics(harness.el(1), 0.0, 0.0, 0.0);
    harness.layout.sticky(harness.el(5));

    let state = harness.measure();
    assert!(!state.get("F0").unwrap().fixed);
    assert!(!state.get("F0").unwrap().transferrable);
    assert!(!state.get("F4").unwrap().transferrable);

    let e1 = harness.el(1);
    let _ = harness.fixed_layer.add_element(e1, Some(true));
    let f0 = harness.measure().get("F0").cloned().unwrap();
    assert!(f0.fixed);
    assert!(f0.transferrable);
}

#[test]
fn test_forbidden_transfer_is_never_transferrable() {
    let mut harness = Harness::standard(Options::transfer());
    harness.layout.fixed(harness.el(1));
    harness.layout.top(harness.el(1), "0px");
    harness.layout.sticky(harness.el(5));
    assert!(harness.measure().get("F0").unwrap().transferrable);

    let e1 = harness.el(1);
    let _ = harness.fixed_layer.add_element(e1, Some(false));
    let f0 = harness.measure().get("F0").cloned().unwrap();
    assert!(f0.fixed);
    assert!(!f0.transferrable);
}
