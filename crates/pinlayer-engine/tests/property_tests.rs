//! Property tests over the standard page.

mod common;

use common::{Harness, Options};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn snapshot(harness: &Harness) -> Vec<(String, Vec<String>, Option<bool>)> {
    harness
        .fixed_layer
        .candidates()
        .iter()
        .map(|c| (c.id().to_string(), c.selectors().to_vec(), c.force_transfer()))
        .collect()
}

/// Inline declarations of every page element, order-insensitive.
fn declarations(harness: &Harness) -> Vec<Vec<String>> {
    (1..=6)
        .map(|n| {
            let mut declarations: Vec<String> = harness
                .tree()
                .style(harness.el(n))
                .unwrap()
                .iter()
                .map(|p| format!("{}: {} {}", p.name, p.value, p.important))
                .collect();
            declarations.sort();
            declarations
        })
        .collect()
}

/// Adding then removing an untracked element restores the registry.
#[quickcheck]
fn prop_add_remove_round_trip(force: Option<bool>, transfer: bool) -> bool {
    let options = if transfer { Options::transfer() } else { Options::default() };
    let mut harness = Harness::standard(options);
    let e6 = harness.el(6);
    harness.layout.fixed(e6);
    harness.layout.top(e6, "0px");
    let before = snapshot(&harness);

    let _ = harness.fixed_layer.add_element(e6, force);
    let added = harness.fixed_layer.candidates().len() == before.len() + 1;
    harness.fixed_layer.remove_element(e6);

    added
        && snapshot(&harness) == before
        && !harness.fixed_layer.is_declared_fixed(e6)
        && harness.tree().parent(e6) == Some(harness.body)
        && harness.inline(e6, "top").is_empty()
        && harness.inline(e6, "z-index").is_empty()
}

/// A second pass with nothing changed writes the same styles.
#[quickcheck]
fn prop_update_is_idempotent(top: u8, padding: u8, fixed_mask: u8, transfer: bool) -> TestResult {
    if padding > 200 {
        return TestResult::discard();
    }
    let options = Options {
        padding_top: f64::from(padding),
        ..if transfer { Options::transfer() } else { Options::default() }
    };
    let mut harness = Harness::standard(options);
    for n in 1..=5 {
        let element = harness.el(n);
        if fixed_mask & (1 << n) == 0 {
            harness.layout.sticky(element);
        } else {
            harness.layout.fixed(element);
        }
        harness.layout.top(element, &format!("{}px", top % 4));
    }

    let _ = harness.fixed_layer.update();
    let first = declarations(&harness);
    let parents: Vec<_> = (1..=6).map(|n| harness.tree().parent(harness.el(n))).collect();

    let _ = harness.fixed_layer.update();
    let second = declarations(&harness);
    let parents_again: Vec<_> = (1..=6).map(|n| harness.tree().parent(harness.el(n))).collect();

    TestResult::from_bool(first == second && parents == parents_again)
}

/// `display: none` is never fixed or sticky, whatever the position.
#[quickcheck]
fn prop_display_none_is_never_positioned(sticky: bool, width: u8, height: u8) -> bool {
    let mut harness = Harness::standard(Options::transfer());
    let e1 = harness.el(1);
    harness.layout.style(e1, |s| {
        s.position = if sticky { "sticky" } else { "fixed" }.to_string();
        s.display = "none".to_string();
        s.top = "0px".to_string();
    });
    harness.layout.metrics(e1, f64::from(width), f64::from(height), 0.0);

    let state = harness.measure();
    let f0 = state.get("F0").unwrap();
    !f0.fixed && !f0.sticky && !f0.transferrable
}
