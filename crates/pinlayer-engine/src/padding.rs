//! Viewport padding coordinator.
//!
//! The hosting viewport may reserve space at the top (e.g. for a header bar).
//! The live padding feeds the `top` correction of every pass; the committed
//! padding is the last non-transient value and is what flush-top detection
//! and relocated sticky elements are measured against.

/// Live and committed top padding, in CSS px.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportPadding {
    live: f64,
    committed: f64,
}

impl ViewportPadding {
    /// Start with `padding` both live and committed.
    #[must_use]
    pub const fn new(padding: f64) -> Self {
        Self {
            live: padding,
            committed: padding,
        }
    }

    /// Set the live padding, and commit it unless `transient`.
    pub const fn update(&mut self, padding: f64, transient: bool) {
        self.live = padding;
        if !transient {
            self.committed = padding;
        }
    }

    /// The padding used for this pass's offsets.
    #[must_use]
    pub const fn live(&self) -> f64 {
        self.live
    }

    /// The last non-transient padding.
    #[must_use]
    pub const fn committed(&self) -> f64 {
        self.committed
    }

    /// Whether no transient change is outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        same_px(self.live, self.committed)
    }
}

/// Pixel equality, tolerant of float noise.
#[must_use]
pub fn same_px(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

/// Format a px amount for use inside `calc()`: `11px`, `10.5px`.
#[must_use]
pub fn px(value: f64) -> String {
    format!("{value}px")
}
