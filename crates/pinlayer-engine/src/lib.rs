//! Fixed/sticky position correction engine.
//!
//! Finds elements whose author styles pin them to the viewport, re-measures
//! them in a single read phase and corrects them in a single write phase.
//! On hosts that cannot render `position: fixed` inside a scrolling embedded
//! frame, eligible fixed elements are relocated into an overlay layer that
//! is a sibling of the body (or a slot inside the body's shadow root).
//!
//! # Components
//!
//! - [`scanner`] - extracts fixed and sticky selectors from author stylesheets
//! - [`registry`] - the tracked candidates, their ids and matched selectors
//! - [`reconciler`] - the measure/mutate transaction
//! - [`transfer`] - the overlay layer strategies
//! - [`observer`] - debounced reaction to visibility mutations
//! - [`padding`] - live and committed viewport padding
//! - [`FixedLayer`] - the facade tying them together
//!
//! # Not Implemented
//!
//! - Layout computation. Computed styles and box metrics are read through
//!   [`LayoutProbe`].
//! - Scrolling.

use pinlayer_css::CssError;
use pinlayer_dom::{DomError, NodeId};
use thiserror::Error;

/// Engine configuration.
pub mod config;
/// The facade.
pub mod fixed_layer;
/// Collaborators the engine runs against.
pub mod host;
/// Mutation observer bridge.
pub mod observer;
/// Viewport padding coordinator.
pub mod padding;
/// Debounced pass scheduling.
pub mod pass;
/// Measure/mutate reconciler.
pub mod reconciler;
/// Candidate registry.
pub mod registry;
/// Style rule scanner.
pub mod scanner;
/// Overlay transfer layer.
pub mod transfer;

pub use config::FixedLayerConfig;
pub use fixed_layer::{FixedLayer, PassOutcome};
pub use host::{
    BoxMetrics, ComputedStyle, Document, DocumentError, Host, ImmediateVsync, LayoutProbe, Platform,
    StaticPlatform, Transaction, Vsync,
};
pub use observer::MutationBridge;
pub use padding::ViewportPadding;
pub use pass::Pass;
pub use reconciler::{CandidateState, MeasureState, Reconciler};
pub use registry::{Candidate, PositionKind, Registry};
pub use scanner::{ScanResult, scan_style_sheets};
pub use transfer::{BodyTransferLayer, ShadowTransferLayer, TransferLayer};

/// Tag used for every diagnostic the engine reports.
pub const TAG: &str = "FixedLayer";

/// Attribute carrying a candidate's id on its element (and placeholder).
pub const FIXED_ID_ATTR: &str = "pinlayer-fixedid";

/// Errors raised by the layout reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The node is not an element of the measured document.
    #[error("cannot measure node {0:?}: not an element of the document")]
    NotMeasurable(NodeId),

    /// The host could not produce layout information.
    #[error("layout unavailable: {0}")]
    Unavailable(String),
}

/// Errors that abandon a setup or reconciliation pass.
///
/// None of these reach the host: the facade reports them through the
/// diagnostics sink and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    /// A computed style or box metric could not be read.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A tree mutation failed.
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A stylesheet or selector could not be used.
    #[error(transparent)]
    Css(#[from] CssError),

    /// The overlay layer needs a `<body>` under a document element.
    #[error("document has no body to mirror")]
    MissingBody,
}
