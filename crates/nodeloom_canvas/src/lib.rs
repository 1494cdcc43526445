// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canvas-side editing engine for NodeLoom: viewport math, hit-testing,
//! interaction gestures, selection and session orchestration.
//!
//! The crate is headless. It computes in graph and screen coordinates and
//! mutates the [`nodeloom_graph`] store, but draws nothing and owns no event
//! loop; hosts feed it input and render from its state. The usual entry
//! point is [`controller::GraphController`], which wires every component
//! together for one editing session.

pub mod autopan;
pub mod controller;
pub mod document;
pub mod interaction;
pub mod selection;
pub mod spatial;
pub mod viewport;

pub use autopan::{AutoPanConfig, AutoPanner};
pub use controller::GraphController;
pub use document::GraphDocument;
pub use interaction::{
    GridSnap, InteractionState, InteractionStateMachine, ResizeHandle, ResizeState,
    TempConnection, UniformGridSnap,
};
pub use selection::SelectionManager;
pub use spatial::{
    DefaultPortSize, NodeShapeBuilder, PortSizeResolver, SegmentCalculator, SpatialIndex,
};
pub use viewport::{AnimationHandle, Viewport, ViewportConfig, ViewportTransform};

/// Canvas-side failures.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// A view metric was queried before its one-time initialization.
    #[error("canvas not initialized: {0}")]
    NotInitialized(&'static str),

    /// Document serialization or deserialization failed.
    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
