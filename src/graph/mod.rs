//! Typed visualization data and the pure operations over it.

pub mod dataset;
pub mod drilldown;
pub mod export;
pub mod filter;
pub mod kind;
pub mod matrix;
pub mod payload;

pub use dataset::{Edge, ElementId, GraphDataset, Node};
pub use kind::{Family, VisualizationKind};
