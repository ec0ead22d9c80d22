//! Force-directed layout engines and the arena that owns them.

pub mod arena;
pub mod engine;
pub mod stabilization;

pub use arena::{LayoutArena, LayoutHandle, Surface};
pub use engine::{LayoutEngine, LayoutOptions, Pick, ViewTransform};
pub use stabilization::{LayoutEvent, StabilizationPhase, StabilizationStatus};
