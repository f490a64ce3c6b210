pub mod bounds;
pub mod ids;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use ids::*;
pub use math::canvas::{CanvasParams, DEFAULT_INSET, MapError, Point2};
