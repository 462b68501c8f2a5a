pub mod canvas;
pub mod checker;
pub mod direction;
pub mod doc;
pub mod id;
pub mod model;
pub mod ordering;

pub use canvas::{Canvas, DEFAULT_DRAGGER, Healed};
pub use checker::{ConnectionChecker, DefaultChecker};
pub use direction::Direction;
pub use doc::parse_canvas;
pub use id::{CanvasId, NodeId};
pub use model::*;
pub use ordering::PortOrdering;

// Re-export kurbo geometry so downstream crates agree on the point/vector types
pub use kurbo::{Point, Size, Vec2};
