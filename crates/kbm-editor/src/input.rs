//! Synthetic pointer events.
//!
//! Keyboard moves drive the dragger with the same pointer-down / move / up
//! sequence a mouse drag produces. Coordinates are in screen pixels
//! (canvas units × zoom scale). A directional step rides along on the move
//! event's `tilt` field; real pointers never set it.

use kbm_core::{Direction, Point};

/// A normalized pointer event fed to a `Dragger`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed: the drag begins here.
    PointerDown { x: f64, y: f64 },

    /// Pointer moved.
    PointerMove {
        x: f64,
        y: f64,
        /// Direction of a constrained keyboard step, if this move is one.
        tilt: Option<Direction>,
    },

    /// Pointer released.
    PointerUp { x: f64, y: f64 },
}

impl InputEvent {
    pub fn pointer_down(at: Point) -> Self {
        Self::PointerDown { x: at.x, y: at.y }
    }

    pub fn pointer_move(at: Point, tilt: Option<Direction>) -> Self {
        Self::PointerMove {
            x: at.x,
            y: at.y,
            tilt,
        }
    }

    pub fn pointer_up(at: Point) -> Self {
        Self::PointerUp { x: at.x, y: at.y }
    }

    pub fn position(&self) -> Point {
        match self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y } => Point::new(*x, *y),
        }
    }

    /// The direction tag of a constrained step.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::PointerMove { tilt, .. } => *tilt,
            _ => None,
        }
    }
}
