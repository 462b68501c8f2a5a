//! Compass directions ↔ unit offsets.
//!
//! Canvas coordinates grow rightwards and downwards, so `Down` is `+y`.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};

/// A discrete direction carried by a keyboard move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit offset in canvas coordinates.
    pub fn to_vec2(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// Direction of the dominant axis of `v`.
    ///
    /// Returns `None` for the zero vector and for non-finite input. When both
    /// axes have the same magnitude the vertical one wins.
    pub fn from_vec2(v: Vec2) -> Option<Self> {
        if !(v.x.is_finite() && v.y.is_finite()) || (v.x == 0.0 && v.y == 0.0) {
            return None;
        }
        if v.x.abs() > v.y.abs() {
            Some(if v.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            })
        } else if v.y > 0.0 {
            Some(Direction::Down)
        } else {
            Some(Direction::Up)
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Step through a port ordering: `Down`/`Right` walk forward,
    /// `Up`/`Left` walk backward.
    pub fn traversal_step(self) -> isize {
        match self {
            Direction::Down | Direction::Right => 1,
            Direction::Up | Direction::Left => -1,
        }
    }
}
