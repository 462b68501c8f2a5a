//! Connection candidate search.
//!
//! Two modes:
//!
//! - **Directional**: resume from a cursor port and step through the
//!   `PortOrdering` until some local port may join the port under the
//!   cursor. Distance plays no part; traversal order breaks ties.
//! - **Nearest**: the closest compatible (local, neighbour) pair within a
//!   radius, as a pointer drag would find it.
//!
//! Directional search without a usable cursor falls back to nearest search
//! with no radius limit.

use kbm_core::{Canvas, ConnectionChecker, Direction, PortOrdering, PortRef};

/// One hypothesis for where the moving block would attach if the move
/// ended now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Port on the moving block.
    pub local: PortRef,
    /// Port on a block that stays put.
    pub neighbour: PortRef,
    /// Geometric distance for nearest search, `0.0` for directional search.
    pub distance: f64,
}

/// A search over one canvas for one moving block's local ports.
pub struct ConnectionSearch<'a> {
    canvas: &'a Canvas,
    checker: &'a dyn ConnectionChecker,
    locals: &'a [PortRef],
    ordering: &'a PortOrdering,
}

impl<'a> ConnectionSearch<'a> {
    pub fn new(
        canvas: &'a Canvas,
        checker: &'a dyn ConnectionChecker,
        locals: &'a [PortRef],
        ordering: &'a PortOrdering,
    ) -> Self {
        Self {
            canvas,
            checker,
            locals,
            ordering,
        }
    }

    /// Next port after `cursor` in `direction` that one of the local ports
    /// may join. `None` once the walk comes back round to `cursor`, or when
    /// `cursor` is not part of the ordering.
    pub fn directional(&self, cursor: PortRef, direction: Direction) -> Option<Candidate> {
        let start = self.ordering.position_of(cursor)?;
        for neighbour in self.ordering.walk(start, direction) {
            for &local in self.locals {
                if self
                    .checker
                    .can_connect(self.canvas, local, neighbour, true, f64::INFINITY)
                {
                    log::trace!(
                        "{direction:?} from {}: {} -> {}",
                        self.canvas.port_label(cursor),
                        self.canvas.port_label(local),
                        self.canvas.port_label(neighbour)
                    );
                    return Some(Candidate {
                        local,
                        neighbour,
                        distance: 0.0,
                    });
                }
            }
        }
        None
    }

    /// Closest compatible pair within `radius`. Ties keep the pair found
    /// first (local port order, then traversal order).
    pub fn nearest(&self, radius: f64) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for &local in self.locals {
            let Some(at) = self.canvas.port_position(local) else {
                continue;
            };
            for neighbour in self.ordering.iter() {
                if !self
                    .checker
                    .can_connect(self.canvas, local, neighbour, false, radius)
                {
                    continue;
                }
                let Some(there) = self.canvas.port_position(neighbour) else {
                    continue;
                };
                let distance = at.distance(there);
                if best.is_none_or(|b| distance < b.distance) {
                    best = Some(Candidate {
                        local,
                        neighbour,
                        distance,
                    });
                }
            }
        }
        best
    }

    /// One constrained step: resume from `cursor` when it is part of the
    /// ordering, otherwise take the globally nearest compatible pair.
    pub fn step(&self, cursor: Option<PortRef>, direction: Direction) -> Option<Candidate> {
        match cursor.filter(|c| self.ordering.position_of(*c).is_some()) {
            Some(cursor) => self.directional(cursor, direction),
            None => {
                log::trace!("no search cursor, falling back to nearest");
                self.nearest(f64::INFINITY).map(|c| Candidate {
                    distance: 0.0,
                    ..c
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbm_core::{Block, DefaultChecker, NodeId};
    use std::collections::HashSet;

    fn port(canvas: &Canvas, block: &str, name: &str) -> PortRef {
        let id = NodeId::intern(block);
        PortRef::new(id, canvas.block(id).unwrap().slot_of(name).unwrap())
    }

    /// Three free stacks in a column plus a cap block `s_mover` off to the side.
    fn canvas() -> Canvas {
        let mut canvas = Canvas::new();
        for (name, y) in [("s_one", 0.0), ("s_two", 200.0), ("s_three", 400.0)] {
            canvas.add_block(Block::statement(name, 0.0, y)).unwrap();
        }
        canvas
            .add_block(Block::new(
                NodeId::intern("s_mover"),
                kbm_core::BlockShape::Cap,
                kbm_core::Point::new(500.0, 215.0),
            ))
            .unwrap();
        canvas
    }

    fn ordering(canvas: &Canvas) -> PortOrdering {
        PortOrdering::snapshot(canvas, &HashSet::from([NodeId::intern("s_mover")]))
    }

    #[test]
    fn directional_skips_incompatible_ports() {
        let canvas = canvas();
        let ordering = ordering(&canvas);
        let locals = [port(&canvas, "s_mover", "previous")];
        let search = ConnectionSearch::new(&canvas, &DefaultChecker, &locals, &ordering);

        let first = search
            .directional(port(&canvas, "s_one", "next"), Direction::Down)
            .unwrap();
        assert_eq!(first.neighbour, port(&canvas, "s_two", "next"));
        assert_eq!(first.distance, 0.0);

        let back = search.directional(first.neighbour, Direction::Up).unwrap();
        assert_eq!(back.neighbour, port(&canvas, "s_one", "next"));
    }

    #[test]
    fn directional_wraps_around() {
        let canvas = canvas();
        let ordering = ordering(&canvas);
        let locals = [port(&canvas, "s_mover", "previous")];
        let search = ConnectionSearch::new(&canvas, &DefaultChecker, &locals, &ordering);
        let wrapped = search
            .directional(port(&canvas, "s_three", "next"), Direction::Right)
            .unwrap();
        assert_eq!(wrapped.neighbour, port(&canvas, "s_one", "next"));
    }

    #[test]
    fn directional_exhaustion_is_none() {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("x_only", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::value("x_val", 300.0, 0.0)).unwrap();
        let ordering = PortOrdering::snapshot(&canvas, &HashSet::from([NodeId::intern("x_val")]));
        let locals = [port(&canvas, "x_val", "output")];
        let search = ConnectionSearch::new(&canvas, &DefaultChecker, &locals, &ordering);
        assert_eq!(
            search.directional(port(&canvas, "x_only", "next"), Direction::Down),
            None
        );
    }

    #[test]
    fn nearest_respects_radius() {
        let canvas = canvas();
        let ordering = ordering(&canvas);
        let locals = [port(&canvas, "s_mover", "previous")];
        let search = ConnectionSearch::new(&canvas, &DefaultChecker, &locals, &ordering);

        assert_eq!(search.nearest(28.0), None);
        let c = search.nearest(f64::INFINITY).unwrap();
        // s_two.next sits at (0, 240), closest to (500, 215).
        assert_eq!(c.neighbour, port(&canvas, "s_two", "next"));
        assert!((c.distance - (500.0f64.powi(2) + 25.0f64.powi(2)).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn step_without_cursor_falls_back_to_nearest() {
        let canvas = canvas();
        let ordering = ordering(&canvas);
        let locals = [port(&canvas, "s_mover", "previous")];
        let search = ConnectionSearch::new(&canvas, &DefaultChecker, &locals, &ordering);
        let c = search.step(None, Direction::Up).unwrap();
        assert_eq!(c.neighbour, port(&canvas, "s_two", "next"));
        assert_eq!(c.distance, 0.0);
    }
}
