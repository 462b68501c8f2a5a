//! Traversal order over the ports a moving block could connect to.
//!
//! Directional keyboard moves step through this list instead of measuring
//! distances. The order follows reading order on the canvas: stacks sorted
//! top to bottom (then left to right) by their top block, and within each
//! stack every port sorted the same way.

use crate::canvas::Canvas;
use crate::direction::Direction;
use crate::id::NodeId;
use crate::model::PortRef;
use std::collections::{HashMap, HashSet};

/// A snapshot of candidate ports in traversal order.
///
/// Taken once when a drag begins and never refreshed; later topology
/// changes on the canvas are not reflected.
#[derive(Debug, Clone, Default)]
pub struct PortOrdering {
    ports: Vec<PortRef>,
    index: HashMap<PortRef, usize>,
}

impl PortOrdering {
    /// Collect every port on `canvas` except those on `excluded` blocks.
    pub fn snapshot(canvas: &Canvas, excluded: &HashSet<NodeId>) -> Self {
        let mut ports = Vec::new();
        for top in canvas.top_blocks() {
            let mut stack: Vec<_> = canvas
                .descendants(top)
                .into_iter()
                .filter(|id| !excluded.contains(id))
                .flat_map(|id| canvas.ports_of(id))
                .filter_map(|p| canvas.port_position(p).map(|pos| (pos, p)))
                .collect();
            stack.sort_by(|(a, _), (b, _)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
            ports.extend(stack.into_iter().map(|(_, p)| p));
        }
        let index = ports.iter().enumerate().map(|(i, p)| (*p, i)).collect();
        Self { ports, index }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<PortRef> {
        self.ports.get(i).copied()
    }

    pub fn position_of(&self, port: PortRef) -> Option<usize> {
        self.index.get(&port).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = PortRef> + '_ {
        self.ports.iter().copied()
    }

    /// Ports visited when stepping from index `start` in `direction`,
    /// wrapping at either end and stopping before `start` comes round again.
    pub fn walk(&self, start: usize, direction: Direction) -> impl Iterator<Item = PortRef> + '_ {
        let len = self.ports.len() as isize;
        let step = direction.traversal_step();
        (1..len).map(move |n| {
            let i = (start as isize + n * step).rem_euclid(len);
            self.ports[i as usize]
        })
    }
}
