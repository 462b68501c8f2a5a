//! Connection legality.
//!
//! The engine never decides on its own whether two ports may be joined; it
//! asks a `ConnectionChecker`. `DefaultChecker` covers the usual block rules.

use crate::canvas::Canvas;
use crate::model::{PortKind, PortRef};

/// Decides whether a port on the moving block may join a port elsewhere.
pub trait ConnectionChecker {
    /// `local` belongs to the moving block, `neighbour` to a block that stays
    /// put. Directional checks ignore `max_distance`.
    fn can_connect(
        &self,
        canvas: &Canvas,
        local: PortRef,
        neighbour: PortRef,
        directional: bool,
        max_distance: f64,
    ) -> bool;
}

/// Standard compatibility rules:
///
/// - ports on different blocks, with complementary kinds
/// - the neighbour is not inside the moving block's own subtree
/// - type checks overlap
/// - the local port is free
/// - a local next/input port only joins a free previous/output port
/// - non-directional checks stay within `max_distance`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultChecker;

impl ConnectionChecker for DefaultChecker {
    fn can_connect(
        &self,
        canvas: &Canvas,
        local: PortRef,
        neighbour: PortRef,
        directional: bool,
        max_distance: f64,
    ) -> bool {
        if local.node == neighbour.node {
            return false;
        }
        let (Some(a), Some(b)) = (canvas.port(local), canvas.port(neighbour)) else {
            return false;
        };
        if a.kind.opposite() != b.kind || !a.accepts(b) {
            return false;
        }
        if canvas.is_descendant(local.node, neighbour.node) {
            return false;
        }
        if canvas.is_connected(local) {
            return false;
        }
        if matches!(a.kind, PortKind::NextStatement | PortKind::Input)
            && canvas.is_connected(neighbour)
        {
            return false;
        }
        if !directional {
            let (Some(pa), Some(pb)) = (canvas.port_position(local), canvas.port_position(neighbour))
            else {
                return false;
            };
            if pa.distance(pb) > max_distance {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::model::Block;

    fn port(canvas: &Canvas, block: &str, name: &str) -> PortRef {
        let id = NodeId::intern(block);
        PortRef::new(id, canvas.block(id).unwrap().slot_of(name).unwrap())
    }

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("k_top", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("k_mid", 0.0, 200.0)).unwrap();
        canvas.add_block(Block::statement("k_low", 0.0, 400.0)).unwrap();
        canvas
            .add_block(Block::value("k_num", 400.0, 0.0).with_checks("output", &["Number"]))
            .unwrap();
        canvas
    }

    #[test]
    fn complementary_statement_ports_connect() {
        let c = canvas();
        let checker = DefaultChecker;
        let mid_prev = port(&c, "k_mid", "previous");
        assert!(checker.can_connect(&c, mid_prev, port(&c, "k_top", "next"), true, 0.0));
        assert!(!checker.can_connect(&c, mid_prev, port(&c, "k_low", "previous"), true, 0.0));
        assert!(!checker.can_connect(&c, mid_prev, port(&c, "k_mid", "next"), true, 0.0));
    }

    #[test]
    fn distance_only_limits_non_directional_checks() {
        let c = canvas();
        let checker = DefaultChecker;
        let mid_prev = port(&c, "k_mid", "previous");
        let top_next = port(&c, "k_top", "next");
        assert!(!checker.can_connect(&c, mid_prev, top_next, false, 28.0));
        assert!(checker.can_connect(&c, mid_prev, top_next, false, 200.0));
    }

    #[test]
    fn local_next_needs_free_neighbour_previous() {
        let mut c = canvas();
        let top_next = port(&c, "k_top", "next");
        let low_prev = port(&c, "k_low", "previous");
        c.connect(top_next, low_prev).unwrap();
        let checker = DefaultChecker;
        let mid_next = port(&c, "k_mid", "next");
        assert!(!checker.can_connect(&c, mid_next, low_prev, true, 0.0));
        // Splicing below an occupied next port is fine.
        let mid_prev = port(&c, "k_mid", "previous");
        assert!(checker.can_connect(&c, mid_prev, top_next, true, 0.0));
    }

    #[test]
    fn no_connections_into_own_subtree() {
        let mut c = canvas();
        let top_next = port(&c, "k_top", "next");
        let mid_prev = port(&c, "k_mid", "previous");
        c.connect(top_next, mid_prev).unwrap();
        let checker = DefaultChecker;
        let top_prev = port(&c, "k_top", "previous");
        let mid_next = port(&c, "k_mid", "next");
        assert!(!checker.can_connect(&c, top_prev, mid_next, true, 0.0));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let c = canvas();
        let checker = DefaultChecker;
        let num = port(&c, "k_num", "output");
        assert!(!checker.can_connect(&c, num, port(&c, "k_top", "next"), true, 0.0));
    }
}
