//! The canvas: blocks plus the connection graph between their ports.
//!
//! Connections are directed petgraph edges from the block owning the
//! superior port (next / input) to the block owning the inferior port
//! (previous / output). Joining two ports aligns the child subtree so both
//! ports sit at the same canvas position; block positions are otherwise
//! only changed by explicit moves.

use crate::id::{CanvasId, NodeId};
use crate::model::{Attachment, Block, Link, Port, PortKind, PortRef};
use kurbo::{Point, Vec2};
use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Name of the dragger every canvas uses unless configured otherwise.
pub const DEFAULT_DRAGGER: &str = "block";

/// How far a block displaced by a splice is pushed when it finds no new home.
pub const BUMP_DELTA: Vec2 = Vec2::new(28.0, 28.0);

/// Record of a stack heal performed by `Canvas::unplug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Healed {
    /// Port of the unplugged block the child used to hang off.
    pub vacated: PortRef,
    /// Inferior port of the child that was split off.
    pub child: PortRef,
    /// Former parent port the child was joined to, if any.
    pub rejoined: Option<PortRef>,
}

/// A canvas of blocks and their connections.
#[derive(Debug)]
pub struct Canvas {
    id: CanvasId,

    /// Blocks as nodes, connections as parent → child edges.
    pub graph: StableDiGraph<Block, Link>,

    /// Index from NodeId → NodeIndex for fast lookup.
    id_index: HashMap<NodeId, NodeIndex>,

    /// Zoom: screen pixels per canvas unit.
    pub scale: f64,

    /// Blocks may be rearranged.
    pub editable: bool,

    /// Keyboard navigation is active.
    pub navigable: bool,

    /// Registry name of the dragger used to move blocks on this canvas.
    pub dragger: String,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: CanvasId::fresh(),
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            scale: 1.0,
            editable: true,
            navigable: true,
            dragger: DEFAULT_DRAGGER.to_string(),
        }
    }

    pub fn id(&self) -> CanvasId {
        self.id
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_navigable(&self) -> bool {
        self.navigable
    }

    // ─── Blocks ──────────────────────────────────────────────────────────

    /// Add a free-floating block.
    pub fn add_block(&mut self, block: Block) -> Result<NodeIndex, String> {
        if self.id_index.contains_key(&block.id) {
            return Err(format!("duplicate block id {}", block.id));
        }
        let id = block.id;
        let idx = self.graph.add_node(block);
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn block(&self, id: NodeId) -> Option<&Block> {
        self.index_of(id).and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn block_mut(&mut self, id: NodeId) -> Option<&mut Block> {
        let idx = self.index_of(id)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    // ─── Ports ───────────────────────────────────────────────────────────

    pub fn port(&self, port: PortRef) -> Option<&Port> {
        self.block(port.node).and_then(|b| b.port(port.slot))
    }

    pub fn port_position(&self, port: PortRef) -> Option<Point> {
        self.block(port.node).and_then(|b| b.port_position(port.slot))
    }

    pub fn ports_of(&self, id: NodeId) -> Vec<PortRef> {
        self.block(id)
            .map(|b| b.slots().map(|slot| PortRef::new(id, slot)).collect())
            .unwrap_or_default()
    }

    /// Human-readable `block.port` label, for logs and test assertions.
    pub fn port_label(&self, port: PortRef) -> String {
        match self.port(port) {
            Some(p) => format!("{}.{}", port.node.as_str(), p.name),
            None => format!("{}.?{}", port.node.as_str(), port.slot),
        }
    }

    /// The connection holding `id` to its parent, if any.
    pub fn attachment(&self, id: NodeId) -> Option<Attachment> {
        let idx = self.index_of(id)?;
        let edge = self.graph.edges_directed(idx, Incoming).next()?;
        Some(Attachment {
            parent: PortRef::new(self.graph[edge.source()].id, edge.weight().parent_slot),
            child: PortRef::new(id, edge.weight().child_slot),
        })
    }

    /// The port on the far side of a connection through `port`.
    pub fn target(&self, port: PortRef) -> Option<PortRef> {
        let kind = self.port(port)?.kind;
        if kind.is_superior() {
            let idx = self.index_of(port.node)?;
            self.graph
                .edges_directed(idx, Outgoing)
                .find(|e| e.weight().parent_slot == port.slot)
                .map(|e| PortRef::new(self.graph[e.target()].id, e.weight().child_slot))
        } else {
            self.attachment(port.node)
                .filter(|a| a.child.slot == port.slot)
                .map(|a| a.parent)
        }
    }

    pub fn is_connected(&self, port: PortRef) -> bool {
        self.target(port).is_some()
    }

    /// All connections, sorted by parent label for stable comparison.
    pub fn attachments(&self) -> Vec<Attachment> {
        let mut out: Vec<Attachment> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (src, dst) = self.graph.edge_endpoints(e)?;
                let link = self.graph.edge_weight(e)?;
                Some(Attachment {
                    parent: PortRef::new(self.graph[src].id, link.parent_slot),
                    child: PortRef::new(self.graph[dst].id, link.child_slot),
                })
            })
            .collect();
        out.sort_by(|a, b| {
            a.parent
                .node
                .as_str()
                .cmp(b.parent.node.as_str())
                .then(a.parent.slot.cmp(&b.parent.slot))
        });
        out
    }

    // ─── Tree queries ────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.attachment(id).map(|a| a.parent.node)
    }

    /// Direct children ordered by the parent port they hang off.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut kids: Vec<(u8, NodeId)> = self
            .graph
            .edges_directed(idx, Outgoing)
            .map(|e| (e.weight().parent_slot, self.graph[e.target()].id))
            .collect();
        kids.sort_by_key(|(slot, _)| *slot);
        kids.into_iter().map(|(_, id)| id).collect()
    }

    /// `id` followed by every block below it, depth-first in port order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if self.index_of(cur).is_none() {
                continue;
            }
            out.push(cur);
            stack.extend(self.children(cur).into_iter().rev());
        }
        out
    }

    /// Whether `node` is `ancestor` or sits somewhere below it.
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Blocks without a parent, top to bottom, then left to right.
    pub fn top_blocks(&self) -> Vec<NodeId> {
        let mut tops: Vec<&Block> = self
            .blocks()
            .filter(|b| self.attachment(b.id).is_none())
            .collect();
        tops.sort_by(|a, b| {
            a.origin
                .y
                .total_cmp(&b.origin.y)
                .then(a.origin.x.total_cmp(&b.origin.x))
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        tops.into_iter().map(|b| b.id).collect()
    }

    /// The free next port at the bottom of the statement stack starting at
    /// `id`. `None` when some block in the chain has no next port.
    pub fn last_next_in_stack(&self, id: NodeId) -> Option<PortRef> {
        let mut cur = id;
        loop {
            let next = PortRef::new(cur, self.block(cur)?.next()?);
            match self.target(next) {
                Some(child) => cur = child.node,
                None => return Some(next),
            }
        }
    }

    // ─── Movement ────────────────────────────────────────────────────────

    /// Translate a block together with everything attached below it.
    pub fn move_by(&mut self, id: NodeId, delta: Vec2) {
        for node in self.descendants(id) {
            if let Some(block) = self.block_mut(node) {
                block.origin += delta;
            }
        }
    }

    pub fn move_to(&mut self, id: NodeId, origin: Point) {
        if let Some(block) = self.block(id) {
            let delta = origin - block.origin;
            if delta != Vec2::ZERO {
                self.move_by(id, delta);
            }
        }
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Join two ports. Argument order does not matter.
    ///
    /// If the superior port already holds a block, that block is displaced:
    /// it moves to the bottom of the incoming stack (statements) or into the
    /// first free accepting value input of the incoming block (values), and
    /// is bumped aside when neither exists.
    pub fn connect(&mut self, a: PortRef, b: PortRef) -> Result<(), String> {
        let ka = self
            .port(a)
            .ok_or_else(|| format!("unknown port {}", self.port_label(a)))?
            .kind;
        let kb = self
            .port(b)
            .ok_or_else(|| format!("unknown port {}", self.port_label(b)))?
            .kind;
        if ka.opposite() != kb {
            return Err(format!("cannot join {ka:?} to {kb:?}"));
        }
        let (parent, child) = if ka.is_superior() { (a, b) } else { (b, a) };
        if parent.node == child.node {
            return Err(format!("cannot connect {} to itself", parent.node));
        }
        if self.is_descendant(child.node, parent.node) {
            return Err(format!(
                "connecting {} would form a cycle",
                self.port_label(parent)
            ));
        }
        if self.attachment(child.node).is_some() {
            return Err(format!("{} is already attached", child.node));
        }

        let orphan = self.disconnect(parent);
        self.link(parent, child);
        if let Some(orphan) = orphan {
            self.rehome(child.node, orphan.child);
        }
        log::trace!(
            "connect {} <- {}",
            self.port_label(parent),
            self.port_label(child)
        );
        Ok(())
    }

    /// Break the connection through `port`, if any.
    pub fn disconnect(&mut self, port: PortRef) -> Option<Attachment> {
        let other = self.target(port)?;
        let attachment = if self.port(port)?.kind.is_superior() {
            Attachment {
                parent: port,
                child: other,
            }
        } else {
            Attachment {
                parent: other,
                child: port,
            }
        };
        let child_idx = self.index_of(attachment.child.node)?;
        let edge = self.graph.edges_directed(child_idx, Incoming).next()?.id();
        self.graph.remove_edge(edge);
        Some(attachment)
    }

    /// The connection healing would split off when `id` is unplugged:
    /// `parent` is the port of `id`, `child` the inferior port below it.
    ///
    /// Statement blocks give up their next block. Value blocks give up the
    /// child of their only value input, provided they have a parent whose
    /// socket accepts that child.
    pub fn heal_candidate(&self, id: NodeId) -> Option<Attachment> {
        let block = self.block(id)?;
        if block.previous().is_some() {
            let next = PortRef::new(id, block.next()?);
            let child = self.target(next)?;
            return Some(Attachment {
                parent: next,
                child,
            });
        }
        if block.output().is_some() {
            let parent = self.attachment(id)?;
            let mut inputs = block.value_inputs();
            let only = inputs.next()?;
            if inputs.next().is_some() {
                return None;
            }
            let input = PortRef::new(id, only);
            let child = self.target(input)?;
            let fits = self
                .port(parent.parent)
                .zip(self.port(child))
                .is_some_and(|(socket, plug)| socket.accepts(plug));
            return fits.then_some(Attachment {
                parent: input,
                child,
            });
        }
        None
    }

    /// Detach `id` from its parent. With `heal`, the block below it is split
    /// off and joined to the former parent when the types allow.
    pub fn unplug(&mut self, id: NodeId, heal: bool) -> Option<Healed> {
        let split = if heal { self.heal_candidate(id) } else { None };
        let former = self.attachment(id);
        if let Some(att) = former {
            self.disconnect(att.child);
        }

        let split = split?;
        self.disconnect(split.parent);
        let rejoined = former.map(|f| f.parent).filter(|parent| {
            self.port(*parent)
                .zip(self.port(split.child))
                .is_some_and(|(p, c)| p.accepts(c))
        });
        if let Some(parent) = rejoined {
            self.link(parent, split.child);
        }
        log::trace!(
            "unplug {id} healed {} -> {:?}",
            self.port_label(split.child),
            rejoined.map(|p| self.port_label(p))
        );
        Some(Healed {
            vacated: split.parent,
            child: split.child,
            rejoined,
        })
    }

    /// Add the edge and snap the child subtree onto the parent port.
    fn link(&mut self, parent: PortRef, child: PortRef) {
        let (Some(p_idx), Some(c_idx)) = (self.index_of(parent.node), self.index_of(child.node))
        else {
            return;
        };
        self.graph.add_edge(
            p_idx,
            c_idx,
            Link {
                parent_slot: parent.slot,
                child_slot: child.slot,
            },
        );
        if let (Some(target), Some(at)) = (self.port_position(parent), self.port_position(child)) {
            self.move_by(child.node, target - at);
        }
    }

    /// Find a new parent port for a block displaced by `connect`.
    fn rehome(&mut self, incoming: NodeId, orphan: PortRef) {
        let Some(plug) = self.port(orphan).cloned() else {
            return;
        };
        let home = match plug.kind {
            PortKind::PreviousStatement => self
                .last_next_in_stack(incoming)
                .filter(|p| self.port(*p).is_some_and(|q| q.accepts(&plug))),
            PortKind::Output => self.block(incoming).and_then(|b| {
                b.value_inputs()
                    .map(|slot| PortRef::new(incoming, slot))
                    .find(|p| {
                        !self.is_connected(*p) && self.port(*p).is_some_and(|q| q.accepts(&plug))
                    })
            }),
            _ => None,
        };
        match home {
            Some(home) => self.link(home, orphan),
            None => self.move_by(orphan.node, BUMP_DELTA),
        }
    }
}
