//! Block and port data model.
//!
//! A canvas holds blocks; each block carries an ordered list of typed ports
//! positioned relative to the block origin. Ports are addressed by
//! `PortRef { node, slot }` where `slot` indexes the block's port list.

use crate::id::NodeId;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Geometry defaults ───────────────────────────────────────────────────

/// Default block width in canvas units.
pub const BLOCK_WIDTH: f64 = 120.0;
/// Height of one block row (the header, and one per input).
pub const ROW_HEIGHT: f64 = 40.0;
/// Horizontal indent of a statement input's port.
pub const STATEMENT_INDENT: f64 = 16.0;

/// Names of the fixed ports. Inputs may not reuse them.
pub const RESERVED_PORT_NAMES: [&str; 3] = ["previous", "next", "output"];

// ─── Ports ───────────────────────────────────────────────────────────────

/// The four kinds of connection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Left plug of a value block.
    Output,
    /// Value socket on a block's right edge.
    Input,
    /// Notch on top of a statement block.
    PreviousStatement,
    /// Tab under a statement block, also used by statement inputs.
    NextStatement,
}

impl PortKind {
    /// The kind this port pairs with.
    pub fn opposite(self) -> PortKind {
        match self {
            PortKind::Output => PortKind::Input,
            PortKind::Input => PortKind::Output,
            PortKind::PreviousStatement => PortKind::NextStatement,
            PortKind::NextStatement => PortKind::PreviousStatement,
        }
    }

    /// Superior ports hold a child; inferior ports hang off a parent.
    pub fn is_superior(self) -> bool {
        matches!(self, PortKind::Input | PortKind::NextStatement)
    }
}

/// A typed connection point on a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub kind: PortKind,
    /// `previous`, `next`, `output`, or the input name.
    pub name: String,
    /// Position relative to the block origin.
    pub offset: Vec2,
    /// Type names this port accepts. Empty accepts anything.
    pub checks: SmallVec<[String; 2]>,
}

impl Port {
    pub fn new(kind: PortKind, name: &str, offset: Vec2) -> Self {
        Self {
            kind,
            name: name.to_string(),
            offset,
            checks: SmallVec::new(),
        }
    }

    /// Whether the type checks on both ends overlap.
    pub fn accepts(&self, other: &Port) -> bool {
        self.checks.is_empty()
            || other.checks.is_empty()
            || self.checks.iter().any(|c| other.checks.contains(c))
    }
}

/// Address of a port: the owning block plus its slot in `Block::ports`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node: NodeId,
    pub slot: u8,
}

impl PortRef {
    pub fn new(node: NodeId, slot: u8) -> Self {
        Self { node, slot }
    }
}

/// Edge weight of the connection graph: which parent port holds which child port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub parent_slot: u8,
    pub child_slot: u8,
}

/// A resolved connection: `parent` is the superior port, `child` the inferior one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub parent: PortRef,
    pub child: PortRef,
}

// ─── Blocks ──────────────────────────────────────────────────────────────

/// Which fixed ports a block carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockShape {
    /// Previous + next.
    Statement,
    /// Output only.
    Value,
    /// Next only (event heads).
    Hat,
    /// Previous only (terminators).
    Cap,
    /// A floating annotation with no ports.
    Annotation,
}

/// Kind of a named input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Value,
    Statement,
}

/// A draggable canvas element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub shape: BlockShape,
    /// Top-left corner in canvas coordinates.
    pub origin: Point,
    pub size: Size,
    pub movable: bool,
    pub ports: SmallVec<[Port; 4]>,
    /// Number of input rows added via `with_input`.
    rows: u8,
}

impl Block {
    pub fn new(id: NodeId, shape: BlockShape, origin: Point) -> Self {
        let mut ports = SmallVec::new();
        match shape {
            BlockShape::Statement => {
                ports.push(Port::new(PortKind::PreviousStatement, "previous", Vec2::ZERO));
                ports.push(Port::new(
                    PortKind::NextStatement,
                    "next",
                    Vec2::new(0.0, ROW_HEIGHT),
                ));
            }
            BlockShape::Value => {
                ports.push(Port::new(PortKind::Output, "output", Vec2::ZERO));
            }
            BlockShape::Hat => {
                ports.push(Port::new(
                    PortKind::NextStatement,
                    "next",
                    Vec2::new(0.0, ROW_HEIGHT),
                ));
            }
            BlockShape::Cap => {
                ports.push(Port::new(PortKind::PreviousStatement, "previous", Vec2::ZERO));
            }
            BlockShape::Annotation => {}
        }

        Self {
            id,
            shape,
            origin,
            size: Size::new(BLOCK_WIDTH, ROW_HEIGHT),
            movable: true,
            ports,
            rows: 0,
        }
    }

    pub fn statement(id: &str, x: f64, y: f64) -> Self {
        Self::new(NodeId::intern(id), BlockShape::Statement, Point::new(x, y))
    }

    pub fn value(id: &str, x: f64, y: f64) -> Self {
        Self::new(NodeId::intern(id), BlockShape::Value, Point::new(x, y))
    }

    /// Append a named input row. The block grows by one row and its next
    /// port moves to the new bottom edge.
    #[must_use]
    pub fn with_input(mut self, name: &str, kind: InputKind) -> Self {
        let row = f64::from(self.rows);
        let port = match kind {
            InputKind::Value => Port::new(
                PortKind::Input,
                name,
                Vec2::new(BLOCK_WIDTH, row * ROW_HEIGHT + ROW_HEIGHT / 2.0),
            ),
            InputKind::Statement => Port::new(
                PortKind::NextStatement,
                name,
                Vec2::new(STATEMENT_INDENT, (row + 1.0) * ROW_HEIGHT),
            ),
        };
        self.ports.push(port);
        self.rows += 1;
        self.size.height = (row + 2.0) * ROW_HEIGHT;
        let bottom = self.size.height;
        if let Some(next) = self.ports.iter_mut().find(|p| p.name == "next") {
            next.offset = Vec2::new(0.0, bottom);
        }
        self
    }

    /// Restrict the named port to the given type names.
    #[must_use]
    pub fn with_checks(mut self, port: &str, checks: &[&str]) -> Self {
        if let Some(p) = self.ports.iter_mut().find(|p| p.name == port) {
            p.checks = checks.iter().map(|c| c.to_string()).collect();
        }
        self
    }

    #[must_use]
    pub fn immovable(mut self) -> Self {
        self.movable = false;
        self
    }

    pub fn port(&self, slot: u8) -> Option<&Port> {
        self.ports.get(usize::from(slot))
    }

    pub fn slot_of(&self, name: &str) -> Option<u8> {
        self.ports
            .iter()
            .position(|p| p.name == name)
            .and_then(|i| u8::try_from(i).ok())
    }

    pub fn previous(&self) -> Option<u8> {
        self.slot_of("previous")
    }

    pub fn next(&self) -> Option<u8> {
        self.slot_of("next")
    }

    pub fn output(&self) -> Option<u8> {
        self.slot_of("output")
    }

    /// Slots of value inputs (`PortKind::Input`), in row order.
    pub fn value_inputs(&self) -> impl Iterator<Item = u8> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == PortKind::Input)
            .filter_map(|(i, _)| u8::try_from(i).ok())
    }

    /// Slots of every named input row, value and statement alike.
    pub fn named_inputs(&self) -> impl Iterator<Item = u8> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| !RESERVED_PORT_NAMES.contains(&p.name.as_str()))
            .filter_map(|(i, _)| u8::try_from(i).ok())
    }

    /// Absolute position of a port.
    pub fn port_position(&self, slot: u8) -> Option<Point> {
        self.port(slot).map(|p| self.origin + p.offset)
    }

    pub fn slots(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.ports.len()).filter_map(|i| u8::try_from(i).ok())
    }
}
