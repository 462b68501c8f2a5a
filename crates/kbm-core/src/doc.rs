//! JSON canvas documents.
//!
//! A small serde format for describing a canvas: blocks with their shape,
//! position and inputs, plus the connections between them. Used to load
//! fixtures and demo canvases.
//!
//! ```json
//! {
//!   "scale": 1.0,
//!   "blocks": [
//!     { "id": "loop", "shape": "statement", "at": [0, 0],
//!       "inputs": [{ "name": "do", "kind": "statement" }] },
//!     { "id": "say", "shape": "statement", "at": [300, 0] }
//!   ],
//!   "links": [{ "parent": "loop", "port": "do", "child": "say" }]
//! }
//! ```

use crate::canvas::Canvas;
use crate::id::NodeId;
use crate::model::{Block, BlockShape, InputKind, PortKind, PortRef, RESERVED_PORT_NAMES};
use kurbo::Point;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CanvasDoc {
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    dragger: Option<String>,
    blocks: Vec<BlockDoc>,
    #[serde(default)]
    links: Vec<LinkDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BlockDoc {
    id: String,
    shape: BlockShape,
    at: [f64; 2],
    #[serde(default)]
    inputs: Vec<InputDoc>,
    #[serde(default = "default_movable")]
    movable: bool,
    /// Type checks on the block's output port.
    #[serde(default)]
    checks: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputDoc {
    name: String,
    kind: InputKind,
    #[serde(default)]
    checks: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkDoc {
    parent: String,
    /// Name of the parent's port: `next` or an input name.
    port: String,
    child: String,
}

fn default_scale() -> f64 {
    1.0
}

fn default_movable() -> bool {
    true
}

/// Build a canvas from a JSON document.
///
/// # Errors
/// Returns a description of the first malformed field, unknown block or
/// port, or illegal link.
pub fn parse_canvas(json: &str) -> Result<Canvas, String> {
    let doc: CanvasDoc =
        serde_json::from_str(json).map_err(|e| format!("invalid canvas document: {e}"))?;
    if !(doc.scale.is_finite() && doc.scale > 0.0) {
        return Err(format!("scale must be positive, got {}", doc.scale));
    }

    let mut canvas = Canvas::new();
    canvas.scale = doc.scale;
    canvas.editable = !doc.readonly;
    if let Some(dragger) = doc.dragger {
        canvas.dragger = dragger;
    }

    for b in doc.blocks {
        let mut block = Block::new(
            NodeId::intern(&b.id),
            b.shape,
            Point::new(b.at[0], b.at[1]),
        );
        for input in &b.inputs {
            if RESERVED_PORT_NAMES.contains(&input.name.as_str()) {
                return Err(format!(
                    "block `{}`: input name `{}` is reserved",
                    b.id, input.name
                ));
            }
            if block.slot_of(&input.name).is_some() {
                return Err(format!("block `{}`: duplicate input `{}`", b.id, input.name));
            }
            block = block.with_input(&input.name, input.kind);
            if !input.checks.is_empty() {
                let checks: Vec<&str> = input.checks.iter().map(String::as_str).collect();
                block = block.with_checks(&input.name, &checks);
            }
        }
        if !b.checks.is_empty() {
            let checks: Vec<&str> = b.checks.iter().map(String::as_str).collect();
            block = block.with_checks("output", &checks);
        }
        block.movable = b.movable;
        canvas.add_block(block)?;
    }

    for link in doc.links {
        let parent_id = NodeId::intern(&link.parent);
        let child_id = NodeId::intern(&link.child);
        let parent = canvas
            .block(parent_id)
            .ok_or_else(|| format!("link from unknown block `{}`", link.parent))?;
        let slot = parent
            .slot_of(&link.port)
            .ok_or_else(|| format!("block `{}` has no port `{}`", link.parent, link.port))?;
        let kind = parent.ports[usize::from(slot)].kind;
        let child = canvas
            .block(child_id)
            .ok_or_else(|| format!("link to unknown block `{}`", link.child))?;
        let child_slot = match kind {
            PortKind::NextStatement => child.previous(),
            PortKind::Input => child.output(),
            _ => None,
        }
        .ok_or_else(|| {
            format!(
                "block `{}` cannot hang off `{}.{}`",
                link.child, link.parent, link.port
            )
        })?;
        canvas.connect(
            PortRef::new(parent_id, slot),
            PortRef::new(child_id, child_slot),
        )?;
    }

    Ok(canvas)
}

impl Canvas {
    /// Shorthand for [`parse_canvas`].
    pub fn from_json(json: &str) -> Result<Self, String> {
        parse_canvas(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blocks_and_links() {
        let json = r#"{
            "scale": 2.0,
            "blocks": [
                { "id": "d_loop", "shape": "statement", "at": [10, 10],
                  "inputs": [{ "name": "do", "kind": "statement" }] },
                { "id": "d_say", "shape": "statement", "at": [300, 0] },
                { "id": "d_note", "shape": "annotation", "at": [0, 500], "movable": false }
            ],
            "links": [{ "parent": "d_loop", "port": "do", "child": "d_say" }]
        }"#;
        let canvas = parse_canvas(json).unwrap();
        assert_eq!(canvas.scale, 2.0);
        assert_eq!(canvas.block_count(), 3);
        assert_eq!(
            canvas.parent(NodeId::intern("d_say")),
            Some(NodeId::intern("d_loop"))
        );
        assert_eq!(
            canvas.block(NodeId::intern("d_say")).unwrap().origin,
            Point::new(26.0, 50.0)
        );
        assert!(!canvas.block(NodeId::intern("d_note")).unwrap().movable);
    }

    #[test]
    fn rejects_unknown_port() {
        let json = r#"{
            "blocks": [
                { "id": "e_a", "shape": "statement", "at": [0, 0] },
                { "id": "e_b", "shape": "statement", "at": [0, 100] }
            ],
            "links": [{ "parent": "e_a", "port": "body", "child": "e_b" }]
        }"#;
        let err = parse_canvas(json).unwrap_err();
        assert!(err.contains("no port `body`"), "{err}");
    }

    #[test]
    fn rejects_value_under_statement() {
        let json = r#"{
            "blocks": [
                { "id": "f_a", "shape": "statement", "at": [0, 0] },
                { "id": "f_v", "shape": "value", "at": [0, 100] }
            ],
            "links": [{ "parent": "f_a", "port": "next", "child": "f_v" }]
        }"#;
        assert!(parse_canvas(json).unwrap_err().contains("cannot hang off"));
    }

    #[test]
    fn rejects_reserved_and_duplicate_input_names() {
        for name in ["next", "previous", "output"] {
            let json = format!(
                r#"{{ "blocks": [{{ "id": "g_block", "shape": "statement", "at": [0, 0],
                    "inputs": [{{ "name": "{name}", "kind": "value" }}] }}] }}"#
            );
            let err = parse_canvas(&json).unwrap_err();
            assert!(err.contains("is reserved"), "{name}: {err}");
        }

        let json = r#"{
            "blocks": [{ "id": "g_twice", "shape": "statement", "at": [0, 0],
                "inputs": [
                    { "name": "arg", "kind": "value" },
                    { "name": "arg", "kind": "statement" }
                ] }]
        }"#;
        assert!(parse_canvas(json).unwrap_err().contains("duplicate input `arg`"));
    }

    #[test]
    fn readonly_documents_are_not_editable() {
        let json = r#"{ "readonly": true, "blocks": [] }"#;
        assert!(!parse_canvas(json).unwrap().is_editable());
    }
}
