//! Scripted keyboard move over a small canvas.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p kbm-editor --example walkthrough
//! ```

use kbm_core::{Canvas, NodeId};
use kbm_editor::{Candidate, Modifiers, Mover, PreviewSink, handle_key};

const CANVAS: &str = r#"{
  "blocks": [
    { "id": "when_clicked", "shape": "hat", "at": [0, 0] },
    { "id": "say_hello", "shape": "statement", "at": [0, 0] },
    { "id": "repeat", "shape": "statement", "at": [0, 200],
      "inputs": [{ "name": "do", "kind": "statement" }] },
    { "id": "stop", "shape": "cap", "at": [300, 400] }
  ],
  "links": [{ "parent": "when_clicked", "port": "next", "child": "say_hello" }]
}"#;

struct PrintPreview;

impl PreviewSink for PrintPreview {
    fn candidate_found(&mut self, canvas: &Canvas, c: &Candidate) {
        println!(
            "  preview: {} -> {}",
            canvas.port_label(c.local),
            canvas.port_label(c.neighbour)
        );
    }

    fn candidate_cleared(&mut self, _canvas: &Canvas) {
        println!("  preview cleared");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut canvas = Canvas::from_json(CANVAS)?;
    let mut mover = Mover::default().with_preview(PrintPreview);
    let focused = Some(NodeId::intern("say_hello"));

    let script = [
        ("m", Modifiers::NONE),
        ("ArrowDown", Modifiers::NONE),
        ("ArrowDown", Modifiers::NONE),
        ("ArrowRight", Modifiers::alt()),
        ("ArrowUp", Modifiers::NONE),
        ("Enter", Modifiers::NONE),
    ];
    for (key, mods) in script {
        let handled = handle_key(&mut mover, &mut canvas, focused, key, mods)?;
        println!("{key:>10} {}", if handled { "" } else { "(ignored)" });
    }

    for att in canvas.attachments() {
        println!(
            "{} <- {}",
            canvas.port_label(att.parent),
            canvas.port_label(att.child)
        );
    }
    Ok(())
}
