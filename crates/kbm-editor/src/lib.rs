pub mod commands;
pub mod config;
pub mod drag;
pub mod hooks;
pub mod input;
pub mod keyboard_drag;
pub mod mover;
pub mod search;
pub mod shortcuts;

pub use commands::{MenuItem, dispatch, handle_key, move_menu_item};
pub use config::MoveConfig;
pub use drag::{BlockDragStrategy, DragContext, DragStrategy, Dragger, DraggerRegistry, PointerDragger};
pub use hooks::{FocusManager, NoFocus, NoPreview, PreviewSink};
pub use input::InputEvent;
pub use keyboard_drag::KeyboardDragStrategy;
pub use mover::{MoveError, MoveSession, Mover};
pub use search::{Candidate, ConnectionSearch};
pub use shortcuts::{Modifiers, MoveAction, ShortcutMap};
