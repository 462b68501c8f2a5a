//! Command dispatch.
//!
//! The bridge between resolved shortcuts (or menu clicks) and the `Mover`.
//! Every command consults `can_move` / `is_moving` before it reaches the
//! session API, so a stray key press is a no-op rather than a `MoveError`.

use crate::mover::{MoveError, Mover};
use crate::shortcuts::{Modifiers, MoveAction, ShortcutMap};
use kbm_core::{Canvas, NodeId};

/// Run `action` against `canvas`. `focused` is the block that has keyboard
/// focus, used only by `StartMove`.
///
/// Returns whether the action was carried out.
///
/// # Errors
/// Only for failures the guards cannot see, such as a canvas naming an
/// unregistered dragger.
pub fn dispatch(
    mover: &mut Mover,
    canvas: &mut Canvas,
    action: MoveAction,
    focused: Option<NodeId>,
) -> Result<bool, MoveError> {
    if let MoveAction::StartMove = action {
        let Some(node) = focused else {
            return Ok(false);
        };
        if !mover.can_move(canvas, node) {
            log::trace!("{}: {node} cannot move", canvas.id());
            return Ok(false);
        }
        mover.start_move(canvas, node)?;
        return Ok(true);
    }

    if !mover.is_moving(canvas) {
        return Ok(false);
    }
    match action {
        MoveAction::FinishMove => mover.finish_move(canvas),
        MoveAction::AbortMove => mover.abort_move(canvas),
        MoveAction::Constrained(direction) => mover.move_constrained(canvas, direction),
        MoveAction::Unconstrained(direction) => mover.move_unconstrained(canvas, direction),
        MoveAction::StartMove => Ok(false),
    }
}

/// Resolve a key press and dispatch it. Unbound keys return `Ok(false)`.
///
/// # Errors
/// See [`dispatch`].
pub fn handle_key(
    mover: &mut Mover,
    canvas: &mut Canvas,
    focused: Option<NodeId>,
    key: &str,
    mods: Modifiers,
) -> Result<bool, MoveError> {
    match ShortcutMap::resolve_with(key, mods) {
        Some(action) => dispatch(mover, canvas, action, focused),
        None => Ok(false),
    }
}

// ─── Context menu ────────────────────────────────────────────────────────

pub const MOVE_MENU_ID: &str = "move";

/// A block context-menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: &'static str,
    pub label: String,
    pub enabled: bool,
}

/// The "Move" entry for `node`'s context menu, for pointer users who want
/// the keyboard move mode. `None` when the block is not on the canvas.
pub fn move_menu_item(mover: &Mover, canvas: &Canvas, node: NodeId) -> Option<MenuItem> {
    canvas.block(node)?;
    Some(MenuItem {
        id: MOVE_MENU_ID,
        label: "Move (M)".to_string(),
        enabled: mover.can_move(canvas, node),
    })
}

/// Handle a click on a menu entry produced by [`move_menu_item`].
///
/// # Errors
/// See [`dispatch`].
pub fn activate_menu_item(
    mover: &mut Mover,
    canvas: &mut Canvas,
    item: &MenuItem,
    node: NodeId,
) -> Result<bool, MoveError> {
    if item.id != MOVE_MENU_ID || !item.enabled {
        return Ok(false);
    }
    dispatch(mover, canvas, MoveAction::StartMove, Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbm_core::{Block, Direction, Point};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("cmd_block", 0.0, 0.0)).unwrap();
        canvas
            .add_block(Block::statement("cmd_fixed", 300.0, 0.0).immovable())
            .unwrap();
        canvas
    }

    #[test]
    fn session_keys_are_ignored_when_idle() {
        let mut mover = Mover::default();
        let mut canvas = canvas();
        for key in ["Enter", "Escape", "ArrowDown"] {
            assert_eq!(
                handle_key(&mut mover, &mut canvas, Some(id("cmd_block")), key, Modifiers::NONE),
                Ok(false)
            );
        }
    }

    #[test]
    fn keys_drive_a_whole_move() {
        let mut mover = Mover::default();
        let mut canvas = canvas();
        let focused = Some(id("cmd_block"));

        assert_eq!(handle_key(&mut mover, &mut canvas, focused, "m", Modifiers::NONE), Ok(true));
        assert!(mover.is_moving(&canvas));
        // A second start is swallowed by the guard.
        assert_eq!(handle_key(&mut mover, &mut canvas, focused, "m", Modifiers::NONE), Ok(false));

        assert_eq!(
            handle_key(&mut mover, &mut canvas, focused, "ArrowRight", Modifiers::alt()),
            Ok(true)
        );
        assert_eq!(handle_key(&mut mover, &mut canvas, focused, "Enter", Modifiers::NONE), Ok(true));
        assert!(!mover.is_moving(&canvas));
        assert_eq!(canvas.block(id("cmd_block")).unwrap().origin, Point::new(20.0, 0.0));
    }

    #[test]
    fn start_needs_focus_and_movable_block() {
        let mut mover = Mover::default();
        let mut canvas = canvas();
        assert_eq!(dispatch(&mut mover, &mut canvas, MoveAction::StartMove, None), Ok(false));
        assert_eq!(
            dispatch(&mut mover, &mut canvas, MoveAction::StartMove, Some(id("cmd_fixed"))),
            Ok(false)
        );
        assert_eq!(
            dispatch(
                &mut mover,
                &mut canvas,
                MoveAction::Constrained(Direction::Up),
                None
            ),
            Ok(false)
        );
    }

    #[test]
    fn menu_item_reflects_movability() {
        let mut mover = Mover::default();
        let mut canvas = canvas();
        let fixed = move_menu_item(&mover, &canvas, id("cmd_fixed")).unwrap();
        assert!(!fixed.enabled);
        assert_eq!(move_menu_item(&mover, &canvas, id("cmd_nowhere")), None);

        let item = move_menu_item(&mover, &canvas, id("cmd_block")).unwrap();
        assert_eq!(item.label, "Move (M)");
        assert!(item.enabled);
        assert_eq!(
            activate_menu_item(&mut mover, &mut canvas, &item, id("cmd_block")),
            Ok(true)
        );
        assert!(!move_menu_item(&mover, &canvas, id("cmd_block")).unwrap().enabled);
    }
}
