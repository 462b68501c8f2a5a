//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `MoveAction`s. Keys are
//! `KeyboardEvent.key` values, so the same table serves any host that can
//! report them.
//!
//! - `M` starts a move on the focused block
//! - Arrows step to the next connection in that direction
//! - Alt / Ctrl / ⌘ + arrows nudge by a fixed distance instead
//! - Enter or Space drops the block, Escape puts it back

use kbm_core::Direction;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAction {
    StartMove,
    FinishMove,
    AbortMove,
    /// Step to the next compatible connection.
    Constrained(Direction),
    /// Translate without searching along the connection order.
    Unconstrained(Direction),
}

/// Modifier keys held with a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }
}

/// Resolves key events into move actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> Option<MoveAction> {
        if let Some(direction) = Self::arrow(key) {
            // Shift+arrow belongs to selection handling elsewhere.
            if shift {
                return None;
            }
            return Some(if alt || ctrl || meta {
                MoveAction::Unconstrained(direction)
            } else {
                MoveAction::Constrained(direction)
            });
        }

        if ctrl || shift || alt || meta {
            return None;
        }

        match key {
            "m" | "M" => Some(MoveAction::StartMove),
            "Enter" | " " => Some(MoveAction::FinishMove),
            "Escape" => Some(MoveAction::AbortMove),
            _ => None,
        }
    }

    pub fn resolve_with(key: &str, mods: Modifiers) -> Option<MoveAction> {
        Self::resolve(key, mods.ctrl, mods.shift, mods.alt, mods.meta)
    }

    fn arrow(key: &str) -> Option<Direction> {
        match key {
            "ArrowUp" => Some(Direction::Up),
            "ArrowDown" => Some(Direction::Down),
            "ArrowLeft" => Some(Direction::Left),
            "ArrowRight" => Some(Direction::Right),
            _ => None,
        }
    }
}
