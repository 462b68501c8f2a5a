//! Keyboard move sessions.
//!
//! A `Mover` keeps at most one `MoveSession` per canvas. Every command
//! drives the canvas's dragger with a synthetic pointer event:
//!
//! | Command | Event |
//! |---------|-------|
//! | `start_move` | pointer-down at the block |
//! | `move_constrained` | pointer-move with a direction tag |
//! | `move_unconstrained` | pointer-move by one step |
//! | `finish_move` | pointer-up |
//! | `abort_move` | pointer-up after forcing return-to-start |
//!
//! Pointer coordinates are screen pixels: canvas units times the canvas
//! scale.

use crate::config::MoveConfig;
use crate::drag::{DragContext, Dragger, DraggerFactory, DraggerRegistry};
use crate::hooks::{FocusManager, NoFocus, NoPreview, PreviewSink};
use crate::input::InputEvent;
use crate::keyboard_drag::KeyboardDragStrategy;
use crate::search::Candidate;
use kbm_core::{
    Canvas, CanvasId, ConnectionChecker, DefaultChecker, Direction, NodeId, Point, PortKind,
    PortRef, Vec2,
};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Misuse of the session API. The command surface avoids these by checking
/// `can_move` and `is_moving` first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("a move is already in progress on {0}")]
    AlreadyMoving(CanvasId),

    #[error("no move in progress on {0}")]
    NotMoving(CanvasId),

    #[error("no dragger registered as {name:?} for {canvas}")]
    NoDragger { canvas: CanvasId, name: String },

    #[error("block {0} is not on the canvas")]
    UnknownNode(NodeId),

    #[error("block {0} is not movable")]
    NotMovable(NodeId),

    #[error("{0} is not editable")]
    NotEditable(CanvasId),
}

// ─── Session ─────────────────────────────────────────────────────────────

/// State of one in-progress move.
pub struct MoveSession {
    node: NodeId,
    /// Next-statement port the block hung off before the move. The revert
    /// itself replays the strategy's start attachment; these two fields let
    /// hosts inspect the origin and let `abort_move` check the result.
    parent_next: Option<PortRef>,
    /// Value input the block was plugged into before the move.
    parent_input: Option<PortRef>,
    start_origin: Point,
    /// Where the synthetic pointer went down, in screen pixels.
    pointer_start: Point,
    /// Pointer travel since the start, in screen pixels.
    total_delta: Vec2,
    dragger: Box<dyn Dragger>,
    strategy: KeyboardDragStrategy,
}

impl fmt::Debug for MoveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveSession")
            .field("node", &self.node)
            .field("parent_next", &self.parent_next)
            .field("parent_input", &self.parent_input)
            .field("start_origin", &self.start_origin)
            .field("total_delta", &self.total_delta)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl MoveSession {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent_next(&self) -> Option<PortRef> {
        self.parent_next
    }

    pub fn parent_input(&self) -> Option<PortRef> {
        self.parent_input
    }

    /// The superior port the block hung off before the move, of either
    /// kind. An abort must leave the block attached here again.
    pub fn original_parent(&self) -> Option<PortRef> {
        self.parent_next.or(self.parent_input)
    }

    pub fn start_origin(&self) -> Point {
        self.start_origin
    }

    pub fn total_delta(&self) -> Vec2 {
        self.total_delta
    }

    pub fn search_cursor(&self) -> Option<PortRef> {
        self.strategy.cursor()
    }

    pub fn staged_candidate(&self) -> Option<&Candidate> {
        self.strategy.staged()
    }

    fn pointer(&self) -> Point {
        self.pointer_start + self.total_delta
    }

    /// Match the pointer to wherever the strategy put the block.
    fn reanchor(&mut self, canvas: &Canvas) {
        if let Some(block) = canvas.block(self.node) {
            self.total_delta = (block.origin - self.start_origin) * canvas.scale;
        }
    }
}

// ─── Mover ───────────────────────────────────────────────────────────────

/// Per-canvas keyboard move state machine.
pub struct Mover {
    config: MoveConfig,
    draggers: DraggerRegistry,
    checker: Box<dyn ConnectionChecker>,
    preview: Box<dyn PreviewSink>,
    focus: Box<dyn FocusManager>,
    sessions: HashMap<CanvasId, MoveSession>,
}

impl Default for Mover {
    fn default() -> Self {
        Self::new(MoveConfig::default())
    }
}

impl Mover {
    pub fn new(config: MoveConfig) -> Self {
        Self {
            config,
            draggers: DraggerRegistry::default(),
            checker: Box::new(DefaultChecker),
            preview: Box::new(NoPreview),
            focus: Box::new(NoFocus),
            sessions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_checker(mut self, checker: impl ConnectionChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    #[must_use]
    pub fn with_preview(mut self, preview: impl PreviewSink + 'static) -> Self {
        self.preview = Box::new(preview);
        self
    }

    #[must_use]
    pub fn with_focus(mut self, focus: impl FocusManager + 'static) -> Self {
        self.focus = Box::new(focus);
        self
    }

    #[must_use]
    pub fn with_draggers(mut self, draggers: DraggerRegistry) -> Self {
        self.draggers = draggers;
        self
    }

    pub fn register_dragger(&mut self, name: &str, factory: DraggerFactory) {
        self.draggers.register(name, factory);
    }

    pub fn config(&self) -> &MoveConfig {
        &self.config
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn is_moving(&self, canvas: &Canvas) -> bool {
        self.sessions.contains_key(&canvas.id())
    }

    pub fn session(&self, canvas: &Canvas) -> Option<&MoveSession> {
        self.sessions.get(&canvas.id())
    }

    /// Whether `start_move(canvas, node)` would be accepted.
    pub fn can_move(&self, canvas: &Canvas, node: NodeId) -> bool {
        canvas.is_editable()
            && canvas.is_navigable()
            && !self.is_moving(canvas)
            && canvas.block(node).is_some_and(|b| b.movable)
    }

    fn usable(canvas: &Canvas) -> bool {
        canvas.is_editable() && canvas.is_navigable()
    }

    // ─── Transitions ─────────────────────────────────────────────────────

    /// Begin moving `node`. Nothing is detached until the first step.
    ///
    /// # Errors
    /// `AlreadyMoving`, `NotEditable`, `UnknownNode` and `NotMovable` when
    /// `can_move` is false; `NoDragger` when the canvas names a dragger the
    /// registry does not know.
    pub fn start_move(&mut self, canvas: &mut Canvas, node: NodeId) -> Result<(), MoveError> {
        let id = canvas.id();
        if self.sessions.contains_key(&id) {
            return Err(MoveError::AlreadyMoving(id));
        }
        if !Self::usable(canvas) {
            return Err(MoveError::NotEditable(id));
        }
        let block = canvas.block(node).ok_or(MoveError::UnknownNode(node))?;
        if !block.movable {
            return Err(MoveError::NotMovable(node));
        }
        let start_origin = block.origin;
        let mut dragger =
            self.draggers
                .create(&canvas.dragger)
                .ok_or_else(|| MoveError::NoDragger {
                    canvas: id,
                    name: canvas.dragger.clone(),
                })?;

        let parent = canvas
            .attachment(node)
            .and_then(|att| canvas.port(att.parent).map(|p| (att.parent, p.kind)));
        let (parent_next, parent_input) = match parent {
            Some((port, PortKind::NextStatement)) => (Some(port), None),
            Some((port, PortKind::Input)) => (None, Some(port)),
            _ => (None, None),
        };

        self.focus.focus_node(id, node);

        let pointer_start = Point::new(start_origin.x * canvas.scale, start_origin.y * canvas.scale);
        let mut strategy = KeyboardDragStrategy::new(node, &self.config);
        let mut cx = DragContext {
            canvas: &mut *canvas,
            checker: self.checker.as_ref(),
            preview: self.preview.as_mut(),
        };
        dragger.on_drag_start(&mut strategy, &mut cx, &InputEvent::pointer_down(pointer_start));

        log::debug!("{id}: start moving {node} from {start_origin:?}");
        self.sessions.insert(
            id,
            MoveSession {
                node,
                parent_next,
                parent_input,
                start_origin,
                pointer_start,
                total_delta: Vec2::ZERO,
                dragger,
                strategy,
            },
        );
        Ok(())
    }

    /// Commit the staged candidate, or leave the block where it is.
    ///
    /// Returns `Ok(false)` without doing anything when the canvas is not
    /// editable or not navigable.
    ///
    /// # Errors
    /// `NotMoving` when the canvas has no session.
    pub fn finish_move(&mut self, canvas: &mut Canvas) -> Result<bool, MoveError> {
        self.end_session(canvas, false)
    }

    /// Put the block back exactly as it was, undoing any stack healing.
    ///
    /// # Errors
    /// `NotMoving` when the canvas has no session.
    pub fn abort_move(&mut self, canvas: &mut Canvas) -> Result<bool, MoveError> {
        self.end_session(canvas, true)
    }

    fn end_session(&mut self, canvas: &mut Canvas, revert: bool) -> Result<bool, MoveError> {
        if !Self::usable(canvas) {
            return Ok(false);
        }
        let id = canvas.id();
        let mut session = self.sessions.remove(&id).ok_or(MoveError::NotMoving(id))?;
        if revert {
            session.dragger.force_return_to_start();
        }
        let at = session.pointer();
        let mut cx = DragContext {
            canvas: &mut *canvas,
            checker: self.checker.as_ref(),
            preview: self.preview.as_mut(),
        };
        session
            .dragger
            .on_drag_end(&mut session.strategy, &mut cx, &InputEvent::pointer_up(at));

        if revert {
            let parent = canvas.attachment(session.node).map(|att| att.parent);
            if parent != session.original_parent() {
                log::warn!(
                    "{id}: abort left {} under {parent:?}, expected {:?}",
                    session.node,
                    session.original_parent()
                );
            }
        }

        log::debug!(
            "{id}: {} move of {}",
            if revert { "aborted" } else { "finished" },
            session.node
        );
        self.focus.focus_node(id, session.node);
        Ok(true)
    }

    /// Step to the next compatible port in `direction`.
    ///
    /// # Errors
    /// `NotMoving` when the canvas has no session.
    pub fn move_constrained(
        &mut self,
        canvas: &mut Canvas,
        direction: Direction,
    ) -> Result<bool, MoveError> {
        if !Self::usable(canvas) {
            return Ok(false);
        }
        let id = canvas.id();
        let session = self.sessions.get_mut(&id).ok_or(MoveError::NotMoving(id))?;
        let at = session.pointer();
        let mut cx = DragContext {
            canvas: &mut *canvas,
            checker: self.checker.as_ref(),
            preview: self.preview.as_mut(),
        };
        session.dragger.on_drag(
            &mut session.strategy,
            &mut cx,
            &InputEvent::pointer_move(at, Some(direction)),
        );
        session.reanchor(canvas);
        Ok(true)
    }

    /// Translate by one `unconstrained_step` in `direction`, snapping the way
    /// a pointer drag would.
    ///
    /// # Errors
    /// `NotMoving` when the canvas has no session.
    pub fn move_unconstrained(
        &mut self,
        canvas: &mut Canvas,
        direction: Direction,
    ) -> Result<bool, MoveError> {
        if !Self::usable(canvas) {
            return Ok(false);
        }
        let id = canvas.id();
        let session = self.sessions.get_mut(&id).ok_or(MoveError::NotMoving(id))?;
        session.total_delta += direction.to_vec2() * (self.config.unconstrained_step * canvas.scale);
        let at = session.pointer();
        let mut cx = DragContext {
            canvas: &mut *canvas,
            checker: self.checker.as_ref(),
            preview: self.preview.as_mut(),
        };
        session
            .dragger
            .on_drag(&mut session.strategy, &mut cx, &InputEvent::pointer_move(at, None));
        Ok(true)
    }

    /// The host lost focus on `node`. If it is being moved, finish the move.
    ///
    /// # Errors
    /// Only what `finish_move` returns.
    pub fn on_focus_lost(&mut self, canvas: &mut Canvas, node: NodeId) -> Result<bool, MoveError> {
        if !self.session(canvas).is_some_and(|s| s.node == node) {
            return Ok(false);
        }
        log::debug!("{}: focus lost on {node}, finishing move", canvas.id());
        self.finish_move(canvas)
    }
}

impl fmt::Debug for Mover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mover")
            .field("config", &self.config)
            .field("draggers", &self.draggers)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
