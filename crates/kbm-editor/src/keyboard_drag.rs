//! Keyboard-driven drag strategy.
//!
//! Wraps `BlockDragStrategy` and swaps in directional candidate search for
//! move events that carry a direction tag. Untagged moves fall through to
//! the ordinary pointer behaviour.

use crate::config::MoveConfig;
use crate::drag::{BlockDragStrategy, DragContext, DragStrategy};
use crate::search::Candidate;
use kbm_core::{Direction, NodeId, PortRef, Vec2};

#[derive(Debug)]
pub struct KeyboardDragStrategy {
    base: BlockDragStrategy,
    candidate_offset: Vec2,
    /// Neighbour port the next directional search resumes from.
    cursor: Option<PortRef>,
    /// The last step was directional.
    constrained: bool,
}

impl KeyboardDragStrategy {
    pub fn new(node: NodeId, config: &MoveConfig) -> Self {
        Self {
            base: BlockDragStrategy::new(node, config),
            candidate_offset: config.candidate_offset,
            cursor: None,
            constrained: false,
        }
    }

    pub fn base(&self) -> &BlockDragStrategy {
        &self.base
    }

    pub fn node(&self) -> NodeId {
        self.base.node()
    }

    pub fn cursor(&self) -> Option<PortRef> {
        self.cursor
    }

    pub fn staged(&self) -> Option<&Candidate> {
        self.base.staged()
    }

    /// One directional step. Exhaustion leaves everything as it was.
    fn step(&mut self, cx: &mut DragContext<'_>, direction: Direction) {
        self.base.ensure_detached(cx);
        self.constrained = true;

        let Some(found) = self.get_candidate(cx, Vec2::ZERO, Some(direction)) else {
            log::debug!("{direction:?}: no candidate for {}", self.node());
            return;
        };
        if let Some(current) = self.base.staged()
            && self.current_candidate_is_better(cx, current, Some(&found))
        {
            return;
        }

        if let (Some(to), Some(from)) = (
            cx.canvas.port_position(found.neighbour),
            cx.canvas.port_position(found.local),
        ) {
            cx.canvas
                .move_by(self.node(), to + self.candidate_offset - from);
        }
        log::debug!(
            "{direction:?}: {} -> {}",
            cx.canvas.port_label(found.local),
            cx.canvas.port_label(found.neighbour)
        );
        self.cursor = Some(found.neighbour);
        self.base.stage(cx, Some(found));
    }
}

impl DragStrategy for KeyboardDragStrategy {
    fn start_drag(&mut self, cx: &mut DragContext<'_>) {
        self.base.start_drag(cx);
        self.constrained = false;
        self.cursor = None;

        // Resume from where the block sits now, and show that right away.
        if let Some(att) = self.base.start_attachment() {
            self.cursor = Some(att.parent);
            self.base.stage(
                cx,
                Some(Candidate {
                    local: att.child,
                    neighbour: att.parent,
                    distance: 0.0,
                }),
            );
        }
    }

    fn drag(&mut self, cx: &mut DragContext<'_>, delta: Vec2, direction: Option<Direction>) {
        match direction {
            Some(direction) => self.step(cx, direction),
            None => {
                self.constrained = false;
                self.base.drag(cx, delta, None);
                self.cursor = self.base.staged().map(|c| c.neighbour);
            }
        }
    }

    fn end_drag(&mut self, cx: &mut DragContext<'_>) {
        self.base.end_drag(cx);
        self.cursor = None;
    }

    fn revert_drag(&mut self, cx: &mut DragContext<'_>) {
        self.base.revert_drag(cx);
        self.cursor = None;
    }

    fn get_candidate(
        &self,
        cx: &DragContext<'_>,
        delta: Vec2,
        direction: Option<Direction>,
    ) -> Option<Candidate> {
        match direction {
            Some(direction) => cx
                .search(self.base.locals(), self.base.ordering())
                .step(self.cursor, direction),
            None => self.base.get_candidate(cx, delta, None),
        }
    }

    fn current_candidate_is_better(
        &self,
        cx: &DragContext<'_>,
        current: &Candidate,
        new: Option<&Candidate>,
    ) -> bool {
        if self.constrained {
            return false;
        }
        self.base.current_candidate_is_better(cx, current, new)
    }
}
