//! Drag strategies and the dragger primitive.
//!
//! A `Dragger` turns pointer-down / move / up events into calls on a
//! `DragStrategy`. The strategy owns what a drag *means*: detaching the
//! block, moving it, choosing a connection candidate, and committing or
//! reverting at the end.
//!
//! `BlockDragStrategy` is the continuous pointer behaviour (nearest
//! candidate within a snap radius). Keyboard moves substitute their own
//! candidate search by wrapping it, see `keyboard_drag`.
//!
//! | Hook | Pointer drag | Keyboard drag |
//! |------|--------------|---------------|
//! | `get_candidate` | nearest within snap radius | next port in traversal order |
//! | `current_candidate_is_better` | keep unless clearly closer | never, after a directional step |

use crate::config::MoveConfig;
use crate::hooks::PreviewSink;
use crate::input::InputEvent;
use crate::search::{Candidate, ConnectionSearch};
use kbm_core::{
    Attachment, Canvas, ConnectionChecker, DEFAULT_DRAGGER, Direction, Healed, NodeId, Point,
    PortOrdering, PortRef, Vec2,
};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Everything a strategy may touch while handling one event.
pub struct DragContext<'a> {
    pub canvas: &'a mut Canvas,
    pub checker: &'a dyn ConnectionChecker,
    pub preview: &'a mut dyn PreviewSink,
}

impl DragContext<'_> {
    pub fn search<'s>(
        &'s self,
        locals: &'s [PortRef],
        ordering: &'s PortOrdering,
    ) -> ConnectionSearch<'s> {
        ConnectionSearch::new(&*self.canvas, self.checker, locals, ordering)
    }
}

/// What a drag does to the block being dragged.
pub trait DragStrategy {
    /// Capture starting state. Nothing is detached yet.
    fn start_drag(&mut self, cx: &mut DragContext<'_>);

    /// Advance the drag. `delta` is the pointer travel since the start in
    /// canvas units; `direction` is set for constrained keyboard steps.
    fn drag(&mut self, cx: &mut DragContext<'_>, delta: Vec2, direction: Option<Direction>);

    /// Commit: connect the staged candidate, or leave the block where it is.
    fn end_drag(&mut self, cx: &mut DragContext<'_>);

    /// Put the block back exactly where and how it was before the drag.
    fn revert_drag(&mut self, cx: &mut DragContext<'_>);

    /// The best connection for the block's current state, if any.
    fn get_candidate(
        &self,
        cx: &DragContext<'_>,
        delta: Vec2,
        direction: Option<Direction>,
    ) -> Option<Candidate>;

    /// Whether the staged `current` candidate should survive in favour of
    /// `new` (which may be no candidate at all).
    fn current_candidate_is_better(
        &self,
        cx: &DragContext<'_>,
        current: &Candidate,
        new: Option<&Candidate>,
    ) -> bool;
}

// ─── Block drag ──────────────────────────────────────────────────────────

/// Continuous drag of one block (and whatever travels with it).
#[derive(Debug)]
pub struct BlockDragStrategy {
    node: NodeId,
    heal_stack: bool,
    snap_radius: f64,
    preference: f64,
    start_origin: Point,
    start_attachment: Option<Attachment>,
    /// Set once the first drag step has unplugged the block.
    detached: bool,
    healed: Option<Healed>,
    /// Ports of the moving block that may form a connection.
    locals: SmallVec<[PortRef; 4]>,
    ordering: PortOrdering,
    staged: Option<Candidate>,
}

impl BlockDragStrategy {
    pub fn new(node: NodeId, config: &MoveConfig) -> Self {
        Self {
            node,
            heal_stack: config.heal_stack,
            snap_radius: config.snap_radius,
            preference: config.current_connection_preference,
            start_origin: Point::ORIGIN,
            start_attachment: None,
            detached: false,
            healed: None,
            locals: SmallVec::new(),
            ordering: PortOrdering::default(),
            staged: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn staged(&self) -> Option<&Candidate> {
        self.staged.as_ref()
    }

    pub fn locals(&self) -> &[PortRef] {
        &self.locals
    }

    pub fn ordering(&self) -> &PortOrdering {
        &self.ordering
    }

    pub fn start_origin(&self) -> Point {
        self.start_origin
    }

    pub fn start_attachment(&self) -> Option<Attachment> {
        self.start_attachment
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Blocks that travel with `node`: its subtree minus whatever healing
    /// splits off.
    fn moving_set(canvas: &Canvas, node: NodeId, heal: bool) -> HashSet<NodeId> {
        let mut moving: HashSet<NodeId> = canvas.descendants(node).into_iter().collect();
        if heal && let Some(split) = canvas.heal_candidate(node) {
            for id in canvas.descendants(split.child.node) {
                moving.remove(&id);
            }
        }
        moving
    }

    /// Previous, output, every named input, and the next port at the bottom
    /// of what moves.
    fn local_ports(canvas: &Canvas, node: NodeId, heal: bool) -> SmallVec<[PortRef; 4]> {
        let mut locals = SmallVec::new();
        let Some(block) = canvas.block(node) else {
            return locals;
        };
        locals.extend(block.previous().map(|s| PortRef::new(node, s)));
        locals.extend(block.output().map(|s| PortRef::new(node, s)));
        locals.extend(block.named_inputs().map(|s| PortRef::new(node, s)));
        let bottom = if heal {
            block.next().map(|s| PortRef::new(node, s))
        } else {
            canvas.last_next_in_stack(node)
        };
        locals.extend(bottom);
        locals
    }

    /// Unplug on the first drag step, healing the stack if configured.
    pub(crate) fn ensure_detached(&mut self, cx: &mut DragContext<'_>) {
        if self.detached {
            return;
        }
        self.healed = cx.canvas.unplug(self.node, self.heal_stack);
        self.detached = true;
        log::debug!("detached {} (healed: {:?})", self.node, self.healed);
    }

    /// Replace the staged candidate, telling the preview when the pairing
    /// actually changes.
    pub(crate) fn stage(&mut self, cx: &mut DragContext<'_>, candidate: Option<Candidate>) {
        let same_pair = match (&self.staged, &candidate) {
            (Some(a), Some(b)) => a.local == b.local && a.neighbour == b.neighbour,
            (None, None) => true,
            _ => false,
        };
        self.staged = candidate;
        if same_pair {
            return;
        }
        match &self.staged {
            Some(c) => cx.preview.candidate_found(cx.canvas, c),
            None => cx.preview.candidate_cleared(cx.canvas),
        }
    }

    pub fn nearest(&self, cx: &DragContext<'_>, radius: f64) -> Option<Candidate> {
        cx.search(&self.locals, &self.ordering).nearest(radius)
    }

    fn live_distance(canvas: &Canvas, candidate: &Candidate) -> f64 {
        match (
            canvas.port_position(candidate.local),
            canvas.port_position(candidate.neighbour),
        ) {
            (Some(a), Some(b)) => a.distance(b),
            _ => f64::INFINITY,
        }
    }
}

impl DragStrategy for BlockDragStrategy {
    fn start_drag(&mut self, cx: &mut DragContext<'_>) {
        let Some(block) = cx.canvas.block(self.node) else {
            log::warn!("drag of unknown block {}", self.node);
            return;
        };
        self.start_origin = block.origin;
        self.start_attachment = cx.canvas.attachment(self.node);
        self.locals = Self::local_ports(cx.canvas, self.node, self.heal_stack);
        let moving = Self::moving_set(cx.canvas, self.node, self.heal_stack);
        self.ordering = PortOrdering::snapshot(cx.canvas, &moving);
        self.detached = false;
        self.healed = None;
        self.staged = None;
        log::debug!(
            "drag {} from {:?}: {} local ports, {} in ordering",
            self.node,
            self.start_origin,
            self.locals.len(),
            self.ordering.len()
        );
    }

    fn drag(&mut self, cx: &mut DragContext<'_>, delta: Vec2, _direction: Option<Direction>) {
        self.ensure_detached(cx);
        cx.canvas.move_to(self.node, self.start_origin + delta);

        let found = self.get_candidate(cx, delta, None);
        let keep = self
            .staged
            .as_ref()
            .is_some_and(|current| self.current_candidate_is_better(cx, current, found.as_ref()));
        if !keep {
            self.stage(cx, found);
        }
    }

    fn end_drag(&mut self, cx: &mut DragContext<'_>) {
        let staged = self.staged.take();
        if self.detached
            && let Some(c) = staged
        {
            // The moving block goes to the neighbour, never the other way round.
            if let (Some(to), Some(from)) = (
                cx.canvas.port_position(c.neighbour),
                cx.canvas.port_position(c.local),
            ) {
                cx.canvas.move_by(self.node, to - from);
            }
            if let Err(err) = cx.canvas.connect(c.neighbour, c.local) {
                log::warn!(
                    "could not connect {} to {}: {err}",
                    cx.canvas.port_label(c.local),
                    cx.canvas.port_label(c.neighbour)
                );
            }
        }
        if staged.is_some() {
            cx.preview.candidate_cleared(cx.canvas);
        }
        log::debug!("drag of {} ended", self.node);
        self.detached = false;
        self.healed = None;
    }

    fn revert_drag(&mut self, cx: &mut DragContext<'_>) {
        let staged = self.staged.take();
        if self.detached {
            let healed = self.healed.take();
            if let Some(h) = healed
                && h.rejoined.is_some()
            {
                cx.canvas.disconnect(h.child);
            }
            let restored = match self.start_attachment {
                Some(att) => cx.canvas.connect(att.parent, att.child),
                None => Ok(()),
            };
            if let Err(err) = &restored {
                log::warn!("could not reattach {}: {err}", self.node);
            }
            if self.start_attachment.is_none() || restored.is_err() {
                cx.canvas.move_to(self.node, self.start_origin);
            }
            if let Some(h) = healed
                && let Err(err) = cx.canvas.connect(h.vacated, h.child)
            {
                log::warn!("could not undo heal below {}: {err}", self.node);
            }
            self.detached = false;
        }
        if staged.is_some() {
            cx.preview.candidate_cleared(cx.canvas);
        }
        log::debug!("drag of {} reverted", self.node);
    }

    fn get_candidate(
        &self,
        cx: &DragContext<'_>,
        _delta: Vec2,
        _direction: Option<Direction>,
    ) -> Option<Candidate> {
        self.nearest(cx, self.snap_radius)
    }

    fn current_candidate_is_better(
        &self,
        cx: &DragContext<'_>,
        current: &Candidate,
        new: Option<&Candidate>,
    ) -> bool {
        let Some(new) = new else {
            return false;
        };
        new.distance > Self::live_distance(cx.canvas, current) - self.preference
    }
}

// ─── Dragger ─────────────────────────────────────────────────────────────

/// The drag primitive: receives pointer events and forwards them to a
/// strategy.
pub trait Dragger {
    fn on_drag_start(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        event: &InputEvent,
    );

    fn on_drag(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        event: &InputEvent,
    );

    fn on_drag_end(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        event: &InputEvent,
    );

    /// Make the next `on_drag_end` revert instead of commit.
    fn force_return_to_start(&mut self);
}

/// Default dragger: pointer travel is converted from screen pixels to canvas
/// units using the canvas zoom.
#[derive(Debug, Default)]
pub struct PointerDragger {
    down: Point,
    return_to_start: bool,
}

impl PointerDragger {
    pub fn new() -> Self {
        Self::default()
    }

    fn canvas_delta(&self, canvas: &Canvas, event: &InputEvent) -> Vec2 {
        let scale = if canvas.scale > 0.0 { canvas.scale } else { 1.0 };
        (event.position() - self.down) / scale
    }
}

impl Dragger for PointerDragger {
    fn on_drag_start(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        event: &InputEvent,
    ) {
        self.down = event.position();
        self.return_to_start = false;
        strategy.start_drag(cx);
    }

    fn on_drag(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        event: &InputEvent,
    ) {
        let delta = self.canvas_delta(cx.canvas, event);
        strategy.drag(cx, delta, event.direction());
    }

    fn on_drag_end(
        &mut self,
        strategy: &mut dyn DragStrategy,
        cx: &mut DragContext<'_>,
        _event: &InputEvent,
    ) {
        if self.return_to_start {
            strategy.revert_drag(cx);
        } else {
            strategy.end_drag(cx);
        }
    }

    fn force_return_to_start(&mut self) {
        self.return_to_start = true;
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

pub type DraggerFactory = fn() -> Box<dyn Dragger>;

fn pointer_dragger() -> Box<dyn Dragger> {
    Box::new(PointerDragger::new())
}

/// Maps a canvas's `dragger` name to the primitive that serves it.
#[derive(Debug, Clone)]
pub struct DraggerRegistry {
    factories: HashMap<String, DraggerFactory>,
}

impl Default for DraggerRegistry {
    /// Registers `PointerDragger` under `DEFAULT_DRAGGER`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DEFAULT_DRAGGER, pointer_dragger);
        registry
    }
}

impl DraggerRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Returns the factory previously registered under `name`, if any.
    pub fn register(&mut self, name: &str, factory: DraggerFactory) -> Option<DraggerFactory> {
        self.factories.insert(name.to_string(), factory)
    }

    pub fn unregister(&mut self, name: &str) -> Option<DraggerFactory> {
        self.factories.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Dragger>> {
        self.factories.get(name).map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoPreview;
    use kbm_core::{Block, DefaultChecker};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl PreviewSink for Log {
        fn candidate_found(&mut self, canvas: &Canvas, c: &Candidate) {
            self.0.push(format!(
                "found {} -> {}",
                canvas.port_label(c.local),
                canvas.port_label(c.neighbour)
            ));
        }

        fn candidate_cleared(&mut self, _canvas: &Canvas) {
            self.0.push("cleared".to_string());
        }
    }

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn port(canvas: &Canvas, block: &str, name: &str) -> PortRef {
        PortRef::new(id(block), canvas.block(id(block)).unwrap().slot_of(name).unwrap())
    }

    #[test]
    fn pointer_drag_snaps_and_commits() {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("pd_target", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("pd_block", 200.0, 200.0)).unwrap();
        let mut log = Log::default();
        let mut strategy = BlockDragStrategy::new(id("pd_block"), &MoveConfig::default());
        let mut dragger = PointerDragger::new();
        let mut cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut log,
        };

        dragger.on_drag_start(&mut strategy, &mut cx, &InputEvent::pointer_down(Point::new(200.0, 200.0)));
        dragger.on_drag(
            &mut strategy,
            &mut cx,
            &InputEvent::pointer_move(Point::new(5.0, 45.0), None),
        );
        assert_eq!(
            strategy.staged().map(|c| c.neighbour),
            Some(port(cx.canvas, "pd_target", "next"))
        );
        dragger.on_drag_end(&mut strategy, &mut cx, &InputEvent::pointer_up(Point::new(5.0, 45.0)));

        assert_eq!(canvas.parent(id("pd_block")), Some(id("pd_target")));
        assert_eq!(canvas.block(id("pd_block")).unwrap().origin, Point::new(0.0, 40.0));
        assert_eq!(
            log.0,
            vec!["found pd_block.previous -> pd_target.next", "cleared"]
        );
    }

    #[test]
    fn zoom_scales_pointer_travel() {
        let mut canvas = Canvas::new();
        canvas.scale = 2.0;
        canvas.add_block(Block::statement("zs_block", 100.0, 100.0)).unwrap();
        let mut strategy = BlockDragStrategy::new(id("zs_block"), &MoveConfig::default());
        let mut dragger = PointerDragger::new();
        let mut cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut NoPreview,
        };
        dragger.on_drag_start(&mut strategy, &mut cx, &InputEvent::pointer_down(Point::new(200.0, 200.0)));
        dragger.on_drag(
            &mut strategy,
            &mut cx,
            &InputEvent::pointer_move(Point::new(240.0, 200.0), None),
        );
        assert_eq!(
            cx.canvas.block(id("zs_block")).unwrap().origin,
            Point::new(120.0, 100.0)
        );
    }

    #[test]
    fn leaving_snap_radius_clears_candidate() {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("lr_target", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("lr_block", 0.0, 300.0)).unwrap();
        let mut log = Log::default();
        let mut strategy = BlockDragStrategy::new(id("lr_block"), &MoveConfig::default());
        let mut cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut log,
        };
        strategy.start_drag(&mut cx);
        strategy.drag(&mut cx, Vec2::new(0.0, -255.0), None);
        assert!(strategy.staged().is_some());
        strategy.drag(&mut cx, Vec2::new(300.0, -255.0), None);
        assert!(strategy.staged().is_none());
        strategy.end_drag(&mut cx);

        assert_eq!(canvas.parent(id("lr_block")), None);
        assert_eq!(canvas.block(id("lr_block")).unwrap().origin, Point::new(300.0, 45.0));
        assert_eq!(
            log.0,
            vec!["found lr_block.previous -> lr_target.next", "cleared"]
        );
    }

    #[test]
    fn staged_candidate_survives_marginal_improvements() {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("sc_target", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("sc_other", 400.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("sc_block", 0.0, 50.0)).unwrap();
        let strategy = BlockDragStrategy::new(id("sc_block"), &MoveConfig::default());
        let cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut NoPreview,
        };
        let local = port(cx.canvas, "sc_block", "previous");
        let current = Candidate {
            local,
            neighbour: port(cx.canvas, "sc_target", "next"),
            distance: 10.0,
        };
        let rival = |distance| Candidate {
            local,
            neighbour: port(cx.canvas, "sc_other", "next"),
            distance,
        };
        assert!(strategy.current_candidate_is_better(&cx, &current, Some(&rival(5.0))));
        assert!(!strategy.current_candidate_is_better(&cx, &current, Some(&rival(1.0))));
        assert!(!strategy.current_candidate_is_better(&cx, &current, None));
    }

    #[test]
    fn revert_undoes_heal() {
        let mut canvas = Canvas::new();
        canvas.add_block(Block::statement("rv_a", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("rv_b", 0.0, 0.0)).unwrap();
        canvas.add_block(Block::statement("rv_c", 0.0, 0.0)).unwrap();
        let (an, bp) = (port(&canvas, "rv_a", "next"), port(&canvas, "rv_b", "previous"));
        canvas.connect(an, bp).unwrap();
        let (bn, cp) = (port(&canvas, "rv_b", "next"), port(&canvas, "rv_c", "previous"));
        canvas.connect(bn, cp).unwrap();
        let before = canvas.attachments();

        let mut strategy = BlockDragStrategy::new(id("rv_b"), &MoveConfig::default());
        let mut dragger = PointerDragger::new();
        let mut cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut NoPreview,
        };
        dragger.on_drag_start(&mut strategy, &mut cx, &InputEvent::pointer_down(Point::new(0.0, 40.0)));
        dragger.on_drag(
            &mut strategy,
            &mut cx,
            &InputEvent::pointer_move(Point::new(500.0, 40.0), None),
        );
        assert_eq!(cx.canvas.parent(id("rv_c")), Some(id("rv_a")));

        dragger.force_return_to_start();
        dragger.on_drag_end(&mut strategy, &mut cx, &InputEvent::pointer_up(Point::new(500.0, 40.0)));

        assert_eq!(canvas.attachments(), before);
        assert_eq!(canvas.block(id("rv_b")).unwrap().origin, Point::new(0.0, 40.0));
        assert_eq!(canvas.block(id("rv_c")).unwrap().origin, Point::new(0.0, 80.0));
    }

    #[test]
    fn statement_input_of_moving_block_wraps_a_free_stack() {
        let mut canvas = Canvas::new();
        canvas
            .add_block(Block::statement("si_loop", 0.0, 0.0).with_input("do", kbm_core::InputKind::Statement))
            .unwrap();
        canvas.add_block(Block::statement("si_body", 100.0, 100.0)).unwrap();
        let mut strategy = BlockDragStrategy::new(id("si_loop"), &MoveConfig::default());
        let mut cx = DragContext {
            canvas: &mut canvas,
            checker: &DefaultChecker,
            preview: &mut NoPreview,
        };
        strategy.start_drag(&mut cx);
        assert!(strategy.locals().contains(&port(cx.canvas, "si_loop", "do")));

        // si_loop.do lands at (96, 102), next to si_body.previous.
        strategy.drag(&mut cx, Vec2::new(80.0, 62.0), None);
        assert_eq!(
            strategy.staged().map(|c| (c.local, c.neighbour)),
            Some((port(cx.canvas, "si_loop", "do"), port(cx.canvas, "si_body", "previous")))
        );
        strategy.end_drag(&mut cx);

        assert_eq!(canvas.parent(id("si_body")), Some(id("si_loop")));
        assert_eq!(canvas.block(id("si_body")).unwrap().origin, Point::new(100.0, 100.0));
        assert_eq!(canvas.block(id("si_loop")).unwrap().origin, Point::new(84.0, 60.0));
    }

    #[test]
    fn registry_has_default_dragger() {
        let registry = DraggerRegistry::default();
        assert!(registry.contains(DEFAULT_DRAGGER));
        assert!(registry.create(DEFAULT_DRAGGER).is_some());
        assert!(registry.create("flyout").is_none());
    }
}
