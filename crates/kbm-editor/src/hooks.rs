//! Collaborators the engine reports to but does not implement.

use crate::search::Candidate;
use kbm_core::{Canvas, CanvasId, NodeId};

/// Receives candidate changes so a renderer can show (or hide) a preview of
/// the prospective connection.
pub trait PreviewSink {
    fn candidate_found(&mut self, canvas: &Canvas, candidate: &Candidate);
    fn candidate_cleared(&mut self, canvas: &Canvas);
}

/// Moves keyboard focus between blocks.
///
/// The host reports focus *loss* back through `Mover::on_focus_lost`.
pub trait FocusManager {
    fn focus_node(&mut self, canvas: CanvasId, node: NodeId);
}

/// Drops every preview notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPreview;

impl PreviewSink for NoPreview {
    fn candidate_found(&mut self, _canvas: &Canvas, _candidate: &Candidate) {}
    fn candidate_cleared(&mut self, _canvas: &Canvas) {}
}

/// Ignores focus requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl FocusManager for NoFocus {
    fn focus_node(&mut self, _canvas: CanvasId, _node: NodeId) {}
}
