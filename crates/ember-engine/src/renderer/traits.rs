//! Presentation-surface contract.
//!
//! The engine computes positions, stacking and transforms; a backend owns the
//! actual visuals. The engine never inspects node content — it only pushes
//! state through this trait and moves nodes between parents.

use std::any::Any;

use crate::api::types::NodeId;

/// A tree of visual nodes owned by a presentation backend.
///
/// Implementors decide what a node *is* (a DOM element, a display-list entry,
/// a plain record). The engine guarantees it only calls `set_*` on nodes it
/// obtained from `create_node`/`clone_node` and has not yet released.
pub trait VisualTree {
    /// Create a fresh, detached node.
    fn create_node(&mut self) -> NodeId;

    /// Duplicate a node's visual state. The clone starts detached.
    fn clone_node(&mut self, node: NodeId) -> NodeId;

    /// Parent `node` under `parent`, detaching it from any previous parent.
    fn attach(&mut self, node: NodeId, parent: NodeId);

    /// Remove `node` from its parent. The node itself survives.
    fn detach(&mut self, node: NodeId);

    /// Free a node for good. The engine never references it again.
    fn release_node(&mut self, node: NodeId);

    /// Anchor-adjusted placement plus extent, in world units.
    fn set_bounds(&mut self, node: NodeId, x: f32, y: f32, width: f32, height: f32);

    /// Draw-order layer.
    fn set_stack_order(&mut self, node: NodeId, order: i32);

    /// Serialized transform, e.g. `translate(4px, 0px) rotate(90deg) ...`.
    fn set_transform(&mut self, node: NodeId, transform: &str);

    /// Escape hatch for hosts that need their concrete backend back.
    fn as_any(&self) -> &dyn Any;
}
