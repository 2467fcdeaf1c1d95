//! Recording backend with no surface behind it.
//!
//! Stands in for a real presentation layer in tests and headless demos: every
//! push is stored on a per-node record that can be read back afterwards.

use std::any::Any;
use std::collections::HashMap;

use crate::api::types::NodeId;
use crate::renderer::traits::VisualTree;

/// Last-written visual state of one headless node.
#[derive(Debug, Clone, Default)]
pub struct NodeRecord {
    pub parent: Option<NodeId>,
    pub bounds: [f32; 4],
    pub stack_order: i32,
    pub transform: String,
}

/// In-memory [`VisualTree`] that records every call.
#[derive(Debug, Default)]
pub struct HeadlessTree {
    nodes: HashMap<u32, NodeRecord>,
    next: u32,
}

impl HeadlessTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a node's recorded state. `None` once released.
    pub fn record(&self, node: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&node.0)
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node.0)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.nodes.get(&node.0).is_some_and(|n| n.parent.is_some())
    }

    /// Number of nodes currently parented under `parent`.
    pub fn child_count(&self, parent: NodeId) -> usize {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(parent))
            .count()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl VisualTree for HeadlessTree {
    fn create_node(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id.0, NodeRecord::default());
        id
    }

    fn clone_node(&mut self, node: NodeId) -> NodeId {
        let mut record = self.nodes.get(&node.0).cloned().unwrap_or_default();
        record.parent = None;
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id.0, record);
        id
    }

    fn attach(&mut self, node: NodeId, parent: NodeId) {
        if let Some(record) = self.nodes.get_mut(&node.0) {
            record.parent = Some(parent);
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(record) = self.nodes.get_mut(&node.0) {
            record.parent = None;
        }
    }

    fn release_node(&mut self, node: NodeId) {
        self.nodes.remove(&node.0);
    }

    fn set_bounds(&mut self, node: NodeId, x: f32, y: f32, width: f32, height: f32) {
        if let Some(record) = self.nodes.get_mut(&node.0) {
            record.bounds = [x, y, width, height];
        }
    }

    fn set_stack_order(&mut self, node: NodeId, order: i32) {
        if let Some(record) = self.nodes.get_mut(&node.0) {
            record.stack_order = order;
        }
    }

    fn set_transform(&mut self, node: NodeId, transform: &str) {
        if let Some(record) = self.nodes.get_mut(&node.0) {
            record.transform = transform.to_string();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_attach_detach() {
        let mut tree = HeadlessTree::new();
        let root = tree.create_node();
        let child = tree.create_node();

        tree.attach(child, root);
        assert!(tree.is_attached(child));
        assert_eq!(tree.child_count(root), 1);

        tree.detach(child);
        assert!(!tree.is_attached(child));
        assert!(tree.exists(child));
    }

    #[test]
    fn clone_copies_state_but_not_parent() {
        let mut tree = HeadlessTree::new();
        let root = tree.create_node();
        let node = tree.create_node();
        tree.attach(node, root);
        tree.set_bounds(node, 1.0, 2.0, 3.0, 4.0);

        let copy = tree.clone_node(node);
        let record = tree.record(copy).unwrap();
        assert_eq!(record.bounds, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(record.parent, None);
    }

    #[test]
    fn release_forgets_the_node() {
        let mut tree = HeadlessTree::new();
        let node = tree.create_node();
        tree.release_node(node);
        assert!(!tree.exists(node));
        assert_eq!(tree.node_count(), 0);
    }
}
