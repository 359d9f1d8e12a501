/// Transform nodes of the scene graph.
///
/// Nodes live in an arena owned by the `Scene`; parent and child links are
/// plain keys. World matrices are kept current eagerly: moving a node
/// recomputes and stamps its whole subtree.

use glam::Mat4;
use slotmap::new_key_type;

new_key_type! {
    /// Stable key for a transform node within a Scene.
    pub struct NodeKey;
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) local: Mat4,
    pub(crate) world: Mat4,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) moved_at: u64,
}

impl Node {
    pub(crate) fn new(local: Mat4, parent: Option<NodeKey>, frame: u64) -> Self {
        Self {
            local,
            world: local,
            parent,
            children: Vec::new(),
            moved_at: frame,
        }
    }

    /// Transform relative to the parent node
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local
    }

    /// Transform relative to the world (parent chain applied)
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Scene frame at which this node (or an ancestor) last moved
    pub fn moved_at(&self) -> u64 {
        self.moved_at
    }
}
