//! Scene-graph contract.
//!
//! The compositing library owns the actual node tree; the core only ever
//! refers to nodes by [`NodeId`] and drives them through [`SceneGraph`].

use serde::{Deserialize, Serialize};

use crate::surface::SurfaceId;

/// Handle to a node in the host's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Operations the core needs from the compositing library's scene graph.
///
/// Children stack in insertion order, last on top. Destroying a node
/// destroys its whole subtree.
pub trait SceneGraph {
    /// Create an empty, enabled tree under `parent` (or the root).
    fn create_tree(&mut self, parent: Option<NodeId>) -> NodeId;

    /// Create the drawable subtree for a client surface.
    ///
    /// Returns `None` when the library ran out of resources.
    fn create_surface_tree(&mut self, parent: NodeId, surface: SurfaceId) -> Option<NodeId>;

    fn set_enabled(&mut self, node: NodeId, enabled: bool);

    /// Position relative to the parent node.
    fn set_position(&mut self, node: NodeId, x: i32, y: i32);

    fn reparent(&mut self, node: NodeId, new_parent: NodeId);

    fn raise_to_top(&mut self, node: NodeId);

    fn destroy(&mut self, node: NodeId);

    // ── Queries ──────────────────────────────────────────────────────

    fn exists(&self, node: NodeId) -> bool;

    fn is_enabled(&self, node: NodeId) -> bool;

    fn position(&self, node: NodeId) -> Option<(i32, i32)>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children, bottom first.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Client surface a surface tree shows; `None` for plain trees.
    fn surface_of(&self, node: NodeId) -> Option<SurfaceId>;

    /// Whether the node and all its ancestors are enabled.
    fn is_visible(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if !self.exists(id) || !self.is_enabled(id) {
                return false;
            }
            current = self.parent(id);
        }
        true
    }
}
