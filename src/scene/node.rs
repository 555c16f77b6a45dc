use glam::Affine3A;

use crate::scene::transform::Transform;
use crate::scene::{MeshKey, NodeHandle, PropertyKey};
use crate::source::BlockId;

/// A scene node.
///
/// # Hierarchy
///
/// - `parent`: handle to the parent node (`None` for roots)
/// - `children`: child handles in insertion order
///
/// # Components
///
/// Mesh and property data live in the [`Scene`](crate::scene::Scene) arenas;
/// the node only keeps their keys.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    /// Record this node was built from, used to resolve controller links.
    pub(crate) block: Option<BlockId>,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    pub transform: Transform,

    /// Written by visibility controllers; a hidden parent hides the subtree.
    pub hidden: bool,

    pub mesh: Option<MeshKey>,
    pub properties: Vec<PropertyKey>,
}

impl Node {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            block: None,
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            hidden: false,
            mesh: None,
            properties: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}
