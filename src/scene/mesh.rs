use glam::{Vec2, Vec3, Vec4};

use crate::scene::NodeHandle;

/// Vertex data of a node's geometry, also used as the particle buffer of a
/// particle system.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Node the mesh is attached to; set by [`Scene::attach_mesh`](crate::scene::Scene::attach_mesh).
    pub(crate) node: Option<NodeHandle>,

    pub verts: Vec<Vec3>,
    /// UV channels; channel 0 is the one animated by UV controllers.
    pub coords: Vec<Vec<Vec2>>,
    pub colors: Vec<Vec4>,
    /// Per-vertex point sizes (particles only).
    pub sizes: Vec<f32>,

    /// Number of live particles written to the front of the buffers.
    pub active_count: usize,
    /// Base point size of a particle system.
    pub point_size: f32,

    /// Vertex positions changed; bounds need recomputing.
    pub update_bounds: bool,
    /// Vertex attributes changed; GPU copies need refreshing.
    pub update_data: bool,
}

impl Mesh {
    #[must_use]
    pub fn new(verts: Vec<Vec3>) -> Self {
        Self {
            verts,
            point_size: 1.0,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeHandle> {
        self.node
    }

    /// A particle buffer of `capacity` vertices with sizes and colors.
    #[must_use]
    pub fn particles(capacity: usize) -> Self {
        Self {
            verts: vec![Vec3::ZERO; capacity],
            colors: vec![Vec4::ONE; capacity],
            sizes: vec![1.0; capacity],
            point_size: 1.0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_coords(mut self, coords: Vec<Vec2>) -> Self {
        self.coords = vec![coords];
        self
    }
}
