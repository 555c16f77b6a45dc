//! Scene Graph
//!
//! The minimal scene model controllers write into:
//! - [`Node`]: hierarchy, local/world transform, hidden flag
//! - [`Mesh`]: vertices, UV channels, per-vertex colors and sizes, dirty flags
//! - [`Property`]: texturing state bound to a node
//! - [`Scene`]: arenas for all of the above plus the controllers and the
//!   sequence registry
//!
//! All cross references are slotmap keys, so a stale reference is detected
//! on lookup instead of dangling.

pub mod mesh;
pub mod node;
pub mod property;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use mesh::Mesh;
pub use node::Node;
pub use property::{Property, TexDesc, TextureProperty, TexturingProperty};
pub use scene::Scene;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
    pub struct PropertyKey;
    pub struct ControllerKey;
}
