//! Error Types
//!
//! # Overview
//!
//! The main error type [`KinemaError`] covers the failures of the scene
//! building API:
//! - record lookups in the model source
//! - stale node, mesh or property handles
//! - controllers attached to the wrong kind of object
//!
//! The per-frame update path never returns errors. A controller that cannot
//! resolve its data stays inert and logs why at debug level.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kinema::errors::{KinemaError, Result};
//!
//! fn build(scene: &mut Scene, source: &ModelSource) -> Result<()> {
//!     let node = scene.create_node("Bip01");
//!     scene.add_controller(source, BlockId(4), TargetRef::Node(node))?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::controller::ControllerKind;
use crate::scene::{MeshKey, NodeHandle, PropertyKey};
use crate::source::SourceError;

#[derive(Error, Debug)]
pub enum KinemaError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// A record could not be resolved.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeHandle),

    #[error("Mesh not found: {0:?}")]
    MeshNotFound(MeshKey),

    #[error("Property not found: {0:?}")]
    PropertyNotFound(PropertyKey),

    /// The controller kind cannot drive the given target.
    #[error("{} cannot target a {found}", kind.type_name())]
    TargetMismatch { kind: ControllerKind, found: &'static str },
}

/// Alias for `Result<T, KinemaError>`.
pub type Result<T> = std::result::Result<T, KinemaError>;
