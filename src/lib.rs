#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod controller;
pub mod errors;
pub mod scene;
pub mod settings;
pub mod source;

pub use animation::{InterpolationMode, Interpolator, KeyframeCursor, KeyframeTrack};
pub use controller::{Controller, ControllerKind, LoopMode, TargetRef};
pub use errors::KinemaError;
pub use scene::{ControllerKey, Mesh, MeshKey, Node, NodeHandle, Property, PropertyKey, Scene};
pub use settings::AnimationSettings;
pub use source::{Block, BlockId, ModelSource};
