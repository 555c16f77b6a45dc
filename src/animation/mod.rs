//! Keyframe sampling and transform interpolators shared by the controllers.

pub mod bspline;
pub mod interpolator;
pub mod tracks;
mod values;

pub use interpolator::{BSplineTransformInterpolator, Interpolator, TransformChannels, TransformKeysInterpolator};
pub use tracks::{InterpolationMode, KeyframeCursor, KeyframeTrack};
pub use values::Interpolatable;
