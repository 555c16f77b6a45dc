//! Controllers
//!
//! A controller binds one animation record to one scene object and writes
//! into it when the scene advances. The set of kinds is closed, so a
//! controller is a [`ControllerBase`] plus a [`ControllerState`] enum and
//! dispatch is a `match`.
//!
//! Every controller follows the same two-phase protocol:
//! - `refresh(source, scene)` re-reads the record and rebuilds the cached
//!   bindings; a failure leaves the controller inert, never broken.
//! - `update(time, scene)` maps `time` into the local window and applies
//!   the sampled values. Inactive, unbound or orphaned controllers are
//!   no-ops.

pub mod base;
pub mod manager;
pub mod morph;
pub mod particles;
pub mod texture;
pub mod transform;
pub mod uv;
pub mod visibility;

pub use base::{ControllerBase, ControllerFlags, LoopMode, remap_time};
pub use manager::ControllerManager;
pub use morph::MorphController;
pub use particles::{EmitFlags, Gravity, GravityKind, Particle, ParticleController};
pub use texture::{TextureFlipController, TextureTransformController, TextureTransformOp};
pub use transform::{KeyframeController, MultiTargetTransformController, TransformController};
pub use uv::UvController;
pub use visibility::VisibilityController;

use crate::scene::{MeshKey, NodeHandle, PropertyKey, Scene};
use crate::settings::AnimationSettings;
use crate::source::{BlockId, ModelSource};

/// Every supported controller kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
    Transform,
    Keyframe,
    MultiTargetTransform,
    Visibility,
    Morph,
    Uv,
    TextureFlip,
    TextureTransform,
    ParticleSystem,
    Manager,
}

/// What a controller kind writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Node,
    Mesh,
    Property,
}

impl TargetKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Mesh => "mesh",
            Self::Property => "property",
        }
    }
}

impl ControllerKind {
    pub const ALL: [Self; 10] = [
        Self::Transform,
        Self::Keyframe,
        Self::MultiTargetTransform,
        Self::Visibility,
        Self::Morph,
        Self::Uv,
        Self::TextureFlip,
        Self::TextureTransform,
        Self::ParticleSystem,
        Self::Manager,
    ];

    /// Type name as written in the file and in sequence channels.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Transform => "NiTransformController",
            Self::Keyframe => "NiKeyframeController",
            Self::MultiTargetTransform => "NiMultiTargetTransformController",
            Self::Visibility => "NiVisController",
            Self::Morph => "NiGeomMorpherController",
            Self::Uv => "NiUVController",
            Self::TextureFlip => "NiFlipController",
            Self::TextureTransform => "NiTextureTransformController",
            Self::ParticleSystem => "NiParticleSystemController",
            Self::Manager => "NiControllerManager",
        }
    }

    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    #[must_use]
    pub fn target_kind(self) -> TargetKind {
        match self {
            Self::Transform | Self::Keyframe | Self::MultiTargetTransform | Self::Visibility | Self::Manager => {
                TargetKind::Node
            }
            Self::Morph | Self::Uv | Self::ParticleSystem => TargetKind::Mesh,
            Self::TextureFlip | Self::TextureTransform => TargetKind::Property,
        }
    }
}

/// The scene object a controller animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRef {
    Node(NodeHandle),
    Mesh(MeshKey),
    Property(PropertyKey),
}

impl TargetRef {
    #[must_use]
    pub fn kind(self) -> TargetKind {
        match self {
            Self::Node(_) => TargetKind::Node,
            Self::Mesh(_) => TargetKind::Mesh,
            Self::Property(_) => TargetKind::Property,
        }
    }
}

/// Kind-specific state of a controller.
#[derive(Debug)]
pub enum ControllerState {
    Transform(TransformController),
    Keyframe(KeyframeController),
    MultiTargetTransform(MultiTargetTransformController),
    Visibility(VisibilityController),
    Morph(MorphController),
    Uv(UvController),
    TextureFlip(TextureFlipController),
    TextureTransform(TextureTransformController),
    ParticleSystem(Box<ParticleController>),
    Manager(ControllerManager),
}

impl ControllerState {
    fn new(kind: ControllerKind, block: BlockId, settings: &AnimationSettings) -> Self {
        match kind {
            ControllerKind::Transform => Self::Transform(TransformController::default()),
            ControllerKind::Keyframe => Self::Keyframe(KeyframeController::default()),
            ControllerKind::MultiTargetTransform => {
                Self::MultiTargetTransform(MultiTargetTransformController::default())
            }
            ControllerKind::Visibility => Self::Visibility(VisibilityController::default()),
            ControllerKind::Morph => Self::Morph(MorphController::default()),
            ControllerKind::Uv => Self::Uv(UvController::default()),
            ControllerKind::TextureFlip => Self::TextureFlip(TextureFlipController::default()),
            ControllerKind::TextureTransform => Self::TextureTransform(TextureTransformController::default()),
            ControllerKind::ParticleSystem => Self::ParticleSystem(Box::new(ParticleController::new(block, settings))),
            ControllerKind::Manager => Self::Manager(ControllerManager::default()),
        }
    }
}

/// A controller instance: shared base plus kind state.
#[derive(Debug)]
pub struct Controller {
    base: ControllerBase,
    state: ControllerState,
}

impl Controller {
    /// An unbound controller; call [`Controller::refresh`] before use.
    #[must_use]
    pub fn new(kind: ControllerKind, block: BlockId, target: TargetRef, settings: &AnimationSettings) -> Self {
        Self {
            base: ControllerBase::new(block, kind, target),
            state: ControllerState::new(kind, block, settings),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ControllerKind {
        self.base.kind
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TargetRef {
        self.base.target
    }

    #[inline]
    #[must_use]
    pub fn base(&self) -> &ControllerBase {
        &self.base
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut ControllerBase {
        &mut self.base
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Re-reads the record and rebuilds kind-specific bindings.
    ///
    /// Returns whether the controller is bound afterwards. An orphaned
    /// controller stays unbound.
    pub fn refresh(&mut self, source: &ModelSource, scene: &mut Scene) -> bool {
        if self.base.orphaned {
            return false;
        }
        if !scene.contains_target(self.base.target) {
            self.base.orphaned = true;
            self.base.bound = false;
            log::debug!(
                "{} {:?} lost its target",
                self.base.kind.type_name(),
                self.base.block
            );
            return false;
        }

        let record = match self.base.refresh(source) {
            Ok(record) => record,
            Err(err) => {
                log::debug!(
                    "{} {:?} left inert: {err}",
                    self.base.kind.type_name(),
                    self.base.block
                );
                self.base.bound = false;
                return false;
            }
        };

        let base = &self.base;
        let bound = match &mut self.state {
            ControllerState::Transform(c) => c.refresh(base, source),
            ControllerState::Keyframe(c) => c.refresh(base, source),
            ControllerState::MultiTargetTransform(c) => c.refresh(record, source, scene),
            ControllerState::Visibility(c) => c.refresh(base, source),
            ControllerState::Morph(c) => c.refresh(base, record, source),
            ControllerState::Uv(c) => c.refresh(base, source),
            ControllerState::TextureFlip(c) => c.refresh(base, record, source, scene),
            ControllerState::TextureTransform(c) => c.refresh(base, record, source),
            ControllerState::ParticleSystem(c) => c.refresh(record, source, scene),
            ControllerState::Manager(c) => c.refresh(record, source, scene),
        };

        if !bound {
            log::debug!(
                "{} {:?} could not resolve its data",
                self.base.kind.type_name(),
                self.base.block
            );
        }
        self.base.bound = bound;
        bound
    }

    /// Applies the controller at scene time `time`.
    pub fn update(&mut self, time: f32, scene: &mut Scene) {
        if !self.base.active || !self.base.bound || self.base.orphaned {
            return;
        }
        if !scene.contains_target(self.base.target) {
            self.base.orphaned = true;
            return;
        }

        let base = &self.base;
        let ctrl_time = base.ctrl_time(time);

        match &mut self.state {
            ControllerState::Transform(c) => c.update(base, ctrl_time, scene),
            ControllerState::Keyframe(c) => c.update(base, ctrl_time, scene),
            ControllerState::MultiTargetTransform(c) => c.update(ctrl_time, scene),
            ControllerState::Visibility(c) => c.update(base, ctrl_time, scene),
            ControllerState::Morph(c) => c.update(base, ctrl_time, scene),
            ControllerState::Uv(c) => c.update(base, ctrl_time, scene),
            ControllerState::TextureFlip(c) => c.update(base, ctrl_time, scene),
            ControllerState::TextureTransform(c) => c.update(base, ctrl_time, scene),
            ControllerState::ParticleSystem(c) => c.update(base, ctrl_time, scene),
            ControllerState::Manager(_) => {}
        }
    }

    /// Rebinds the controller to another interpolator, as a sequence does.
    ///
    /// Returns `false` and changes nothing if `interpolator` does not exist.
    pub fn bind_interpolator(&mut self, interpolator: BlockId, source: &ModelSource) -> bool {
        if source.block(interpolator).is_err() {
            return false;
        }

        // Morph weights are bound per target through the record links; the
        // morph data itself stays.
        if let ControllerState::Morph(_) = self.state {
            self.base.interpolator = Some(interpolator);
            return true;
        }

        self.base.set_interpolator(interpolator, source);

        let base = &self.base;
        let ok = match &mut self.state {
            ControllerState::Transform(c) => c.bind_interpolator(interpolator, source),
            ControllerState::Keyframe(c) => c.load_data(base, source),
            ControllerState::Visibility(c) => c.load_data(base, source),
            ControllerState::Uv(c) => c.load_data(base, source),
            ControllerState::TextureFlip(c) => c.load_data(base, source),
            ControllerState::TextureTransform(c) => c.load_data(base, source),
            ControllerState::MultiTargetTransform(_)
            | ControllerState::Morph(_)
            | ControllerState::ParticleSystem(_)
            | ControllerState::Manager(_) => true,
        };
        if ok {
            self.base.bound = true;
        }
        ok
    }

    pub fn set_timing(&mut self, start: f32, stop: f32, phase: f32, frequency: f32) {
        self.base.set_timing(start, stop, phase, frequency);
    }

    #[must_use]
    pub fn as_particles(&self) -> Option<&ParticleController> {
        match &self.state {
            ControllerState::ParticleSystem(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_multi_target(&self) -> Option<&MultiTargetTransformController> {
        match &self.state {
            ControllerState::MultiTargetTransform(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_multi_target_mut(&mut self) -> Option<&mut MultiTargetTransformController> {
        match &mut self.state {
            ControllerState::MultiTargetTransform(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_manager(&self) -> Option<&ControllerManager> {
        match &self.state {
            ControllerState::Manager(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_transform(&self) -> Option<&TransformController> {
        match &self.state {
            ControllerState::Transform(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for kind in ControllerKind::ALL {
            assert_eq!(ControllerKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(ControllerKind::from_type_name("NiAlphaController"), None);
    }
}
