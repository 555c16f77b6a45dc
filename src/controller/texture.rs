use std::sync::Arc;

use crate::animation::{KeyframeCursor, KeyframeTrack};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::property::TEXTURE_SLOTS;
use crate::scene::{Property, Scene};
use crate::source::{BlockId, ControllerParams, ControllerRecord, ModelSource, version};

/// First version whose flip controllers list source textures.
const FIRST_SOURCE_TEXTURES: u32 = version(4, 0, 0, 0);

fn float_keys(base: &ControllerBase, source: &ModelSource) -> Option<Arc<KeyframeTrack<f32>>> {
    base.data
        .and_then(|data| source.float_data(data).ok())
        .map(|data| Arc::clone(&data.keys))
}

#[inline]
fn slot_index(slot: u32) -> usize {
    slot as usize & (TEXTURE_SLOTS - 1)
}

/// Cycles a texture slot through a list of images.
#[derive(Debug, Default)]
pub struct TextureFlipController {
    slot: u32,
    delta: f32,
    /// Validated list; entries of the wrong kind are `None`.
    sources: Vec<Option<BlockId>>,
    frames: Option<Arc<KeyframeTrack<f32>>>,
    cursor: KeyframeCursor,
}

impl TextureFlipController {
    pub(crate) fn refresh(
        &mut self,
        base: &ControllerBase,
        record: &ControllerRecord,
        source: &ModelSource,
        scene: &Scene,
    ) -> bool {
        let ControllerParams::Flip {
            texture_slot,
            delta,
            sources,
            images,
        } = &record.params
        else {
            return false;
        };
        let TargetRef::Property(key) = base.target else {
            return false;
        };
        let Some(property) = scene.properties.get(key) else {
            return false;
        };

        self.slot = *texture_slot;
        self.delta = *delta;

        let list = if source.check_version(FIRST_SOURCE_TEXTURES, 0) {
            sources
        } else {
            images
        };
        let expected = match property {
            Property::Texturing(_) => "NiSourceTexture",
            Property::Texture(_) => "NiImage",
        };
        self.sources = list
            .iter()
            .map(|link| link.filter(|id| source.is_block(*id, expected)))
            .collect();

        self.load_data(base, source);
        true
    }

    /// Frame keys are optional; without them the frame follows time.
    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.frames = float_keys(base, source);
        self.cursor.reset();
        true
    }

    fn frame(&mut self, time: f32) -> f32 {
        if let Some(frames) = &self.frames {
            frames.sample_with_cursor(time, &mut self.cursor).unwrap_or(0.0)
        } else if self.delta > 0.0 {
            time / self.delta
        } else {
            0.0
        }
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let TargetRef::Property(key) = base.target else {
            return;
        };

        let frame = self.frame(time);
        if !frame.is_finite() || frame < 0.0 {
            return;
        }
        let Some(Some(texture)) = self.sources.get(frame as usize).copied() else {
            return;
        };

        match scene.properties.get_mut(key) {
            Some(Property::Texturing(texturing)) => {
                texturing.textures[slot_index(self.slot)].source = Some(texture);
            }
            Some(Property::Texture(property)) => property.image = Some(texture),
            None => {}
        }
    }

    #[must_use]
    pub fn sources(&self) -> &[Option<BlockId>] {
        &self.sources
    }
}

/// Which part of a texture slot's transform is animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTransformOp {
    TranslateU,
    TranslateV,
    Rotate,
    TileU,
    TileV,
}

impl TextureTransformOp {
    #[must_use]
    pub fn from_raw(operation: u32) -> Option<Self> {
        match operation {
            0 => Some(Self::TranslateU),
            1 => Some(Self::TranslateV),
            2 => Some(Self::Rotate),
            3 => Some(Self::TileU),
            4 => Some(Self::TileV),
            _ => None,
        }
    }
}

/// Animates one component of a texture slot's transform.
#[derive(Debug, Default)]
pub struct TextureTransformController {
    slot: u32,
    operation: Option<TextureTransformOp>,
    keys: Option<Arc<KeyframeTrack<f32>>>,
    cursor: KeyframeCursor,
}

impl TextureTransformController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, record: &ControllerRecord, source: &ModelSource) -> bool {
        let ControllerParams::TextureTransform {
            texture_slot,
            operation,
        } = &record.params
        else {
            return false;
        };
        self.slot = *texture_slot;
        self.operation = TextureTransformOp::from_raw(*operation);
        if self.operation.is_none() {
            log::trace!("Unknown texture transform operation {operation}");
        }
        self.load_data(base, source)
    }

    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.keys = float_keys(base, source);
        self.cursor.reset();
        self.keys.is_some()
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let TargetRef::Property(key) = base.target else {
            return;
        };
        let Some(operation) = self.operation else {
            return;
        };
        let Some(value) = self
            .keys
            .as_ref()
            .and_then(|keys| keys.sample_with_cursor(time, &mut self.cursor))
        else {
            return;
        };
        let Some(Property::Texturing(texturing)) = scene.properties.get_mut(key) else {
            return;
        };

        let desc = &mut texturing.textures[slot_index(self.slot)];
        match operation {
            TextureTransformOp::TranslateU => desc.translation.x = value,
            TextureTransformOp::TranslateV => desc.translation.y = value,
            TextureTransformOp::Rotate => desc.rotation = value,
            TextureTransformOp::TileU => desc.tiling.x = value,
            TextureTransformOp::TileV => desc.tiling.y = value,
        }
    }
}
