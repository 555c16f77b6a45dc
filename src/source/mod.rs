//! Model Data Source
//!
//! Read-only, indexed view of the animation records a scene was built from.
//! Controllers hold [`BlockId`] links into it and re-resolve them on every
//! refresh; nothing here is owned by a controller.
//!
//! # Versioning
//!
//! Some logical fields changed encoding across format revisions (morph
//! weight interpolators, flip texture lists). [`ModelSource::check_version`]
//! is the switch controllers use to pick the right one.

pub mod error;
pub mod records;

pub use error::{Result, SourceError};
pub use records::*;

use std::sync::Arc;

use crate::animation::KeyframeTrack;

/// Index of a record in a [`ModelSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Packs a dotted version number the way file headers store it.
#[must_use]
pub const fn version(major: u8, minor: u8, patch: u8, build: u8) -> u32 {
    ((major as u32) << 24) | ((minor as u32) << 16) | ((patch as u32) << 8) | build as u32
}

/// Every record kind the controllers understand.
#[derive(Debug, Clone)]
pub enum Block {
    Node(NodeRecord),
    Controller(ControllerRecord),
    TransformInterpolator(TransformInterpolatorRecord),
    BSplineCompTransformInterpolator(BSplineTransformRecord),
    FloatInterpolator(ScalarInterpolatorRecord),
    BoolInterpolator(ScalarInterpolatorRecord),
    TransformData(TransformData),
    FloatData(FloatData),
    BoolData(BoolData),
    ColorData(ColorData),
    MorphData(MorphData),
    UvData(UvData),
    SourceTexture(SourceTextureRecord),
    Image(ImageRecord),
    ControllerSequence(SequenceRecord),
    TextKeyExtraData(TextKeyData),
    StringPalette(StringPalette),
    ParticleModifier(ParticleModifierRecord),
}

impl Block {
    /// Type name as written in the file.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Node(_) => "NiNode",
            Self::Controller(c) => c.params.kind().type_name(),
            Self::TransformInterpolator(_) => "NiTransformInterpolator",
            Self::BSplineCompTransformInterpolator(_) => "NiBSplineCompTransformInterpolator",
            Self::FloatInterpolator(_) => "NiFloatInterpolator",
            Self::BoolInterpolator(_) => "NiBoolInterpolator",
            Self::TransformData(_) => "NiTransformData",
            Self::FloatData(_) => "NiFloatData",
            Self::BoolData(_) => "NiBoolData",
            Self::ColorData(_) => "NiColorData",
            Self::MorphData(_) => "NiMorphData",
            Self::UvData(_) => "NiUVData",
            Self::SourceTexture(_) => "NiSourceTexture",
            Self::Image(_) => "NiImage",
            Self::ControllerSequence(_) => "NiControllerSequence",
            Self::TextKeyExtraData(_) => "NiTextKeyExtraData",
            Self::StringPalette(_) => "NiStringPalette",
            Self::ParticleModifier(m) => match m.modifier {
                ParticleModifier::GrowFade { .. } => "NiParticleGrowFade",
                ParticleModifier::Color { .. } => "NiParticleColorModifier",
                ParticleModifier::Gravity { .. } => "NiGravity",
                ParticleModifier::Other => "NiParticleModifier",
            },
        }
    }
}

macro_rules! block_accessor {
    ($(#[$meta:meta])* $name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        $(#[$meta])*
        pub fn $name(&self, id: BlockId) -> Result<&$ty> {
            match self.block(id)? {
                Block::$variant(record) => Ok(record),
                other => Err(SourceError::KindMismatch {
                    id,
                    expected: $expected,
                    found: other.type_name(),
                }),
            }
        }
    };
}

/// The record store.
#[derive(Debug, Clone, Default)]
pub struct ModelSource {
    version: u32,
    blocks: Vec<Block>,
}

impl ModelSource {
    #[must_use]
    pub fn new(version: u32) -> Self {
        Self {
            version,
            blocks: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// True if `since <= version <= until`; a bound of 0 is open.
    #[must_use]
    pub fn check_version(&self, since: u32, until: u32) -> bool {
        (since == 0 || self.version >= since) && (until == 0 || self.version <= until)
    }

    pub fn push(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    /// Overwrites a record in place, as an editor would. Controllers see the
    /// change on their next refresh.
    pub fn replace(&mut self, id: BlockId, block: Block) -> Result<()> {
        let slot = self
            .blocks
            .get_mut(id.index())
            .ok_or(SourceError::MissingBlock(id))?;
        *slot = block;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(id.index()).ok_or(SourceError::MissingBlock(id))
    }

    /// Dereferences an optional link field.
    pub fn link(&self, link: Option<BlockId>, field: &'static str) -> Result<BlockId> {
        let id = link.ok_or(SourceError::NullLink(field))?;
        self.block(id)?;
        Ok(id)
    }

    block_accessor!(node, Node, NodeRecord, "NiNode");
    block_accessor!(controller, Controller, ControllerRecord, "NiTimeController");
    block_accessor!(float_data, FloatData, FloatData, "NiFloatData");
    block_accessor!(bool_data, BoolData, BoolData, "NiBoolData");
    block_accessor!(color_data, ColorData, ColorData, "NiColorData");
    block_accessor!(transform_data, TransformData, TransformData, "NiTransformData");
    block_accessor!(morph_data, MorphData, MorphData, "NiMorphData");
    block_accessor!(uv_data, UvData, UvData, "NiUVData");
    block_accessor!(sequence, ControllerSequence, SequenceRecord, "NiControllerSequence");
    block_accessor!(text_keys, TextKeyExtraData, TextKeyData, "NiTextKeyExtraData");
    block_accessor!(string_palette, StringPalette, StringPalette, "NiStringPalette");
    block_accessor!(
        particle_modifier,
        ParticleModifier,
        ParticleModifierRecord,
        "NiParticleModifier"
    );

    /// Data link of any interpolator that has one.
    pub fn interpolator_data(&self, id: BlockId) -> Result<Option<BlockId>> {
        match self.block(id)? {
            Block::TransformInterpolator(record) => Ok(record.data),
            Block::FloatInterpolator(record) | Block::BoolInterpolator(record) => Ok(record.data),
            Block::BSplineCompTransformInterpolator(_) => Ok(None),
            other => Err(SourceError::KindMismatch {
                id,
                expected: "NiInterpolator",
                found: other.type_name(),
            }),
        }
    }

    /// Follows float interpolator -> float data -> keys.
    pub fn float_interpolator_keys(&self, id: BlockId) -> Result<Arc<KeyframeTrack<f32>>> {
        let data = match self.block(id)? {
            Block::FloatInterpolator(record) => record.data,
            other => {
                return Err(SourceError::KindMismatch {
                    id,
                    expected: "NiFloatInterpolator",
                    found: other.type_name(),
                });
            }
        };
        let data = self.link(data, "Data")?;
        Ok(Arc::clone(&self.float_data(data)?.keys))
    }

    /// True if the block exists and is of the named kind.
    #[must_use]
    pub fn is_block(&self, id: BlockId, type_name: &str) -> bool {
        self.block(id).is_ok_and(|block| block.type_name() == type_name)
    }
}
