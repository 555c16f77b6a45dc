use glam::Vec2;

use crate::source::BlockId;

/// Number of texture slots of a texturing property.
pub const TEXTURE_SLOTS: usize = 8;

/// One texture slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexDesc {
    /// Bound source texture record.
    pub source: Option<BlockId>,
    pub translation: Vec2,
    pub rotation: f32,
    pub tiling: Vec2,
}

impl Default for TexDesc {
    fn default() -> Self {
        Self {
            source: None,
            translation: Vec2::ZERO,
            rotation: 0.0,
            tiling: Vec2::ONE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TexturingProperty {
    pub textures: [TexDesc; TEXTURE_SLOTS],
}

/// Single-image texture property of older files.
#[derive(Debug, Clone, Default)]
pub struct TextureProperty {
    pub image: Option<BlockId>,
}

/// Render state attached to a node.
#[derive(Debug, Clone)]
pub enum Property {
    Texturing(TexturingProperty),
    Texture(TextureProperty),
}

impl Property {
    /// Type name as written in the file, used by sequences to find it.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Texturing(_) => "NiTexturingProperty",
            Self::Texture(_) => "NiTextureProperty",
        }
    }
}
