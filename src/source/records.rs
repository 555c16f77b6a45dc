//! Record types exposed by the model data source.
//!
//! Every record is plain data. Track payloads are wrapped in [`Arc`] so
//! controllers can keep a snapshot of what they bound without copying keys.

use std::sync::Arc;

use glam::{Quat, Vec3, Vec4};

use crate::animation::KeyframeTrack;
use crate::controller::{ControllerFlags, ControllerKind, EmitFlags, LoopMode};
use crate::source::BlockId;

// ============================================================================
// Scene nodes
// ============================================================================

/// An object in the scene graph that controllers may reference by link.
#[derive(Debug, Clone, Default)]
pub struct NodeRecord {
    pub name: String,
}

// ============================================================================
// Controllers
// ============================================================================

/// Fields shared by every controller record.
#[derive(Debug, Clone)]
pub struct ControllerRecord {
    /// Raw [`ControllerFlags`] word.
    pub flags: u16,
    pub frequency: f32,
    pub phase: f32,
    pub start_time: f32,
    pub stop_time: f32,
    /// Direct data link (older files).
    pub data: Option<BlockId>,
    /// Interpolator link (newer files); its data link stands in for `data`.
    pub interpolator: Option<BlockId>,
    /// Identifiers a sequence uses to tell controllers of the same kind apart.
    pub variable1: String,
    pub variable2: String,
    pub params: ControllerParams,
}

impl ControllerRecord {
    /// Active, clamped, `[0, 0]` window at frequency 1.
    #[must_use]
    pub fn new(params: ControllerParams) -> Self {
        Self {
            flags: (ControllerFlags::ACTIVE | LoopMode::Once.to_flags()).bits(),
            frequency: 1.0,
            phase: 0.0,
            start_time: 0.0,
            stop_time: 0.0,
            data: None,
            interpolator: None,
            variable1: String::new(),
            variable2: String::new(),
            params,
        }
    }

    #[must_use]
    pub fn with_window(mut self, start: f32, stop: f32) -> Self {
        self.start_time = start;
        self.stop_time = stop;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ControllerFlags) -> Self {
        self.flags = flags.bits();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: BlockId) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_interpolator(mut self, interpolator: BlockId) -> Self {
        self.interpolator = Some(interpolator);
        self
    }
}

/// Kind-specific controller fields.
#[derive(Debug, Clone)]
pub enum ControllerParams {
    Transform,
    Keyframe,
    MultiTargetTransform {
        extra_targets: Vec<Option<BlockId>>,
    },
    Visibility,
    GeomMorpher {
        /// Per-morph float interpolators, files up to 20.0.0.5.
        interpolators: Vec<Option<BlockId>>,
        /// Per-morph interpolator/weight pairs, files from 20.1.0.3.
        interpolator_weights: Vec<InterpolatorWeight>,
    },
    Uv,
    Flip {
        texture_slot: u32,
        delta: f32,
        /// Source textures, files from 4.0.0.0.
        sources: Vec<Option<BlockId>>,
        /// Raw images, older files.
        images: Vec<Option<BlockId>>,
    },
    TextureTransform {
        texture_slot: u32,
        operation: u32,
    },
    ParticleSystem(Box<ParticleSystemRecord>),
    Manager {
        sequences: Vec<Option<BlockId>>,
    },
}

impl ControllerParams {
    #[must_use]
    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::Transform => ControllerKind::Transform,
            Self::Keyframe => ControllerKind::Keyframe,
            Self::MultiTargetTransform { .. } => ControllerKind::MultiTargetTransform,
            Self::Visibility => ControllerKind::Visibility,
            Self::GeomMorpher { .. } => ControllerKind::Morph,
            Self::Uv => ControllerKind::Uv,
            Self::Flip { .. } => ControllerKind::TextureFlip,
            Self::TextureTransform { .. } => ControllerKind::TextureTransform,
            Self::ParticleSystem(_) => ControllerKind::ParticleSystem,
            Self::Manager { .. } => ControllerKind::Manager,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolatorWeight {
    pub interpolator: Option<BlockId>,
    pub weight: f32,
}

// ============================================================================
// Interpolators
// ============================================================================

/// Interpolator that reads linear TRS key tracks from a transform data block.
#[derive(Debug, Clone, Default)]
pub struct TransformInterpolatorRecord {
    pub data: Option<BlockId>,
}

/// Float or bool interpolator: a thin indirection to a data block.
#[derive(Debug, Clone, Default)]
pub struct ScalarInterpolatorRecord {
    pub data: Option<BlockId>,
}

/// One channel of a compressed spline: where its control points start and
/// how to decompress them.
#[derive(Debug, Clone, Copy)]
pub struct SplineChannel {
    /// Index of the first short of this channel; `0xFFFF` means absent.
    pub handle: u32,
    pub offset: f32,
    pub half_range: f32,
}

impl SplineChannel {
    pub const ABSENT: u32 = 0xFFFF;

    #[must_use]
    pub fn absent() -> Self {
        Self {
            handle: Self::ABSENT,
            offset: 0.0,
            half_range: 0.0,
        }
    }

    #[must_use]
    pub fn new(handle: u32, offset: f32, half_range: f32) -> Self {
        Self {
            handle,
            offset,
            half_range,
        }
    }
}

impl Default for SplineChannel {
    fn default() -> Self {
        Self::absent()
    }
}

/// Compressed cubic B-spline transform interpolator.
#[derive(Debug, Clone)]
pub struct BSplineTransformRecord {
    pub start_time: f32,
    pub stop_time: f32,
    /// Quantized control points shared by all channels.
    pub control_points: Arc<[i16]>,
    pub num_control_points: u32,
    pub translation: SplineChannel,
    /// Control points stored `w, x, y, z`.
    pub rotation: SplineChannel,
    pub scale: SplineChannel,
}

// ============================================================================
// Key data
// ============================================================================

/// Rotation keys: quaternions, or three independent Euler angle tracks.
#[derive(Debug, Clone)]
pub enum RotationKeys {
    Quaternion(Arc<KeyframeTrack<Quat>>),
    Euler([Arc<KeyframeTrack<f32>>; 3]),
}

impl Default for RotationKeys {
    fn default() -> Self {
        Self::Quaternion(Arc::default())
    }
}

/// Rotation, translation and scale tracks.
#[derive(Debug, Clone, Default)]
pub struct TransformData {
    pub rotations: RotationKeys,
    pub translations: Arc<KeyframeTrack<Vec3>>,
    pub scales: Arc<KeyframeTrack<f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct FloatData {
    pub keys: Arc<KeyframeTrack<f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct BoolData {
    pub keys: Arc<KeyframeTrack<bool>>,
}

#[derive(Debug, Clone, Default)]
pub struct ColorData {
    pub keys: Arc<KeyframeTrack<Vec4>>,
}

/// One blend shape: weight keys plus per-vertex displacement.
#[derive(Debug, Clone, Default)]
pub struct Morph {
    pub keys: Arc<KeyframeTrack<f32>>,
    pub vectors: Arc<[Vec3]>,
}

/// Morph 0 is the base pose; the rest are weighted deltas.
#[derive(Debug, Clone, Default)]
pub struct MorphData {
    pub morphs: Vec<Morph>,
}

/// U translation, V translation, U scale, V scale.
#[derive(Debug, Clone, Default)]
pub struct UvData {
    pub groups: Vec<Arc<KeyframeTrack<f32>>>,
}

// ============================================================================
// Textures
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SourceTextureRecord {
    pub file_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImageRecord {
    pub file_name: String,
}

// ============================================================================
// Sequences
// ============================================================================

/// A string stored either inline or as an offset into the sequence's
/// string palette. Both forms name the same logical value.
#[derive(Debug, Clone, Default)]
pub struct PaletteString {
    pub value: Option<String>,
    pub offset: Option<u32>,
}

impl PaletteString {
    #[must_use]
    pub fn direct(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            offset: None,
        }
    }

    #[must_use]
    pub fn at_offset(offset: u32) -> Self {
        Self {
            value: None,
            offset: Some(offset),
        }
    }

    /// Inline value if non-empty, otherwise the palette entry.
    #[must_use]
    pub fn resolve<'a>(&'a self, palette: Option<&'a StringPalette>) -> &'a str {
        match self.value.as_deref() {
            Some(value) if !value.is_empty() => value,
            _ => self
                .offset
                .zip(palette)
                .and_then(|(offset, palette)| palette.string_at(offset))
                .unwrap_or(""),
        }
    }
}

/// NUL-separated string table.
#[derive(Debug, Clone, Default)]
pub struct StringPalette {
    pub palette: String,
}

impl StringPalette {
    pub const NO_OFFSET: u32 = u32::MAX;

    /// Builds a palette and the offset of each string in it.
    #[must_use]
    pub fn build<'a>(strings: impl IntoIterator<Item = &'a str>) -> (Self, Vec<u32>) {
        let mut palette = String::new();
        let mut offsets = Vec::new();
        for s in strings {
            offsets.push(palette.len() as u32);
            palette.push_str(s);
            palette.push('\0');
        }
        (Self { palette }, offsets)
    }

    #[must_use]
    pub fn string_at(&self, offset: u32) -> Option<&str> {
        if offset == Self::NO_OFFSET {
            return None;
        }
        let tail = self.palette.get(offset as usize..)?;
        Some(tail.split('\0').next().unwrap_or(tail))
    }
}

/// One channel binding of a sequence.
#[derive(Debug, Clone, Default)]
pub struct ControlledBlock {
    pub interpolator: Option<BlockId>,
    pub node_name: PaletteString,
    pub property_type: PaletteString,
    pub controller_type: PaletteString,
    pub variable1: PaletteString,
    pub variable2: PaletteString,
}

#[derive(Debug, Clone)]
pub struct TextKey {
    pub time: f32,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextKeyData {
    pub keys: Vec<TextKey>,
}

/// A named animation clip.
#[derive(Debug, Clone, Default)]
pub struct SequenceRecord {
    pub name: String,
    pub text_keys: Option<BlockId>,
    pub start_time: f32,
    pub stop_time: f32,
    pub phase: f32,
    pub frequency: f32,
    pub string_palette: Option<BlockId>,
    pub controlled_blocks: Vec<ControlledBlock>,
}

// ============================================================================
// Particles
// ============================================================================

/// A particle saved in the file, shown on first display.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleRecord {
    pub velocity: Vec3,
    pub lifetime: f32,
    pub lifespan: f32,
    pub timestamp: f32,
    pub vertex_id: u32,
}

#[derive(Debug, Clone)]
pub struct ParticleSystemRecord {
    pub emitter: Option<BlockId>,
    pub emit_start_time: f32,
    pub emit_stop_time: f32,
    pub emit_rate: f32,
    /// Half extents of the emission box.
    pub start_random: Vec3,
    pub speed: f32,
    pub speed_random: f32,
    pub lifetime: f32,
    pub lifetime_random: f32,
    pub vertical_direction: f32,
    pub vertical_angle: f32,
    pub horizontal_direction: f32,
    pub horizontal_angle: f32,
    pub size: f32,
    /// Pool size (`emitMax`).
    pub num_particles: u32,
    pub num_valid: u32,
    pub particles: Vec<ParticleRecord>,
    /// Raw [`EmitFlags`] word.
    pub emit_flags: u16,
    /// First modifier of the chain.
    pub particle_extra: Option<BlockId>,
}

impl Default for ParticleSystemRecord {
    fn default() -> Self {
        Self {
            emitter: None,
            emit_start_time: 0.0,
            emit_stop_time: 0.0,
            emit_rate: 0.0,
            start_random: Vec3::ZERO,
            speed: 0.0,
            speed_random: 0.0,
            lifetime: 1.0,
            lifetime_random: 0.0,
            vertical_direction: 0.0,
            vertical_angle: 0.0,
            horizontal_direction: 0.0,
            horizontal_angle: 0.0,
            size: 1.0,
            num_particles: 0,
            num_valid: 0,
            particles: Vec::new(),
            emit_flags: EmitFlags::FIXED_RATE.bits(),
            particle_extra: None,
        }
    }
}

/// A link in a particle system's modifier chain.
#[derive(Debug, Clone)]
pub struct ParticleModifierRecord {
    pub next: Option<BlockId>,
    pub modifier: ParticleModifier,
}

#[derive(Debug, Clone)]
pub enum ParticleModifier {
    GrowFade {
        grow: f32,
        fade: f32,
    },
    Color {
        color_data: Option<BlockId>,
    },
    Gravity {
        force: f32,
        /// 0 = planar, 1 = point.
        kind: u32,
        position: Vec3,
        direction: Vec3,
    },
    /// Any modifier this system does not simulate.
    Other,
}
