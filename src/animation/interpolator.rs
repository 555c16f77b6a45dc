use std::sync::Arc;

use glam::{EulerRot, Quat, Vec3};

use crate::animation::bspline;
use crate::animation::tracks::{KeyframeCursor, KeyframeTrack};
use crate::scene::Transform;
use crate::source::{BSplineTransformRecord, Block, BlockId, ModelSource, RotationKeys, SplineChannel, TransformData};

/// Rotation, translation and scale tracks with one cursor per track.
///
/// Channels without keys leave the matching transform component untouched.
#[derive(Debug, Clone, Default)]
pub struct TransformChannels {
    rotations: RotationKeys,
    translations: Arc<KeyframeTrack<Vec3>>,
    scales: Arc<KeyframeTrack<f32>>,

    rotation_cursors: [KeyframeCursor; 3],
    translation_cursor: KeyframeCursor,
    scale_cursor: KeyframeCursor,
}

impl TransformChannels {
    #[must_use]
    pub fn new(data: &TransformData) -> Self {
        Self {
            rotations: data.rotations.clone(),
            translations: Arc::clone(&data.translations),
            scales: Arc::clone(&data.scales),
            ..Default::default()
        }
    }

    pub fn apply(&mut self, transform: &mut Transform, time: f32) {
        match &self.rotations {
            RotationKeys::Quaternion(track) => {
                if let Some(rotation) = track.sample_with_cursor(time, &mut self.rotation_cursors[0]) {
                    transform.rotation = rotation;
                }
            }
            RotationKeys::Euler(axes) => {
                let mut angles = [0.0f32; 3];
                let mut any = false;
                for ((track, cursor), angle) in axes.iter().zip(&mut self.rotation_cursors).zip(&mut angles) {
                    if let Some(value) = track.sample_with_cursor(time, cursor) {
                        *angle = value;
                        any = true;
                    }
                }
                if any {
                    transform.rotation = Quat::from_euler(EulerRot::XYZ, angles[0], angles[1], angles[2]);
                }
            }
        }

        if let Some(translation) = self.translations.sample_with_cursor(time, &mut self.translation_cursor) {
            transform.translation = translation;
        }

        if let Some(scale) = self.scales.sample_with_cursor(time, &mut self.scale_cursor) {
            transform.scale = scale;
        }
    }
}

/// Compressed B-spline transform channels.
#[derive(Debug, Clone)]
pub struct BSplineTransformInterpolator {
    record: BSplineTransformRecord,
}

impl BSplineTransformInterpolator {
    #[must_use]
    pub fn new(record: BSplineTransformRecord) -> Self {
        Self { record }
    }

    fn channel<const N: usize>(&self, channel: &SplineChannel, u: f32) -> Option<[f32; N]> {
        if channel.handle == SplineChannel::ABSENT {
            return None;
        }
        bspline::evaluate::<N>(
            &self.record.control_points,
            channel.handle,
            self.record.num_control_points as usize,
            u,
            channel.offset,
            channel.half_range,
        )
    }

    /// Spline parameter for `time`, clamped to the curve's domain.
    fn parameter(&self, time: f32) -> f32 {
        let n = self.record.num_control_points as usize;
        let span = self.record.stop_time - self.record.start_time;
        if n <= bspline::DEGREE || span <= 0.0 {
            return 0.0;
        }
        let domain = (n - bspline::DEGREE) as f32;
        ((time - self.record.start_time) / span * domain).clamp(0.0, domain)
    }

    pub fn update_transform(&self, transform: &mut Transform, time: f32) {
        let u = self.parameter(time);

        if let Some([w, x, y, z]) = self.channel::<4>(&self.record.rotation, u) {
            let rotation = Quat::from_xyzw(x, y, z, w);
            if rotation.length_squared() > f32::EPSILON {
                transform.rotation = rotation.normalize();
            }
        }

        if let Some(translation) = self.channel::<3>(&self.record.translation, u) {
            transform.translation = Vec3::from_array(translation);
        }

        if let Some([scale]) = self.channel::<1>(&self.record.scale, u) {
            transform.scale = scale;
        }
    }
}

/// Linear keys interpolator: reads a transform data block through a cursor
/// per channel.
#[derive(Debug, Clone, Default)]
pub struct TransformKeysInterpolator {
    channels: TransformChannels,
}

impl TransformKeysInterpolator {
    /// A missing data link yields an interpolator with no keys.
    #[must_use]
    pub fn new(source: &ModelSource, data: Option<BlockId>) -> Self {
        let channels = data
            .and_then(|data| source.transform_data(data).ok())
            .map(TransformChannels::new)
            .unwrap_or_default();
        Self { channels }
    }

    pub fn update_transform(&mut self, transform: &mut Transform, time: f32) {
        self.channels.apply(transform, time);
    }
}

/// A transform interpolator of one of the supported kinds.
#[derive(Debug, Clone)]
pub enum Interpolator {
    LinearKeys(TransformKeysInterpolator),
    CompressedSpline(BSplineTransformInterpolator),
}

impl Interpolator {
    /// Builds the interpolator for the record at `id`. Records of any other
    /// kind yield `None`.
    #[must_use]
    pub fn from_block(source: &ModelSource, id: BlockId) -> Option<Self> {
        match source.block(id).ok()? {
            Block::TransformInterpolator(record) => {
                Some(Self::LinearKeys(TransformKeysInterpolator::new(source, record.data)))
            }
            Block::BSplineCompTransformInterpolator(record) => {
                Some(Self::CompressedSpline(BSplineTransformInterpolator::new(record.clone())))
            }
            other => {
                log::trace!("{id:?} is a {}, not a transform interpolator", other.type_name());
                None
            }
        }
    }

    pub fn update_transform(&mut self, transform: &mut Transform, time: f32) {
        match self {
            Self::LinearKeys(interpolator) => interpolator.update_transform(transform, time),
            Self::CompressedSpline(interpolator) => interpolator.update_transform(transform, time),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LinearKeys(_) => "NiTransformInterpolator",
            Self::CompressedSpline(_) => "NiBSplineCompTransformInterpolator",
        }
    }
}
