//! Keyframe Sampling Tests
//!
//! Tests for:
//! - KeyframeTrack linear/constant/quadratic interpolation
//! - Clamping before the first and after the last key
//! - Interpolatable implementations (f32, bool, Vec2, Vec4, Quat)
//! - KeyframeCursor local scan and binary search fallback
//! - Transform interpolators (linear keys, Euler rotations, compressed spline)

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Quat, Vec2, Vec3, Vec4};

use kinema::animation::{
    Interpolatable, InterpolationMode, Interpolator, KeyframeCursor, KeyframeTrack, TransformChannels,
};
use kinema::scene::Transform;
use kinema::source::{
    BSplineTransformRecord, Block, ModelSource, RotationKeys, SplineChannel, TransformData,
    TransformInterpolatorRecord, version,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn triangle() -> KeyframeTrack<f32> {
    KeyframeTrack::from_keys([(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)], InterpolationMode::Linear)
}

// ============================================================================
// KeyframeTrack: Linear
// ============================================================================

#[test]
fn linear_samples_between_keys() {
    let track = triangle();
    let mut cursor = KeyframeCursor::default();

    assert!(approx(track.sample_with_cursor(0.5, &mut cursor).unwrap(), 0.5));
    assert!(approx(track.sample_with_cursor(1.5, &mut cursor).unwrap(), 0.5));
    assert!(approx(track.sample_with_cursor(1.0, &mut cursor).unwrap(), 1.0));
}

#[test]
fn linear_clamps_outside_the_keys() {
    let track = triangle();
    let mut cursor = KeyframeCursor::default();

    assert!(approx(track.sample_with_cursor(-3.0, &mut cursor).unwrap(), 0.0));
    assert!(approx(track.sample_with_cursor(9.0, &mut cursor).unwrap(), 0.0));

    let rising = KeyframeTrack::from_keys([(1.0, 4.0), (2.0, 8.0)], InterpolationMode::Linear);
    assert!(approx(rising.sample(0.0).unwrap(), 4.0));
    assert!(approx(rising.sample(5.0).unwrap(), 8.0));
}

#[test]
fn empty_track_yields_nothing() {
    let track = KeyframeTrack::<f32>::default();
    let mut cursor = KeyframeCursor::default();

    assert!(track.is_empty());
    assert_eq!(track.sample(0.0), None);
    assert_eq!(track.sample_with_cursor(0.0, &mut cursor), None);
}

#[test]
fn malformed_track_yields_nothing() {
    // Three keys but only two values.
    let track = KeyframeTrack::new(vec![0.0, 1.0, 2.0], vec![0.0_f32, 1.0], InterpolationMode::Linear);
    assert!(track.is_empty());
    assert_eq!(track.sample(0.5), None);
}

#[test]
fn single_key_is_constant() {
    let track = KeyframeTrack::from_keys([(1.0, 7.0_f32)], InterpolationMode::Linear);
    let mut cursor = KeyframeCursor::default();
    for t in [-1.0, 1.0, 10.0] {
        assert!(approx(track.sample_with_cursor(t, &mut cursor).unwrap(), 7.0));
    }
}

// ============================================================================
// KeyframeTrack: Constant & Quadratic
// ============================================================================

#[test]
fn constant_holds_left_key() {
    let track = KeyframeTrack::from_keys([(0.0, 1.0_f32), (1.0, 5.0)], InterpolationMode::Constant);
    assert!(approx(track.sample(0.99).unwrap(), 1.0));
    assert!(approx(track.sample(1.0).unwrap(), 5.0));
}

#[test]
fn quadratic_passes_through_keys() {
    // [in, value, out] per key.
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 2.0, 0.0, 0.0, 6.0, 0.0],
        InterpolationMode::Quadratic,
    );
    assert!(approx(track.sample(0.0).unwrap(), 2.0));
    assert!(approx(track.sample(1.0).unwrap(), 6.0));

    // Flat tangents: smoothstep midpoint.
    assert!(approx(track.sample(0.5).unwrap(), 4.0));
}

#[test]
fn quadratic_uses_tangents() {
    let track = KeyframeTrack::new(
        vec![0.0, 1.0],
        vec![0.0_f32, 0.0, 1.0, 1.0, 1.0, 0.0],
        InterpolationMode::Quadratic,
    );
    // Linear tangents reproduce the straight line.
    assert!(approx(track.sample(0.25).unwrap(), 0.25));
    assert!(approx(track.sample(0.75).unwrap(), 0.75));
}

// ============================================================================
// KeyframeCursor
// ============================================================================

#[test]
fn cursor_follows_forward_playback() {
    let times: Vec<f32> = (0..20).map(|i| i as f32).collect();
    let values: Vec<f32> = times.iter().map(|t| t * 2.0).collect();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);
    let mut cursor = KeyframeCursor::default();

    for step in 0..40 {
        let t = step as f32 * 0.5;
        let v = track.sample_with_cursor(t, &mut cursor).unwrap();
        assert!(approx(v, (t * 2.0).min(38.0)), "t = {t}");
    }
    assert_eq!(cursor.last_index, 19);
}

#[test]
fn cursor_handles_seeks_both_ways() {
    let times: Vec<f32> = (0..100).map(|i| i as f32).collect();
    let values = times.clone();
    let track = KeyframeTrack::new(times, values, InterpolationMode::Linear);
    let mut cursor = KeyframeCursor::default();

    // Large jump forward: binary search.
    assert!(approx(track.sample_with_cursor(80.5, &mut cursor).unwrap(), 80.5));
    assert_eq!(cursor.last_index, 80);

    // Small step back: local scan.
    assert!(approx(track.sample_with_cursor(78.25, &mut cursor).unwrap(), 78.25));
    assert_eq!(cursor.last_index, 78);

    // Loop wrap to the start.
    assert!(approx(track.sample_with_cursor(0.5, &mut cursor).unwrap(), 0.5));
    assert_eq!(cursor.last_index, 0);
}

#[test]
fn cursor_from_longer_track_is_reset() {
    let track = triangle();
    let mut cursor = KeyframeCursor { last_index: 50 };
    assert!(approx(track.sample_with_cursor(0.5, &mut cursor).unwrap(), 0.5));
    assert!(cursor.last_index < 3);
}

// ============================================================================
// Interpolatable
// ============================================================================

#[test]
fn bool_holds_start_value() {
    let track = KeyframeTrack::from_keys([(0.0, true), (1.0, false)], InterpolationMode::Linear);
    assert_eq!(track.sample(0.9), Some(true));
    assert_eq!(track.sample(1.0), Some(false));
}

#[test]
fn vectors_interpolate_componentwise() {
    let v = Vec2::interpolate_linear(Vec2::ZERO, Vec2::new(2.0, 4.0), 0.5);
    assert!((v - Vec2::new(1.0, 2.0)).length() < EPSILON);

    let c = Vec4::interpolate_linear(Vec4::ZERO, Vec4::ONE, 0.25);
    assert!((c - Vec4::splat(0.25)).length() < EPSILON);
}

#[test]
fn quaternion_takes_shortest_path() {
    let a = Quat::from_rotation_z(0.0);
    let b = -Quat::from_rotation_z(FRAC_PI_2);
    let mid = Quat::interpolate_linear(a, b, 0.5);

    assert!(mid.is_normalized());
    let expected = Quat::from_rotation_z(FRAC_PI_2 / 2.0);
    assert!(mid.dot(expected).abs() > 1.0 - 1e-4);
}

// ============================================================================
// Transform interpolators
// ============================================================================

#[test]
fn channels_leave_missing_components_alone() {
    let data = TransformData {
        translations: Arc::new(KeyframeTrack::from_keys(
            [(0.0, Vec3::ZERO), (1.0, Vec3::new(2.0, 0.0, 0.0))],
            InterpolationMode::Linear,
        )),
        ..Default::default()
    };
    let mut channels = TransformChannels::new(&data);
    let mut transform = Transform::new();
    transform.scale = 3.0;
    transform.rotation = Quat::from_rotation_x(1.0);

    channels.apply(&mut transform, 0.5);

    assert!((transform.translation - Vec3::new(1.0, 0.0, 0.0)).length() < EPSILON);
    assert!(approx(transform.scale, 3.0));
    assert!(transform.rotation.dot(Quat::from_rotation_x(1.0)).abs() > 1.0 - EPSILON);
}

#[test]
fn euler_rotation_combines_axes() {
    let z = Arc::new(KeyframeTrack::from_keys(
        [(0.0, 0.0_f32), (1.0, FRAC_PI_2)],
        InterpolationMode::Linear,
    ));
    let data = TransformData {
        rotations: RotationKeys::Euler([Arc::default(), Arc::default(), z]),
        ..Default::default()
    };
    let mut channels = TransformChannels::new(&data);
    let mut transform = Transform::new();

    channels.apply(&mut transform, 1.0);

    let rotated = transform.rotation * Vec3::X;
    assert!((rotated - Vec3::Y).length() < 1e-4);
}

#[test]
fn linear_keys_interpolator_from_source() {
    let mut source = ModelSource::new(version(20, 0, 0, 5));
    let data = source.push(Block::TransformData(TransformData {
        scales: Arc::new(KeyframeTrack::from_keys([(0.0, 1.0), (2.0, 3.0)], InterpolationMode::Linear)),
        ..Default::default()
    }));
    let id = source.push(Block::TransformInterpolator(TransformInterpolatorRecord { data: Some(data) }));

    let mut interpolator = Interpolator::from_block(&source, id).unwrap();
    assert_eq!(interpolator.type_name(), "NiTransformInterpolator");

    let mut transform = Transform::new();
    interpolator.update_transform(&mut transform, 1.0);
    assert!(approx(transform.scale, 2.0));

    // Not an interpolator.
    assert!(Interpolator::from_block(&source, data).is_none());
}

#[test]
fn compressed_spline_reaches_both_ends() {
    let max = i16::MAX;
    // Translation x: 4 points, 3 shorts each. Scale absent.
    let points: Vec<i16> = vec![0, 0, 0, 0, 0, 0, max, 0, 0, max, 0, 0];
    let record = BSplineTransformRecord {
        start_time: 0.0,
        stop_time: 2.0,
        control_points: points.into(),
        num_control_points: 4,
        translation: SplineChannel::new(0, 0.0, 10.0),
        rotation: SplineChannel::absent(),
        scale: SplineChannel::absent(),
    };

    let mut source = ModelSource::new(version(20, 2, 0, 7));
    let id = source.push(Block::BSplineCompTransformInterpolator(record));
    let mut interpolator = Interpolator::from_block(&source, id).unwrap();

    let mut transform = Transform::new();
    transform.scale = 5.0;

    interpolator.update_transform(&mut transform, 0.0);
    assert!(transform.translation.length() < 1e-4);

    interpolator.update_transform(&mut transform, 2.0);
    assert!((transform.translation.x - 10.0).abs() < 1e-3);

    // Past the end clamps to the last point.
    interpolator.update_transform(&mut transform, 8.0);
    assert!((transform.translation.x - 10.0).abs() < 1e-3);

    // Absent channel left alone.
    assert!(approx(transform.scale, 5.0));
}
