use std::sync::Arc;

use glam::Vec3;

use crate::animation::{KeyframeCursor, KeyframeTrack};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::Scene;
use crate::source::{BlockId, ControllerParams, ControllerRecord, ModelSource, version};

/// Last version whose morph weights come from plain interpolator links.
const LAST_INTERPOLATOR_LINKS: u32 = version(20, 0, 0, 5);
/// First version using interpolator/weight pairs.
const FIRST_INTERPOLATOR_WEIGHTS: u32 = version(20, 1, 0, 3);

/// One blend shape. Key 0 is the base pose.
#[derive(Debug, Clone)]
pub struct MorphKey {
    weights: Option<Arc<KeyframeTrack<f32>>>,
    verts: Arc<[Vec3]>,
    cursor: KeyframeCursor,
}

impl MorphKey {
    #[must_use]
    pub fn verts(&self) -> &[Vec3] {
        &self.verts
    }

    #[must_use]
    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }
}

/// Blends morph targets into a mesh's vertices.
#[derive(Debug, Default)]
pub struct MorphController {
    keys: Vec<MorphKey>,
    /// Per-morph weight interpolator links from the record.
    links: Vec<Option<BlockId>>,
}

impl MorphController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, record: &ControllerRecord, source: &ModelSource) -> bool {
        let ControllerParams::GeomMorpher {
            interpolators,
            interpolator_weights,
        } = &record.params
        else {
            return false;
        };

        self.links = if source.check_version(0, LAST_INTERPOLATOR_LINKS) {
            interpolators.clone()
        } else if source.check_version(FIRST_INTERPOLATOR_WEIGHTS, 0) {
            interpolator_weights.iter().map(|entry| entry.interpolator).collect()
        } else {
            Vec::new()
        };

        self.load_data(base, source)
    }

    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.keys.clear();

        let Some(data) = base.data.and_then(|data| source.morph_data(data).ok()) else {
            return false;
        };

        for (index, morph) in data.morphs.iter().enumerate() {
            let weights = match self.links.get(index).copied().flatten() {
                Some(link) => match source.float_interpolator_keys(link) {
                    Ok(keys) => Some(keys),
                    Err(err) => {
                        log::trace!("Morph {index} weight link unresolved: {err}");
                        None
                    }
                },
                None => Some(Arc::clone(&morph.keys)),
            };

            self.keys.push(MorphKey {
                weights,
                verts: Arc::clone(&morph.vectors),
                cursor: KeyframeCursor::default(),
            });
        }

        true
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let TargetRef::Mesh(mesh) = base.target else {
            return;
        };
        let Some(mesh) = scene.meshes.get_mut(mesh) else {
            return;
        };
        let Some((base_pose, morphs)) = self.keys.split_first_mut() else {
            return;
        };
        if morphs.is_empty() || base_pose.verts.len() != mesh.verts.len() {
            return;
        }

        mesh.verts.copy_from_slice(&base_pose.verts);

        for key in morphs {
            let Some(weights) = &key.weights else {
                continue;
            };
            let Some(weight) = weights.sample_with_cursor(time, &mut key.cursor) else {
                continue;
            };
            let weight = weight.clamp(0.0, 1.0);
            if weight == 0.0 || key.verts.len() != mesh.verts.len() {
                continue;
            }
            for (vert, delta) in mesh.verts.iter_mut().zip(key.verts.iter()) {
                *vert += *delta * weight;
            }
        }

        mesh.update_bounds = true;
    }

    #[must_use]
    pub fn keys(&self) -> &[MorphKey] {
        &self.keys
    }
}
