use std::sync::Arc;

use glam::Vec2;
use smallvec::SmallVec;

use crate::animation::{KeyframeCursor, KeyframeTrack};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::Scene;
use crate::source::ModelSource;

/// U translate, V translate, U scale, V scale.
const DEFAULTS: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

#[derive(Debug, Clone)]
struct UvGroup {
    keys: Arc<KeyframeTrack<f32>>,
    cursor: KeyframeCursor,
}

/// Scrolls and scales UV channel 0 of a mesh.
///
/// The transform is applied to a snapshot of the coordinates taken on the
/// first update after (re)loading, so repeated updates never compound.
#[derive(Debug, Default)]
pub struct UvController {
    groups: SmallVec<[UvGroup; 4]>,
    resolved: bool,
    rest: Option<Vec<Vec2>>,
}

impl UvController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.load_data(base, source)
    }

    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.groups.clear();
        self.rest = None;
        let data = base.data.and_then(|data| source.uv_data(data).ok());
        self.resolved = data.is_some();

        if let Some(data) = data {
            self.groups.extend(data.groups.iter().take(DEFAULTS.len()).map(|keys| UvGroup {
                keys: Arc::clone(keys),
                cursor: KeyframeCursor::default(),
            }));
        }
        self.resolved
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let TargetRef::Mesh(mesh) = base.target else {
            return;
        };
        if !self.resolved {
            return;
        }
        let Some(mesh) = scene.meshes.get_mut(mesh) else {
            return;
        };
        let Some(coords) = mesh.coords.first_mut() else {
            return;
        };

        let mut values = DEFAULTS;
        for (group, value) in self.groups.iter_mut().zip(values.iter_mut()) {
            if let Some(sampled) = group.keys.sample_with_cursor(time, &mut group.cursor) {
                *value = sampled;
            }
        }
        let [tu, tv, su, sv] = values;

        if self.rest.as_ref().is_none_or(|rest| rest.len() != coords.len()) {
            self.rest = Some(coords.clone());
        }
        let Some(rest) = &self.rest else {
            return;
        };

        let center = Vec2::splat(0.5);
        let scale = Vec2::new(su, sv);
        let offset = Vec2::new(-tu, tv);
        for (uv, rest) in coords.iter_mut().zip(rest.iter()) {
            *uv = (*rest - center) * scale + offset + center;
        }

        mesh.update_data = true;
    }
}
