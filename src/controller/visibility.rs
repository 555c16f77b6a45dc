use std::sync::Arc;

use crate::animation::{KeyframeCursor, KeyframeTrack};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::Scene;
use crate::source::ModelSource;

/// Shows or hides a node from boolean keys.
#[derive(Debug, Default)]
pub struct VisibilityController {
    keys: Option<Arc<KeyframeTrack<bool>>>,
    cursor: KeyframeCursor,
}

impl VisibilityController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.load_data(base, source)
    }

    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.keys = base
            .data
            .and_then(|data| source.bool_data(data).ok())
            .map(|data| Arc::clone(&data.keys));
        self.cursor.reset();
        self.keys.is_some()
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let TargetRef::Node(node) = base.target else {
            return;
        };
        let Some(keys) = &self.keys else {
            return;
        };
        let Some(visible) = keys.sample_with_cursor(time, &mut self.cursor) else {
            return;
        };
        if let Some(node) = scene.get_node_mut(node) {
            node.hidden = !visible;
        }
    }
}
