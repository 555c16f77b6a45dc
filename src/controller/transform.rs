use crate::animation::{Interpolator, TransformChannels};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::{NodeHandle, Scene};
use crate::source::{BlockId, ControllerParams, ControllerRecord, ModelSource};

fn target_node(base: &ControllerBase) -> Option<NodeHandle> {
    match base.target {
        TargetRef::Node(node) => Some(node),
        _ => None,
    }
}

/// Drives a node's transform through an interpolator.
#[derive(Debug, Default)]
pub struct TransformController {
    interpolator: Option<Interpolator>,
}

impl TransformController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        if let Some(interpolator) = base.interpolator {
            self.bind_interpolator(interpolator, source);
        }
        true
    }

    /// Replaces the interpolator. An unsupported record leaves the
    /// controller without one.
    pub(crate) fn bind_interpolator(&mut self, interpolator: BlockId, source: &ModelSource) -> bool {
        self.interpolator.take();
        self.interpolator = Interpolator::from_block(source, interpolator);
        self.interpolator.is_some()
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let Some(interpolator) = &mut self.interpolator else {
            return;
        };
        if let Some(node) = target_node(base).and_then(|node| scene.get_node_mut(node)) {
            interpolator.update_transform(&mut node.transform, time);
        }
    }

    #[must_use]
    pub fn interpolator(&self) -> Option<&Interpolator> {
        self.interpolator.as_ref()
    }
}

/// Older transform controller reading key data directly.
#[derive(Debug, Default)]
pub struct KeyframeController {
    channels: Option<TransformChannels>,
}

impl KeyframeController {
    pub(crate) fn refresh(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.load_data(base, source)
    }

    pub(crate) fn load_data(&mut self, base: &ControllerBase, source: &ModelSource) -> bool {
        self.channels = base
            .data
            .and_then(|data| source.transform_data(data).ok())
            .map(TransformChannels::new);
        self.channels.is_some()
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, time: f32, scene: &mut Scene) {
        let Some(channels) = &mut self.channels else {
            return;
        };
        if let Some(node) = target_node(base).and_then(|node| scene.get_node_mut(node)) {
            channels.apply(&mut node.transform, time);
        }
    }
}

/// One node driven by a multi-target controller.
#[derive(Debug)]
pub struct TransformTarget {
    pub node: NodeHandle,
    interpolator: Option<Interpolator>,
}

impl TransformTarget {
    #[must_use]
    pub fn has_interpolator(&self) -> bool {
        self.interpolator.is_some()
    }
}

/// Fans one time value out to several nodes, each with its own
/// interpolator. The list of nodes comes from the record; interpolators are
/// bound later by sequence activation.
#[derive(Debug, Default)]
pub struct MultiTargetTransformController {
    targets: Vec<TransformTarget>,
}

impl MultiTargetTransformController {
    pub(crate) fn refresh(&mut self, record: &ControllerRecord, source: &ModelSource, scene: &Scene) -> bool {
        let ControllerParams::MultiTargetTransform { extra_targets } = &record.params else {
            return false;
        };

        self.targets.clear();
        for link in extra_targets {
            let Some(block) = *link else {
                continue;
            };
            if !source.is_block(block, "NiNode") {
                log::trace!("Extra target {block:?} is not a node, skipped");
                continue;
            }
            match scene.node_for_block(block) {
                Some(node) => self.targets.push(TransformTarget {
                    node,
                    interpolator: None,
                }),
                None => log::trace!("Extra target {block:?} has no node in the scene"),
            }
        }
        true
    }

    /// Sets the interpolator of the entry for `node`. Returns `false` if the
    /// node is not a target of this controller or the record is missing.
    pub fn bind_target(&mut self, node: NodeHandle, interpolator: BlockId, source: &ModelSource) -> bool {
        if source.block(interpolator).is_err() {
            return false;
        }
        let Some(target) = self.targets.iter_mut().find(|target| target.node == node) else {
            return false;
        };
        target.interpolator.take();
        target.interpolator = Interpolator::from_block(source, interpolator);
        true
    }

    pub(crate) fn update(&mut self, time: f32, scene: &mut Scene) {
        for target in &mut self.targets {
            let Some(interpolator) = &mut target.interpolator else {
                continue;
            };
            if let Some(node) = scene.get_node_mut(target.node) {
                interpolator.update_transform(&mut node.transform, time);
            }
        }
    }

    #[must_use]
    pub fn targets(&self) -> &[TransformTarget] {
        &self.targets
    }
}
