//! Controller Manager
//!
//! Owns the named sequences of a node subtree. Refresh registers the
//! sequence names and text keys with the scene; activation retargets each
//! sequence channel onto the controller it names.

use crate::controller::{ControllerKind, TargetRef};
use crate::scene::{ControllerKey, Scene};
use crate::source::{BlockId, ControllerParams, ControllerRecord, ModelSource, SequenceRecord};

#[derive(Debug, Default)]
pub struct ControllerManager {
    sequences: Vec<BlockId>,
}

impl ControllerManager {
    pub(crate) fn refresh(&mut self, record: &ControllerRecord, source: &ModelSource, scene: &mut Scene) -> bool {
        let ControllerParams::Manager { sequences } = &record.params else {
            return false;
        };

        self.sequences.clear();
        for link in sequences.iter().flatten() {
            let Ok(sequence) = source.sequence(*link) else {
                log::trace!("Sequence link {link:?} unresolved");
                continue;
            };
            self.sequences.push(*link);

            let text_keys = sequence
                .text_keys
                .and_then(|keys| source.text_keys(keys).ok())
                .map(|data| data.keys.as_slice())
                .unwrap_or_default();
            let tags = text_keys.iter().map(|key| (key.value.as_str(), key.time));
            if scene.register_sequence(&sequence.name, tags) {
                log::debug!("Registered sequence '{}'", sequence.name);
            }
        }
        true
    }

    /// Sequence records in link order.
    #[must_use]
    pub fn sequences(&self) -> &[BlockId] {
        &self.sequences
    }

    fn find_sequence<'s>(&self, source: &'s ModelSource, name: &str) -> Option<&'s SequenceRecord> {
        self.sequences
            .iter()
            .filter_map(|id| source.sequence(*id).ok())
            .find(|sequence| sequence.name == name)
    }
}

/// Binds sequence `name` of the manager controller `manager`.
///
/// Returns the number of channels bound. Channels whose node or controller
/// is missing are skipped.
pub fn activate_sequence(scene: &mut Scene, source: &ModelSource, manager: ControllerKey, name: &str) -> usize {
    let Some(controller) = scene.controllers.get(manager) else {
        return 0;
    };
    let Some(state) = controller.as_manager() else {
        log::warn!("{:?} is not a controller manager", controller.base().block());
        return 0;
    };
    let TargetRef::Node(root) = controller.target() else {
        return 0;
    };
    let Some(sequence) = state.find_sequence(source, name) else {
        log::debug!("Unknown sequence '{name}'");
        return 0;
    };

    let palette = sequence
        .string_palette
        .and_then(|palette| source.string_palette(palette).ok());
    let multi_target = scene.find_controller_of_kind(root, ControllerKind::MultiTargetTransform);
    let (start, stop, phase, frequency) = (
        sequence.start_time,
        sequence.stop_time,
        sequence.phase,
        sequence.frequency,
    );

    let mut bound = 0;
    for channel in &sequence.controlled_blocks {
        let node_name = channel.node_name.resolve(palette);
        let property_type = channel.property_type.resolve(palette);
        let controller_type = channel.controller_type.resolve(palette);
        let variable1 = channel.variable1.resolve(palette);
        let variable2 = channel.variable2.resolve(palette);

        let Some(node) = scene.find_child(root, node_name) else {
            log::trace!("Node '{node_name}' of sequence '{name}' not found");
            continue;
        };

        if controller_type == ControllerKind::Transform.type_name()
            && let Some(interpolator) = channel.interpolator
            && let Some(controller) = multi_target.and_then(|key| scene.controller_mut(key))
            && controller
                .as_multi_target_mut()
                .is_some_and(|c| c.bind_target(node, interpolator, source))
        {
            controller.set_timing(start, stop, phase, frequency);
            bound += 1;
            continue;
        }

        let Some(key) = scene.find_controller(node, property_type, controller_type, variable1, variable2) else {
            log::trace!("No {controller_type} on '{node_name}' for sequence '{name}'");
            continue;
        };
        let Some(controller) = scene.controller_mut(key) else {
            continue;
        };
        controller.set_timing(start, stop, phase, frequency);
        match channel.interpolator {
            Some(interpolator) => {
                if controller.bind_interpolator(interpolator, source) {
                    bound += 1;
                }
            }
            None => log::trace!("Channel '{node_name}' {controller_type} has no interpolator"),
        }
    }

    if let Some(controller) = scene.controller_mut(manager) {
        controller.set_timing(start, stop, phase, frequency);
    }

    log::info!("Activated sequence '{name}': {bound} channel(s) bound");
    bound
}
