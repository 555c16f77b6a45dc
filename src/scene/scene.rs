use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::controller::{Controller, ControllerKind, TargetRef, manager};
use crate::errors::{KinemaError, Result};
use crate::scene::mesh::Mesh;
use crate::scene::node::Node;
use crate::scene::property::Property;
use crate::scene::transform_system;
use crate::scene::{ControllerKey, MeshKey, NodeHandle, PropertyKey};
use crate::settings::AnimationSettings;
use crate::source::{BlockId, ModelSource};

/// Scene graph plus everything animating it.
///
/// Nodes, meshes, properties and controllers live in separate arenas and
/// refer to each other by key. Controllers are driven by [`Scene::update`];
/// sequences known to the scene are registered by controller managers on
/// refresh and activated through [`Scene::activate_sequence`].
pub struct Scene {
    pub nodes: SlotMap<NodeHandle, Node>,
    pub root_nodes: Vec<NodeHandle>,

    pub meshes: SlotMap<MeshKey, Mesh>,
    pub properties: SlotMap<PropertyKey, Property>,
    pub(crate) controllers: SlotMap<ControllerKey, Controller>,

    /// Record -> node, for controllers that link to other nodes.
    node_by_block: FxHashMap<BlockId, NodeHandle>,

    /// Sequence names in registration order.
    anim_groups: Vec<String>,
    /// Sequence name -> text key value -> time.
    anim_tags: FxHashMap<String, FxHashMap<String, f32>>,

    settings: AnimationSettings,
    time: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: AnimationSettings) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root_nodes: Vec::new(),
            meshes: SlotMap::with_key(),
            properties: SlotMap::with_key(),
            controllers: SlotMap::with_key(),
            node_by_block: FxHashMap::default(),
            anim_groups: Vec::new(),
            anim_tags: FxHashMap::default(),
            settings,
            time: 0.0,
        }
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// Time passed to the last [`Scene::update`].
    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Adds a root node.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        let handle = self.nodes.insert(node);
        self.root_nodes.push(handle);
        handle
    }

    /// Shorthand for adding an empty named root node.
    pub fn create_node(&mut self, name: &str) -> NodeHandle {
        self.add_node(Node::new(name))
    }

    pub fn add_to_parent(&mut self, child: Node, parent: NodeHandle) -> NodeHandle {
        let handle = self.nodes.insert(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
            if let Some(c) = self.nodes.get_mut(handle) {
                c.parent = Some(parent);
            }
        } else {
            log::warn!("Parent node not found, adding {handle:?} as a root");
            self.root_nodes.push(handle);
        }

        handle
    }

    /// Re-parents `child` under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::warn!("Attach of {child:?} to {parent:?} skipped: node not found");
            return;
        }

        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.root_nodes.iter().position(|&x| x == child) {
            self.root_nodes.remove(i);
        }

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.transform.mark_dirty();
        }
    }

    /// Removes a node, its subtree and its components.
    ///
    /// Controllers targeting any removed object are dropped with it.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        let Some(node) = self.nodes.get(handle) else {
            return;
        };
        let children = node.children.clone();

        for child in children {
            self.remove_node(child);
        }

        let parent = self.nodes.get(handle).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(parent)
                && let Some(pos) = p.children.iter().position(|&x| x == handle)
            {
                p.children.remove(pos);
            }
        } else if let Some(pos) = self.root_nodes.iter().position(|&x| x == handle) {
            self.root_nodes.remove(pos);
        }

        let Some(node) = self.nodes.remove(handle) else {
            return;
        };

        if let Some(block) = node.block {
            self.node_by_block.remove(&block);
        }
        if let Some(mesh) = node.mesh {
            self.meshes.remove(mesh);
        }
        for property in &node.properties {
            self.properties.remove(*property);
        }

        let before = self.controllers.len();
        self.controllers.retain(|_, controller| {
            !matches!(
                controller.target(),
                TargetRef::Node(n) if n == handle
            ) && !matches!(
                controller.target(),
                TargetRef::Mesh(m) if Some(m) == node.mesh
            ) && !matches!(
                controller.target(),
                TargetRef::Property(p) if node.properties.contains(&p)
            )
        });
        let dropped = before - self.controllers.len();
        if dropped > 0 {
            log::debug!("Removed {dropped} controller(s) with node '{}'", node.name);
        }
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    /// Records that `node` was built from record `block`.
    pub fn bind_block(&mut self, node: NodeHandle, block: BlockId) {
        if let Some(n) = self.nodes.get_mut(node) {
            if let Some(previous) = n.block.replace(block) {
                self.node_by_block.remove(&previous);
            }
            self.node_by_block.insert(block, node);
        }
    }

    #[must_use]
    pub fn node_for_block(&self, block: BlockId) -> Option<NodeHandle> {
        self.node_by_block
            .get(&block)
            .copied()
            .filter(|handle| self.nodes.contains_key(*handle))
    }

    /// Depth-first search for a node named `name`, `root` included.
    #[must_use]
    pub fn find_child(&self, root: NodeHandle, name: &str) -> Option<NodeHandle> {
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if node.name == name {
                return Some(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// A node is visible if neither it nor any ancestor is hidden.
    #[must_use]
    pub fn is_visible(&self, handle: NodeHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(h) else {
                return false;
            };
            if node.hidden {
                return false;
            }
            current = node.parent;
        }
        true
    }

    // ========================================================================
    // Components
    // ========================================================================

    /// Attaches `mesh` to `node`, replacing any mesh it had.
    pub fn attach_mesh(&mut self, node: NodeHandle, mut mesh: Mesh) -> Result<MeshKey> {
        if !self.nodes.contains_key(node) {
            return Err(KinemaError::NodeNotFound(node));
        }
        mesh.node = Some(node);
        let key = self.meshes.insert(mesh);
        if let Some(n) = self.nodes.get_mut(node)
            && let Some(old) = n.mesh.replace(key)
        {
            self.meshes.remove(old);
        }
        Ok(key)
    }

    pub fn add_property(&mut self, node: NodeHandle, property: Property) -> Result<PropertyKey> {
        if !self.nodes.contains_key(node) {
            return Err(KinemaError::NodeNotFound(node));
        }
        let key = self.properties.insert(property);
        if let Some(n) = self.nodes.get_mut(node) {
            n.properties.push(key);
        }
        Ok(key)
    }

    #[must_use]
    pub fn mesh_of(&self, node: NodeHandle) -> Option<&Mesh> {
        self.meshes.get(self.nodes.get(node)?.mesh?)
    }

    /// Whether the object a controller points at still exists.
    #[must_use]
    pub fn contains_target(&self, target: TargetRef) -> bool {
        match target {
            TargetRef::Node(handle) => self.nodes.contains_key(handle),
            TargetRef::Mesh(key) => self.meshes.contains_key(key),
            TargetRef::Property(key) => self.properties.contains_key(key),
        }
    }

    // ========================================================================
    // Controllers
    // ========================================================================

    /// Creates the controller for record `block` and binds it to `target`.
    ///
    /// The controller is refreshed once; a failed refresh still adds it,
    /// inert until a later refresh succeeds.
    pub fn add_controller(&mut self, source: &ModelSource, block: BlockId, target: TargetRef) -> Result<ControllerKey> {
        let kind = match source.controller(block) {
            Ok(record) => record.params.kind(),
            Err(err) => {
                log::warn!("Cannot create controller from {block:?}: {err}");
                return Err(err.into());
            }
        };

        if kind.target_kind() != target.kind() {
            return Err(KinemaError::TargetMismatch {
                kind,
                found: target.kind().name(),
            });
        }
        if !self.contains_target(target) {
            return Err(match target {
                TargetRef::Node(handle) => KinemaError::NodeNotFound(handle),
                TargetRef::Mesh(key) => KinemaError::MeshNotFound(key),
                TargetRef::Property(key) => KinemaError::PropertyNotFound(key),
            });
        }

        let mut controller = Controller::new(kind, block, target, &self.settings);
        controller.refresh(source, self);
        Ok(self.controllers.insert(controller))
    }

    #[inline]
    #[must_use]
    pub fn controller(&self, key: ControllerKey) -> Option<&Controller> {
        self.controllers.get(key)
    }

    #[inline]
    pub fn controller_mut(&mut self, key: ControllerKey) -> Option<&mut Controller> {
        self.controllers.get_mut(key)
    }

    pub fn controllers(&self) -> impl Iterator<Item = (ControllerKey, &Controller)> {
        self.controllers.iter()
    }

    pub fn remove_controller(&mut self, key: ControllerKey) -> Option<Controller> {
        self.controllers.remove(key)
    }

    /// Re-reads every controller from `source`.
    pub fn refresh_controllers(&mut self, source: &ModelSource) {
        let mut controllers = std::mem::take(&mut self.controllers);

        for (_key, controller) in &mut controllers {
            controller.refresh(source, self);
        }

        self.controllers = controllers;
    }

    /// Applies every controller at `time` without touching world matrices.
    pub fn update_controllers(&mut self, time: f32) {
        let mut controllers = std::mem::take(&mut self.controllers);

        for (_key, controller) in &mut controllers {
            controller.update(time, self);
        }

        self.controllers = controllers;
    }

    /// Advances the scene to `time`.
    ///
    /// World matrices are brought current before the controller pass, since
    /// particle emitters read them, and again after it. Only nodes whose local
    /// transform changed are recomputed.
    pub fn update(&mut self, time: f32) {
        self.time = time;
        self.update_matrix_world();
        self.update_controllers(time);
        self.update_matrix_world();
    }

    pub fn update_matrix_world(&mut self) {
        transform_system::update_hierarchy_iterative(&mut self.nodes, &self.root_nodes);
    }

    /// First controller on `node` matching a sequence channel.
    ///
    /// With a non-empty `property_type` the search is over controllers of
    /// that property of the node; otherwise over controllers of the node and
    /// its mesh. Empty variables match any.
    #[must_use]
    pub fn find_controller(
        &self,
        node: NodeHandle,
        property_type: &str,
        controller_type: &str,
        variable1: &str,
        variable2: &str,
    ) -> Option<ControllerKey> {
        let n = self.nodes.get(node)?;
        let kind = ControllerKind::from_type_name(controller_type)?;

        let matches = |target: TargetRef| -> bool {
            if property_type.is_empty() {
                target == TargetRef::Node(node) || n.mesh.is_some_and(|mesh| target == TargetRef::Mesh(mesh))
            } else {
                match target {
                    TargetRef::Property(key) => {
                        n.properties.contains(&key)
                            && self
                                .properties
                                .get(key)
                                .is_some_and(|property| property.type_name() == property_type)
                    }
                    _ => false,
                }
            }
        };

        self.controllers
            .iter()
            .find(|(_, controller)| {
                controller.kind() == kind
                    && matches(controller.target())
                    && controller.base().matches_variables(variable1, variable2)
            })
            .map(|(key, _)| key)
    }

    /// First controller of `kind` targeting `node` itself.
    #[must_use]
    pub fn find_controller_of_kind(&self, node: NodeHandle, kind: ControllerKind) -> Option<ControllerKey> {
        self.controllers
            .iter()
            .find(|(_, controller)| controller.kind() == kind && controller.target() == TargetRef::Node(node))
            .map(|(key, _)| key)
    }

    // ========================================================================
    // Sequences
    // ========================================================================

    /// Binds the named sequence of `manager`. Returns the number of channels
    /// that found a controller; 0 if the sequence is unknown.
    pub fn activate_sequence(&mut self, source: &ModelSource, manager: ControllerKey, name: &str) -> usize {
        manager::activate_sequence(self, source, manager, name)
    }

    /// Sequence names in registration order.
    #[must_use]
    pub fn anim_groups(&self) -> &[String] {
        &self.anim_groups
    }

    /// Text keys of a sequence: value -> time.
    #[must_use]
    pub fn anim_tags(&self, sequence: &str) -> Option<&FxHashMap<String, f32>> {
        self.anim_tags.get(sequence)
    }

    #[must_use]
    pub fn has_anim_group(&self, name: &str) -> bool {
        self.anim_groups.iter().any(|group| group == name)
    }

    /// Registers a sequence name once and merges its text keys.
    ///
    /// Returns `false` if the name was already known; its tags are then left
    /// untouched.
    pub(crate) fn register_sequence<'a>(&mut self, name: &str, tags: impl IntoIterator<Item = (&'a str, f32)>) -> bool {
        if self.has_anim_group(name) {
            return false;
        }
        self.anim_groups.push(name.to_string());

        let entry = self.anim_tags.entry(name.to_string()).or_default();
        for (value, time) in tags {
            entry.insert(value.to_string(), time);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_walks_ancestors() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let child = scene.add_to_parent(Node::new("child"), root);

        assert!(scene.is_visible(child));
        scene.nodes[root].hidden = true;
        assert!(!scene.is_visible(child));
        assert!(!scene.is_visible(root));
    }

    #[test]
    fn remove_node_drops_subtree_and_components() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let child = scene.add_to_parent(Node::new("child"), root);
        let mesh = scene.attach_mesh(child, Mesh::new(vec![])).unwrap();
        scene.bind_block(child, BlockId(3));

        scene.remove_node(root);

        assert!(scene.nodes.is_empty());
        assert!(scene.root_nodes.is_empty());
        assert!(!scene.meshes.contains_key(mesh));
        assert_eq!(scene.node_for_block(BlockId(3)), None);
    }

    #[test]
    fn find_child_searches_depth_first() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let a = scene.add_to_parent(Node::new("a"), root);
        let b = scene.add_to_parent(Node::new("b"), a);

        assert_eq!(scene.find_child(root, "b"), Some(b));
        assert_eq!(scene.find_child(root, "root"), Some(root));
        assert_eq!(scene.find_child(a, "missing"), None);
    }

    #[test]
    fn register_sequence_is_first_wins() {
        let mut scene = Scene::new();
        assert!(scene.register_sequence("Idle", [("start", 0.0), ("end", 2.0)]));
        assert!(!scene.register_sequence("Idle", [("start", 5.0)]));

        assert_eq!(scene.anim_groups(), ["Idle".to_string()]);
        let tags = scene.anim_tags("Idle").unwrap();
        assert_eq!(tags.get("start"), Some(&0.0));
        assert_eq!(tags.get("end"), Some(&2.0));
    }
}
