//! Transform System
//!
//! Propagates local transforms down the hierarchy into world matrices.
//! Kept apart from [`Scene`](crate::scene::Scene) so it only borrows the node
//! arena and the root list.

use glam::Affine3A;
use slotmap::SlotMap;

use crate::scene::NodeHandle;
use crate::scene::node::Node;

/// Updates world matrices of every node reachable from `roots`.
///
/// Uses an explicit stack instead of recursion so deep hierarchies cannot
/// overflow. Only subtrees whose local or parent matrix changed are
/// recomputed.
pub fn update_hierarchy_iterative(nodes: &mut SlotMap<NodeHandle, Node>, roots: &[NodeHandle]) {
    // (node, parent world matrix, parent changed)
    let mut stack: Vec<(NodeHandle, Affine3A, bool)> = Vec::with_capacity(64);

    for &root_handle in roots.iter().rev() {
        stack.push((root_handle, Affine3A::IDENTITY, false));
    }

    while let Some((node_handle, parent_world_matrix, parent_changed)) = stack.pop() {
        let Some(node) = nodes.get_mut(node_handle) else {
            continue;
        };

        let local_changed = node.transform.update_local_matrix();
        let world_needs_update = local_changed || parent_changed;

        if world_needs_update {
            let new_world = parent_world_matrix * *node.transform.local_matrix();
            node.transform.set_world_matrix(new_world);
        }

        let current_world = node.transform.world_matrix;
        for &child_handle in node.children.iter().rev() {
            stack.push((child_handle, current_world, world_needs_update));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn test_hierarchy_update() {
        let mut nodes: SlotMap<NodeHandle, Node> = SlotMap::with_key();
        let root = nodes.insert(Node::new("root"));
        let child = nodes.insert(Node::new("child"));
        nodes[root].children.push(child);
        nodes[child].parent = Some(root);

        nodes[root].transform.translation = Vec3::new(1.0, 0.0, 0.0);
        nodes[child].transform.translation = Vec3::new(0.0, 2.0, 0.0);

        update_hierarchy_iterative(&mut nodes, &[root]);

        let world = nodes[child].transform.world_translation();
        assert!((world - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);

        // Moving the parent propagates even though the child is unchanged.
        nodes[root].transform.translation = Vec3::new(5.0, 0.0, 0.0);
        update_hierarchy_iterative(&mut nodes, &[root]);
        let world = nodes[child].transform.world_translation();
        assert!((world - Vec3::new(5.0, 2.0, 0.0)).length() < 1e-5);
    }
}
