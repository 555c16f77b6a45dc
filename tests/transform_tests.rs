//! Transform and TransformSystem tests
//!
//! Tests for:
//! - Transform TRS operations and dirty checking
//! - Euler angle construction
//! - World translation/rotation extraction
//! - Hierarchical matrix propagation (iterative)

use glam::{Quat, Vec3};
use kinema::scene::node::Node;
use kinema::scene::{NodeHandle, Scene};
use kinema::scene::transform::Transform;
use kinema::scene::transform_system::update_hierarchy_iterative;
use std::f32::consts::FRAC_PI_2;

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

// ============================================================================
// Transform Unit Tests
// ============================================================================

#[test]
fn transform_default_is_identity() {
    let t = Transform::new();
    assert_eq!(t.translation, Vec3::ZERO);
    assert_eq!(t.rotation, Quat::IDENTITY);
    assert!(approx_eq(t.scale, 1.0));
}

#[test]
fn transform_update_local_matrix_dirty_check() {
    let mut t = Transform::new();

    // First call always rebuilds.
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.translation = Vec3::new(1.0, 2.0, 3.0);
    assert!(t.update_local_matrix());
    assert!(!t.update_local_matrix());

    t.scale = 2.0;
    assert!(t.update_local_matrix());

    t.mark_dirty();
    assert!(t.update_local_matrix());
}

#[test]
fn transform_local_matrix_uses_uniform_scale() {
    let mut t = Transform::new();
    t.translation = Vec3::new(0.0, 0.0, 1.0);
    t.scale = 3.0;
    t.update_local_matrix();

    let p = t.local_matrix().transform_point3(Vec3::X);
    assert!(vec3_approx(p, Vec3::new(3.0, 0.0, 1.0)));
}

#[test]
fn transform_euler_xyz() {
    let mut t = Transform::new();
    t.set_rotation_euler(0.0, 0.0, FRAC_PI_2);

    assert!(vec3_approx(t.rotation * Vec3::X, Vec3::Y));
}

// ============================================================================
// TransformSystem Hierarchy Tests
// ============================================================================

fn create_chain(length: usize) -> (Scene, Vec<NodeHandle>) {
    let mut scene = Scene::new();
    let mut handles: Vec<NodeHandle> = Vec::new();

    for i in 0..length {
        let mut node = Node::new(&format!("Link{i}"));
        node.transform.translation = Vec3::new(1.0, 0.0, 0.0);
        let handle = match handles.last() {
            Some(&parent) => scene.add_to_parent(node, parent),
            None => scene.add_node(node),
        };
        handles.push(handle);
    }

    (scene, handles)
}

fn update(scene: &mut Scene) {
    update_hierarchy_iterative(&mut scene.nodes, &scene.root_nodes);
}

#[test]
fn hierarchy_chain_world_positions() {
    let (mut scene, handles) = create_chain(5);

    update(&mut scene);

    for (i, &handle) in handles.iter().enumerate() {
        let world = scene.nodes[handle].transform.world_translation();
        let expected_x = (i + 1) as f32;
        assert!(
            approx_eq(world.x, expected_x),
            "Node {i}: expected x={expected_x}, got x={}",
            world.x
        );
    }
}

#[test]
fn hierarchy_with_rotation_and_scale() {
    let (mut scene, handles) = create_chain(2);
    scene.nodes[handles[0]].transform.rotation = Quat::from_rotation_z(FRAC_PI_2);
    scene.nodes[handles[0]].transform.scale = 2.0;

    update(&mut scene);

    // Child offset (1,0,0) is scaled by 2 and turned onto +Y.
    let child = &scene.nodes[handles[1]].transform;
    assert!(vec3_approx(child.world_translation(), Vec3::new(1.0, 2.0, 0.0)));
    assert!(child.world_rotation().dot(Quat::from_rotation_z(FRAC_PI_2)).abs() > 1.0 - EPSILON);
}

#[test]
fn hierarchy_parent_change_reaches_unchanged_children() {
    let (mut scene, handles) = create_chain(3);
    update(&mut scene);

    scene.nodes[handles[0]].transform.translation = Vec3::new(10.0, 0.0, 0.0);
    update(&mut scene);

    let leaf = scene.nodes[handles[2]].transform.world_translation();
    assert!(approx_eq(leaf.x, 12.0));
}

#[test]
fn deeply_nested_hierarchy_no_stack_overflow() {
    let depth = 500;
    let (mut scene, handles) = create_chain(depth);

    update(&mut scene);

    let last = scene.nodes[handles[depth - 1]].transform.world_translation();
    let expected = depth as f32;
    assert!((last.x - expected).abs() < 1e-2, "expected {expected}, got {}", last.x);
}
