//! Particle System
//!
//! A bounded particle pool driven by emission-rate integration. Each update:
//! 1. ages the live particles and drops the expired ones into a fresh dense
//!    pool, integrating gravity over a fixed number of sub-steps
//! 2. emits new particles while the emitter is visible and the local time
//!    is inside the emission window
//! 3. publishes positions, sizes and colors to the front of the target
//!    mesh's buffers
//!
//! Time may run backwards; every step treats a negative delta as zero.

use std::sync::Arc;

use bitflags::bitflags;
use glam::{Quat, Vec3, Vec4};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::animation::{KeyframeCursor, KeyframeTrack};
use crate::controller::{ControllerBase, TargetRef};
use crate::scene::{MeshKey, NodeHandle, Scene};
use crate::settings::AnimationSettings;
use crate::source::{BlockId, ControllerParams, ControllerRecord, ModelSource, ParticleModifier};

bitflags! {
    /// Emitter flags of a particle system record.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct EmitFlags: u16 {
        /// Keep the stored emit rate instead of deriving it from the pool size.
        const FIXED_RATE = 1 << 0;
    }
}

/// One live particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Position in the target mesh's space.
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub lifespan: f32,
    /// Local time of the last integration.
    pub last_time: f32,
    /// Vertex slot in the target mesh.
    pub vertex: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityKind {
    /// Constant force along `direction`.
    Planar,
    /// Force towards `position`.
    Point,
}

impl GravityKind {
    #[must_use]
    pub fn from_raw(kind: u32) -> Option<Self> {
        match kind {
            0 => Some(Self::Planar),
            1 => Some(Self::Point),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    pub kind: GravityKind,
    pub force: f32,
    pub position: Vec3,
    pub direction: Vec3,
}

impl Gravity {
    fn apply(&self, particle: &mut Particle, dt: f32) {
        match self.kind {
            GravityKind::Planar => particle.velocity += self.direction * (self.force * dt),
            GravityKind::Point => {
                let towards = (self.position - particle.position).normalize_or_zero();
                particle.velocity += towards * (self.force * dt);
            }
        }
    }
}

/// Emitter and target orientation used while spawning.
struct EmitFrame {
    /// Emitter position relative to the target, in target space.
    offset: Vec3,
    /// Rotates emitter-space directions into target space.
    rotation: Quat,
}

/// Emission parameters read from the record.
#[derive(Debug, Clone, Default)]
struct EmitterParams {
    emitter: Option<NodeHandle>,
    start: f32,
    stop: f32,
    rate: f32,
    radius: Vec3,
    speed: f32,
    speed_random: f32,
    lifetime: f32,
    lifetime_random: f32,
    inclination: f32,
    inclination_random: f32,
    declination: f32,
    declination_random: f32,
    size: f32,
    max: u32,
}

#[derive(Debug)]
pub struct ParticleController {
    params: EmitterParams,

    grow: f32,
    fade: f32,
    colors: Option<Arc<KeyframeTrack<Vec4>>>,
    gravities: SmallVec<[Gravity; 4]>,

    particles: Vec<Particle>,
    emit_accu: f32,
    emit_last: f32,

    substeps: u32,
    rng: StdRng,
}

impl ParticleController {
    /// The random stream is seeded from the configured seed and the record
    /// index, so two systems of one scene do not emit in lockstep.
    #[must_use]
    pub fn new(block: BlockId, settings: &AnimationSettings) -> Self {
        Self {
            params: EmitterParams::default(),
            grow: 0.0,
            fade: 0.0,
            colors: None,
            gravities: SmallVec::new(),
            particles: Vec::new(),
            emit_accu: 0.0,
            emit_last: 0.0,
            substeps: settings.particle_substeps.max(1),
            rng: StdRng::seed_from_u64(settings.particle_seed.wrapping_add(u64::from(block.0))),
        }
    }

    pub(crate) fn refresh(&mut self, record: &ControllerRecord, source: &ModelSource, scene: &Scene) -> bool {
        let ControllerParams::ParticleSystem(system) = &record.params else {
            return false;
        };

        self.params = EmitterParams {
            emitter: system.emitter.and_then(|block| scene.node_for_block(block)),
            start: system.emit_start_time,
            stop: system.emit_stop_time,
            rate: system.emit_rate,
            radius: system.start_random,
            speed: system.speed,
            speed_random: system.speed_random,
            lifetime: system.lifetime,
            lifetime_random: system.lifetime_random,
            inclination: system.vertical_direction,
            inclination_random: system.vertical_angle,
            declination: system.horizontal_direction,
            declination_random: system.horizontal_angle,
            size: system.size,
            max: system.num_particles,
        };

        if !EmitFlags::from_bits_retain(system.emit_flags).contains(EmitFlags::FIXED_RATE) {
            let mean_lifetime = system.lifetime + system.lifetime_random / 2.0;
            if mean_lifetime > 0.0 {
                self.params.rate = system.num_particles as f32 / mean_lifetime;
            } else {
                log::trace!("Particle lifetime is zero, keeping stored emit rate");
            }
        }

        self.particles = system
            .particles
            .iter()
            .take(system.num_valid as usize)
            .map(|saved| Particle {
                position: Vec3::ZERO,
                velocity: saved.velocity,
                age: saved.lifetime,
                lifespan: saved.lifespan,
                last_time: saved.timestamp,
                vertex: saved.vertex_id as usize,
            })
            .collect();

        self.emit_accu = 0.0;
        self.emit_last = self.params.start;

        self.read_modifiers(system.particle_extra, source);
        true
    }

    /// Walks the modifier chain. A cycle ends the walk.
    fn read_modifiers(&mut self, first: Option<BlockId>, source: &ModelSource) {
        self.grow = 0.0;
        self.fade = 0.0;
        self.colors = None;
        self.gravities.clear();

        let mut visited = FxHashSet::default();
        let mut link = first;
        while let Some(id) = link {
            if !visited.insert(id) {
                log::debug!("Particle modifier chain loops at {id:?}");
                break;
            }
            let Ok(record) = source.particle_modifier(id) else {
                break;
            };

            match &record.modifier {
                ParticleModifier::GrowFade { grow, fade } => {
                    self.grow = *grow;
                    self.fade = *fade;
                }
                ParticleModifier::Color { color_data } => {
                    self.colors = color_data
                        .and_then(|data| source.color_data(data).ok())
                        .map(|data| Arc::clone(&data.keys));
                }
                ParticleModifier::Gravity {
                    force,
                    kind,
                    position,
                    direction,
                } => match GravityKind::from_raw(*kind) {
                    Some(kind) => self.gravities.push(Gravity {
                        kind,
                        force: *force,
                        position: *position,
                        direction: *direction,
                    }),
                    None => log::trace!("Gravity type {kind} ignored"),
                },
                ParticleModifier::Other => {}
            }

            link = record.next;
        }
    }

    pub(crate) fn update(&mut self, base: &ControllerBase, local: f32, scene: &mut Scene) {
        let TargetRef::Mesh(mesh_key) = base.target else {
            return;
        };
        let Some(mesh) = scene.meshes.get(mesh_key) else {
            return;
        };
        let vertex_count = mesh.verts.len();
        let target_node = mesh.node;
        let capacity = if self.params.max > 0 {
            vertex_count.min(self.params.max as usize)
        } else {
            vertex_count
        };

        // Age and compact into a fresh pool.
        let substeps = self.substeps;
        let previous = std::mem::take(&mut self.particles);
        let mut survivors = Vec::with_capacity(previous.len());
        for mut particle in previous {
            let dt = (local - particle.last_time).max(0.0);
            particle.age += dt;
            if particle.age >= particle.lifespan || particle.vertex >= vertex_count {
                continue;
            }
            particle.position = mesh.verts[particle.vertex];
            let step = dt / substeps as f32;
            for _ in 0..substeps {
                for gravity in &self.gravities {
                    gravity.apply(&mut particle, step);
                }
                particle.position += particle.velocity * step;
            }
            particle.last_time = local;
            survivors.push(particle);
        }
        self.particles = survivors;

        // Emit.
        if let Some(emitter) = self.params.emitter
            && scene.is_visible(emitter)
            && local >= self.params.start
            && local <= self.params.stop
        {
            let delta = (local - self.emit_last).max(0.0);
            self.emit_last = local;
            self.emit_accu += delta * self.params.rate;

            let count = self.emit_accu.trunc();
            if count > 0.0 {
                self.emit_accu -= count;
                let frame = emit_frame(scene, emitter, target_node);
                let mut remaining = count as usize;
                while remaining > 0 && self.particles.len() < capacity {
                    let particle = self.spawn(&frame, local);
                    self.particles.push(particle);
                    remaining -= 1;
                }
            }
        }

        self.publish(scene, mesh_key);
    }

    /// Uniform in `[0, range)`.
    fn random(&mut self, range: f32) -> f32 {
        range * self.rng.random_range(0.0..1.0f32)
    }

    fn coin(&mut self) -> bool {
        self.rng.random_range(0..2u32) == 1
    }

    fn spawn(&mut self, frame: &EmitFrame, local: f32) -> Particle {
        let radius = self.params.radius;
        let jitter = Vec3::new(
            self.random(radius.x * 2.0),
            self.random(radius.y * 2.0),
            self.random(radius.z * 2.0),
        );
        let position = jitter - radius + frame.offset;

        let inclination = self.params.inclination + self.random(self.params.inclination_random);
        let declination = self.params.declination + self.random(self.params.declination_random);

        let sin = if self.coin() {
            inclination.sin()
        } else {
            -inclination.sin()
        };
        let direction = Vec3::new(sin, 0.0, inclination.cos());
        let spin = Quat::from_rotation_z(if self.coin() { declination } else { -declination });
        let speed = self.params.speed + self.random(self.params.speed_random);
        let velocity = frame.rotation * (spin * direction * speed);

        let lifespan = self.params.lifetime + self.random(self.params.lifetime_random);

        Particle {
            position,
            velocity,
            age: 0.0,
            lifespan,
            last_time: local,
            vertex: 0,
        }
    }

    fn size_of(&self, particle: &Particle) -> f32 {
        let mut size = 1.0;
        if self.grow > 0.0 && particle.age < self.grow {
            size *= particle.age / self.grow;
        }
        let remaining = particle.lifespan - particle.age;
        if self.fade > 0.0 && remaining < self.fade {
            size *= remaining / self.fade;
        }
        size
    }

    fn publish(&mut self, scene: &mut Scene, mesh_key: MeshKey) {
        let Some(mesh) = scene.meshes.get_mut(mesh_key) else {
            return;
        };

        self.particles.truncate(mesh.verts.len());

        let mut cursor = KeyframeCursor::default();
        for (slot, particle) in self.particles.iter_mut().enumerate() {
            particle.vertex = slot;
            mesh.verts[slot] = particle.position;
        }
        for (slot, particle) in self.particles.iter().enumerate() {
            let size = self.size_of(particle);
            if let Some(out) = mesh.sizes.get_mut(slot) {
                *out = size;
            }
            if let Some(colors) = &self.colors
                && particle.lifespan > 0.0
                && let Some(color) = colors.sample_with_cursor(particle.age / particle.lifespan, &mut cursor)
                && let Some(out) = mesh.colors.get_mut(slot)
            {
                *out = color;
            }
        }

        mesh.active_count = self.particles.len();
        mesh.point_size = self.params.size;
        mesh.update_data = true;
        mesh.update_bounds = true;
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub fn emit_accumulator(&self) -> f32 {
        self.emit_accu
    }

    #[must_use]
    pub fn emit_rate(&self) -> f32 {
        self.params.rate
    }

    #[must_use]
    pub fn gravities(&self) -> &[Gravity] {
        &self.gravities
    }

    #[must_use]
    pub fn grow_fade(&self) -> (f32, f32) {
        (self.grow, self.fade)
    }

    #[must_use]
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }
}

fn emit_frame(scene: &Scene, emitter: NodeHandle, target: Option<NodeHandle>) -> EmitFrame {
    let (emitter_position, emitter_rotation) = scene
        .get_node(emitter)
        .map_or((Vec3::ZERO, Quat::IDENTITY), |node| {
            (node.transform.world_translation(), node.transform.world_rotation())
        });
    let (target_position, target_rotation) = target
        .and_then(|target| scene.get_node(target))
        .map_or((Vec3::ZERO, Quat::IDENTITY), |node| {
            (node.transform.world_translation(), node.transform.world_rotation())
        });

    let inverse = target_rotation.inverse();
    EmitFrame {
        offset: inverse * (emitter_position - target_position),
        rotation: inverse * emitter_rotation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle_at(position: Vec3) -> Particle {
        Particle {
            position,
            velocity: Vec3::ZERO,
            age: 0.0,
            lifespan: 1.0,
            last_time: 0.0,
            vertex: 0,
        }
    }

    #[test]
    fn planar_gravity_adds_along_direction() {
        let gravity = Gravity {
            kind: GravityKind::Planar,
            force: 2.0,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        };
        let mut p = particle_at(Vec3::ZERO);
        gravity.apply(&mut p, 0.5);
        assert!((p.velocity - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn point_gravity_pulls_towards_position() {
        let gravity = Gravity {
            kind: GravityKind::Point,
            force: 1.0,
            position: Vec3::new(10.0, 0.0, 0.0),
            direction: Vec3::ZERO,
        };
        let mut p = particle_at(Vec3::ZERO);
        gravity.apply(&mut p, 1.0);
        assert!((p.velocity - Vec3::X).length() < 1e-6);

        // Coincident: no force.
        let mut p = particle_at(Vec3::new(10.0, 0.0, 0.0));
        gravity.apply(&mut p, 1.0);
        assert_eq!(p.velocity, Vec3::ZERO);
    }

    #[test]
    fn unknown_gravity_kind_is_rejected() {
        assert_eq!(GravityKind::from_raw(0), Some(GravityKind::Planar));
        assert_eq!(GravityKind::from_raw(1), Some(GravityKind::Point));
        assert_eq!(GravityKind::from_raw(7), None);
    }
}
