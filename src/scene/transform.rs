use glam::{Affine3A, EulerRot, Quat, Vec3};

/// Local rigid transform of a node with a cached world matrix.
///
/// Controllers write `translation`, `rotation` and `scale` directly; the
/// local matrix is rebuilt lazily by comparing against the last-seen values.
#[derive(Debug, Clone)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    /// Uniform scale.
    pub scale: f32,

    pub(crate) local_matrix: Affine3A,
    pub(crate) world_matrix: Affine3A,

    last_translation: Vec3,
    last_rotation: Quat,
    last_scale: f32,
    force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,

            local_matrix: Affine3A::IDENTITY,
            world_matrix: Affine3A::IDENTITY,

            last_translation: Vec3::ZERO,
            last_rotation: Quat::IDENTITY,
            last_scale: 1.0,
            force_update: true,
        }
    }

    /// Rebuilds the local matrix if any component changed since the last
    /// call. Returns whether it changed.
    pub fn update_local_matrix(&mut self) -> bool {
        let changed = self.translation != self.last_translation
            || self.rotation != self.last_rotation
            || self.scale != self.last_scale
            || self.force_update;

        if changed {
            self.local_matrix = Affine3A::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.last_translation = self.translation;
            self.last_rotation = self.rotation;
            self.last_scale = self.scale;
            self.force_update = false;
        }

        changed
    }

    /// Sets the rotation from XYZ Euler angles in radians.
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, x, y, z);
    }

    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Affine3A {
        &self.local_matrix
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    pub fn set_world_matrix(&mut self, mat: Affine3A) {
        self.world_matrix = mat;
    }

    /// World-space rotation, with scale removed.
    #[must_use]
    pub fn world_rotation(&self) -> Quat {
        let (_, rotation, _) = self.world_matrix.to_scale_rotation_translation();
        rotation
    }

    #[must_use]
    pub fn world_translation(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
