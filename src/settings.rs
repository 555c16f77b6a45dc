//! Animation Settings
//!
//! Knobs the scene passes to its controllers when they are created.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use kinema::{AnimationSettings, Scene};
//!
//! // Default: fixed seed, 4 integration sub-steps per frame
//! let scene = Scene::new();
//!
//! // Reproducible particle runs with a chosen seed
//! let scene = Scene::with_settings(AnimationSettings {
//!     particle_seed: 7,
//!     ..Default::default()
//! });
//! ```

/// Seed used when none is configured.
pub const DEFAULT_PARTICLE_SEED: u64 = 0x5EED;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSettings {
    /// Base seed of every particle system's random stream. Each system mixes
    /// in its record index.
    pub particle_seed: u64,
    /// Gravity integration sub-steps per particle per update. Values below 1
    /// are treated as 1.
    pub particle_substeps: u32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            particle_seed: DEFAULT_PARTICLE_SEED,
            particle_substeps: 4,
        }
    }
}
