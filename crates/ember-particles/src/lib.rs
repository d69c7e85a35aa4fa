//! Ember Particles - bounded-pool particle simulation
//!
//! Provides the CPU half of the effect renderer:
//! - Swap-remove particle pool with bounded admission and O(1) kill
//! - Per-frame Euler integration and time-based expiry
//! - Single-pass instance packing over a capacity-sized reusable buffer
//! - Seedable jitter RNG for spawn randomization
//!
//! The per-frame pipeline is strictly ordered on one thread:
//! `emit* → advance → pack → submit`. Emits land before `advance` so the
//! packed buffer always reflects the exact post-advance alive set.

pub mod config;
pub mod pack;
pub mod particle;
pub mod rand;

pub use config::{EmitterConfig, ParticleShape};
pub use pack::{InstancePacker, InstanceRecord, Mat4, RenderSurface};
pub use particle::{Particle, ParticlePool};
pub use rand::JitterRng;

/// One particle effect: pool, packer, RNG and the current emitter config.
///
/// The config is plain mutable state on the effect; edits take effect on the
/// next `emit` call only, since particles snapshot it at spawn time.
pub struct ParticleEffect {
    pool: ParticlePool,
    packer: InstancePacker,
    rng: JitterRng,
    pub config: EmitterConfig,
}

impl ParticleEffect {
    pub fn new(capacity: usize, seed: u32) -> Self {
        Self {
            pool: ParticlePool::new(capacity),
            packer: InstancePacker::new(capacity),
            rng: JitterRng::new(seed),
            config: EmitterConfig::default(),
        }
    }

    pub fn with_config(capacity: usize, seed: u32, config: EmitterConfig) -> Self {
        Self {
            config,
            ..Self::new(capacity, seed)
        }
    }

    /// Spawn a batch at `origin` using the current config; returns the
    /// number admitted (zero when the pool is full — expected throttling).
    pub fn emit(&mut self, origin: [f32; 3], now: f32) -> usize {
        self.pool.emit(origin, now, &self.config, &mut self.rng)
    }

    /// Integrate motion and expire particles for simulation time `now`
    pub fn advance(&mut self, now: f32) {
        self.pool.advance(now);
    }

    /// Pack the post-advance alive set into draw-ready records
    pub fn pack(&mut self, now: f32) -> &[InstanceRecord] {
        self.packer.pack(&self.pool, now)
    }

    /// Run one frame's pack-and-submit against a render surface
    pub fn render(&mut self, now: f32, surface: &mut dyn RenderSurface, view: Mat4, projection: Mat4) {
        let records = self.packer.pack(&self.pool, now);
        surface.submit(records, view, projection);
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Telemetry: currently alive particles (read-only, for UI display)
    pub fn alive_particles_count(&self) -> usize {
        self.pool.alive_count()
    }

    /// Telemetry: spawn requests refused at capacity since construction
    pub fn dropped_particles(&self) -> u64 {
        self.pool.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what was submitted, standing in for the GPU surface
    struct RecordingSurface {
        counts: Vec<usize>,
    }

    impl RenderSurface for RecordingSurface {
        fn submit(&mut self, records: &[InstanceRecord], _view: Mat4, _projection: Mat4) {
            self.counts.push(records.len());
        }
    }

    const IDENTITY: Mat4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    #[test]
    fn frame_pipeline_emit_advance_pack_submit() {
        let mut effect = ParticleEffect::new(10, 42);
        effect.config.spawn_count = 5;
        effect.config.lifetime = 2.0;

        let mut surface = RecordingSurface { counts: Vec::new() };

        effect.emit([0.0; 3], 0.0);
        assert_eq!(effect.alive_particles_count(), 5);

        effect.advance(1.0);
        assert_eq!(effect.alive_particles_count(), 5);
        effect.render(1.0, &mut surface, IDENTITY, IDENTITY);

        effect.advance(2.0);
        assert_eq!(effect.alive_particles_count(), 0);
        effect.render(2.0, &mut surface, IDENTITY, IDENTITY);

        assert_eq!(surface.counts, vec![5, 0]);
    }

    #[test]
    fn config_edits_apply_to_next_emit_only() {
        let mut effect = ParticleEffect::new(16, 1);
        effect.config.spawn_count = 2;
        effect.config.scale = 1.0;
        effect.emit([0.0; 3], 0.0);

        effect.config.scale = 3.0;
        effect.emit([0.0; 3], 0.0);

        let records = effect.pack(0.0);
        let scales: Vec<f32> = records.iter().map(|r| r.transform[0][0]).collect();
        assert_eq!(scales, vec![1.0, 1.0, 3.0, 3.0]);
    }

    #[test]
    fn sustained_over_emission_throttles_silently() {
        let mut effect = ParticleEffect::new(8, 2);
        effect.config.spawn_count = 6;
        effect.config.lifetime = 100.0;
        for frame in 0..5 {
            effect.emit([0.0; 3], frame as f32);
            effect.advance(frame as f32);
        }
        assert_eq!(effect.alive_particles_count(), 8);
        assert_eq!(effect.dropped_particles(), 6 * 5 - 8);
    }
}
