//! Instance packing: alive particles → draw-ready GPU records
//!
//! One linear pass per frame over a buffer pre-sized to pool capacity.
//! This loop runs at up to hundreds of thousands of particles, so records
//! are computed and written in place — no per-frame allocation, no
//! filter-then-map second pass.

use bytemuck::{Pod, Zeroable};

use crate::particle::ParticlePool;

/// Column-major 4x4 matrix as uploaded to the GPU
pub type Mat4 = [[f32; 4]; 4];

/// Per-particle draw data — matches the WGSL `Instance` struct
/// (vec4 color + mat4x4 transform, 80 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct InstanceRecord {
    pub color: [f32; 4],
    pub transform: Mat4,
}

/// Linear interpolation between two RGBA colors
pub fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Reusable instance buffer, sized once to pool capacity.
pub struct InstancePacker {
    records: Vec<InstanceRecord>,
}

impl InstancePacker {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: vec![InstanceRecord::zeroed(); capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Pack the pool's alive particles, called after `advance` so expired
    /// particles are already gone. Returns the packed prefix; its length is
    /// exactly the pool's alive count and the borrow is good for one
    /// frame's submission only.
    pub fn pack(&mut self, pool: &ParticlePool, now: f32) -> &[InstanceRecord] {
        let mut count = 0;
        for p in pool.alive_slice() {
            let progress = p.progress(now);
            let s = p.scale;

            // Scale on the diagonal, position in the translation column.
            // rotation_speed is carried on the particle but not applied;
            // records stay a plain scale + translate.
            let record = &mut self.records[count];
            record.color = lerp_color(p.start_color, p.end_color, progress);
            record.transform = [
                [s, 0.0, 0.0, 0.0],
                [0.0, s, 0.0, 0.0],
                [0.0, 0.0, s, 0.0],
                [p.position[0], p.position[1], p.position[2], 1.0],
            ];
            count += 1;
        }
        &self.records[..count]
    }
}

/// GPU-side collaborator: accepts one frame's packed instances and issues a
/// single instanced draw. Implemented by `ember-render`; mocked in tests.
pub trait RenderSurface {
    fn submit(&mut self, records: &[InstanceRecord], view: Mat4, projection: Mat4);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmitterConfig;
    use crate::rand::JitterRng;

    fn emit_n(pool: &mut ParticlePool, n: i32, lifetime: f32, now: f32) {
        let cfg = EmitterConfig {
            spawn_count: n,
            lifetime,
            random_velocity: false,
            ..Default::default()
        };
        let mut rng = JitterRng::new(5);
        pool.emit([0.0; 3], now, &cfg, &mut rng);
    }

    #[test]
    fn record_layout() {
        assert_eq!(std::mem::size_of::<InstanceRecord>(), 80);
        assert_eq!(std::mem::align_of::<InstanceRecord>(), 4);
    }

    #[test]
    fn pack_count_matches_alive_count() {
        let mut pool = ParticlePool::new(16);
        let mut packer = InstancePacker::new(16);

        emit_n(&mut pool, 6, 2.0, 0.0);
        pool.advance(1.0);
        let records = packer.pack(&pool, 1.0);
        assert_eq!(records.len(), pool.alive_count());
        assert_eq!(records.len(), 6);

        // After expiry no stale records survive
        pool.advance(2.0);
        let records = packer.pack(&pool, 2.0);
        assert!(records.is_empty());
    }

    #[test]
    fn pack_never_exceeds_capacity() {
        let mut pool = ParticlePool::new(8);
        let mut packer = InstancePacker::new(8);
        emit_n(&mut pool, 100, 10.0, 0.0);
        let records = packer.pack(&pool, 0.0);
        assert_eq!(records.len(), 8);
        assert_eq!(packer.capacity(), 8);
    }

    #[test]
    fn color_interpolates_over_lifetime() {
        let mut pool = ParticlePool::new(4);
        let mut packer = InstancePacker::new(4);
        let cfg = EmitterConfig {
            spawn_count: 1,
            lifetime: 10.0,
            start_color: [1.0, 0.0, 0.0, 1.0],
            end_color: [0.0, 0.0, 1.0, 0.0],
            random_velocity: false,
            ..Default::default()
        };
        let mut rng = JitterRng::new(5);
        pool.emit([0.0; 3], 0.0, &cfg, &mut rng);

        // progress = 0 → start color exactly
        let records = packer.pack(&pool, 0.0);
        assert_eq!(records[0].color, [1.0, 0.0, 0.0, 1.0]);

        // progress → 1 approaches end color
        let records = packer.pack(&pool, 9.999);
        assert!((records[0].color[0]).abs() < 1e-3);
        assert!((records[0].color[2] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn transform_encodes_scale_and_translation_only() {
        let mut pool = ParticlePool::new(4);
        let mut packer = InstancePacker::new(4);
        let cfg = EmitterConfig {
            spawn_count: 1,
            lifetime: 5.0,
            scale: 0.5,
            random_velocity: false,
            ..Default::default()
        };
        let mut rng = JitterRng::new(5);
        pool.emit([1.0, 2.0, 3.0], 0.0, &cfg, &mut rng);

        let records = packer.pack(&pool, 0.0);
        let m = records[0].transform;
        assert_eq!(m[0][0], 0.5);
        assert_eq!(m[1][1], 0.5);
        assert_eq!(m[2][2], 0.5);
        assert_eq!(m[3], [1.0, 2.0, 3.0, 1.0]);
        // No rotation: off-diagonal basis entries stay zero
        assert_eq!(m[0][1], 0.0);
        assert_eq!(m[1][0], 0.0);
    }

    #[test]
    fn repeated_pack_on_empty_pool_returns_nothing() {
        let pool = ParticlePool::new(4);
        let mut packer = InstancePacker::new(4);
        for _ in 0..3 {
            assert!(packer.pack(&pool, 1.0).is_empty());
        }
    }

    #[test]
    fn lerp_color_endpoints() {
        let a = [0.0, 0.2, 0.4, 1.0];
        let b = [1.0, 0.8, 0.6, 0.0];
        assert_eq!(lerp_color(a, b, 0.0), a);
        assert_eq!(lerp_color(a, b, 1.0), b);
        let mid = lerp_color(a, b, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }
}
