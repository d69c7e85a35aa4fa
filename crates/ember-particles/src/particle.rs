//! Particle state and the bounded pool
//!
//! The pool is a swap-remove arena: alive particles occupy a contiguous
//! prefix of a capacity-sized `Vec`, so killing a particle is O(1) and a
//! frame's work is proportional to the alive count, never to capacity.

use crate::config::EmitterConfig;
use crate::rand::JitterRng;

/// CPU-side particle state. Owned exclusively by the pool while alive.
#[derive(Clone)]
pub struct Particle {
    pub start_color: [f32; 4],
    pub end_color: [f32; 4],
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub acceleration: [f32; 3],
    /// Simulation-clock timestamp at emission
    pub created_at: f32,
    pub lifetime: f32,
    /// Reserved: assigned at spawn but not applied to the transform
    pub rotation_speed: f32,
    pub scale: f32,
    /// Transient, recomputed each advance; the alive prefix is authoritative
    pub alive: bool,
}

impl Particle {
    pub fn dead() -> Self {
        Self {
            start_color: [0.0; 4],
            end_color: [0.0; 4],
            position: [0.0; 3],
            velocity: [0.0; 3],
            acceleration: [0.0; 3],
            created_at: 0.0,
            lifetime: 0.0,
            rotation_speed: 0.0,
            scale: 0.0,
            alive: false,
        }
    }

    pub fn age(&self, now: f32) -> f32 {
        now - self.created_at
    }

    /// Normalized age in [0, 1]
    pub fn progress(&self, now: f32) -> f32 {
        if self.lifetime <= 0.0 {
            1.0
        } else {
            (self.age(now) / self.lifetime).clamp(0.0, 1.0)
        }
    }
}

/// Fixed-capacity pool with bounded admission and swap-remove compaction.
pub struct ParticlePool {
    particles: Vec<Particle>,
    alive_count: usize,
    /// Spawn requests refused because the pool was full (steady-state
    /// throttling under sustained emission, not an error)
    dropped: u64,
}

impl ParticlePool {
    /// A zero-capacity pool can never hold a particle; that is a
    /// construction-time defect, not a runtime condition.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "particle pool capacity must be non-zero");
        let mut particles = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            particles.push(Particle::dead());
        }
        Self {
            particles,
            alive_count: 0,
            dropped: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Total spawn requests refused at capacity since construction
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Claim the next free slot, or None when the pool is full.
    fn spawn(&mut self) -> Option<&mut Particle> {
        if self.alive_count >= self.particles.len() {
            return None;
        }
        let idx = self.alive_count;
        self.particles[idx].alive = true;
        self.alive_count += 1;
        Some(&mut self.particles[idx])
    }

    /// Spawn up to `config.spawn_count` particles at `origin`, returning the
    /// number actually admitted. Stops at capacity; the remainder of the
    /// request is dropped and counted. Non-positive spawn count is a no-op.
    pub fn emit(
        &mut self,
        origin: [f32; 3],
        now: f32,
        config: &EmitterConfig,
        rng: &mut JitterRng,
    ) -> usize {
        if config.spawn_count <= 0 {
            return 0;
        }

        let requested = config.spawn_count as usize;
        let mut admitted = 0;
        while admitted < requested {
            let Some(p) = self.spawn() else {
                break;
            };
            p.position = origin;
            p.velocity = if config.random_velocity {
                [rng.jitter(), rng.jitter(), rng.jitter()]
            } else {
                config.initial_velocity
            };
            p.acceleration = if config.random_acceleration {
                [
                    rng.jitter() / 10.0,
                    rng.jitter() / 10.0,
                    rng.jitter() / 10.0,
                ]
            } else {
                config.acceleration
            };
            p.created_at = now;
            p.lifetime = config.lifetime;
            p.rotation_speed = rng.jitter() * 10000.0;
            p.scale = config.scale;
            p.start_color = config.start_color;
            p.end_color = config.end_color;
            admitted += 1;
        }

        self.dropped += (requested - admitted) as u64;
        admitted
    }

    /// One simulation step at simulation time `now`: recompute liveness for
    /// every alive particle, integrate the survivors, then compact. The step
    /// size is one frame — velocity and acceleration are in per-frame units.
    pub fn advance(&mut self, now: f32) {
        if self.alive_count == 0 {
            return;
        }

        for p in &mut self.particles[..self.alive_count] {
            if p.age(now) >= p.lifetime {
                p.alive = false;
                continue;
            }
            p.position[0] += p.velocity[0];
            p.position[1] += p.velocity[1];
            p.position[2] += p.velocity[2];
            p.velocity[0] += p.acceleration[0];
            p.velocity[1] += p.acceleration[1];
            p.velocity[2] += p.acceleration[2];
        }

        self.compact();
    }

    /// Swap-remove every particle marked expired out of the alive prefix.
    pub fn compact(&mut self) {
        let mut i = 0;
        while i < self.alive_count {
            if !self.particles[i].alive {
                self.alive_count -= 1;
                if i < self.alive_count {
                    self.particles.swap(i, self.alive_count);
                }
                // Don't increment i — the swapped-in particle needs checking
            } else {
                i += 1;
            }
        }
    }

    /// The alive prefix, valid until the next emit/advance
    pub fn alive_slice(&self) -> &[Particle] {
        &self.particles[..self.alive_count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(spawn_count: i32, lifetime: f32) -> EmitterConfig {
        EmitterConfig {
            spawn_count,
            lifetime,
            random_velocity: false,
            ..Default::default()
        }
    }

    #[test]
    fn emit_admits_up_to_capacity() {
        let mut pool = ParticlePool::new(10);
        let mut rng = JitterRng::new(1);

        // Request more than fits: exactly capacity admitted, rest dropped
        let admitted = pool.emit([0.0; 3], 0.0, &config(25, 1.0), &mut rng);
        assert_eq!(admitted, 10);
        assert_eq!(pool.alive_count(), 10);
        assert_eq!(pool.dropped(), 15);

        // A full pool refuses everything without error
        let admitted = pool.emit([0.0; 3], 0.0, &config(5, 1.0), &mut rng);
        assert_eq!(admitted, 0);
        assert_eq!(pool.alive_count(), 10);
        assert_eq!(pool.dropped(), 20);
    }

    #[test]
    fn alive_count_never_exceeds_capacity() {
        let mut pool = ParticlePool::new(7);
        let mut rng = JitterRng::new(3);
        for frame in 0..50 {
            pool.emit([0.0; 3], frame as f32 * 0.1, &config(3, 0.5), &mut rng);
            assert!(pool.alive_count() <= pool.capacity());
            pool.advance(frame as f32 * 0.1);
            assert!(pool.alive_count() <= pool.capacity());
        }
    }

    #[test]
    fn non_positive_spawn_count_is_noop() {
        let mut pool = ParticlePool::new(4);
        let mut rng = JitterRng::new(1);
        assert_eq!(pool.emit([0.0; 3], 0.0, &config(0, 1.0), &mut rng), 0);
        assert_eq!(pool.emit([0.0; 3], 0.0, &config(-3, 1.0), &mut rng), 0);
        assert_eq!(pool.alive_count(), 0);
        assert_eq!(pool.dropped(), 0);
    }

    #[test]
    fn particle_lives_until_exactly_lifetime() {
        let mut pool = ParticlePool::new(10);
        let mut rng = JitterRng::new(1);
        pool.emit([0.0; 3], 0.0, &config(5, 2.0), &mut rng);

        pool.advance(1.0);
        assert_eq!(pool.alive_count(), 5);
        pool.advance(1.999);
        assert_eq!(pool.alive_count(), 5);
        // age == lifetime expires
        pool.advance(2.0);
        assert_eq!(pool.alive_count(), 0);
    }

    #[test]
    fn zero_lifetime_expires_on_next_advance() {
        let mut pool = ParticlePool::new(4);
        let mut rng = JitterRng::new(1);
        pool.emit([0.0; 3], 1.0, &config(2, 0.0), &mut rng);
        // Not expired at emit time, only once advanced
        assert_eq!(pool.alive_count(), 2);
        pool.advance(1.0);
        assert_eq!(pool.alive_count(), 0);
    }

    #[test]
    fn advance_on_empty_pool_is_noop() {
        let mut pool = ParticlePool::new(4);
        pool.advance(0.0);
        pool.advance(100.0);
        assert_eq!(pool.alive_count(), 0);
    }

    #[test]
    fn euler_integration_per_frame_step() {
        let mut pool = ParticlePool::new(1);
        let mut rng = JitterRng::new(1);
        let cfg = EmitterConfig {
            spawn_count: 1,
            lifetime: 10.0,
            random_velocity: false,
            random_acceleration: false,
            initial_velocity: [1.0, 0.0, 0.0],
            acceleration: [0.0, 0.5, 0.0],
            ..Default::default()
        };
        pool.emit([0.0; 3], 0.0, &cfg, &mut rng);

        // position += velocity, then velocity += acceleration, once per advance
        pool.advance(1.0);
        let p = &pool.alive_slice()[0];
        assert_eq!(p.position, [1.0, 0.0, 0.0]);
        assert_eq!(p.velocity, [1.0, 0.5, 0.0]);

        pool.advance(2.0);
        let p = &pool.alive_slice()[0];
        assert_eq!(p.position, [2.0, 0.5, 0.0]);
        assert_eq!(p.velocity, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn compaction_keeps_survivors() {
        let mut pool = ParticlePool::new(8);
        let mut rng = JitterRng::new(1);
        // Two generations with different lifetimes
        pool.emit([1.0, 0.0, 0.0], 0.0, &config(3, 1.0), &mut rng);
        pool.emit([2.0, 0.0, 0.0], 0.0, &config(3, 5.0), &mut rng);
        assert_eq!(pool.alive_count(), 6);

        pool.advance(2.0);
        assert_eq!(pool.alive_count(), 3);
        for p in pool.alive_slice() {
            assert!((p.lifetime - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn jittered_spawn_is_deterministic_per_seed() {
        let run = |seed| {
            let mut pool = ParticlePool::new(4);
            let mut rng = JitterRng::new(seed);
            let cfg = EmitterConfig {
                spawn_count: 4,
                random_velocity: true,
                ..Default::default()
            };
            pool.emit([0.0; 3], 0.0, &cfg, &mut rng);
            pool.alive_slice()
                .iter()
                .map(|p| p.velocity)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn zero_capacity_is_a_defect() {
        let _ = ParticlePool::new(0);
    }
}
