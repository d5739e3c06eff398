//! Spawn point selection

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ws::protocol::Vec3;

/// Fixed spawn coordinates around the arena floor
pub const SPAWN_POINTS: [Vec3; 8] = [
    Vec3::new(-40.0, 1.0, -40.0),
    Vec3::new(40.0, 1.0, -40.0),
    Vec3::new(-40.0, 1.0, 40.0),
    Vec3::new(40.0, 1.0, 40.0),
    Vec3::new(0.0, 1.0, -35.0),
    Vec3::new(0.0, 1.0, 35.0),
    Vec3::new(-35.0, 1.0, 0.0),
    Vec3::new(35.0, 1.0, 0.0),
];

/// Picks spawn points uniformly, with replacement
pub struct SpawnAllocator {
    pool: &'static [Vec3],
    rng: ChaCha8Rng,
}

impl SpawnAllocator {
    /// `pool` must not be empty
    pub fn new(pool: &'static [Vec3], seed: u64) -> Self {
        assert!(!pool.is_empty(), "spawn pool must not be empty");
        Self {
            pool,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Default arena pool
    pub fn arena(seed: u64) -> Self {
        Self::new(&SPAWN_POINTS, seed)
    }

    pub fn next_spawn(&mut self) -> Vec3 {
        let idx = self.rng.gen_range(0..self.pool.len());
        self.pool[idx]
    }

    pub fn pool(&self) -> &[Vec3] {
        self.pool
    }
}
