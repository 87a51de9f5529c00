//! Random sampling helpers shared by the field generator and the pools.
//!
//! Every random draw in the scene goes through one [`SpawnRng`] owned by the
//! scene state, so a configured seed reproduces a run exactly.

use glam::{Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Seeded random source with helpers for common spawn patterns.
#[derive(Debug, Clone)]
pub struct SpawnRng {
    rng: SmallRng,
}

impl SpawnRng {
    /// Create a source seeded with `seed`, or from entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { rng }
    }

    /// Random f32 in [0, 1).
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in [min, max).
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    /// Random angle in [0, 2π).
    #[inline]
    pub fn random_angle(&mut self) -> f32 {
        self.random() * TAU
    }

    /// Bernoulli trial that succeeds with probability `p`.
    #[inline]
    pub fn chance(&mut self, p: f32) -> bool {
        self.random() < p
    }

    /// Symmetric jitter in [-width/2, width/2).
    #[inline]
    pub fn jitter(&mut self, width: f32) -> f32 {
        (self.random() - 0.5) * width
    }

    /// Random point inside a disk of given radius in the XZ plane.
    ///
    /// Uses `r = R * sqrt(u)` so density is uniform over the area instead of
    /// clustering at the centre.
    pub fn random_in_disk(&mut self, radius: f32) -> Vec2 {
        let r = self.random().sqrt() * radius;
        let theta = self.random_angle();
        Vec2::new(r * theta.cos(), r * theta.sin())
    }

    /// Random point inside an axis-aligned square centred at the origin.
    pub fn random_in_square(&mut self, side: f32) -> Vec2 {
        Vec2::new(self.jitter(side), self.jitter(side))
    }

    /// Random point in a box: square footprint of `side`, height in [min_y, max_y).
    pub fn random_in_column(&mut self, side: f32, min_y: f32, max_y: f32) -> Vec3 {
        let xz = self.random_in_square(side);
        Vec3::new(xz.x, self.random_range(min_y, max_y), xz.y)
    }
}
