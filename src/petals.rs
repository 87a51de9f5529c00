//! Falling petal rain.
//!
//! Petals are always falling. When one drops below the ground it is lifted
//! back to the reset height at a fresh random (x, z), so the rain never runs
//! out and never allocates.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::PetalSettings;
use crate::instances::{Category, InstanceBatch};
use crate::pool::{FrameContext, ParticleSystem};
use crate::spawn::SpawnRng;

/// One falling petal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Petal {
    pub position: Vec3,
    /// Fall distance per frame.
    pub fall_speed: f32,
    /// Rotation about X.
    pub pitch: f32,
    /// Rotation about Z.
    pub roll: f32,
    /// Shared advance of both angles per frame.
    pub spin: f32,
    /// Batch this petal renders into.
    pub category: Category,
    pub slot: usize,
}

/// Fixed set of petals split evenly across two batches.
///
/// Even indices render into the Primary batch, odd indices into Secondary,
/// each at slot `index / 2`.
#[derive(Debug, Clone)]
pub struct PetalRain {
    petals: Vec<Petal>,
    batches: [InstanceBatch; 2],
    settings: PetalSettings,
}

impl PetalRain {
    /// Scatter `settings.count` petals through the air column.
    pub fn new(settings: &PetalSettings, rng: &mut SpawnRng) -> Self {
        let count = settings.count;
        let per_batch = count.div_ceil(2);

        let petals: Vec<Petal> = (0..count)
            .map(|i| {
                let position = rng.random_in_column(
                    settings.region,
                    settings.spawn_min_height,
                    settings.spawn_max_height,
                );
                Petal {
                    position,
                    fall_speed: rng.random_range(settings.fall_min, settings.fall_max),
                    pitch: rng.random() * std::f32::consts::PI,
                    roll: rng.random() * std::f32::consts::PI,
                    spin: rng.jitter(settings.spin),
                    category: if i % 2 == 0 { Category::Primary } else { Category::Secondary },
                    slot: i / 2,
                }
            })
            .collect();

        let primary = count - count / 2;
        let mut rain = Self {
            petals,
            batches: [
                InstanceBatch::filled(per_batch, primary),
                InstanceBatch::filled(per_batch, count / 2),
            ],
            settings: settings.clone(),
        };
        rain.write_transforms();
        rain
    }

    /// All petals in index order.
    pub fn petals(&self) -> &[Petal] {
        &self.petals
    }

    /// Transforms for one petal batch.
    pub fn batch(&self, category: Category) -> &InstanceBatch {
        &self.batches[category.index()]
    }

    pub fn batch_mut(&mut self, category: Category) -> &mut InstanceBatch {
        &mut self.batches[category.index()]
    }

    fn write_transforms(&mut self) {
        for petal in &self.petals {
            self.batches[petal.category.index()].set(petal.slot, transform(petal));
        }
    }
}

impl ParticleSystem for PetalRain {
    fn capacity(&self) -> usize {
        self.petals.len()
    }

    fn live_count(&self) -> usize {
        self.petals.len()
    }

    fn tick(&mut self, _frame: &FrameContext, rng: &mut SpawnRng) {
        let s = &self.settings;
        for petal in &mut self.petals {
            petal.position.y -= petal.fall_speed;
            petal.pitch += petal.spin;
            petal.roll += petal.spin;

            if petal.position.y < 0.0 {
                let xz = rng.random_in_square(s.region);
                petal.position = Vec3::new(xz.x, s.reset_height, xz.y);
            }

            self.batches[petal.category.index()].set(petal.slot, transform(petal));
        }
    }
}

fn transform(petal: &Petal) -> Mat4 {
    Mat4::from_rotation_translation(
        Quat::from_euler(EulerRot::XYZ, petal.pitch, 0.0, petal.roll),
        petal.position,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FrameContext {
        FrameContext { time: 0.0, delta: 1.0 / 60.0, frame: 1 }
    }

    #[test]
    fn test_split_across_batches() {
        let settings = PetalSettings { count: 7, ..PetalSettings::default() };
        let rain = PetalRain::new(&settings, &mut SpawnRng::new(Some(1)));

        assert_eq!(rain.batch(Category::Primary).capacity(), 4);
        assert_eq!(rain.batch(Category::Primary).visible(), 4);
        assert_eq!(rain.batch(Category::Secondary).visible(), 3);
        assert_eq!(rain.petals()[5].category, Category::Secondary);
        assert_eq!(rain.petals()[5].slot, 2);
    }

    #[test]
    fn test_initial_placement_in_column() {
        let settings = PetalSettings::default();
        let rain = PetalRain::new(&settings, &mut SpawnRng::new(Some(2)));
        for p in rain.petals() {
            assert!(p.position.x.abs() <= 150.0 && p.position.z.abs() <= 150.0);
            assert!(p.position.y >= 10.0 && p.position.y < 110.0);
            assert!(p.fall_speed >= 0.1 && p.fall_speed < 0.3);
        }
    }

    #[test]
    fn test_petal_recycles_below_ground() {
        let settings = PetalSettings { count: 2, ..PetalSettings::default() };
        let mut rng = SpawnRng::new(Some(3));
        let mut rain = PetalRain::new(&settings, &mut rng);
        rain.petals[0].position.y = 0.05;
        rain.petals[0].fall_speed = 0.1;

        rain.tick(&frame(), &mut rng);

        let p = rain.petals()[0];
        assert_eq!(p.position.y, settings.reset_height);
        assert!(p.position.x.abs() <= 150.0 && p.position.z.abs() <= 150.0);
        assert_eq!(rain.live_count(), 2);
    }

    #[test]
    fn test_never_loses_petals_over_long_run() {
        let settings = PetalSettings { count: 50, ..PetalSettings::default() };
        let mut rng = SpawnRng::new(Some(4));
        let mut rain = PetalRain::new(&settings, &mut rng);
        for _ in 0..3_000 {
            rain.tick(&frame(), &mut rng);
        }
        assert_eq!(rain.live_count(), 50);
        assert!(rain.petals().iter().all(|p| p.position.y >= 0.0 && p.position.y <= 110.0));
    }

    #[test]
    fn test_spin_advances_both_angles() {
        let settings = PetalSettings { count: 1, ..PetalSettings::default() };
        let mut rng = SpawnRng::new(Some(5));
        let mut rain = PetalRain::new(&settings, &mut rng);
        let before = rain.petals()[0];
        rain.tick(&frame(), &mut rng);
        let after = rain.petals()[0];
        assert!((after.pitch - before.pitch - before.spin).abs() < 1e-6);
        assert!((after.roll - before.roll - before.spin).abs() < 1e-6);
    }
}
