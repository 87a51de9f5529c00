//! Ambient fireflies.
//!
//! Each firefly wanders by accumulating a sinusoidal offset keyed by elapsed
//! time and its own phase, so no velocity is stored. Positions are never
//! clamped; the swarm slowly drifts over long sessions.

use glam::Vec3;

use crate::config::FireflySettings;
use crate::pool::{FrameContext, ParticleSystem, PointBuffer};
use crate::spawn::SpawnRng;

#[derive(Debug, Clone)]
pub struct FireflySwarm {
    points: PointBuffer,
    phases: Vec<f32>,
    settings: FireflySettings,
}

impl FireflySwarm {
    pub fn new(settings: &FireflySettings, rng: &mut SpawnRng) -> Self {
        let mut positions = Vec::with_capacity(settings.count);
        let mut phases = Vec::with_capacity(settings.count);
        for _ in 0..settings.count {
            positions.push(rng.random_in_column(settings.spread, 0.0, settings.max_height));
            phases.push(rng.random_angle());
        }
        Self {
            points: PointBuffer::from_positions(positions),
            phases,
            settings: settings.clone(),
        }
    }

    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut PointBuffer {
        &mut self.points
    }

    /// Fixed phase of firefly `index`.
    pub fn phase(&self, index: usize) -> f32 {
        self.phases[index]
    }

    /// Offset applied to a firefly with phase `phase` at time `time`.
    pub fn drift(&self, time: f32, phase: f32) -> Vec3 {
        let s = &self.settings;
        let horizontal = (time * s.horizontal_rate + phase).sin() * s.horizontal_step;
        Vec3::new(
            horizontal,
            (time * s.vertical_rate + phase).cos() * s.vertical_step,
            horizontal,
        )
    }
}

impl ParticleSystem for FireflySwarm {
    fn capacity(&self) -> usize {
        self.phases.len()
    }

    fn live_count(&self) -> usize {
        self.phases.len()
    }

    fn tick(&mut self, frame: &FrameContext, _rng: &mut SpawnRng) {
        for index in 0..self.phases.len() {
            let offset = self.drift(frame.time, self.phases[index]);
            self.points.positions_mut()[index] += offset;
        }
    }
}
