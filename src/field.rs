//! Procedural field generation.
//!
//! Instances are scattered uniformly over a disk and split into two
//! categories by an implicit heart curve:
//!
//! ```text
//! nx =  (x / scale) * stretch
//! ny = -(z / scale) * stretch
//! (nx² + ny² - 1)³ - nx²·ny³ <= 0   =>  Primary
//! ```
//!
//! Points exactly on the curve count as Primary. The same [`HeartShape`] is
//! the single source of truth for the silhouette everywhere in the crate.

use glam::Vec2;

use crate::config::FieldSettings;
use crate::instances::{Category, InstanceStore};
use crate::spawn::SpawnRng;

/// Evaluate the heart curve at a normalized point.
///
/// Negative inside the silhouette, zero on its boundary, positive outside.
/// Evaluated in f64 so boundary decisions match a double-precision reference.
#[inline]
pub fn heart_value(nx: f64, ny: f64) -> f64 {
    let nx2 = nx * nx;
    (nx2 + ny * ny - 1.0).powi(3) - nx2 * ny.powi(3)
}

/// The heart silhouette scaled into world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartShape {
    pub scale: f32,
    pub stretch: f32,
}

impl HeartShape {
    /// Shape described by the field settings.
    pub fn from_settings(settings: &FieldSettings) -> Self {
        Self {
            scale: settings.shape_scale,
            stretch: settings.shape_stretch,
        }
    }

    /// Map a world point (x, z) into curve space.
    #[inline]
    pub fn normalize(&self, x: f32, z: f32) -> (f64, f64) {
        let scale = self.scale as f64;
        let stretch = self.stretch as f64;
        let nx = (x as f64 / scale) * stretch;
        let ny = -(z as f64 / scale) * stretch;
        (nx, ny)
    }

    /// Category of a world point.
    #[inline]
    pub fn classify(&self, x: f32, z: f32) -> Category {
        let (nx, ny) = self.normalize(x, z);
        if heart_value(nx, ny) <= 0.0 {
            Category::Primary
        } else {
            Category::Secondary
        }
    }
}

/// Places the field once at startup.
#[derive(Debug, Clone)]
pub struct FieldGenerator {
    settings: FieldSettings,
    shape: HeartShape,
}

impl FieldGenerator {
    /// Create a generator for the given field settings.
    pub fn new(settings: &FieldSettings) -> Self {
        Self {
            settings: settings.clone(),
            shape: HeartShape::from_settings(settings),
        }
    }

    /// The silhouette used for classification.
    pub fn shape(&self) -> HeartShape {
        self.shape
    }

    /// Run `instance_count` placement attempts and return the populated store.
    ///
    /// A point whose category batch is already full is dropped silently.
    pub fn generate(&self, rng: &mut SpawnRng) -> InstanceStore {
        let settings = &self.settings;
        let mut store = InstanceStore::new(settings.capacity(), settings.height);

        for _ in 0..settings.instance_count {
            let point: Vec2 = rng.random_in_disk(settings.radius);
            let category = self.shape.classify(point.x, point.y);
            let yaw = rng.random_angle();
            let scale = rng.random_range(settings.scale_min, settings.scale_max);
            store.place(point, yaw, scale, category);
        }

        let summary = store.summary();
        log::info!(
            "Field generated: {} primary, {} secondary, {} dropped",
            summary.primary,
            summary.secondary,
            summary.dropped
        );
        store
    }
}
