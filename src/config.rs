//! Scene configuration.
//!
//! [`SceneConfig`] gathers every tunable constant of the field, the particle
//! pools, the camera and the asset locations. Defaults reproduce the
//! reference scene exactly; any section can be overridden from a JSON file:
//!
//! ```json
//! {
//!     "seed": 7,
//!     "field": { "instance_count": 5000 },
//!     "hover": { "capacity": 200 }
//! }
//! ```
//!
//! Missing sections and fields fall back to their defaults.
//!
//! The builder methods follow the same chaining style as the rest of the
//! crate:
//!
//! ```ignore
//! let config = SceneConfig::default()
//!     .with_instance_count(2_000)
//!     .with_seed(42);
//! ```

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Convert a `0xRRGGBB` colour into an RGB vector with channels in 0-1.
pub fn hex_to_rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Top-level scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SceneConfig {
    /// Seed for every random draw. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub field: FieldSettings,
    pub sway: SwaySettings,
    pub swell: SwellSettings,
    pub hover: HoverSettings,
    pub petals: PetalSettings,
    pub fireflies: FireflySettings,
    pub camera: CameraSettings,
    pub palette: PaletteSettings,
    pub assets: AssetSettings,
}

/// Placement of the flower field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Radius of the disk instances are sampled from.
    pub radius: f32,
    /// Number of placement attempts (and default capacity of each batch).
    pub instance_count: usize,
    /// Per-batch slot capacity. Defaults to `instance_count`.
    pub batch_capacity: Option<usize>,
    /// World size of the heart silhouette.
    pub shape_scale: f32,
    /// Multiplier applied after dividing by `shape_scale`.
    pub shape_stretch: f32,
    /// Fixed height of every instance above the ground plane.
    pub height: f32,
    /// Lower bound of the random base scale.
    pub scale_min: f32,
    /// Upper bound (exclusive) of the random base scale.
    pub scale_max: f32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            radius: 220.0,
            instance_count: 25_000,
            batch_capacity: None,
            shape_scale: 85.0,
            shape_stretch: 1.5,
            height: 0.1,
            scale_min: 1.5,
            scale_max: 2.5,
        }
    }
}

impl FieldSettings {
    /// Slot capacity of each category batch.
    pub fn capacity(&self) -> usize {
        self.batch_capacity.unwrap_or(self.instance_count)
    }
}

/// Ambient wind applied as a rotational perturbation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwaySettings {
    /// Peak sway angle in radians.
    pub amplitude: f32,
    /// Phase offset per world unit along x / z.
    pub spatial_frequency: f32,
    /// Slow yaw drift in radians per second.
    pub yaw_drift: f32,
}

impl Default for SwaySettings {
    fn default() -> Self {
        Self {
            amplitude: 0.1,
            spatial_frequency: 0.4,
            yaw_drift: 0.05,
        }
    }
}

/// Cursor-driven swell of nearby instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwellSettings {
    /// Planar distance below which an instance swells.
    pub radius: f32,
    /// Target scale multiplier while swelling.
    pub factor: f32,
    /// EMA weight kept from the previous scale each frame.
    pub smoothing: f32,
    /// Per-frame probability that a swelling instance emits a sparkle.
    pub spawn_chance: f32,
    /// Height sparkles are emitted at.
    pub spawn_height: f32,
}

impl Default for SwellSettings {
    fn default() -> Self {
        Self {
            radius: 25.0,
            factor: 1.3,
            smoothing: 0.9,
            spawn_chance: 0.05,
            spawn_height: 2.0,
        }
    }
}

/// Hover sparkle pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverSettings {
    pub capacity: usize,
    /// Life removed per frame.
    pub decay: f32,
    /// Full width of the horizontal spawn jitter.
    pub jitter: f32,
    /// Full width of the horizontal velocity jitter.
    pub drift: f32,
    pub rise_min: f32,
    pub rise_max: f32,
    /// Height inactive slots are parked at.
    pub hidden_y: f32,
    /// Point sprite size.
    pub size: f32,
}

impl Default for HoverSettings {
    fn default() -> Self {
        Self {
            capacity: 600,
            decay: 0.02,
            jitter: 1.0,
            drift: 0.1,
            rise_min: 0.1,
            rise_max: 0.25,
            hidden_y: -500.0,
            size: 2.5,
        }
    }
}

/// Falling petal rain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetalSettings {
    pub count: usize,
    /// Side length of the square petals are scattered over.
    pub region: f32,
    /// Height a petal is reset to after reaching the ground.
    pub reset_height: f32,
    pub spawn_min_height: f32,
    pub spawn_max_height: f32,
    pub fall_min: f32,
    pub fall_max: f32,
    /// Full width of the random spin speed.
    pub spin: f32,
    /// Edge length of a petal quad.
    pub size: f32,
}

impl Default for PetalSettings {
    fn default() -> Self {
        Self {
            count: 800,
            region: 300.0,
            reset_height: 100.0,
            spawn_min_height: 10.0,
            spawn_max_height: 110.0,
            fall_min: 0.1,
            fall_max: 0.3,
            spin: 0.1,
            size: 0.8,
        }
    }
}

/// Ambient fireflies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireflySettings {
    pub count: usize,
    /// Side length of the square fireflies start in.
    pub spread: f32,
    pub max_height: f32,
    pub horizontal_rate: f32,
    pub vertical_rate: f32,
    pub horizontal_step: f32,
    pub vertical_step: f32,
    pub size: f32,
    pub color: u32,
    pub opacity: f32,
}

impl Default for FireflySettings {
    fn default() -> Self {
        Self {
            count: 1500,
            spread: 400.0,
            max_height: 150.0,
            horizontal_rate: 0.5,
            vertical_rate: 0.3,
            horizontal_step: 0.05,
            vertical_step: 0.02,
            size: 1.5,
            color: 0xffff88,
            opacity: 0.7,
        }
    }
}

/// Perspective camera and orbit limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub start_position: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            start_position: Vec3::new(0.0, 160.0, 0.0),
            min_distance: 5.0,
            max_distance: 600.0,
        }
    }
}

/// Scene colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
    pub background: u32,
    pub fog: u32,
    pub fog_density: f32,
    pub primary_sparkle: Vec3,
    pub secondary_sparkle: Vec3,
    pub label: u32,
    pub label_emissive: u32,
    pub highlight_emissive: u32,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        Self {
            background: 0xfff0f5,
            fog: 0xfff0f5,
            fog_density: 0.0035,
            primary_sparkle: Vec3::new(1.0, 0.2, 0.5),
            secondary_sparkle: Vec3::new(1.0, 0.9, 0.5),
            label: 0xe91e63,
            label_emissive: 0x880033,
            highlight_emissive: 0x550000,
        }
    }
}

/// Asset file locations, resolved against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    pub root: PathBuf,
    pub primary_texture: String,
    pub secondary_texture: String,
    pub model: String,
    pub font: String,
    pub label_text: String,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            primary_texture: "red.png".to_string(),
            secondary_texture: "white.png".to_string(),
            model: "rose.glb".to_string(),
            font: "droid_sans_bold.typeface.json".to_string(),
            label_text: "ONLY FOR YOU".to_string(),
        }
    }
}

impl AssetSettings {
    /// Resolve a file name relative to the asset root.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl SceneConfig {
    /// Parse a config from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of field placement attempts.
    pub fn with_instance_count(mut self, count: usize) -> Self {
        self.field.instance_count = count;
        self
    }

    /// Set the radius of the field disk.
    pub fn with_field_radius(mut self, radius: f32) -> Self {
        self.field.radius = radius;
        self
    }

    /// Cap each category batch below the instance count.
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.field.batch_capacity = Some(capacity);
        self
    }

    /// Set the hover sparkle pool capacity.
    pub fn with_hover_capacity(mut self, capacity: usize) -> Self {
        self.hover.capacity = capacity;
        self
    }

    /// Set the number of falling petals.
    pub fn with_petal_count(mut self, count: usize) -> Self {
        self.petals.count = count;
        self
    }

    /// Set the number of fireflies.
    pub fn with_firefly_count(mut self, count: usize) -> Self {
        self.fireflies.count = count;
        self
    }

    /// Set the directory assets are loaded from.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets.root = root.into();
        self
    }

    /// Check every value against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if !(field.radius > 0.0) {
            return Err(ConfigError::invalid("field.radius", "must be positive"));
        }
        if !(field.shape_scale > 0.0) {
            return Err(ConfigError::invalid("field.shape_scale", "must be positive"));
        }
        if field.instance_count == 0 {
            return Err(ConfigError::invalid("field.instance_count", "must be at least 1"));
        }
        if field.scale_min >= field.scale_max {
            return Err(ConfigError::invalid(
                "field.scale_min",
                format!("scale band [{}, {}) is empty", field.scale_min, field.scale_max),
            ));
        }
        if !(self.swell.radius > 0.0) {
            return Err(ConfigError::invalid("swell.radius", "must be positive"));
        }
        if !(self.swell.factor > 1.0) {
            return Err(ConfigError::invalid("swell.factor", "must be greater than 1.0"));
        }
        if !(self.swell.smoothing > 0.0 && self.swell.smoothing < 1.0) {
            return Err(ConfigError::invalid("swell.smoothing", "must be inside (0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.swell.spawn_chance) {
            return Err(ConfigError::invalid("swell.spawn_chance", "must be inside [0, 1]"));
        }
        if !(self.hover.decay > 0.0) {
            return Err(ConfigError::invalid("hover.decay", "must be positive"));
        }
        if self.hover.rise_min >= self.hover.rise_max {
            return Err(ConfigError::invalid("hover.rise_min", "rise range is empty"));
        }
        if self.petals.fall_min >= self.petals.fall_max || self.petals.fall_min <= 0.0 {
            return Err(ConfigError::invalid("petals.fall_min", "fall range must be positive and non-empty"));
        }
        if self.petals.spawn_min_height >= self.petals.spawn_max_height {
            return Err(ConfigError::invalid("petals.spawn_min_height", "height range is empty"));
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            return Err(ConfigError::invalid("camera.near", "requires 0 < near < far"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_scene() {
        let config = SceneConfig::default();
        assert_eq!(config.field.radius, 220.0);
        assert_eq!(config.field.instance_count, 25_000);
        assert_eq!(config.field.capacity(), 25_000);
        assert_eq!(config.hover.capacity, 600);
        assert_eq!(config.petals.count, 800);
        assert_eq!(config.fireflies.count, 1500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SceneConfig::from_json_str(
            r#"{ "seed": 3, "field": { "instance_count": 100 }, "hover": { "capacity": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.field.instance_count, 100);
        assert_eq!(config.field.radius, 220.0);
        assert_eq!(config.hover.capacity, 10);
        assert_eq!(config.hover.decay, 0.02);
    }

    #[test]
    fn test_rejects_swell_factor_not_above_one() {
        let json = r#"{ "swell": { "factor": 1.0 } }"#;
        match SceneConfig::from_json_str(json) {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "swell.factor"),
            other => panic!("expected invalid swell.factor, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            SceneConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let config = SceneConfig::default()
            .with_instance_count(10)
            .with_batch_capacity(4)
            .with_seed(9);
        assert_eq!(config.field.capacity(), 4);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_hex_to_rgb() {
        let c = hex_to_rgb(0xff8000);
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.y - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.z, 0.0);
    }
}
