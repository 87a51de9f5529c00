//! # Petalfield
//!
//! A heart-shaped field of flowers with pooled particle effects and a
//! scripted reveal, simulated on the CPU and drawn with wgpu.
//!
//! The simulation is independent of the window: [`FrameSimulator`] advances
//! the whole scene one frame at a time and hands changed buffers to anything
//! implementing [`RenderBoundary`]. The binary wires it to a winit window
//! and the [`gpu::SceneRenderer`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use petalfield::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = SceneConfig::default()
//!         .with_seed(7)
//!         .with_instance_count(10_000);
//!     petalfield::run(config)
//! }
//! ```
//!
//! ## Headless use
//!
//! ```ignore
//! let provider = FileAssets::new(&config.assets);
//! let mut sim = FrameSimulator::new(config, Box::new(provider))?;
//! sim.set_cursor(Some(Vec2::ZERO));
//! for _ in 0..60 {
//!     sim.step_fixed(1.0 / 60.0);
//! }
//! sim.present(&mut my_renderer);
//! ```
//!
//! ## Frame order
//!
//! Each frame runs, in order:
//!
//! 1. [`InteractionProbe`]: cursor ray to a ground point, or none
//! 2. [`InstanceStore`]: wind sway and hover swell, queueing sparkle spawns
//! 3. [`HoverPool`]: spawn queued sparkles, then age and move the live ones
//! 4. [`PetalRain`]: fall, spin and recycle
//! 5. [`FireflySwarm`]: drift
//! 6. [`RevealSequencer`]: tweens, asset polling and the highlighted model
//!
//! ## Pools
//!
//! Every particle system allocates its slots once. A sparkle spawn with no
//! free slot is dropped silently; petals and fireflies never die and are
//! recycled in place.
//!
//! ## Logging
//!
//! The library logs through the `log` facade. The binary installs
//! `env_logger`; set `RUST_LOG=petalfield=debug` for per-frame pool
//! occupancy.

pub mod assets;
pub mod camera;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod fireflies;
pub mod gpu;
pub mod input;
pub mod instances;
pub mod petals;
pub mod pool;
pub mod probe;
pub mod reveal;
pub mod simulation;
pub mod spawn;
pub mod textures;
pub mod time;
pub mod tween;
mod window;

pub use glam::{Mat4, Vec2, Vec3};

pub use assets::{AssetProvider, AssetSignal, AssetState, FileAssets, FontHandle, LabelMesh, ModelHandle};
pub use camera::{Camera, OrbitControls};
pub use config::SceneConfig;
pub use diagnostics::{guard_frame, install_panic_hook};
pub use error::{AppError, AssetError, ConfigError, GpuError, TextureError};
pub use field::{FieldGenerator, HeartShape};
pub use fireflies::FireflySwarm;
pub use instances::{Category, InstanceBatch, InstanceStore};
pub use petals::PetalRain;
pub use pool::{FrameContext, HoverPool, ParticleSystem, PointBuffer};
pub use probe::{InteractionProbe, CURSOR_SENTINEL};
pub use reveal::{RevealEvent, RevealPhase, RevealSequencer, RevealView};
pub use simulation::{BatchKind, FrameReport, FrameSimulator, PointsKind, RenderBoundary, SceneState};
pub use spawn::SpawnRng;
pub use textures::{SceneTextures, TextureConfig};
pub use time::{FrameClock, MAX_FRAME_DELTA};
pub use tween::{Ease, Tween};
pub use window::run;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use petalfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assets::{AssetProvider, AssetSignal, FileAssets, FontHandle, ModelHandle};
    pub use crate::camera::Camera;
    pub use crate::config::SceneConfig;
    pub use crate::error::{AppError, ConfigError};
    pub use crate::instances::{Category, InstanceBatch};
    pub use crate::pool::{ParticleSystem, PointBuffer};
    pub use crate::reveal::{RevealEvent, RevealPhase, RevealView};
    pub use crate::simulation::{BatchKind, FrameSimulator, PointsKind, RenderBoundary};
    pub use crate::{Vec2, Vec3};
    #[cfg(feature = "egui")]
    pub use egui;
}
