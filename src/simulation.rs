//! Scene state and the per-frame simulator.
//!
//! [`FrameSimulator`] owns the whole [`SceneState`] and advances it one frame
//! at a time in a fixed order:
//!
//! 1. cursor ray to ground point
//! 2. field sway and swell (queues sparkle spawns)
//! 3. hover sparkles
//! 4. petals
//! 5. fireflies
//! 6. reveal sequence and camera
//!
//! [`FrameSimulator::present`] then hands every changed buffer to a
//! [`RenderBoundary`] and clears its dirty flag.

use glam::{Vec2, Vec3};

use crate::assets::AssetProvider;
use crate::camera::{Camera, OrbitControls};
use crate::config::SceneConfig;
use crate::error::ConfigError;
use crate::field::FieldGenerator;
use crate::fireflies::FireflySwarm;
use crate::instances::{Category, FieldFrame, InstanceBatch, InstanceStore};
use crate::petals::PetalRain;
use crate::pool::{FrameContext, HoverPool, ParticleSystem, PointBuffer};
use crate::probe::{InteractionProbe, CURSOR_SENTINEL};
use crate::reveal::{RevealSequencer, RevealView};
use crate::spawn::SpawnRng;
use crate::time::FrameClock;

/// Frames between pool occupancy debug lines.
const OCCUPANCY_LOG_INTERVAL: u64 = 300;

/// Which instanced batch a transform upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Field(Category),
    Petals(Category),
}

/// Which point cloud a position upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointsKind {
    Hover,
    Fireflies,
}

/// The opaque renderer as seen from the simulation.
///
/// Uploads are only issued for buffers whose dirty flag is set.
pub trait RenderBoundary {
    /// Transforms for one batch. Draw `batch.visible()` instances.
    fn upload_batch(&mut self, kind: BatchKind, batch: &InstanceBatch);

    /// Positions (and colours, for sparkles) for one point cloud.
    fn upload_points(&mut self, kind: PointsKind, points: &PointBuffer);

    fn set_camera(&mut self, camera: &Camera);

    /// Fog, field opacity, highlighted model, label and lights.
    fn set_reveal(&mut self, view: &RevealView<'_>);
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    pub frame: u64,
    pub ground: Option<Vec3>,
    /// Sparkle spawns requested by swelling instances.
    pub spawn_requests: usize,
    /// Requests that found a free slot.
    pub spawned: usize,
    pub hover_live: usize,
}

/// Buffers handed to the renderer by one present call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresentStats {
    pub batches: usize,
    pub point_clouds: usize,
}

/// All mutable scene data.
pub struct SceneState {
    pub config: SceneConfig,
    pub rng: SpawnRng,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub probe: InteractionProbe,
    pub field: InstanceStore,
    pub hover: HoverPool,
    pub petals: PetalRain,
    pub fireflies: FireflySwarm,
    pub reveal: RevealSequencer,
    /// Cursor in NDC, or [`CURSOR_SENTINEL`].
    pub cursor: Vec2,
    /// Ground point from the most recent frame.
    pub ground: Option<Vec3>,
}

impl SceneState {
    /// Validate the config, generate the field and allocate every pool.
    pub fn new(config: SceneConfig, provider: Box<dyn AssetProvider>) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = SpawnRng::new(config.seed);
        let field = FieldGenerator::new(&config.field).generate(&mut rng);
        let hover = HoverPool::new(&config.hover, &config.palette);
        let petals = PetalRain::new(&config.petals, &mut rng);
        let fireflies = FireflySwarm::new(&config.fireflies, &mut rng);
        let reveal = RevealSequencer::new(&config, provider);

        log::info!(
            "Scene ready: {} hover slots, {} petals, {} fireflies",
            hover.capacity(),
            petals.capacity(),
            fireflies.capacity()
        );

        Ok(Self {
            camera: Camera::new(&config.camera, 16.0 / 9.0),
            controls: OrbitControls::new(&config.camera),
            probe: InteractionProbe::new(config.field.radius),
            rng,
            field,
            hover,
            petals,
            fireflies,
            reveal,
            cursor: CURSOR_SENTINEL,
            ground: None,
            config,
        })
    }
}

/// Drives the scene one frame at a time.
pub struct FrameSimulator {
    state: SceneState,
    clock: FrameClock,
    spawn_queue: Vec<(Vec3, Category)>,
}

impl FrameSimulator {
    pub fn new(config: SceneConfig, provider: Box<dyn AssetProvider>) -> Result<Self, ConfigError> {
        let state = SceneState::new(config, provider)?;
        let queue_capacity = state.hover.capacity();
        Ok(Self {
            state,
            clock: FrameClock::new(),
            spawn_queue: Vec::with_capacity(queue_capacity),
        })
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Advance using wall time.
    pub fn step(&mut self) -> FrameReport {
        let frame = self.clock.update();
        self.step_with(frame)
    }

    /// Advance by exactly `delta` seconds.
    pub fn step_fixed(&mut self, delta: f32) -> FrameReport {
        let frame = self.clock.advance(delta);
        self.step_with(frame)
    }

    fn step_with(&mut self, frame: FrameContext) -> FrameReport {
        let s = &mut self.state;

        // 1. probe
        let ground = s.probe.ground_point(&s.camera, s.cursor);
        s.ground = ground;

        // 2. field
        let queue = &mut self.spawn_queue;
        queue.clear();
        let limit = queue.capacity();
        let field_frame = FieldFrame {
            time: frame.time,
            ground,
            sway: &s.config.sway,
            swell: &s.config.swell,
        };
        let mut spawn_requests = 0;
        s.field.update(&field_frame, &mut s.rng, |point, category| {
            spawn_requests += 1;
            // The pool cannot accept more than its capacity in one frame
            if queue.len() < limit {
                queue.push((point, category));
            }
        });

        // 3. hover sparkles: spawn queued requests, then age every slot
        let mut spawned = 0;
        for &(point, category) in queue.iter() {
            if s.hover.spawn(point, category, &mut s.rng).is_some() {
                spawned += 1;
            }
        }
        s.hover.tick(&frame, &mut s.rng);

        // 4. petals, 5. fireflies
        s.petals.tick(&frame, &mut s.rng);
        s.fireflies.tick(&frame, &mut s.rng);

        // 6. reveal
        s.reveal.update(frame.delta, s.cursor);
        s.controls.enabled = s.reveal.controls_enabled();
        if let Some(pose) = s.reveal.camera_pose() {
            s.camera.position = pose.position;
            s.camera.target = pose.look_at;
        }

        let report = FrameReport {
            frame: frame.frame,
            ground,
            spawn_requests,
            spawned,
            hover_live: s.hover.live_count(),
        };
        if frame.frame % OCCUPANCY_LOG_INTERVAL == 0 {
            log::debug!(
                "Frame {}: {} of {} sparkles live, ground {:?}",
                frame.frame,
                report.hover_live,
                s.hover.capacity(),
                ground
            );
        }
        report
    }

    /// Hand changed buffers to the renderer and acknowledge them.
    pub fn present<R: RenderBoundary + ?Sized>(&mut self, renderer: &mut R) -> PresentStats {
        let s = &mut self.state;
        let mut stats = PresentStats::default();

        renderer.set_camera(&s.camera);

        for category in Category::ALL {
            let batch = s.field.batch_mut(category);
            if batch.is_dirty() {
                renderer.upload_batch(BatchKind::Field(category), batch);
                batch.mark_clean();
                stats.batches += 1;
            }
            let batch = s.petals.batch_mut(category);
            if batch.is_dirty() {
                renderer.upload_batch(BatchKind::Petals(category), batch);
                batch.mark_clean();
                stats.batches += 1;
            }
        }

        let points = s.hover.points_mut();
        if points.is_dirty() {
            renderer.upload_points(PointsKind::Hover, points);
            points.mark_clean();
            stats.point_clouds += 1;
        }
        let points = s.fireflies.points_mut();
        if points.is_dirty() {
            renderer.upload_points(PointsKind::Fireflies, points);
            points.mark_clean();
            stats.point_clouds += 1;
        }

        renderer.set_reveal(&s.reveal.view());
        stats
    }

    /// Update the cursor from window pixels, or reset it with `None`.
    pub fn set_cursor(&mut self, ndc: Option<Vec2>) {
        self.state.cursor = ndc.unwrap_or(CURSOR_SENTINEL);
    }

    /// Apply a drag and wheel delta through the orbit controls.
    pub fn orbit(&mut self, drag: Vec2, scroll: f32) {
        let s = &mut self.state;
        s.controls.apply(&mut s.camera, drag, scroll);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.state.camera.resize(width, height);
    }

    pub fn enter_field(&mut self) {
        let position = self.state.camera.position;
        self.state.reveal.enter_field(position);
    }

    pub fn trigger_final_reveal(&mut self) {
        let position = self.state.camera.position;
        self.state.reveal.trigger_final_reveal(position);
    }

    pub fn dismiss(&mut self) {
        self.state.reveal.dismiss();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetSignal, FontHandle, ModelHandle};

    struct NoAssets;

    impl AssetProvider for NoAssets {
        fn request_model(&self) -> AssetSignal<ModelHandle> {
            AssetSignal::ready("model", ModelHandle::new("model", vec![0]))
        }

        fn request_font(&self) -> AssetSignal<FontHandle> {
            AssetSignal::ready("font", FontHandle::from_bytes("font", b"{}"))
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        batches: Vec<(BatchKind, usize)>,
        points: Vec<(PointsKind, usize)>,
        reveals: usize,
    }

    impl RenderBoundary for CountingRenderer {
        fn upload_batch(&mut self, kind: BatchKind, batch: &InstanceBatch) {
            self.batches.push((kind, batch.visible()));
        }

        fn upload_points(&mut self, kind: PointsKind, points: &PointBuffer) {
            self.points.push((kind, points.len()));
        }

        fn set_camera(&mut self, _camera: &Camera) {}

        fn set_reveal(&mut self, _view: &RevealView<'_>) {
            self.reveals += 1;
        }
    }

    fn small_config() -> SceneConfig {
        SceneConfig::default()
            .with_seed(9)
            .with_instance_count(2_000)
            .with_petal_count(40)
            .with_firefly_count(30)
    }

    fn simulator() -> FrameSimulator {
        FrameSimulator::new(small_config(), Box::new(NoAssets)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SceneConfig::default().with_field_radius(-1.0);
        assert!(FrameSimulator::new(config, Box::new(NoAssets)).is_err());
    }

    #[test]
    fn test_no_cursor_no_spawns() {
        let mut sim = simulator();
        for _ in 0..30 {
            let report = sim.step_fixed(1.0 / 60.0);
            assert_eq!(report.ground, None);
            assert_eq!(report.spawn_requests, 0);
        }
        assert_eq!(sim.state().hover.live_count(), 0);
    }

    #[test]
    fn test_centered_cursor_spawns_sparkles() {
        let mut sim = simulator();
        sim.set_cursor(Some(Vec2::ZERO));
        let mut spawned = 0;
        for _ in 0..60 {
            let report = sim.step_fixed(1.0 / 60.0);
            assert!(report.ground.is_some());
            spawned += report.spawned;
        }
        assert!(spawned > 0);
        assert!(sim.state().hover.live_count() <= sim.state().hover.capacity());
    }

    #[test]
    fn test_present_uploads_only_dirty_buffers() {
        let mut sim = simulator();
        let mut renderer = CountingRenderer::default();

        let first = sim.present(&mut renderer);
        assert_eq!(first.batches, 4);
        assert_eq!(first.point_clouds, 2);

        // Nothing changed since the last present
        let again = sim.present(&mut renderer);
        assert_eq!(again, PresentStats::default());
        assert_eq!(renderer.reveals, 2);

        // A frame with no active sparkles leaves the hover buffer clean
        sim.step_fixed(1.0 / 60.0);
        let stats = sim.present(&mut renderer);
        assert_eq!(stats.batches, 4);
        assert_eq!(stats.point_clouds, 1);
    }

    #[test]
    fn test_reveal_drives_camera() {
        let mut sim = simulator();
        sim.trigger_final_reveal();
        for _ in 0..320 {
            sim.step_fixed(1.0 / 60.0);
        }
        let camera = &sim.state().camera;
        assert!((camera.position - Vec3::new(0.0, 2.0, 20.0)).length() < 1e-3);
        assert_eq!(camera.target, Vec3::new(0.0, 5.0, 0.0));
        assert!(!sim.state().controls.enabled);
    }

    #[test]
    fn test_cursor_reset_to_sentinel() {
        let mut sim = simulator();
        sim.set_cursor(Some(Vec2::new(0.2, 0.1)));
        sim.set_cursor(None);
        assert_eq!(sim.state().cursor, CURSOR_SENTINEL);
    }
}
