//! The one-shot reveal sequence.
//!
//! ```text
//! Idle ──enter_field──▶ Entering ──camera settles──▶ Active
//!   │                      │                           │
//!   └───────────── trigger_final_reveal ───────────────┘
//!                          ▼
//!                      Revealing ──model placed──▶ Revealed ──dismiss──▶ Dismissed
//! ```
//!
//! Every trigger is guarded by the current phase; a call from any other phase
//! is logged and ignored, so repeated triggers never duplicate the highlight.
//! The highlighted model and the label come from the asset boundary. If a
//! preloaded asset is not ready when the spawn runs, a fresh load is
//! requested and the spawn completes whenever one of them arrives.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::assets::{AssetProvider, AssetSignal, AssetState, FontHandle, LabelMesh, ModelHandle};
use crate::config::SceneConfig;
use crate::probe::cursor_in_viewport;
use crate::tween::{Ease, Tween};

const ENTER_HEIGHT: f32 = 60.0;
const ENTER_DISTANCE: f32 = 50.0;
const ENTER_SECS: f32 = 3.0;

const REVEAL_FOG_DENSITY: f32 = 0.01;
const REVEAL_FOG_SECS: f32 = 4.0;
const REVEAL_CAMERA: Vec3 = Vec3::new(0.0, 2.0, 20.0);
const REVEAL_LOOK_AT: Vec3 = Vec3::new(0.0, 5.0, 0.0);
const REVEAL_CAMERA_SECS: f32 = 5.0;

const FIELD_FADE_OPACITY: f32 = 0.05;
const FIELD_FADE_SECS: f32 = 2.0;

const LABEL_SIZE: f32 = 1.5;
const LABEL_DEPTH: f32 = 0.2;
const LABEL_BASELINE: f32 = 6.5;

const MODEL_SCALE: f32 = 8.0;
const MODEL_START_Y: f32 = -5.0;
const MODEL_BOB_Y: f32 = -3.5;
const MODEL_PITCH: f32 = 0.5;
const MODEL_SWAY_YAW: f32 = 0.2;
const MODEL_TILT: f32 = 0.15;

const DISMISS_DELAY_SECS: f32 = 2.0;

/// Phase of the reveal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    Entering,
    Active,
    Revealing,
    Revealed,
    Dismissed,
}

/// Notifications delivered to the completion hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealEvent {
    /// The entry camera move finished.
    FieldEntered,
    /// `trigger_final_reveal` was accepted.
    RevealStarted,
    /// The highlighted model was placed.
    HighlightVisible,
    /// The dismiss affordance appeared.
    DismissAvailable,
    /// The highlight was dismissed.
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Spot,
    Point,
}

/// A light added by the reveal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: u32,
    pub intensity: f32,
    pub position: Vec3,
    /// Reach in world units.
    pub range: f32,
}

/// Camera position and look-at point while the sequence drives the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub look_at: Vec3,
}

struct CameraMove {
    tween: Tween<Vec3>,
    look_at: Vec3,
    /// Keep reporting the final pose after the move completes.
    hold: bool,
}

struct Highlight {
    handle: ModelHandle,
    scale: Tween<f32>,
    yaw: Tween<f32>,
    bob: Tween<f32>,
    pitch: f32,
    roll: f32,
}

impl Highlight {
    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale.value()),
            Quat::from_euler(EulerRot::XYZ, self.pitch, self.yaw.value(), self.roll),
            Vec3::new(0.0, self.bob.value(), 0.0),
        )
    }
}

struct Label {
    mesh: LabelMesh,
    scale: Tween<f32>,
}

/// Everything the renderer needs from the sequence this frame.
#[derive(Debug, Clone)]
pub struct RevealView<'a> {
    pub phase: RevealPhase,
    /// Opacity of both field batches.
    pub field_opacity: f32,
    pub fog_density: f32,
    pub camera: Option<CameraPose>,
    pub model: Option<(&'a ModelHandle, Mat4)>,
    pub label: Option<(&'a LabelMesh, Mat4)>,
    pub lights: &'a [Light],
    pub dismiss_visible: bool,
    pub label_color: u32,
    pub label_emissive: u32,
    pub highlight_emissive: u32,
}

/// The narrative state machine.
pub struct RevealSequencer {
    phase: RevealPhase,
    provider: Box<dyn AssetProvider>,
    hook: Option<Box<dyn FnMut(RevealEvent)>>,

    preloaded_model: AssetSignal<ModelHandle>,
    preloaded_font: AssetSignal<FontHandle>,
    fresh_model: Option<AssetSignal<ModelHandle>>,
    fresh_font: Option<AssetSignal<FontHandle>>,
    spawn_started: bool,

    controls_enabled: bool,
    camera: Option<CameraMove>,
    base_fog: f32,
    fog: Option<Tween<f32>>,
    field_opacity: Option<Tween<f32>>,

    model: Option<Highlight>,
    label: Option<Label>,
    lights: Vec<Light>,
    dismiss_timer: Option<f32>,
    dismiss_visible: bool,

    label_text: String,
    label_color: u32,
    label_emissive: u32,
    highlight_emissive: u32,
}

impl RevealSequencer {
    /// Create the sequencer and start preloading the model and font.
    pub fn new(config: &SceneConfig, provider: Box<dyn AssetProvider>) -> Self {
        let preloaded_model = provider.request_model();
        let preloaded_font = provider.request_font();
        Self {
            phase: RevealPhase::Idle,
            provider,
            hook: None,
            preloaded_model,
            preloaded_font,
            fresh_model: None,
            fresh_font: None,
            spawn_started: false,
            controls_enabled: false,
            camera: None,
            base_fog: config.palette.fog_density,
            fog: None,
            field_opacity: None,
            model: None,
            label: None,
            lights: Vec::new(),
            dismiss_timer: None,
            dismiss_visible: false,
            label_text: config.assets.label_text.clone(),
            label_color: config.palette.label,
            label_emissive: config.palette.label_emissive,
            highlight_emissive: config.palette.highlight_emissive,
        }
    }

    /// Install the completion hook, replacing any previous one.
    pub fn set_hook<F>(&mut self, hook: F)
    where
        F: FnMut(RevealEvent) + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Whether orbit controls may move the camera.
    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    pub fn dismiss_visible(&self) -> bool {
        self.dismiss_visible
    }

    /// Number of highlighted models in the scene (0 or 1).
    pub fn highlight_count(&self) -> usize {
        usize::from(self.model.is_some())
    }

    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Whether a fresh model load was issued because the preload was not ready.
    pub fn issued_fresh_model_load(&self) -> bool {
        self.fresh_model.is_some()
    }

    pub fn issued_fresh_font_load(&self) -> bool {
        self.fresh_font.is_some()
    }

    pub fn fog_density(&self) -> f32 {
        self.fog.as_ref().map_or(self.base_fog, Tween::value)
    }

    pub fn field_opacity(&self) -> f32 {
        self.field_opacity.as_ref().map_or(1.0, Tween::value)
    }

    /// Pose the camera must take this frame, if the sequence drives it.
    pub fn camera_pose(&self) -> Option<CameraPose> {
        self.camera.as_ref().map(|m| CameraPose {
            position: m.tween.value(),
            look_at: m.look_at,
        })
    }

    /// Start the entry transition. Only valid from `Idle`.
    pub fn enter_field(&mut self, camera_position: Vec3) -> bool {
        if self.phase != RevealPhase::Idle {
            log::debug!("enter_field ignored in phase {:?}", self.phase);
            return false;
        }
        self.controls_enabled = true;
        let target = Vec3::new(camera_position.x, ENTER_HEIGHT, ENTER_DISTANCE);
        self.camera = Some(CameraMove {
            tween: Tween::new(camera_position, target, ENTER_SECS, Ease::Power2Out),
            look_at: Vec3::ZERO,
            hold: false,
        });
        self.transition(RevealPhase::Entering);
        true
    }

    /// Start the final reveal. Valid from `Idle`, `Entering` or `Active`.
    pub fn trigger_final_reveal(&mut self, camera_position: Vec3) -> bool {
        if !matches!(
            self.phase,
            RevealPhase::Idle | RevealPhase::Entering | RevealPhase::Active
        ) {
            log::debug!("trigger_final_reveal ignored in phase {:?}", self.phase);
            return false;
        }
        self.controls_enabled = false;
        self.fog = Some(Tween::new(
            self.fog_density(),
            REVEAL_FOG_DENSITY,
            REVEAL_FOG_SECS,
            Ease::Power1Out,
        ));
        self.camera = Some(CameraMove {
            tween: Tween::new(camera_position, REVEAL_CAMERA, REVEAL_CAMERA_SECS, Ease::Power2InOut),
            look_at: REVEAL_LOOK_AT,
            hold: true,
        });
        self.transition(RevealPhase::Revealing);
        self.emit(RevealEvent::RevealStarted);
        true
    }

    /// Hide the highlight. Only valid once the dismiss affordance is visible.
    pub fn dismiss(&mut self) -> bool {
        if self.phase != RevealPhase::Revealed || !self.dismiss_visible {
            log::debug!("dismiss ignored in phase {:?}", self.phase);
            return false;
        }
        self.dismiss_visible = false;
        if let Some(model) = &mut self.model {
            model.scale = Tween::new(model.scale.value(), 0.0, 1.0, Ease::BackIn(1.5));
        }
        if let Some(label) = &mut self.label {
            label.scale = Tween::new(label.scale.value(), 0.0, 1.0, Ease::Power1Out);
        }
        self.transition(RevealPhase::Dismissed);
        self.emit(RevealEvent::Dismissed);
        true
    }

    /// Advance the sequence by one frame.
    pub fn update(&mut self, delta: f32, cursor_ndc: Vec2) {
        self.poll_assets();

        if let Some(camera) = &mut self.camera {
            if camera.tween.advance(delta) && !camera.hold {
                self.camera = None;
                if self.phase == RevealPhase::Entering {
                    self.transition(RevealPhase::Active);
                    self.emit(RevealEvent::FieldEntered);
                }
            }
        }
        if let Some(fog) = &mut self.fog {
            fog.advance(delta);
        }
        if let Some(opacity) = &mut self.field_opacity {
            opacity.advance(delta);
        }

        let camera_settled = self.camera.as_ref().is_some_and(|m| m.tween.is_finished());
        if self.phase == RevealPhase::Revealing && camera_settled && !self.spawn_started {
            self.start_spawn();
        }
        if self.spawn_started {
            self.complete_spawn();
        }

        self.animate(delta, cursor_ndc);
    }

    /// Snapshot for the renderer.
    pub fn view(&self) -> RevealView<'_> {
        RevealView {
            phase: self.phase,
            field_opacity: self.field_opacity(),
            fog_density: self.fog_density(),
            camera: self.camera_pose(),
            model: self.model.as_ref().map(|m| (&m.handle, m.transform())),
            label: self
                .label
                .as_ref()
                .map(|l| (&l.mesh, Mat4::from_scale(Vec3::splat(l.scale.value())))),
            lights: &self.lights,
            dismiss_visible: self.dismiss_visible,
            label_color: self.label_color,
            label_emissive: self.label_emissive,
            highlight_emissive: self.highlight_emissive,
        }
    }

    fn poll_assets(&mut self) {
        self.preloaded_model.poll();
        self.preloaded_font.poll();
        if let Some(signal) = &mut self.fresh_model {
            signal.poll();
        }
        if let Some(signal) = &mut self.fresh_font {
            signal.poll();
        }
    }

    fn start_spawn(&mut self) {
        self.spawn_started = true;
        self.field_opacity = Some(Tween::new(
            self.field_opacity(),
            FIELD_FADE_OPACITY,
            FIELD_FADE_SECS,
            Ease::Power1Out,
        ));

        if !self.preloaded_font.is_ready() {
            log::info!("Font not ready at reveal, requesting a fresh load");
            self.fresh_font = Some(self.provider.request_font());
        }
        if !self.preloaded_model.is_ready() {
            log::info!("Model not ready at reveal, requesting a fresh load");
            self.fresh_model = Some(self.provider.request_model());
        }
    }

    fn complete_spawn(&mut self) {
        if self.label.is_none() {
            if let Some(font) = ready(&self.preloaded_font, self.fresh_font.as_ref()) {
                let mesh = font.layout_label(&self.label_text, LABEL_SIZE, LABEL_DEPTH, LABEL_BASELINE);
                self.label = Some(Label {
                    mesh,
                    scale: Tween::new(0.0, 1.0, 2.0, Ease::BackOut(1.7)).with_delay(0.5),
                });
                log::info!("Label '{}' placed", self.label_text);
            }
        }

        if self.model.is_none() {
            if let Some(handle) = ready(&self.preloaded_model, self.fresh_model.as_ref()).cloned() {
                self.place_model(handle);
            } else if let Some(AssetState::Failed(reason)) = self.fresh_model.as_ref().map(AssetSignal::state) {
                log::error!("Highlighted model unavailable: {reason}");
                // Forget the failed attempt so the error is reported once
                self.fresh_model = None;
            }
        }
    }

    fn place_model(&mut self, handle: ModelHandle) {
        self.model = Some(Highlight {
            handle,
            scale: Tween::new(0.0, MODEL_SCALE, 3.0, Ease::ElasticOut(1.0, 0.5)),
            yaw: Tween::new(0.0, MODEL_SWAY_YAW, 4.0, Ease::SineInOut).yoyo_forever(),
            bob: Tween::new(MODEL_START_Y, MODEL_BOB_Y, 2.0, Ease::SineInOut).yoyo_forever(),
            pitch: MODEL_PITCH,
            roll: 0.0,
        });
        self.lights = vec![
            Light {
                kind: LightKind::Spot,
                color: 0xff0055,
                intensity: 30.0,
                position: Vec3::new(0.0, 15.0, 5.0),
                range: 50.0,
            },
            Light {
                kind: LightKind::Point,
                color: 0xffaa00,
                intensity: 5.0,
                position: Vec3::new(0.0, 0.0, -5.0),
                range: 20.0,
            },
        ];
        self.dismiss_timer = Some(DISMISS_DELAY_SECS);
        self.transition(RevealPhase::Revealed);
        self.emit(RevealEvent::HighlightVisible);
    }

    fn animate(&mut self, delta: f32, cursor_ndc: Vec2) {
        let cursor = if cursor_in_viewport(cursor_ndc) {
            cursor_ndc
        } else {
            Vec2::ZERO
        };

        if let Some(model) = &mut self.model {
            model.scale.advance(delta);
            model.yaw.advance(delta);
            model.bob.advance(delta);
            model.roll = -cursor.x * MODEL_TILT;
            model.pitch = MODEL_PITCH + cursor.y * MODEL_TILT;
        }
        if let Some(label) = &mut self.label {
            label.scale.advance(delta);
        }

        if let Some(remaining) = &mut self.dismiss_timer {
            *remaining -= delta;
            if *remaining <= 0.0 {
                self.dismiss_timer = None;
                if self.phase == RevealPhase::Revealed {
                    self.dismiss_visible = true;
                    self.emit(RevealEvent::DismissAvailable);
                }
            }
        }
    }

    fn transition(&mut self, next: RevealPhase) {
        log::info!("Reveal: {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    fn emit(&mut self, event: RevealEvent) {
        if let Some(hook) = &mut self.hook {
            hook(event);
        }
    }
}

/// First ready value of a preloaded signal or its fresh replacement.
fn ready<'a, T>(preloaded: &'a AssetSignal<T>, fresh: Option<&'a AssetSignal<T>>) -> Option<&'a T> {
    preloaded.value().or_else(|| fresh.and_then(AssetSignal::value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetSender;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Provider whose loads resolve only when the test says so.
    #[derive(Default, Clone)]
    struct ManualAssets {
        models: Rc<RefCell<Vec<AssetSender<ModelHandle>>>>,
        fonts: Rc<RefCell<Vec<AssetSender<FontHandle>>>>,
    }

    impl AssetProvider for ManualAssets {
        fn request_model(&self) -> AssetSignal<ModelHandle> {
            let (tx, signal) = AssetSignal::channel("model");
            self.models.borrow_mut().push(tx);
            signal
        }

        fn request_font(&self) -> AssetSignal<FontHandle> {
            let (tx, signal) = AssetSignal::channel("font");
            self.fonts.borrow_mut().push(tx);
            signal
        }
    }

    impl ManualAssets {
        fn resolve_all(&self) {
            for tx in self.models.borrow_mut().drain(..) {
                tx.resolve(Ok(ModelHandle::new("rose.glb", vec![1])));
            }
            for tx in self.fonts.borrow_mut().drain(..) {
                tx.resolve(Ok(FontHandle::from_bytes("font", b"{}")));
            }
        }
    }

    fn run(seq: &mut RevealSequencer, secs: f32) {
        let steps = (secs * 60.0).ceil() as usize;
        for _ in 0..steps {
            seq.update(1.0 / 60.0, Vec2::ZERO);
        }
    }

    fn sequencer() -> (RevealSequencer, ManualAssets) {
        let assets = ManualAssets::default();
        let seq = RevealSequencer::new(&SceneConfig::default(), Box::new(assets.clone()));
        (seq, assets)
    }

    #[test]
    fn test_enter_moves_camera_then_activates() {
        let (mut seq, _assets) = sequencer();
        assert!(seq.enter_field(Vec3::new(0.0, 160.0, 0.0)));
        assert_eq!(seq.phase(), RevealPhase::Entering);
        assert!(seq.controls_enabled());
        assert!(!seq.enter_field(Vec3::ZERO));

        run(&mut seq, 3.1);
        assert_eq!(seq.phase(), RevealPhase::Active);
        assert!(seq.camera_pose().is_none());
    }

    #[test]
    fn test_enter_camera_reaches_target() {
        let (mut seq, _assets) = sequencer();
        seq.enter_field(Vec3::new(4.0, 160.0, 0.0));
        run(&mut seq, 2.9);
        let pose = seq.camera_pose().unwrap();
        assert!((pose.position - Vec3::new(4.0, 60.0, 50.0)).length() < 0.5);
    }

    #[test]
    fn test_reveal_with_preloaded_assets() {
        let (mut seq, assets) = sequencer();
        assets.resolve_all();
        assert!(seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0)));
        assert!(!seq.controls_enabled());

        run(&mut seq, 5.1);
        assert_eq!(seq.phase(), RevealPhase::Revealed);
        assert_eq!(seq.highlight_count(), 1);
        assert!(seq.has_label());
        assert!(!seq.issued_fresh_model_load());
        assert_eq!(seq.lights().len(), 2);
        assert!((seq.fog_density() - 0.01).abs() < 1e-6);
        let pose = seq.camera_pose().unwrap();
        assert!((pose.position - Vec3::new(0.0, 2.0, 20.0)).length() < 1e-4);
        assert_eq!(pose.look_at, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_reveal_before_assets_ready_issues_fresh_load() {
        let (mut seq, assets) = sequencer();
        seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0));
        run(&mut seq, 6.0);

        assert_eq!(seq.phase(), RevealPhase::Revealing);
        assert!(seq.issued_fresh_model_load());
        assert!(seq.issued_fresh_font_load());
        assert_eq!(assets.models.borrow().len(), 2);
        assert_eq!(seq.highlight_count(), 0);

        assets.resolve_all();
        run(&mut seq, 0.1);
        assert_eq!(seq.phase(), RevealPhase::Revealed);
        assert_eq!(seq.highlight_count(), 1);
        assert!(seq.has_label());
    }

    #[test]
    fn test_repeated_reveal_does_not_duplicate() {
        let (mut seq, assets) = sequencer();
        assets.resolve_all();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        seq.set_hook(move |e| sink.borrow_mut().push(e));

        assert!(seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0)));
        assert!(!seq.trigger_final_reveal(Vec3::ZERO));
        run(&mut seq, 6.0);
        assert!(!seq.trigger_final_reveal(Vec3::ZERO));
        assert!(!seq.enter_field(Vec3::ZERO));
        run(&mut seq, 1.0);

        assert_eq!(seq.highlight_count(), 1);
        let visible = events.borrow().iter().filter(|e| **e == RevealEvent::HighlightVisible).count();
        assert_eq!(visible, 1);
    }

    #[test]
    fn test_dismiss_only_after_affordance() {
        let (mut seq, assets) = sequencer();
        assets.resolve_all();
        seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0));
        run(&mut seq, 5.1);
        assert!(!seq.dismiss_visible());
        assert!(!seq.dismiss());

        run(&mut seq, 2.1);
        assert!(seq.dismiss_visible());
        assert!(seq.dismiss());
        assert_eq!(seq.phase(), RevealPhase::Dismissed);
        assert!(!seq.dismiss());

        run(&mut seq, 1.1);
        assert!(seq.model.as_ref().unwrap().scale.value().abs() < 1e-4);
        assert!(seq.label.as_ref().unwrap().scale.value().abs() < 1e-4);
    }

    #[test]
    fn test_model_tilts_with_cursor() {
        let (mut seq, assets) = sequencer();
        assets.resolve_all();
        seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0));
        run(&mut seq, 5.1);

        seq.update(1.0 / 60.0, Vec2::new(1.0, -1.0));
        let model = seq.model.as_ref().unwrap();
        assert!((model.roll + 0.15).abs() < 1e-6);
        assert!((model.pitch - 0.35).abs() < 1e-6);

        seq.update(1.0 / 60.0, crate::probe::CURSOR_SENTINEL);
        let model = seq.model.as_ref().unwrap();
        assert_eq!(model.roll, 0.0);
        assert_eq!(model.pitch, 0.5);
    }

    #[test]
    fn test_field_fades_after_spawn() {
        let (mut seq, assets) = sequencer();
        assets.resolve_all();
        seq.trigger_final_reveal(Vec3::new(0.0, 160.0, 0.0));
        assert_eq!(seq.field_opacity(), 1.0);
        run(&mut seq, 7.5);
        assert!((seq.field_opacity() - 0.05).abs() < 1e-6);
    }
}
