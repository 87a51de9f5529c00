//! Asynchronous asset boundary.
//!
//! Models and fonts are requested from an [`AssetProvider`] and arrive later
//! through an [`AssetSignal`]. The frame loop polls each signal once per
//! frame, so a completed load is applied at the next frame boundary and never
//! mid-update. Nothing here blocks.
//!
//! Handles are opaque: the scene only clones them and asks a font for a label
//! layout. Decoding model geometry is left to the renderer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::config::AssetSettings;
use crate::error::AssetError;

/// Load state of one requested asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetState<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> AssetState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetState::Pending)
    }
}

/// Sending half of an [`AssetSignal`], held by whoever performs the load.
#[derive(Debug)]
pub struct AssetSender<T> {
    tx: mpsc::Sender<Result<T, AssetError>>,
}

impl<T> AssetSender<T> {
    /// Deliver the load result. A receiver that was dropped is ignored.
    pub fn resolve(self, result: Result<T, AssetError>) {
        let _ = self.tx.send(result);
    }
}

/// Readiness signal for one asynchronous load.
#[derive(Debug)]
pub struct AssetSignal<T> {
    label: String,
    state: AssetState<T>,
    rx: Option<mpsc::Receiver<Result<T, AssetError>>>,
}

impl<T> AssetSignal<T> {
    /// Create a pending signal and the sender that completes it.
    pub fn channel(label: impl Into<String>) -> (AssetSender<T>, Self) {
        let (tx, rx) = mpsc::channel();
        let signal = Self {
            label: label.into(),
            state: AssetState::Pending,
            rx: Some(rx),
        };
        (AssetSender { tx }, signal)
    }

    /// A signal that is already resolved.
    pub fn ready(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            state: AssetState::Ready(value),
            rx: None,
        }
    }

    /// Check for a delivered result without blocking.
    ///
    /// Returns `true` on the poll that moves the signal out of `Pending`.
    pub fn poll(&mut self) -> bool {
        let Some(rx) = &self.rx else {
            return false;
        };
        let next = match rx.try_recv() {
            Ok(Ok(value)) => {
                log::info!("Asset '{}' ready", self.label);
                AssetState::Ready(value)
            }
            Ok(Err(e)) => {
                log::warn!("Asset '{}' failed: {e}", self.label);
                AssetState::Failed(e.to_string())
            }
            Err(mpsc::TryRecvError::Empty) => return false,
            Err(mpsc::TryRecvError::Disconnected) => {
                let e = AssetError::Disconnected(self.label.clone());
                log::warn!("Asset '{}' failed: {e}", self.label);
                AssetState::Failed(e.to_string())
            }
        };
        self.state = next;
        self.rx = None;
        true
    }

    pub fn state(&self) -> &AssetState<T> {
        &self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The loaded value, if ready.
    pub fn value(&self) -> Option<&T> {
        match &self.state {
            AssetState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, AssetState::Ready(_))
    }
}

/// Opaque handle to a loaded 3D model. Clones share the same bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHandle {
    name: Arc<str>,
    bytes: Arc<[u8]>,
}

impl ModelHandle {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: Arc::from(name),
            bytes: Arc::from(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Per-glyph horizontal advances from a typeface JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
struct TypefaceMetrics {
    #[serde(default)]
    glyphs: HashMap<String, GlyphMetrics>,
    #[serde(default = "default_resolution")]
    resolution: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct GlyphMetrics {
    ha: f32,
}

fn default_resolution() -> f32 {
    1000.0
}

/// Advance of a glyph the font does not describe, as a fraction of the size.
const FALLBACK_ADVANCE: f32 = 0.7;

/// Opaque handle to a loaded font.
#[derive(Debug, Clone)]
pub struct FontHandle {
    name: Arc<str>,
    metrics: Arc<TypefaceMetrics>,
}

impl FontHandle {
    /// Build a font from typeface JSON. Unparseable data keeps the handle
    /// usable with fixed advances.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Self {
        let metrics = serde_json::from_slice::<TypefaceMetrics>(bytes).unwrap_or_else(|e| {
            log::debug!("Font '{name}' has no readable metrics ({e}), using fixed advance");
            TypefaceMetrics {
                glyphs: HashMap::new(),
                resolution: default_resolution(),
            }
        });
        Self {
            name: Arc::from(name),
            metrics: Arc::new(metrics),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Advance of `ch` at `size` world units.
    pub fn advance(&self, ch: char, size: f32) -> f32 {
        let key = ch.to_string();
        match self.metrics.glyphs.get(&key) {
            Some(glyph) if self.metrics.resolution > 0.0 => glyph.ha / self.metrics.resolution * size,
            _ => FALLBACK_ADVANCE * size,
        }
    }

    /// Lay out `text` as a single line, horizontally centred on x = 0 with
    /// its baseline at `baseline_y`.
    pub fn layout_label(&self, text: &str, size: f32, depth: f32, baseline_y: f32) -> LabelMesh {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0;
        for ch in text.chars() {
            let advance = self.advance(ch, size);
            if !ch.is_whitespace() {
                glyphs.push(GlyphQuad {
                    ch,
                    origin: Vec3::new(pen, baseline_y, 0.0),
                    size: Vec2::new(advance, size),
                });
            }
            pen += advance;
        }

        let offset = -0.5 * pen;
        for glyph in &mut glyphs {
            glyph.origin.x += offset;
        }

        LabelMesh {
            glyphs,
            width: pen,
            height: size,
            depth,
        }
    }
}

/// One glyph cell of a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub ch: char,
    /// Lower-left corner.
    pub origin: Vec3,
    pub size: Vec2,
}

/// Single-line text geometry built once for the reveal.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMesh {
    pub glyphs: Vec<GlyphQuad>,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

/// Source of model and font loads.
pub trait AssetProvider {
    fn request_model(&self) -> AssetSignal<ModelHandle>;
    fn request_font(&self) -> AssetSignal<FontHandle>;
}

/// Loads assets from disk on worker threads.
#[derive(Debug, Clone)]
pub struct FileAssets {
    model: PathBuf,
    font: PathBuf,
}

impl FileAssets {
    pub fn new(settings: &AssetSettings) -> Self {
        Self {
            model: settings.path(&settings.model),
            font: settings.path(&settings.font),
        }
    }

    fn spawn_load<T, F>(path: &Path, build: F) -> AssetSignal<T>
    where
        T: Send + 'static,
        F: FnOnce(&str, Vec<u8>) -> T + Send + 'static,
    {
        let label = path.display().to_string();
        let (sender, signal) = AssetSignal::channel(label.clone());
        let path = path.to_path_buf();
        log::debug!("Loading asset '{label}'");
        thread::spawn(move || sender.resolve(read_asset(&path).map(|bytes| build(&label, bytes))));
        signal
    }
}

impl AssetProvider for FileAssets {
    fn request_model(&self) -> AssetSignal<ModelHandle> {
        Self::spawn_load(&self.model, |name, bytes| ModelHandle::new(name, bytes))
    }

    fn request_font(&self) -> AssetSignal<FontHandle> {
        Self::spawn_load(&self.font, |name, bytes| FontHandle::from_bytes(name, &bytes))
    }
}

fn read_asset(path: &Path) -> Result<Vec<u8>, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(AssetError::Empty(path.to_path_buf()));
    }
    Ok(bytes)
}
