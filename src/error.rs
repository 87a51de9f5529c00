//! Error types for petalfield.
//!
//! Only genuinely failing operations are represented here. A cursor ray that
//! misses the ground, or a particle pool that is full, are ordinary states
//! and never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or validating a [`SceneConfig`](crate::SceneConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid JSON for the scene schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is outside its accepted range.
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during texture loading.
#[derive(Debug, Error)]
pub enum TextureError {
    /// Failed to decode image file.
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),
    /// Failed to read file from disk.
    #[error("Failed to read texture file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by an asset provider for a model or font request.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset file could not be read.
    #[error("Failed to read asset '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The asset file exists but holds no data.
    #[error("Asset '{0}' is empty")]
    Empty(PathBuf),
    /// The loader went away before delivering a result.
    #[error("Asset loader for '{0}' disconnected")]
    Disconnected(String),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,
    /// The surface reports no usable texture format for the adapter.
    #[error("Surface has no supported texture format")]
    NoSurfaceFormat,
    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors that can occur when running the windowed scene.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to create event loop.
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The scene configuration was rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message_names_field() {
        let err = ConfigError::invalid("swell.factor", "must be greater than 1.0");
        let msg = err.to_string();
        assert!(msg.contains("swell.factor"));
        assert!(msg.contains("greater than 1.0"));
    }

    #[test]
    fn test_asset_error_keeps_io_source() {
        let err = AssetError::Io {
            path: PathBuf::from("rose.glb"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("rose.glb"));
    }
}
