//! Texture data for the renderer.
//!
//! Flower textures are optional. A missing or unreadable file degrades to a
//! 1×1 solid colour so the batches still render. The sparkle glow is always
//! generated procedurally.

use std::path::Path;

use crate::error::TextureError;

/// Filter mode for texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// Raw RGBA pixels plus sampling options.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Raw RGBA pixel data (width * height * 4 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub filter: FilterMode,
}

impl TextureConfig {
    /// Load a texture from an image file.
    pub fn try_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let bytes = std::fs::read(path.as_ref())?;
        let img = image::load_from_memory(&bytes)?.into_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self {
            data: img.into_raw(),
            width,
            height,
            filter: FilterMode::Linear,
        })
    }

    /// Load `path`, or fall back to a solid colour with a warning.
    pub fn load_or_solid<P: AsRef<Path>>(path: P, fallback: [u8; 4]) -> Self {
        match Self::try_from_file(path.as_ref()) {
            Ok(texture) => {
                log::info!(
                    "Loaded texture '{}' ({}x{})",
                    path.as_ref().display(),
                    texture.width,
                    texture.height
                );
                texture
            }
            Err(e) => {
                log::warn!(
                    "Texture '{}' unavailable ({e}), using solid fallback",
                    path.as_ref().display()
                );
                let [r, g, b, a] = fallback;
                Self::solid(r, g, b, a)
            }
        }
    }

    /// Create a solid color texture (1x1 pixel).
    pub fn solid(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            data: vec![r, g, b, a],
            width: 1,
            height: 1,
            filter: FilterMode::Nearest,
        }
    }

    /// Soft radial glow used for point sprites.
    ///
    /// Warm white (255, 255, 230) opaque at the centre, fading linearly to
    /// fully transparent at the edge.
    pub fn glow(size: u32) -> Self {
        let size = size.max(1);
        let center = size as f32 / 2.0;
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let t = ((dx * dx + dy * dy).sqrt() / center).min(1.0);
                data.push(255);
                data.push(255);
                data.push(lerp_u8(230, 255, t));
                data.push(lerp_u8(255, 0, t));
            }
        }
        Self {
            data,
            width: size,
            height: size,
            filter: FilterMode::Linear,
        }
    }

    /// RGBA of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// Helper function for linear interpolation of u8 values.
fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let a = a as f32;
    let b = b as f32;
    (a + (b - a) * t).round() as u8
}

/// The three textures the scene samples.
#[derive(Debug, Clone)]
pub struct SceneTextures {
    pub primary: TextureConfig,
    pub secondary: TextureConfig,
    pub glow: TextureConfig,
}

impl SceneTextures {
    /// Load flower textures from `root`, falling back to solid colours.
    pub fn load(root: &Path, primary: &str, secondary: &str) -> Self {
        Self {
            primary: TextureConfig::load_or_solid(root.join(primary), [233, 30, 99, 255]),
            secondary: TextureConfig::load_or_solid(root.join(secondary), [255, 255, 255, 255]),
            glow: TextureConfig::glow(32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_error() {
        let result = TextureConfig::try_from_file("definitely/not/here.png");
        assert!(matches!(result, Err(TextureError::Io(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_solid() {
        let tex = TextureConfig::load_or_solid("definitely/not/here.png", [1, 2, 3, 4]);
        assert_eq!((tex.width, tex.height), (1, 1));
        assert_eq!(tex.pixel(0, 0), [1, 2, 3, 4]);
    }

    #[test]
    fn test_glow_fades_outward() {
        let glow = TextureConfig::glow(32);
        assert_eq!(glow.data.len(), 32 * 32 * 4);
        let center = glow.pixel(16, 16);
        let edge = glow.pixel(0, 16);
        let corner = glow.pixel(0, 0);
        assert!(center[3] > 240);
        assert!(edge[3] < center[3]);
        assert_eq!(corner[3], 0);
    }
}
