//! Perspective camera and orbit controls.

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraSettings;

/// Perspective camera looking from `position` toward `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera at the configured start position looking at the origin.
    pub fn new(settings: &CameraSettings, aspect: f32) -> Self {
        Self {
            position: settings.start_position,
            target: Vec3::ZERO,
            fov_degrees: settings.fov_degrees,
            aspect,
            near: settings.near,
            far: settings.far,
        }
    }

    /// Update the aspect ratio after a resize. Zero-sized windows are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Calculate the view matrix.
    ///
    /// When the view direction is (almost) vertical, world Y cannot serve as
    /// the up vector and −Z is used instead. The start position sits straight
    /// above the origin, so this case is the common one at launch.
    pub fn view_matrix(&self) -> Mat4 {
        let forward = (self.target - self.position).normalize_or_zero();
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.target, up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Distance from the camera to its target.
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Drag-to-orbit and wheel-to-zoom around the camera's target.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub enabled: bool,
    /// Radians of rotation per pixel of drag.
    pub rotate_speed: f32,
    /// Fractional distance change per wheel step.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Largest angle from straight up.
    pub max_polar: f32,
}

impl OrbitControls {
    /// Controls start disabled; the scene enables them on entry.
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            enabled: false,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            min_distance: settings.min_distance,
            max_distance: settings.max_distance,
            max_polar: std::f32::consts::FRAC_PI_2 - 0.05,
        }
    }

    /// Apply a drag of `delta` pixels and `scroll` wheel steps.
    pub fn apply(&self, camera: &mut Camera, delta: Vec2, scroll: f32) {
        if !self.enabled || (delta == Vec2::ZERO && scroll == 0.0) {
            return;
        }

        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth -= delta.x * self.rotate_speed;
        polar -= delta.y * self.rotate_speed;
        polar = polar.clamp(1e-4, self.max_polar);

        radius *= 1.0 - scroll * self.zoom_speed;
        radius = radius.clamp(self.min_distance, self.max_distance);

        let sin_polar = polar.sin();
        camera.position = camera.target
            + Vec3::new(
                radius * sin_polar * azimuth.sin(),
                radius * polar.cos(),
                radius * sin_polar * azimuth.cos(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(&CameraSettings::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_vertical_view_is_finite() {
        let view = camera().view_matrix();
        assert!(view.to_cols_array().iter().all(|v| v.is_finite()));
        // Origin lands 160 units in front of the camera
        let p = view.transform_point3(Vec3::ZERO);
        assert!((p.z + 160.0).abs() < 1e-3);
    }

    #[test]
    fn test_resize_ignores_zero() {
        let mut cam = camera();
        cam.resize(800, 400);
        assert_eq!(cam.aspect, 2.0);
        cam.resize(0, 400);
        assert_eq!(cam.aspect, 2.0);
    }

    #[test]
    fn test_disabled_controls_do_nothing() {
        let controls = OrbitControls::new(&CameraSettings::default());
        let mut cam = camera();
        let before = cam.position;
        controls.apply(&mut cam, Vec2::new(50.0, 50.0), 1.0);
        assert_eq!(cam.position, before);
    }

    #[test]
    fn test_orbit_clamps_polar_and_distance() {
        let mut controls = OrbitControls::new(&CameraSettings::default());
        controls.enabled = true;
        let mut cam = camera();
        cam.position = Vec3::new(0.0, 60.0, 50.0);

        // Drag far downward: polar angle clamps just above the horizon
        controls.apply(&mut cam, Vec2::new(0.0, -10_000.0), 0.0);
        assert!(cam.position.y > 0.0);

        // Zoom in hard: distance clamps to the minimum
        for _ in 0..200 {
            controls.apply(&mut cam, Vec2::ZERO, 5.0);
        }
        assert!((cam.distance() - 5.0).abs() < 1e-3);

        // Zoom out hard: distance clamps to the maximum
        for _ in 0..200 {
            controls.apply(&mut cam, Vec2::ZERO, -5.0);
        }
        assert!((cam.distance() - 600.0).abs() < 1e-2);
    }
}
