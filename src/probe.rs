//! Cursor ray to ground-plane intersection.
//!
//! The probe casts a ray from the camera through the cursor and intersects
//! it with the plane y = 0. No intersection is a normal state, not an error:
//! the cursor may be outside the window, the ray may run parallel to the
//! ground or point away from it, or the hit may lie far outside the field.

use glam::{Vec2, Vec3};

use crate::camera::Camera;

/// Cursor position reported before the first move and after the cursor
/// leaves the window.
pub const CURSOR_SENTINEL: Vec2 = Vec2::new(-999.0, -999.0);

const PARALLEL_EPSILON: f32 = 1e-6;

/// Whether `ndc` is a real cursor position inside the viewport.
#[inline]
pub fn cursor_in_viewport(ndc: Vec2) -> bool {
    ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0
}

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Ray from the camera through the NDC point `ndc`.
    pub fn from_camera(camera: &Camera, ndc: Vec2) -> Option<Self> {
        let inverse = camera.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        let direction = (far - near).try_normalize()?;
        Some(Self {
            origin: camera.position,
            direction,
        })
    }

    /// Intersection with the plane y = 0 in front of the origin.
    pub fn intersect_ground(&self) -> Option<Vec3> {
        if self.direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = -self.origin.y / self.direction.y;
        if t < 0.0 {
            return None;
        }
        Some(self.origin + self.direction * t)
    }
}

/// Converts the cursor into an optional ground point each frame.
#[derive(Debug, Clone, Copy)]
pub struct InteractionProbe {
    /// Squared cutoff distance from the origin (`2 × radius²`).
    cutoff_sq: f32,
}

impl InteractionProbe {
    pub fn new(field_radius: f32) -> Self {
        Self {
            cutoff_sq: 2.0 * field_radius * field_radius,
        }
    }

    /// Ground point under the cursor, if one is meaningful this frame.
    pub fn ground_point(&self, camera: &Camera, cursor_ndc: Vec2) -> Option<Vec3> {
        if !cursor_in_viewport(cursor_ndc) {
            return None;
        }
        let point = Ray::from_camera(camera, cursor_ndc)?.intersect_ground()?;
        (point.length_squared() < self.cutoff_sq).then_some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraSettings;

    fn top_down() -> Camera {
        Camera::new(&CameraSettings::default(), 1.0)
    }

    #[test]
    fn test_center_cursor_hits_origin() {
        let probe = InteractionProbe::new(220.0);
        let point = probe.ground_point(&top_down(), Vec2::ZERO).unwrap();
        assert!(point.length() < 1e-2);
        assert!(point.y.abs() < 1e-4);
    }

    #[test]
    fn test_sentinel_yields_none() {
        let probe = InteractionProbe::new(220.0);
        assert_eq!(probe.ground_point(&top_down(), CURSOR_SENTINEL), None);
    }

    #[test]
    fn test_parallel_ray_yields_none() {
        let ray = Ray {
            origin: Vec3::new(0.0, 10.0, 0.0),
            direction: Vec3::X,
        };
        assert_eq!(ray.intersect_ground(), None);
    }

    #[test]
    fn test_diverging_ray_yields_none() {
        let ray = Ray {
            origin: Vec3::new(0.0, 10.0, 0.0),
            direction: Vec3::Y,
        };
        assert_eq!(ray.intersect_ground(), None);
    }

    #[test]
    fn test_far_hit_is_cut_off() {
        // A low camera looking toward the horizon hits the ground far away
        let mut camera = top_down();
        camera.position = Vec3::new(0.0, 2.0, 0.0);
        camera.target = Vec3::new(0.0, 1.9, -100.0);

        let wide = InteractionProbe::new(10_000.0);
        let point = wide.ground_point(&camera, Vec2::ZERO).unwrap();
        assert!(point.length_squared() > 2.0 * 220.0 * 220.0);

        let probe = InteractionProbe::new(220.0);
        assert_eq!(probe.ground_point(&camera, Vec2::ZERO), None);
    }

    #[test]
    fn test_cursor_offset_moves_hit() {
        let probe = InteractionProbe::new(220.0);
        let camera = top_down();
        let right = probe.ground_point(&camera, Vec2::new(0.5, 0.0)).unwrap();
        assert!(right.x > 1.0);
    }
}
