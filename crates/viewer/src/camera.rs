//! Orbit-style camera for point-cloud display
//!
//! # Coordinate System
//!
//! OpenGL convention: +X right, +Y up, -Z forward.

use glam::{Mat4, Quat, Vec3};

/// Default vertical field of view: 60 degrees
pub const DEFAULT_VFOV: f32 = 60.0 * std::f32::consts::PI / 180.0;

/// Maximum elevation angle to prevent flipping over the poles (85 degrees)
const MAX_ELEVATION: f32 = 85.0 * std::f32::consts::PI / 180.0;

/// Camera with a position, a look-at target, and projection parameters
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians
    pub vfov: f32,
    /// Width / height of the render surface
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a camera at `position` looking at `target`
    pub fn look_at(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            position,
            target,
            vfov: DEFAULT_VFOV,
            aspect,
            near: 0.01,
            far: 1000.0,
        }
    }

    /// Keep the projection in sync with the render surface dimensions
    ///
    /// Skipping this on resize distorts the geometry; it is a correctness
    /// requirement, not cosmetics.
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.vfov, self.aspect, self.near, self.far)
    }

    /// Orbit around the target: yaw about world Y, pitch about the camera's
    /// current right axis, with the elevation clamped away from the poles
    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        let mut offset = self.position - self.target;
        let distance = offset.length();
        if distance < 1e-6 {
            return;
        }

        // Pitch first, around the current right axis
        if pitch_delta.abs() > 1e-6 {
            let forward = -offset.normalize();
            let right = forward.cross(Vec3::Y);
            if right.length_squared() > 1e-6 {
                let pitch_rotation = Quat::from_axis_angle(right.normalize(), pitch_delta);
                offset = pitch_rotation * offset;

                // Clamp elevation so the orbit never flips over the top
                let xz = (offset.x * offset.x + offset.z * offset.z).sqrt();
                let elevation = offset.y.atan2(xz);
                if elevation.abs() > MAX_ELEVATION {
                    let clamped = elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION);
                    let new_y = distance * clamped.sin();
                    let new_xz = distance * clamped.cos();
                    let ratio = if xz > 1e-6 { new_xz / xz } else { 0.0 };
                    offset = Vec3::new(offset.x * ratio, new_y, offset.z * ratio);
                }
            }
        }

        // Yaw second, always around world Y
        if yaw_delta.abs() > 1e-6 {
            offset = Quat::from_axis_angle(Vec3::Y, yaw_delta) * offset;
        }

        self.position = self.target + offset.normalize() * distance;
    }

    /// Move toward/away from the target, clamped to the given range
    pub fn zoom_toward_target(&mut self, amount: f32, min_distance: f32, max_distance: f32) {
        let to_target = self.target - self.position;
        let distance = to_target.length();
        if distance < 1e-6 {
            return;
        }
        let new_distance = (distance - amount).clamp(min_distance, max_distance);
        self.position = self.target - to_target * (new_distance / distance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_preserves_distance() {
        let mut camera = Camera::look_at(Vec3::new(3.0, 2.0, 3.0), Vec3::ZERO, 1.0);
        let before = camera.distance();
        camera.orbit(0.7, 0.3);
        assert!((camera.distance() - before).abs() < 1e-4);
    }

    #[test]
    fn orbit_clamps_elevation() {
        let mut camera = Camera::look_at(Vec3::new(0.0, 0.5, 3.0), Vec3::ZERO, 1.0);
        for _ in 0..100 {
            camera.orbit(0.0, 0.2);
        }
        let offset = camera.position - camera.target;
        let elevation = offset.y.atan2((offset.x * offset.x + offset.z * offset.z).sqrt());
        assert!(elevation <= MAX_ELEVATION + 1e-3);
    }

    #[test]
    fn zoom_clamps_to_range() {
        let mut camera = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 1.0);
        camera.zoom_toward_target(100.0, 0.5, 50.0);
        assert!((camera.distance() - 0.5).abs() < 1e-5);
        camera.zoom_toward_target(-100.0, 0.5, 50.0);
        assert!((camera.distance() - 50.0).abs() < 1e-4);
    }

    #[test]
    fn aspect_tracks_surface_dimensions() {
        let mut camera = Camera::look_at(Vec3::ONE, Vec3::ZERO, 1.0);
        camera.set_aspect(1920, 1080);
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        // Degenerate height is ignored rather than producing NaN
        camera.set_aspect(100, 0);
        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }
}
