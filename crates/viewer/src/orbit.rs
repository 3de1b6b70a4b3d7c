//! Orbit interaction controller with damping and idle auto-rotate

use crate::camera::Camera;
use glam::Vec3;

/// Configuration for orbit interaction
#[derive(Debug, Clone)]
pub struct OrbitConfig {
    /// Rotation applied per pixel of drag (radians)
    pub rotate_sensitivity: f32,
    /// Zoom units per scroll unit
    pub zoom_sensitivity: f32,
    /// Minimum zoom distance from target
    pub min_distance: f32,
    /// Maximum zoom distance from target
    pub max_distance: f32,
    /// Exponential decay rate for rotational inertia (per second)
    pub damping: f32,
    /// Auto-rotate speed once idle (radians per second)
    pub auto_rotate_speed: f32,
    /// Seconds without input before auto-rotate engages
    pub idle_delay: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            rotate_sensitivity: 0.005,
            zoom_sensitivity: 0.5,
            min_distance: 0.5,
            max_distance: 50.0,
            damping: 6.0,
            auto_rotate_speed: 0.3,
            idle_delay: 2.0,
        }
    }
}

/// Orbit controller: converts drag/scroll input into damped camera motion
/// and slowly auto-rotates the subject when the user goes idle
pub struct OrbitController {
    pub target: Vec3,
    pub config: OrbitConfig,
    yaw_velocity: f32,
    pitch_velocity: f32,
    idle_time: f32,
}

impl OrbitController {
    pub fn new(target: Vec3, config: OrbitConfig) -> Self {
        Self {
            target,
            config,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            idle_time: 0.0,
        }
    }

    pub fn with_target(target: Vec3) -> Self {
        Self::new(target, OrbitConfig::default())
    }

    /// Feed a drag delta in pixels; sets the rotational velocity that
    /// `update` integrates and damps over subsequent frames
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        // Input is per-frame; scale to an equivalent per-second velocity
        self.yaw_velocity = -delta_x * self.config.rotate_sensitivity * 60.0;
        self.pitch_velocity = -delta_y * self.config.rotate_sensitivity * 60.0;
        self.idle_time = 0.0;
    }

    /// Feed a scroll delta; zoom applies immediately (no inertia)
    pub fn zoom(&mut self, scroll_delta: f32, camera: &mut Camera) {
        let amount = scroll_delta * self.config.zoom_sensitivity;
        camera.zoom_toward_target(amount, self.config.min_distance, self.config.max_distance);
        self.idle_time = 0.0;
    }

    /// Advance one frame: integrate damped inertia, then auto-rotate when
    /// idle long enough
    pub fn update(&mut self, dt: f32, camera: &mut Camera) {
        self.idle_time += dt;

        let yaw = self.yaw_velocity * dt;
        let pitch = self.pitch_velocity * dt;
        if yaw.abs() > 1e-7 || pitch.abs() > 1e-7 {
            camera.orbit(yaw, pitch);
        }

        let decay = (-self.config.damping * dt).exp();
        self.yaw_velocity *= decay;
        self.pitch_velocity *= decay;

        if self.idle_time >= self.config.idle_delay {
            camera.orbit(self.config.auto_rotate_speed * dt, 0.0);
        }
    }

    /// Residual rotational speed, for tests and input gating
    pub fn angular_speed(&self) -> f32 {
        (self.yaw_velocity * self.yaw_velocity + self.pitch_velocity * self.pitch_velocity).sqrt()
    }
}
