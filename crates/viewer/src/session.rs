//! Viewer lifecycle: mounting point clouds onto a render surface
//!
//! A [`Viewer`] owns at most one [`ViewerSession`] at a time. Mounting a
//! new cloud first parses it, then tears the previous session down fully
//! before the new one renders its first frame, so the surface never
//! receives interleaved draws from two sessions.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info};

use crate::camera::Camera;
use crate::error::Result;
use crate::frame::RenderLoop;
use crate::geometry::PointCloud;
use crate::orbit::{OrbitConfig, OrbitController};
use crate::ply::parse_point_cloud;

/// Abstraction over whatever actually puts pixels on screen
pub trait RenderSurface: Send + 'static {
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, cloud: &PointCloud, camera: &Camera);
    /// Release GPU/window resources; called exactly once, after the last draw
    fn destroy(&mut self);
}

/// Viewer configuration
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub frame_interval: Duration,
    /// Rotate incoming clouds 180 degrees about X before display
    pub flip_up_axis: bool,
    pub orbit: OrbitConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            frame_interval: Duration::from_millis(16),
            flip_up_axis: true,
            orbit: OrbitConfig::default(),
        }
    }
}

struct Scene<S> {
    surface: S,
    cloud: PointCloud,
    camera: Camera,
    orbit: OrbitController,
}

/// One mounted point cloud with its running render loop
pub struct ViewerSession<S> {
    scene: Arc<Mutex<Scene<S>>>,
    render: RenderLoop,
}

impl<S: RenderSurface> ViewerSession<S> {
    fn start(surface: S, cloud: PointCloud, config: &ViewerConfig) -> Self {
        let extent = cloud.extent().max(1e-3);
        let distance = extent * 1.8;
        let camera = Camera::look_at(
            Vec3::new(0.0, distance * 0.4, distance),
            Vec3::ZERO,
            config.width as f32 / config.height.max(1) as f32,
        );
        let orbit = OrbitController::new(Vec3::ZERO, config.orbit.clone());

        let scene = Arc::new(Mutex::new(Scene {
            surface,
            cloud,
            camera,
            orbit,
        }));
        let shared = scene.clone();
        let render = RenderLoop::spawn(config.frame_interval, move |dt| {
            let mut scene = match shared.lock() {
                Ok(scene) => scene,
                Err(_) => return false,
            };
            let Scene {
                surface,
                cloud,
                camera,
                orbit,
            } = &mut *scene;
            orbit.update(dt, camera);
            surface.draw(cloud, camera);
            true
        });

        Self { scene, render }
    }

    /// Stop rendering, then release the surface. The draw that is in
    /// flight when this is called completes before `destroy` runs.
    async fn dispose(self) {
        self.render.stop().await;
        if let Ok(mut scene) = self.scene.lock() {
            scene.surface.destroy();
        }
    }
}

/// Owns the session lifecycle and routes input to the active scene
pub struct Viewer<S> {
    config: ViewerConfig,
    session: Option<ViewerSession<S>>,
}

impl<S: RenderSurface> Viewer<S> {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Parse PLY bytes and start rendering them on `surface`, replacing any
    /// active session. On a parse error the previous session keeps running
    /// and the raw bytes stay usable for download.
    pub async fn mount(&mut self, bytes: &[u8], surface: S) -> Result<()> {
        let mut cloud = parse_point_cloud(bytes)?;
        cloud.recenter();
        if self.config.flip_up_axis {
            cloud.flip_up_axis();
        }
        info!(points = cloud.len(), "mounting point cloud");

        if let Some(previous) = self.session.take() {
            debug!("disposing previous viewer session");
            previous.dispose().await;
        }
        self.session = Some(ViewerSession::start(surface, cloud, &self.config));
        Ok(())
    }

    /// Tear the active session down, if any
    pub async fn dispose(&mut self) {
        if let Some(session) = self.session.take() {
            session.dispose().await;
        }
    }

    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    /// Propagate a surface resize to both the surface and the projection
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        if let Some(session) = &self.session {
            if let Ok(mut scene) = session.scene.lock() {
                scene.surface.resize(width, height);
                scene.camera.set_aspect(width, height);
            }
        }
    }

    /// Drag input in pixels
    pub fn rotate(&mut self, delta_x: f32, delta_y: f32) {
        if let Some(session) = &self.session {
            if let Ok(mut scene) = session.scene.lock() {
                scene.orbit.rotate(delta_x, delta_y);
            }
        }
    }

    /// Scroll input
    pub fn zoom(&mut self, scroll_delta: f32) {
        if let Some(session) = &self.session {
            if let Ok(mut scene) = session.scene.lock() {
                let Scene { camera, orbit, .. } = &mut *scene;
                orbit.zoom(scroll_delta, camera);
            }
        }
    }
}
