//! Point-cloud viewer
//!
//! Parses PLY reconstruction output into a [`PointCloud`], normalizes it
//! for display (recenter, up-axis flip), and renders it through a
//! [`RenderSurface`] with an orbiting camera. Session lifecycle guarantees
//! that at most one render loop touches the surface at a time.

pub mod camera;
pub mod error;
pub mod frame;
pub mod fullscreen;
pub mod geometry;
pub mod orbit;
pub mod ply;
pub mod session;

pub use camera::Camera;
pub use error::{Result, ViewerError};
pub use frame::RenderLoop;
pub use fullscreen::FullscreenState;
pub use geometry::PointCloud;
pub use orbit::{OrbitConfig, OrbitController};
pub use ply::parse_point_cloud;
pub use session::{RenderSurface, Viewer, ViewerConfig, ViewerSession};
