//! Client seams for the pipeline controller
//!
//! The controller consumes the two remote services through these traits so
//! the state machine can be exercised with in-process doubles.

use apex_imagegen::{GeneratedImage, ImageGenClient};
use apex_sam3d::{ReconstructionResult, Sam3dClient};
use async_trait::async_trait;

/// Text-to-image generation seam
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> apex_imagegen::Result<GeneratedImage>;
}

/// Image-to-3D reconstruction seam
#[async_trait]
pub trait Reconstructor: Send + Sync {
    async fn convert(&self, image: &[u8], seed: i64) -> apex_sam3d::Result<ReconstructionResult>;
}

#[async_trait]
impl ImageGenerator for ImageGenClient {
    async fn generate(&self, prompt: &str, model: &str) -> apex_imagegen::Result<GeneratedImage> {
        ImageGenClient::generate(self, prompt, model).await
    }
}

#[async_trait]
impl Reconstructor for Sam3dClient {
    async fn convert(&self, image: &[u8], seed: i64) -> apex_sam3d::Result<ReconstructionResult> {
        Sam3dClient::convert(self, image, seed).await
    }
}
