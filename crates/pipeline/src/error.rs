//! Error types for pipeline orchestration

use crate::controller::PipelineStage;
use thiserror::Error;

/// Pipeline error types
///
/// Stage-level failures from the two clients pass through transparently so
/// their user-facing messages survive; the pipeline adds only the errors it
/// can cause itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    ImageGen(#[from] apex_imagegen::ImageGenError),

    #[error(transparent)]
    Reconstruction(#[from] apex_sam3d::Sam3dError),

    #[error("{action} is not allowed while the pipeline is {stage:?}")]
    InvalidTransition {
        action: &'static str,
        stage: PipelineStage,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
