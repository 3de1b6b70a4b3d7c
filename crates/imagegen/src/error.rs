//! Error types for image generation

use thiserror::Error;

/// Image generation client error types
#[derive(Debug, Error)]
pub enum ImageGenError {
    /// The requested model is not offered to this project or region.
    /// Terminal for the call; the caller decides whether to fall back.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Transport succeeded but the provider returned zero candidates
    #[error("Provider returned no candidates")]
    NoCandidates,

    /// Candidates exist but none carries inline image bytes
    /// (typically safety filtering)
    #[error("No image data in any candidate")]
    NoImageData,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Result type alias for image generation operations
pub type Result<T> = std::result::Result<T, ImageGenError>;
