//! Text-to-image generation client
//!
//! Wraps a `generateContent`-style image API with a fixed photogrammetry
//! prompt treatment so the output feeds cleanly into 3D reconstruction.
//! Model selection is per call: try [`PRIMARY_MODEL`] first and fall back to
//! [`FALLBACK_MODEL`] when the client reports
//! [`ImageGenError::ModelUnavailable`] - fallback is the caller's decision,
//! never an internal retry.

pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use client::{
    build_request, image_from_response, ImageGenClient, DEFAULT_BASE_URL, FALLBACK_MODEL,
    PRIMARY_MODEL, PROMPT_DIRECTIVES,
};
pub use error::{ImageGenError, Result};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GeneratedImage,
    GenerationConfig, ImageConfig, InlineData, Part,
};
