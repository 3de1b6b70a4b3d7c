//! Types for SAM 3D Objects API requests and responses

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SAM 3D client error types
#[derive(Debug, Error)]
pub enum Sam3dError {
    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request timed out after {0}s - the service may still be processing, try again later")]
    Timeout(u64),

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Mixed content blocked: {0}")]
    MixedTransportBlocked(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Result type alias for SAM 3D operations
pub type Result<T> = std::result::Result<T, Sam3dError>;

/// Request payload for SAM 3D reconstruction
///
/// Both images are base64-encoded PNGs at the service's fixed input size.
/// Constructed fresh per call, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ReconstructionRequest {
    /// Base64-encoded source image
    pub image: String,

    /// Base64-encoded foreground mask, same dimensions as the image
    pub mask: String,

    /// Random seed for reproducibility
    pub seed: i64,
}

/// Successful response body from the reconstruction endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ReconstructionResponse {
    /// Base64-encoded point-cloud payload, optionally with a data-URI prefix
    pub ply: Option<String>,

    /// Status marker reported by the service
    #[serde(default)]
    pub status: Option<String>,
}

/// Decoded reconstruction result: raw point-cloud bytes ready for
/// rendering or download
#[derive(Debug, Clone)]
pub struct ReconstructionResult {
    /// Raw PLY payload
    pub bytes: Vec<u8>,

    /// Content type for downloads
    pub content_type: &'static str,
}

impl ReconstructionResult {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: "application/octet-stream",
        }
    }

    /// Suggested filename when offering the payload as a download
    pub fn suggested_filename(&self) -> &'static str {
        "model.ply"
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
