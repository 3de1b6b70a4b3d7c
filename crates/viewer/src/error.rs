//! Error types for the viewer
//!
//! A parse failure here must never strand the user: the raw bytes remain
//! downloadable, the viewer is only a convenience on top of them.

use thiserror::Error;

/// Viewer error types
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("PLY parse error: {0}")]
    ParseError(String),

    #[error("Unsupported PLY feature: {0}")]
    Unsupported(String),
}

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, ViewerError>;
