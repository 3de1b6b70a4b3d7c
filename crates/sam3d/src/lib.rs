//! SAM 3D Objects reconstruction client
//!
//! Turns a source image into a raw point-cloud payload by calling a deployed
//! SAM 3D Objects HTTP endpoint:
//!
//! ```text
//! Image bytes
//!     ├─ preprocess::resize_image()          256x256 PNG
//!     ├─ preprocess::build_full_select_mask() matching opaque mask
//!     ↓ HTTP POST {image, mask, seed}
//! SAM 3D endpoint
//!     ↓ {"ply": "<base64>", "status": "success"}
//! ReconstructionResult (raw PLY bytes)
//! ```
//!
//! The client classifies failures into distinct kinds so callers can present
//! actionable messages: a 300 s timeout means "still processing, try again",
//! a mixed-content block means "fix the endpoint scheme", and so on.

pub mod client;
pub mod preprocess;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{
    decode_ply_field, extract_error_detail, Sam3dClient, CONVERT_TIMEOUT_SECS, DEFAULT_ENDPOINT,
    PROBE_TIMEOUT_SECS,
};
pub use preprocess::TARGET_SIZE;
pub use transport::mixed_content_blocked;
pub use types::{
    ReconstructionRequest, ReconstructionResponse, ReconstructionResult, Result, Sam3dError,
};
