//! Text-to-3D pipeline orchestration
//!
//! Sequences the two remote stages - text-to-image generation, then
//! image-to-3D reconstruction - behind an explicit stage state machine:
//!
//! ```text
//! Idle --generate(prompt)--> GeneratingImage
//! GeneratingImage --success--> ImageReady
//! GeneratingImage --failure--> Error
//! ImageReady --convert(seed)--> Converting3D
//! Converting3D --success--> Complete
//! Converting3D --failure--> Error
//! {any} --reset()--> Idle
//! Error --generate(prompt)--> GeneratingImage
//! ```
//!
//! Progress is a synthetic ramp (the services report nothing usable), every
//! network call is bound to a cancellation token, and failures surface as
//! recorded user-facing messages rather than retries.
//!
//! # Modules
//!
//! - [`controller`]: the stage state machine
//! - [`clients`]: trait seams over the two remote clients
//! - [`progress`]: synthetic progress ramps
//! - [`settings`]: persisted endpoint/credential configuration
//! - [`error`]: pipeline error types

pub mod clients;
pub mod controller;
pub mod error;
pub mod progress;
pub mod settings;

// Re-export commonly used types
pub use clients::{ImageGenerator, Reconstructor};
pub use controller::{invalidates_credentials, PipelineController, PipelineStage};
pub use error::{PipelineError, Result};
pub use progress::{ProgressTracker, StageProfile};
pub use settings::{Settings, SettingsError};
