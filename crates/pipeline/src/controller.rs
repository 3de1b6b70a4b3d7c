//! Pipeline stage state machine
//!
//! Sequences image generation and 3D reconstruction. Stage data lives inside
//! the state enum, so illegal combinations (a conversion with no source
//! image, a completed result with no image) are unrepresentable, and
//! reconstruction structurally cannot start before generation has succeeded.

use crate::clients::{ImageGenerator, Reconstructor};
use crate::error::{PipelineError, Result};
use crate::progress::{ProgressTracker, StageProfile};
use apex_imagegen::{GeneratedImage, ImageGenError, FALLBACK_MODEL, PRIMARY_MODEL};
use apex_sam3d::ReconstructionResult;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Observable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    GeneratingImage,
    ImageReady,
    Converting3D,
    Complete,
    Error,
}

/// Internal state; variants own the data their stage requires
enum StageState {
    Idle,
    GeneratingImage,
    ImageReady {
        image: GeneratedImage,
    },
    Converting3D {
        image: GeneratedImage,
    },
    Complete {
        image: GeneratedImage,
        result: ReconstructionResult,
    },
    Error {
        message: String,
    },
}

impl StageState {
    fn stage(&self) -> PipelineStage {
        match self {
            StageState::Idle => PipelineStage::Idle,
            StageState::GeneratingImage => PipelineStage::GeneratingImage,
            StageState::ImageReady { .. } => PipelineStage::ImageReady,
            StageState::Converting3D { .. } => PipelineStage::Converting3D,
            StageState::Complete { .. } => PipelineStage::Complete,
            StageState::Error { .. } => PipelineStage::Error,
        }
    }
}

/// Orchestrates the prompt -> image -> point-cloud pipeline
///
/// One network operation may be in flight per controller; `generate` is only
/// accepted from `Idle`/`Error`, `convert` only from `ImageReady`, and
/// `reset` from anywhere.
pub struct PipelineController {
    imagegen: Arc<dyn ImageGenerator>,
    recon: Arc<dyn Reconstructor>,
    state: StageState,
    progress: ProgressTracker,
    cancel: CancellationToken,
    credentials_invalidated: bool,
    primary_model: String,
    fallback_model: String,
}

impl PipelineController {
    pub fn new(imagegen: Arc<dyn ImageGenerator>, recon: Arc<dyn Reconstructor>) -> Self {
        Self {
            imagegen,
            recon,
            state: StageState::Idle,
            progress: ProgressTracker::new(),
            cancel: CancellationToken::new(),
            credentials_invalidated: false,
            primary_model: PRIMARY_MODEL.to_string(),
            fallback_model: FALLBACK_MODEL.to_string(),
        }
    }

    /// Override the primary/fallback model pair
    pub fn with_models(
        mut self,
        primary: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        self.primary_model = primary.into();
        self.fallback_model = fallback.into();
        self
    }

    /// Current observable stage
    pub fn stage(&self) -> PipelineStage {
        self.state.stage()
    }

    /// The generated image, if one is held by the current stage
    pub fn image(&self) -> Option<&GeneratedImage> {
        match &self.state {
            StageState::ImageReady { image }
            | StageState::Converting3D { image }
            | StageState::Complete { image, .. } => Some(image),
            _ => None,
        }
    }

    /// The reconstruction result, once complete
    pub fn result(&self) -> Option<&ReconstructionResult> {
        match &self.state {
            StageState::Complete { result, .. } => Some(result),
            _ => None,
        }
    }

    /// The recorded failure message, when in `Error`
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            StageState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Subscribe to synthetic progress updates (0-100)
    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Current synthetic progress percentage
    pub fn progress_percent(&self) -> u8 {
        self.progress.percent()
    }

    /// Whether a failure indicated the stored credential is no longer valid
    /// and the caller should re-prompt for one
    pub fn credentials_invalidated(&self) -> bool {
        self.credentials_invalidated
    }

    /// A handle that cancels the current (and any subsequent, until `reset`)
    /// in-flight operation when triggered
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the image-generation stage
    ///
    /// Valid from `Idle` and `Error` (re-entry after failure). Tries the
    /// primary model and falls back once on `ModelUnavailable`.
    pub async fn generate(&mut self, prompt: &str) -> Result<()> {
        match self.state {
            StageState::Idle | StageState::Error { .. } => {}
            _ => {
                return Err(PipelineError::InvalidTransition {
                    action: "generate",
                    stage: self.stage(),
                })
            }
        }

        self.state = StageState::GeneratingImage;
        self.progress.start(StageProfile::GENERATING);
        let token = self.cancel.child_token();

        let outcome = tokio::select! {
            _ = token.cancelled() => Err(PipelineError::Cancelled),
            result = self.generate_with_fallback(prompt) => result,
        };

        match outcome {
            Ok(image) => {
                info!(mime = %image.mime_type, bytes = image.bytes.len(), "image generated");
                self.progress.finish();
                self.state = StageState::ImageReady { image };
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run the 3D-conversion stage
    ///
    /// Valid only from `ImageReady`; the stage variant owning the image is
    /// what makes an out-of-order conversion impossible.
    pub async fn convert(&mut self, seed: i64) -> Result<()> {
        let image = match std::mem::replace(&mut self.state, StageState::Idle) {
            StageState::ImageReady { image } => image,
            other => {
                let stage = other.stage();
                self.state = other;
                return Err(PipelineError::InvalidTransition {
                    action: "convert",
                    stage,
                });
            }
        };

        self.state = StageState::Converting3D {
            image: image.clone(),
        };
        self.progress.start(StageProfile::CONVERTING);
        let token = self.cancel.child_token();

        let outcome = tokio::select! {
            _ = token.cancelled() => Err(PipelineError::Cancelled),
            result = self.recon.convert(&image.bytes, seed) => {
                result.map_err(PipelineError::from)
            }
        };

        match outcome {
            Ok(result) => {
                info!(bytes = result.len(), "point cloud ready");
                self.progress.finish();
                self.state = StageState::Complete { image, result };
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Cancel any in-flight work, discard all stage data, and return to
    /// `Idle`. Unconditionally allowed.
    pub fn reset(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.progress.clear();
        self.credentials_invalidated = false;
        self.state = StageState::Idle;
    }

    async fn generate_with_fallback(&self, prompt: &str) -> Result<GeneratedImage> {
        match self.imagegen.generate(prompt, &self.primary_model).await {
            Ok(image) => Ok(image),
            Err(ImageGenError::ModelUnavailable(detail)) => {
                warn!(%detail, fallback = %self.fallback_model, "primary model unavailable, falling back");
                self.imagegen
                    .generate(prompt, &self.fallback_model)
                    .await
                    .map_err(PipelineError::from)
            }
            Err(e) => Err(PipelineError::from(e)),
        }
    }

    /// Record a stage failure and return the error for the caller
    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.progress.clear();
        if matches!(error, PipelineError::Cancelled) {
            self.cancel = CancellationToken::new();
            self.state = StageState::Idle;
            return error;
        }

        let message = error.to_string();
        if invalidates_credentials(&message) {
            warn!("failure indicates a stale credential, flagging for re-entry");
            self.credentials_invalidated = true;
        }
        self.state = StageState::Error { message };
        error
    }
}

/// Whether a failure message matches the provider's entity/key-not-found
/// pattern, meaning any cached credential should be treated as stale
pub fn invalidates_credentials(message: &str) -> bool {
    let lowered = message.to_lowercase();
    if lowered.contains("api key not valid") || lowered.contains("api_key_invalid") {
        return true;
    }
    lowered.contains("not found") && (lowered.contains("entity") || lowered.contains("key"))
}
