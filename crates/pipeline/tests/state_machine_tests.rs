//! Integration tests for the pipeline stage state machine
//!
//! Exercise the controller against scripted in-process clients: transitions,
//! fallback selection, failure recording, cancellation, and reset.

use apex_imagegen::{GeneratedImage, ImageGenError};
use apex_pipeline::{
    ImageGenerator, PipelineController, PipelineError, PipelineStage, Reconstructor,
};
use apex_sam3d::{ReconstructionResult, Sam3dError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Scripted client doubles
// =============================================================================

#[derive(Clone)]
enum GenOutcome {
    Image(&'static [u8], &'static str),
    ModelUnavailable,
    NoCandidates,
    NoImageData,
    Error(&'static str),
    Hang,
}

struct StubGen {
    script: Mutex<VecDeque<GenOutcome>>,
    calls: Mutex<Vec<String>>,
}

impl StubGen {
    fn new(script: impl IntoIterator<Item = GenOutcome>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for StubGen {
    async fn generate(&self, _prompt: &str, model: &str) -> apex_imagegen::Result<GeneratedImage> {
        self.calls.lock().unwrap().push(model.to_string());
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("stub script exhausted");
        match outcome {
            GenOutcome::Image(bytes, mime) => Ok(GeneratedImage {
                bytes: bytes.to_vec(),
                mime_type: mime.to_string(),
            }),
            GenOutcome::ModelUnavailable => Err(ImageGenError::ModelUnavailable(
                "model is not found".to_string(),
            )),
            GenOutcome::NoCandidates => Err(ImageGenError::NoCandidates),
            GenOutcome::NoImageData => Err(ImageGenError::NoImageData),
            GenOutcome::Error(message) => Err(ImageGenError::ServiceError(message.to_string())),
            GenOutcome::Hang => std::future::pending().await,
        }
    }
}

#[derive(Clone)]
enum ReconOutcome {
    Bytes(&'static [u8]),
    Service(&'static str),
    Timeout,
    Hang,
}

struct StubRecon {
    outcome: ReconOutcome,
    calls: Mutex<Vec<i64>>,
}

impl StubRecon {
    fn new(outcome: ReconOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Reconstructor for StubRecon {
    async fn convert(&self, _image: &[u8], seed: i64) -> apex_sam3d::Result<ReconstructionResult> {
        self.calls.lock().unwrap().push(seed);
        match &self.outcome {
            ReconOutcome::Bytes(bytes) => Ok(ReconstructionResult::new(bytes.to_vec())),
            ReconOutcome::Service(message) => {
                Err(Sam3dError::ServiceError(message.to_string()))
            }
            ReconOutcome::Timeout => Err(Sam3dError::Timeout(300)),
            ReconOutcome::Hang => std::future::pending().await,
        }
    }
}

fn controller(gen: Arc<StubGen>, recon: Arc<StubRecon>) -> PipelineController {
    PipelineController::new(gen, recon)
}

// =============================================================================
// Generation stage
// =============================================================================

#[tokio::test]
async fn generation_success_yields_image_ready() {
    let gen = StubGen::new([GenOutcome::Image(b"png-bytes", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("a red apple").await.unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::ImageReady);
    let image = pipeline.image().unwrap();
    assert_eq!(image.bytes, b"png-bytes");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(pipeline.progress_percent(), 100);
}

#[tokio::test]
async fn generation_failure_yields_error_with_no_image() {
    let gen = StubGen::new([GenOutcome::NoCandidates]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    let err = pipeline.generate("a red apple").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::ImageGen(ImageGenError::NoCandidates)
    ));
    assert_eq!(pipeline.stage(), PipelineStage::Error);
    assert!(pipeline.image().is_none());
    assert!(pipeline.error_message().is_some());
    assert_eq!(pipeline.progress_percent(), 0);
}

#[tokio::test]
async fn safety_filtered_response_yields_error() {
    let gen = StubGen::new([GenOutcome::NoImageData]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("something filtered").await.unwrap_err();
    assert_eq!(pipeline.stage(), PipelineStage::Error);
}

#[tokio::test]
async fn unavailable_primary_falls_back_once() {
    let gen = StubGen::new([
        GenOutcome::ModelUnavailable,
        GenOutcome::Image(b"img", "image/png"),
    ]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen.clone(), recon);

    pipeline.generate("a vase").await.unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::ImageReady);
    assert_eq!(
        gen.models_called(),
        vec![
            apex_imagegen::PRIMARY_MODEL.to_string(),
            apex_imagegen::FALLBACK_MODEL.to_string(),
        ]
    );
}

#[tokio::test]
async fn error_state_allows_generate_reentry() {
    let gen = StubGen::new([
        GenOutcome::NoCandidates,
        GenOutcome::Image(b"img", "image/png"),
    ]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("first try").await.unwrap_err();
    assert_eq!(pipeline.stage(), PipelineStage::Error);

    pipeline.generate("second try").await.unwrap();
    assert_eq!(pipeline.stage(), PipelineStage::ImageReady);
}

// =============================================================================
// Conversion stage
// =============================================================================

#[tokio::test]
async fn full_pipeline_reaches_complete_with_exact_bytes() {
    let gen = StubGen::new([GenOutcome::Image(b"png-bytes", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(&[7u8; 10]));
    let mut pipeline = controller(gen, recon.clone());

    pipeline.generate("a red apple").await.unwrap();
    pipeline.convert(42).await.unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::Complete);
    assert_eq!(pipeline.result().unwrap().len(), 10);
    // Source image is retained alongside the result
    assert!(pipeline.image().is_some());
    assert_eq!(*recon.calls.lock().unwrap(), vec![42]);
    assert_eq!(pipeline.progress_percent(), 100);
}

#[tokio::test]
async fn service_failure_detail_is_recorded() {
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Service("GPU OOM"));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("a red apple").await.unwrap();
    pipeline.convert(1).await.unwrap_err();

    assert_eq!(pipeline.stage(), PipelineStage::Error);
    assert!(pipeline.error_message().unwrap().contains("GPU OOM"));
}

#[tokio::test]
async fn timeout_failure_keeps_its_kind() {
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Timeout);
    let mut pipeline = controller(gen, recon);

    pipeline.generate("a slow one").await.unwrap();
    let err = pipeline.convert(1).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Reconstruction(Sam3dError::Timeout(300))
    ));
    assert!(pipeline
        .error_message()
        .unwrap()
        .contains("may still be processing"));
}

// =============================================================================
// Transition guards
// =============================================================================

#[tokio::test]
async fn convert_is_rejected_outside_image_ready() {
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon.clone());

    let err = pipeline.convert(1).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidTransition {
            action: "convert",
            stage: PipelineStage::Idle,
        }
    ));
    // The guard must not have touched the reconstructor or the stage
    assert!(recon.calls.lock().unwrap().is_empty());
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
}

#[tokio::test]
async fn generate_is_rejected_while_image_is_held() {
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("a vase").await.unwrap();
    let err = pipeline.generate("another vase").await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidTransition { .. }));
    assert_eq!(pipeline.stage(), PipelineStage::ImageReady);
}

// =============================================================================
// Reset and cancellation
// =============================================================================

#[tokio::test]
async fn reset_returns_to_idle_from_every_state() {
    // Complete
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(&[1, 2, 3]));
    let mut pipeline = controller(gen, recon);
    pipeline.generate("x").await.unwrap();
    pipeline.convert(7).await.unwrap();
    pipeline.reset();
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
    assert!(pipeline.image().is_none());
    assert!(pipeline.result().is_none());
    assert_eq!(pipeline.progress_percent(), 0);

    // Error
    let gen = StubGen::new([GenOutcome::NoCandidates]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);
    pipeline.generate("x").await.unwrap_err();
    pipeline.reset();
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
    assert!(pipeline.error_message().is_none());

    // Idle: reset is a no-op but still allowed
    pipeline.reset();
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
}

#[tokio::test(start_paused = true)]
async fn cancelling_in_flight_generation_returns_to_idle() {
    let gen = StubGen::new([GenOutcome::Hang]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    let handle = pipeline.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = pipeline.generate("a hanging prompt").await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
    assert!(pipeline.image().is_none());
    assert_eq!(pipeline.progress_percent(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_in_flight_conversion_returns_to_idle() {
    let gen = StubGen::new([GenOutcome::Image(b"img", "image/png")]);
    let recon = StubRecon::new(ReconOutcome::Hang);
    let mut pipeline = controller(gen, recon);

    pipeline.generate("x").await.unwrap();

    let handle = pipeline.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let err = pipeline.convert(1).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(pipeline.stage(), PipelineStage::Idle);
}

// =============================================================================
// Credential invalidation
// =============================================================================

#[tokio::test]
async fn stale_credential_failure_sets_flag_until_reset() {
    let gen = StubGen::new([GenOutcome::Error("Requested entity was not found.")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("x").await.unwrap_err();
    assert!(pipeline.credentials_invalidated());

    pipeline.reset();
    assert!(!pipeline.credentials_invalidated());
}

#[tokio::test]
async fn ordinary_failures_leave_credentials_alone() {
    let gen = StubGen::new([GenOutcome::Error("backend overloaded")]);
    let recon = StubRecon::new(ReconOutcome::Bytes(b""));
    let mut pipeline = controller(gen, recon);

    pipeline.generate("x").await.unwrap_err();
    assert!(!pipeline.credentials_invalidated());
}
