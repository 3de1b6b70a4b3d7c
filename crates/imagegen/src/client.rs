//! HTTP client for the `generateContent` image API

use crate::error::{ImageGenError, Result};
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GeneratedImage, GenerationConfig,
    Part,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// High-fidelity primary model; may be region-restricted
pub const PRIMARY_MODEL: &str = "gemini-3-pro-image-preview";

/// Fallback model with broader availability
pub const FALLBACK_MODEL: &str = "gemini-2.5-flash-image";

/// Directives appended to every prompt so the output photographs well for
/// reconstruction: one centered subject, clean silhouette, even lighting.
/// These are a correctness requirement for the 3D step, not styling, and are
/// never user-toggleable.
pub const PROMPT_DIRECTIVES: &str = "Render as an isometric three-quarter view of a single \
centered object on a solid white background with soft studio lighting. No text, no watermarks, \
nothing cropped or cut off at the edges.";

/// Client for text-to-image generation
///
/// The model is passed per call so the caller owns primary/fallback
/// selection; this client never retries on its own.
#[derive(Debug, Clone)]
pub struct ImageGenClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl ImageGenClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Create a client from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> Self {
        Self::new(std::env::var("GEMINI_API_KEY").unwrap_or_default())
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if url.ends_with('/') {
            url.pop();
        }
        self.base_url = url;
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate an image from a text prompt with the given model
    ///
    /// Appends the photogrammetry directives to the prompt, requests a
    /// square high-resolution image, and returns the first candidate that
    /// carries inline image bytes.
    pub async fn generate(&self, prompt: &str, model: &str) -> Result<GeneratedImage> {
        let request = build_request(prompt);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        debug!(model, "sending image generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImageGenError::Timeout(self.timeout.as_secs())
                } else if e.is_connect() {
                    ImageGenError::ConnectionError(format!("failed to reach provider: {}", e))
                } else {
                    ImageGenError::RequestFailed(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_status(model, status, &body));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::ServiceError(format!("invalid response body: {}", e)))?;

        image_from_response(body)
    }
}

/// Build the request body, appending the fixed directives to the prompt
pub fn build_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part::text(format!("{}. {}", prompt.trim(), PROMPT_DIRECTIVES))],
        }],
        generation_config: GenerationConfig::default(),
    }
}

/// Classify a non-success HTTP status into an error kind
///
/// A 404 or a body mentioning model availability maps to
/// [`ImageGenError::ModelUnavailable`] so the caller can fall back.
fn classify_error_status(model: &str, status: StatusCode, body: &str) -> ImageGenError {
    let lowered = body.to_lowercase();
    if status == StatusCode::NOT_FOUND
        || lowered.contains("is not found")
        || lowered.contains("not supported")
        || lowered.contains("not available in your")
    {
        warn!(model, %status, "model unavailable");
        return ImageGenError::ModelUnavailable(format!("{}: {}", model, truncate(body, 200)));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ImageGenError::Unauthorized(truncate(body, 200));
    }
    ImageGenError::ServiceError(format!("{}: {}", status, truncate(body, 200)))
}

/// Extract the first inline image from a parsed response
pub fn image_from_response(response: GenerateContentResponse) -> Result<GeneratedImage> {
    if response.candidates.is_empty() {
        return Err(ImageGenError::NoCandidates);
    }

    for candidate in response.candidates {
        let Some(content) = candidate.content else {
            continue;
        };
        for part in content.parts {
            if let Some(inline) = part.inline_data {
                let compact: String = inline.data.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD.decode(compact).map_err(|e| {
                    ImageGenError::DecodeError(format!("invalid base64 image data: {}", e))
                })?;
                return Ok(GeneratedImage {
                    bytes,
                    mime_type: inline.mime_type,
                });
            }
        }
    }

    Err(ImageGenError::NoImageData)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
