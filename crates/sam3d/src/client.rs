//! HTTP client for SAM 3D Objects reconstruction endpoints
//!
//! Shapes the request (resize, mask synthesis, base64 payload), sends it with
//! a bounded timeout, and classifies/decodes the response. Reconstruction can
//! take minutes on a cold endpoint, so the convert timeout is deliberately
//! generous while the reachability probe stays short.

use crate::preprocess;
use crate::transport;
use crate::types::{ReconstructionRequest, ReconstructionResult, Result, Sam3dError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default endpoint for a locally deployed service
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/predict";

/// Upper bound on a single reconstruction request
pub const CONVERT_TIMEOUT_SECS: u64 = 300;

/// Upper bound on a reachability probe
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Client for SAM 3D Objects reconstruction
///
/// # Example
///
/// ```no_run
/// use apex_sam3d::Sam3dClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Sam3dClient::new("http://localhost:8080/predict")
///         .with_api_key("secret");
///
///     if !client.test_connection().await {
///         eprintln!("endpoint unreachable");
///     }
///
///     let image = std::fs::read("object.png")?;
///     let result = client.convert(&image, 42).await?;
///     std::fs::write(result.suggested_filename(), &result.bytes)?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Sam3dClient {
    client: Client,
    endpoint: String,
    api_key: String,
    convert_timeout: Duration,
    probe_timeout: Duration,
    target_size: u32,
    secure_context: bool,
}

impl Sam3dClient {
    /// Create a new client for the given endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Self {
        let mut endpoint = endpoint.into();
        // No trailing slash, for consistent logging and host extraction
        if endpoint.ends_with('/') {
            endpoint.pop();
        }

        Self {
            client: Client::new(),
            endpoint,
            api_key: String::new(),
            convert_timeout: Duration::from_secs(CONVERT_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            target_size: preprocess::TARGET_SIZE,
            secure_context: false,
        }
    }

    /// Create a client from `SAM3D_ENDPOINT` / `SAM3D_API_KEY` environment
    /// variables, falling back to the local default endpoint
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("SAM3D_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let api_key = std::env::var("SAM3D_API_KEY").unwrap_or_default();
        Self::new(endpoint).with_api_key(api_key)
    }

    /// Set the API key sent in the `X-API-Key` header
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Override the reconstruction timeout
    pub fn with_convert_timeout(mut self, timeout: Duration) -> Self {
        self.convert_timeout = timeout;
        self
    }

    /// Override the probe timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Override the input size sent to the service
    ///
    /// 256x256 is a hard contract with the deployed service; only use this
    /// against an endpoint known to accept other sizes.
    pub fn with_target_size(mut self, size: u32) -> Self {
        self.target_size = size;
        self
    }

    /// Mark the client as running in a secure (encrypted-origin) context,
    /// enabling the mixed-content pre-flight check
    pub fn with_secure_context(mut self, secure: bool) -> Self {
        self.secure_context = secure;
        self
    }

    /// Get the configured endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Convert a source image into a point cloud
    ///
    /// Resizes the image to the service's fixed input size, synthesizes a
    /// full-select mask, posts both as base64 PNGs, and decodes the returned
    /// `ply` field into raw bytes.
    pub async fn convert(&self, image_bytes: &[u8], seed: i64) -> Result<ReconstructionResult> {
        if transport::mixed_content_blocked(self.secure_context, &self.endpoint) {
            return Err(Sam3dError::MixedTransportBlocked(format!(
                "endpoint {} uses plaintext http from an encrypted context and the request \
                 would be silently blocked; switch the endpoint to https or tunnel it locally",
                self.endpoint
            )));
        }

        let resized = preprocess::resize_image(image_bytes, self.target_size, self.target_size)?;
        let mask = preprocess::build_full_select_mask(self.target_size, self.target_size);

        let request = ReconstructionRequest {
            image: STANDARD.encode(&resized),
            mask: STANDARD.encode(&mask),
            seed,
        };

        debug!(endpoint = %self.endpoint, seed, "sending reconstruction request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(&request)
            .timeout(self.convert_timeout)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e, self.convert_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_error_detail(&body);
            warn!(%status, %detail, "reconstruction request rejected");
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(Sam3dError::Unauthorized(detail));
            }
            return Err(Sam3dError::ServiceError(detail));
        }

        let body: crate::types::ReconstructionResponse = response
            .json()
            .await
            .map_err(|e| Sam3dError::MalformedResponse(format!("invalid JSON body: {}", e)))?;

        let field = body
            .ply
            .ok_or_else(|| Sam3dError::MalformedResponse("missing `ply` field".to_string()))?;

        let bytes = decode_ply_field(&field)?;
        info!(bytes = bytes.len(), "reconstruction payload decoded");
        Ok(ReconstructionResult::new(bytes))
    }

    /// Probe the endpoint for reachability
    ///
    /// Any HTTP response, including an error status, counts as reachable;
    /// only a transport-level failure yields `false`. Never returns an error.
    pub async fn test_connection(&self) -> bool {
        let result = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "ping": "pong" }))
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                debug!(status = %response.status(), "probe got a response");
                true
            }
            Err(e) => {
                debug!(error = %e, "probe failed at transport level");
                false
            }
        }
    }

    fn classify_transport_error(&self, e: reqwest::Error, timeout: Duration) -> Sam3dError {
        if e.is_timeout() {
            Sam3dError::Timeout(timeout.as_secs())
        } else if e.is_connect() {
            Sam3dError::ConnectionError(format!(
                "failed to connect to {}: {}",
                self.endpoint, e
            ))
        } else {
            Sam3dError::RequestFailed(e)
        }
    }
}

/// Extract a human-readable detail from an error response body
///
/// Checks `detail`, then `message`, then `error`; falls back to the
/// serialized body, then to the raw text truncated to 200 characters.
pub fn extract_error_detail(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(field) = value.get(key) {
                return match field.as_str() {
                    Some(s) => s.to_string(),
                    None => field.to_string(),
                };
            }
        }
        return value.to_string();
    }
    body.chars().take(200).collect()
}

/// Decode the transport-encoded `ply` field into raw bytes
///
/// Strips any data-URI prefix and embedded whitespace first. Decoding is
/// strict; a single corrupt character fails rather than yielding shifted
/// geometry.
pub fn decode_ply_field(field: &str) -> Result<Vec<u8>> {
    let compact: String = field.chars().filter(|c| !c.is_whitespace()).collect();
    let payload = if compact.starts_with("data:") {
        match compact.find("base64,") {
            Some(idx) => &compact[idx + "base64,".len()..],
            None => {
                return Err(Sam3dError::DecodeError(
                    "data-URI payload is not base64".to_string(),
                ))
            }
        }
    } else {
        compact.as_str()
    };

    STANDARD
        .decode(payload)
        .map_err(|e| Sam3dError::DecodeError(format!("invalid base64 in `ply` field: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_detail_field() {
        let body = r#"{"detail":"GPU OOM","message":"other","error":"also other"}"#;
        assert_eq!(extract_error_detail(body), "GPU OOM");
    }

    #[test]
    fn error_detail_falls_back_to_message_then_error() {
        assert_eq!(
            extract_error_detail(r#"{"message":"queue full"}"#),
            "queue full"
        );
        assert_eq!(extract_error_detail(r#"{"error":"boom"}"#), "boom");
    }

    #[test]
    fn error_detail_serializes_non_string_fields() {
        assert_eq!(
            extract_error_detail(r#"{"detail":{"code":13}}"#),
            r#"{"code":13}"#
        );
    }

    #[test]
    fn error_detail_serializes_unrecognized_body() {
        assert_eq!(extract_error_detail(r#"{"status":"failed"}"#), r#"{"status":"failed"}"#);
    }

    #[test]
    fn error_detail_truncates_raw_text() {
        let raw = "x".repeat(500);
        assert_eq!(extract_error_detail(&raw).len(), 200);
    }

    #[test]
    fn ply_field_decodes_byte_exact() {
        let payload: Vec<u8> = (0u8..=255).collect();
        let encoded = STANDARD.encode(&payload);
        assert_eq!(decode_ply_field(&encoded).unwrap(), payload);
    }

    #[test]
    fn ply_field_strips_data_uri_prefix_and_whitespace() {
        let payload = b"0123456789";
        let encoded = STANDARD.encode(payload);
        let wrapped = format!(
            "data:application/octet-stream;base64,{}\n",
            encoded
        );
        assert_eq!(decode_ply_field(&wrapped).unwrap(), payload);

        let spaced: String = encoded
            .chars()
            .enumerate()
            .flat_map(|(i, c)| {
                if i == 4 {
                    vec!['\n', c]
                } else {
                    vec![c]
                }
            })
            .collect();
        assert_eq!(decode_ply_field(&spaced).unwrap(), payload);
    }

    #[test]
    fn ply_field_rejects_corrupt_base64() {
        let err = decode_ply_field("abc!def").unwrap_err();
        assert!(matches!(err, Sam3dError::DecodeError(_)));
    }

    #[test]
    fn ten_byte_payload_yields_ten_bytes() {
        let encoded = STANDARD.encode([7u8; 10]);
        assert_eq!(decode_ply_field(&encoded).unwrap().len(), 10);
    }

    #[tokio::test]
    async fn convert_flags_mixed_content_without_a_request() {
        // The endpoint does not exist; the check must trip before any
        // connection attempt.
        let client = Sam3dClient::new("http://sam3d.invalid/predict").with_secure_context(true);
        let image = crate::preprocess::build_full_select_mask(8, 8);
        let err = client.convert(&image, 1).await.unwrap_err();
        assert!(matches!(err, Sam3dError::MixedTransportBlocked(_)));
    }

    #[tokio::test]
    async fn probe_returns_false_for_unreachable_endpoint() {
        let client = Sam3dClient::new("http://127.0.0.1:1/predict")
            .with_probe_timeout(Duration::from_millis(500));
        assert!(!client.test_connection().await);
    }
}
