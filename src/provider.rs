//! Generative Provider Abstraction
//!
//! Trait seams for the external media providers the engine orchestrates:
//! image synthesis, long-running video synthesis, vision layout extraction and
//! image refinement. Concrete HTTP clients live in the submodules; the rest of
//! the crate only sees the traits.

use crate::error::EngineError;
use crate::types::ImageSize;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod dashscope;
pub mod gemini;

pub use dashscope::DashscopeClient;
pub use gemini::GeminiClient;

/// Raw media bytes plus their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image from disk, inferring the MIME type from its extension
    pub async fn load_image(path: &Path) -> Result<Self, EngineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            EngineError::IoError(std::io::Error::new(
                e.kind(),
                format!("Failed to read image {}: {}", path.display(), e),
            ))
        })?;
        Ok(Self::new(bytes, image_mime_type(path)))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// `.jpg`/`.jpeg` are sent as JPEG, everything else as PNG
pub fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// One image synthesis call
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub prompt: String,
    pub image_size: Option<ImageSize>,
    pub aspect_ratio: Option<String>,
    pub reference_images: Vec<MediaPayload>,
    pub model: String,
}

/// Handle to a long-running provider operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHandle {
    pub name: String,
}

impl OperationHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Result of polling a long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationStatus {
    pub done: bool,
    pub error: Option<String>,
}

impl OperationStatus {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn done() -> Self {
        Self {
            done: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(message.into()),
        }
    }
}

/// Image synthesis provider
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image. `Ok(None)` means the provider answered without a
    /// media payload.
    async fn generate(&self, request: &ImageRequest) -> Result<Option<MediaPayload>, EngineError>;

    fn provider_name(&self) -> &str;
}

/// Long-running video synthesis provider (submit / poll / download)
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn submit(
        &self,
        source_image: &MediaPayload,
        prompt: &str,
        model: &str,
    ) -> Result<OperationHandle, EngineError>;

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, EngineError>;

    async fn download(&self, handle: &OperationHandle) -> Result<Vec<u8>, EngineError>;

    fn provider_name(&self) -> &str;
}

/// Vision provider that reads text placement out of a rendered image.
///
/// Returns the provider's raw text answer; parsing into layout records is the
/// caller's job so malformed answers stay a recoverable, local failure.
#[async_trait]
pub trait LayoutProvider: Send + Sync {
    async fn analyze(
        &self,
        image: &MediaPayload,
        instruction: &str,
        model: Option<&str>,
    ) -> Result<String, EngineError>;

    fn provider_name(&self) -> &str;
}

/// Instruction-driven image editing provider
#[async_trait]
pub trait RefineProvider: Send + Sync {
    async fn edit(&self, image: &MediaPayload, instruction: &str)
        -> Result<MediaPayload, EngineError>;

    fn provider_name(&self) -> &str;
}

// Helper function to map HTTP errors to EngineError
pub(crate) fn map_http_error(error: reqwest::Error) -> EngineError {
    if let Some(status) = error.status() {
        map_status(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        EngineError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        EngineError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        EngineError::ProviderError(format!("HTTP error: {}", error))
    }
}

pub(crate) fn map_status(status: u16, body: &str) -> EngineError {
    match status {
        401 | 403 => EngineError::ProviderAuthFailed(format!("Authentication failed: {}", body)),
        429 => EngineError::ProviderRateLimit(format!("Rate limit exceeded: {}", body)),
        404 => EngineError::ProviderModelNotFound(format!("Model not found: {}", body)),
        _ => EngineError::ProviderRequestFailed(format!(
            "Request failed with status {}: {}",
            status, body
        )),
    }
}

/// Turn a non-success response into an error, keeping the body for context
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, EngineError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(map_status(status, &truncate(&error_text, 400)))
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) fn build_provider_http_client() -> Result<Client, EngineError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EngineError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}
