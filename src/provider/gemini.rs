//! Gemini REST client: image generation, Veo video operations and vision layout analysis.

use super::{
    build_provider_http_client, ensure_success, map_http_error, ImageProvider, ImageRequest,
    LayoutProvider, MediaPayload, OperationHandle, OperationStatus, VideoProvider,
};
use crate::error::EngineError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, EngineError> {
        if api_key.trim().is_empty() {
            return Err(EngineError::ProviderNotConfigured(
                "Gemini API key is empty".to_string(),
            ));
        }
        Ok(Self {
            client: build_provider_http_client()?,
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<GenerateContentResponse, EngineError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        response
            .json()
            .await
            .map_err(|e| EngineError::ProviderError(format!("Failed to parse response: {}", e)))
    }

    async fn get_operation(&self, handle: &OperationHandle) -> Result<VideoOperation, EngineError> {
        let url = format!("{}/{}", self.base_url, handle.name);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(|e| {
            EngineError::ProviderError(format!("Failed to parse operation status: {}", e))
        })
    }
}

fn inline_part(payload: &MediaPayload) -> Value {
    json!({
        "inlineData": {
            "mimeType": payload.mime_type,
            "data": STANDARD.encode(&payload.bytes),
        }
    })
}

fn image_request_body(request: &ImageRequest) -> Value {
    let mut parts: Vec<Value> = request.reference_images.iter().map(inline_part).collect();
    parts.push(json!({ "text": request.prompt }));

    let mut generation_config = json!({ "responseModalities": ["IMAGE", "TEXT"] });
    if let Some(size) = request.image_size {
        generation_config["imageConfig"] = json!({
            "aspectRatio": request.aspect_ratio.as_deref().unwrap_or("16:9"),
            "imageSize": size.as_str(),
        });
    }

    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": generation_config,
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoOperation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<VideoResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    uri: Option<String>,
}

impl VideoOperation {
    fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Option<MediaPayload>, EngineError> {
        let body = image_request_body(request);
        let response = self.generate_content(&request.model, &body).await?;

        for part in response.first_parts() {
            if let Some(inline) = &part.inline_data {
                let bytes = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                    EngineError::ProviderError(format!("Invalid base64 image payload: {}", e))
                })?;
                let mime_type = inline
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string());
                return Ok(Some(MediaPayload::new(bytes, mime_type)));
            }
        }
        Ok(None)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl LayoutProvider for GeminiClient {
    async fn analyze(
        &self,
        image: &MediaPayload,
        instruction: &str,
        model: Option<&str>,
    ) -> Result<String, EngineError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [inline_part(image), { "text": instruction }],
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });
        let model = model.unwrap_or(DEFAULT_VISION_MODEL);
        let response = self.generate_content(model, &body).await?;
        response
            .first_parts()
            .first()
            .and_then(|p| p.text.clone())
            .ok_or_else(|| {
                EngineError::LayoutExtractionFailed("Vision model returned no text".to_string())
            })
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl VideoProvider for GeminiClient {
    async fn submit(
        &self,
        source_image: &MediaPayload,
        prompt: &str,
        model: &str,
    ) -> Result<OperationHandle, EngineError> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, model);
        let body = json!({
            "instances": [{
                "prompt": prompt,
                "image": {
                    "bytesBase64Encoded": STANDARD.encode(&source_image.bytes),
                    "mimeType": source_image.mime_type,
                },
            }],
        });
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let operation: VideoOperation = response.json().await.map_err(|e| {
            EngineError::ProviderError(format!("Failed to parse video operation: {}", e))
        })?;
        if operation.name.is_empty() {
            return Err(EngineError::VideoGenerationFailed(
                "Provider returned an operation without a name".to_string(),
            ));
        }
        debug!(operation = %operation.name, model, "Submitted video generation");
        Ok(OperationHandle::new(operation.name))
    }

    async fn poll(&self, handle: &OperationHandle) -> Result<OperationStatus, EngineError> {
        let operation = self.get_operation(handle).await?;
        Ok(match operation.error {
            Some(err) => OperationStatus::failed(err.message),
            None => OperationStatus {
                done: operation.done,
                error: None,
            },
        })
    }

    async fn download(&self, handle: &OperationHandle) -> Result<Vec<u8>, EngineError> {
        let operation = self.get_operation(handle).await?;
        let uri = operation.video_uri().ok_or_else(|| {
            EngineError::VideoGenerationFailed(format!(
                "Operation {} finished without a generated video",
                handle.name
            ))
        })?;
        let response = self
            .client
            .get(uri)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(map_http_error)?;
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}
