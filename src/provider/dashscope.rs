//! Dashscope image-edit client (async task submit, bounded polling, result fetch).

use super::{
    build_provider_http_client, ensure_success, map_http_error, MediaPayload, RefineProvider,
};
use crate::clock::{Sleeper, TokioSleeper};
use crate::error::EngineError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_EDIT_MODEL: &str = "qwen-image-edit-max-2026-01-16";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLLS: u32 = 60;

pub struct DashscopeClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    poll_interval: Duration,
    max_polls: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl DashscopeClient {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, EngineError> {
        if api_key.trim().is_empty() {
            return Err(EngineError::ProviderNotConfigured(
                "Dashscope API key is empty".to_string(),
            ));
        }
        Ok(Self {
            client: build_provider_http_client()?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_EDIT_MODEL.to_string()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls.max(1);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

/// The three task endpoints the edit loop drives
#[async_trait]
trait TaskApi: Send + Sync {
    async fn submit(&self, image: &MediaPayload, instruction: &str) -> Result<String, EngineError>;

    async fn status(&self, task_id: &str) -> Result<TaskState, EngineError>;

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, EngineError>;
}

#[async_trait]
impl TaskApi for DashscopeClient {
    async fn submit(&self, image: &MediaPayload, instruction: &str) -> Result<String, EngineError> {
        let url = format!(
            "{}/services/aigc/image2image/image-synthesis",
            self.base_url
        );
        let body = json!({
            "model": self.model,
            "input": {
                "prompt": instruction,
                "base_image_url": format!(
                    "data:{};base64,{}",
                    image.mime_type,
                    STANDARD.encode(&image.bytes)
                ),
            },
        });
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let task: TaskEnvelope = response.json().await.map_err(|e| {
            EngineError::RefinementFailed(format!("Failed to parse submit response: {}", e))
        })?;
        task.output
            .and_then(|o| o.task_id)
            .ok_or_else(|| EngineError::RefinementFailed("Submit returned no task id".to_string()))
    }

    async fn status(&self, task_id: &str) -> Result<TaskState, EngineError> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let task: TaskEnvelope = response.json().await.map_err(|e| {
            EngineError::RefinementFailed(format!("Failed to parse task status: {}", e))
        })?;
        task.output
            .ok_or_else(|| EngineError::RefinementFailed(format!("Task {} has no output", task_id)))?
            .state()
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, EngineError> {
        let response = self.client.get(url).send().await.map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await.map_err(map_http_error)?.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    output: Option<TaskOutput>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_id: Option<String>,
    task_status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    results: Vec<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TaskState {
    Running,
    Succeeded(String),
    Failed(String),
}

impl TaskOutput {
    fn state(&self) -> Result<TaskState, EngineError> {
        match self.task_status.as_deref() {
            Some("SUCCEEDED") => self
                .results
                .first()
                .and_then(|r| r.url.clone())
                .map(TaskState::Succeeded)
                .ok_or_else(|| EngineError::RefinementFailed("No result URL".to_string())),
            Some("FAILED") | Some("CANCELED") | Some("UNKNOWN") => Ok(TaskState::Failed(
                self.message.clone().unwrap_or_else(|| "task failed".to_string()),
            )),
            _ => Ok(TaskState::Running),
        }
    }
}

/// Submit, then poll every `interval` up to `max_polls` times before giving up
async fn run_edit_task(
    api: &dyn TaskApi,
    sleeper: &dyn Sleeper,
    interval: Duration,
    max_polls: u32,
    image: &MediaPayload,
    instruction: &str,
) -> Result<MediaPayload, EngineError> {
    let task_id = api.submit(image, instruction).await?;
    debug!(task_id = %task_id, "Submitted refinement task");

    for poll in 1..=max_polls {
        sleeper.sleep(interval).await;
        match api.status(&task_id).await? {
            TaskState::Running => {
                debug!(task_id = %task_id, poll, "Refinement still running");
            }
            TaskState::Succeeded(url) => {
                let bytes = api.fetch(&url).await?;
                info!(task_id = %task_id, size = bytes.len(), poll, "Refinement finished");
                return Ok(MediaPayload::new(bytes, "image/png"));
            }
            TaskState::Failed(message) => {
                return Err(EngineError::RefinementFailed(message));
            }
        }
    }

    Err(EngineError::RefinementTimeout(format!(
        "task {} not finished after {} polls",
        task_id, max_polls
    )))
}

#[async_trait]
impl RefineProvider for DashscopeClient {
    async fn edit(&self, image: &MediaPayload, instruction: &str) -> Result<MediaPayload, EngineError> {
        debug!(model = %self.model, "Refining with Dashscope");
        run_edit_task(
            self,
            self.sleeper.as_ref(),
            self.poll_interval,
            self.max_polls,
            image,
            instruction,
        )
        .await
    }

    fn provider_name(&self) -> &str {
        "dashscope"
    }
}
