//! Retrying Synthesis Client
//!
//! Wraps one image-provider call per attempt with a bounded retry policy. The
//! artifact cache is consulted before the provider is ever reached, errors are
//! logged rather than propagated, and exhausting the attempt ceiling yields
//! `None` so the batch can carry on without this job.

use crate::cache::ArtifactCache;
use crate::clock::Sleeper;
use crate::error::EngineError;
use crate::provider::{ImageProvider, ImageRequest, MediaPayload};
use crate::queue::JobProcessor;
use crate::types::{ImageSize, Job, JobResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(15);

/// Attempt ceiling plus the delay inserted after an errored attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}

/// One image to produce at a fixed output path
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub prompt: String,
    pub output_path: PathBuf,
    pub image_size: Option<ImageSize>,
    pub aspect_ratio: Option<String>,
    pub reference_images: Vec<PathBuf>,
    pub model: Option<String>,
    pub label: String,
}

impl SynthesisRequest {
    pub fn from_job(job: &Job) -> Self {
        Self {
            prompt: job.prompt.clone(),
            output_path: job.output_path.clone(),
            image_size: job.image_size,
            aspect_ratio: job.aspect_ratio.clone(),
            reference_images: job.reference_images.clone(),
            model: job.model_override.clone(),
            label: job.label.clone(),
        }
    }
}

enum AttemptOutcome {
    Written(PathBuf),
    NoPayload,
}

pub struct SynthesisClient {
    provider: Arc<dyn ImageProvider>,
    cache: ArtifactCache,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    default_model: String,
}

impl SynthesisClient {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        sleeper: Arc<dyn Sleeper>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            cache: ArtifactCache::default(),
            retry: RetryPolicy::default(),
            sleeper,
            default_model: default_model.into(),
        }
    }

    pub fn with_cache(mut self, cache: ArtifactCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Produce the requested image, or `None` once every attempt is spent
    pub async fn synthesize(&self, request: &SynthesisRequest) -> JobResult {
        if self.cache.is_hit(&request.output_path) {
            info!(label = %request.label, path = %request.output_path.display(), "Cached");
            return Some(request.output_path.clone());
        }

        let references = match load_references(&request.reference_images).await {
            Ok(references) => references,
            Err(e) => {
                error!(label = %request.label, error = %e, "Unreadable reference image");
                return None;
            }
        };

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let provider_request = ImageRequest {
            prompt: request.prompt.clone(),
            image_size: request.image_size,
            aspect_ratio: request.aspect_ratio.clone(),
            reference_images: references,
            model: model.clone(),
        };

        let max_attempts = self.retry.max_attempts;
        for attempt in 1..=max_attempts {
            debug!(label = %request.label, attempt, max_attempts, model = %model, "Synthesis attempt");
            match self.attempt(&provider_request, &request.output_path).await {
                Ok(AttemptOutcome::Written(path)) => {
                    info!(
                        label = %request.label,
                        model = %model,
                        provider = self.provider.provider_name(),
                        attempt,
                        "Image generated"
                    );
                    return Some(path);
                }
                Ok(AttemptOutcome::NoPayload) => {
                    warn!(label = %request.label, attempt, max_attempts, "No image in response");
                }
                Err(e) => {
                    warn!(
                        label = %request.label,
                        attempt,
                        max_attempts,
                        error = %crate::provider::truncate(&e.to_string(), 200),
                        "Synthesis attempt failed"
                    );
                    if attempt < max_attempts {
                        self.sleeper.sleep(self.retry.backoff).await;
                    }
                }
            }
        }

        error!(label = %request.label, attempts = max_attempts, "Synthesis failed");
        None
    }

    async fn attempt(
        &self,
        request: &ImageRequest,
        output_path: &Path,
    ) -> Result<AttemptOutcome, EngineError> {
        let Some(payload) = self.provider.generate(request).await? else {
            return Ok(AttemptOutcome::NoPayload);
        };
        if payload.is_empty() {
            return Ok(AttemptOutcome::NoPayload);
        }
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(output_path, &payload.bytes).await?;
        debug!(path = %output_path.display(), size = payload.len(), "Wrote image");
        Ok(AttemptOutcome::Written(output_path.to_path_buf()))
    }
}

async fn load_references(paths: &[PathBuf]) -> Result<Vec<MediaPayload>, EngineError> {
    let mut references = Vec::with_capacity(paths.len());
    for path in paths {
        references.push(MediaPayload::load_image(path).await?);
    }
    Ok(references)
}

#[async_trait]
impl JobProcessor for SynthesisClient {
    type Output = JobResult;

    async fn process(&self, job: &Job) -> JobResult {
        self.synthesize(&SynthesisRequest::from_job(job)).await
    }

    fn succeeded(output: &JobResult) -> bool {
        output.is_some()
    }
}
