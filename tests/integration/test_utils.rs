//! Recording test doubles for every provider trait, the compositor and the
//! sleeper, plus engine wiring over them.

#![allow(dead_code)]

use async_trait::async_trait;
use mofa::clock::InstantSleeper;
use mofa::compositor::{ClipInfo, CompositionCommand, MediaCompositor};
use mofa::config::MofaConfig;
use mofa::engine::{Engine, EngineProviders};
use mofa::error::{CompositorError, EngineError};
use mofa::provider::{
    ImageProvider, ImageRequest, LayoutProvider, MediaPayload, OperationHandle, OperationStatus,
    RefineProvider, VideoProvider,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Comfortably above the default 10 000 byte cache floor
pub const ARTIFACT_BYTES: usize = 20_000;

pub fn png_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    bytes[..8].copy_from_slice(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    bytes
}

/// Write a file that the artifact cache accepts
pub fn write_artifact(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, png_bytes(ARTIFACT_BYTES)).unwrap();
}

#[derive(Debug, Clone)]
pub enum ImageReply {
    Image,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedImageCall {
    pub prompt: String,
    pub model: String,
    pub image_size: Option<mofa::types::ImageSize>,
    pub aspect_ratio: Option<String>,
    pub reference_count: usize,
}

/// Image provider that replays scripted replies, then falls back to a default
pub struct RecordingImageProvider {
    script: Mutex<VecDeque<ImageReply>>,
    default_reply: ImageReply,
    fail_marker: Option<String>,
    calls: Mutex<Vec<RecordedImageCall>>,
}

impl RecordingImageProvider {
    pub fn succeeding() -> Self {
        Self::with_default(ImageReply::Image)
    }

    pub fn failing() -> Self {
        Self::with_default(ImageReply::Error)
    }

    pub fn with_default(default_reply: ImageReply) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_reply,
            fail_marker: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(replies: Vec<ImageReply>) -> Self {
        let provider = Self::succeeding();
        *provider.script.lock() = replies.into();
        provider
    }

    /// Error on every prompt containing `marker`
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedImageCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ImageProvider for RecordingImageProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<Option<MediaPayload>, EngineError> {
        self.calls.lock().push(RecordedImageCall {
            prompt: request.prompt.clone(),
            model: request.model.clone(),
            image_size: request.image_size,
            aspect_ratio: request.aspect_ratio.clone(),
            reference_count: request.reference_images.len(),
        });
        // Let other workers interleave
        tokio::task::yield_now().await;

        if let Some(marker) = &self.fail_marker {
            if request.prompt.contains(marker.as_str()) {
                return Err(EngineError::ProviderRequestFailed("scripted failure".to_string()));
            }
        }
        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());
        match reply {
            ImageReply::Image => Ok(Some(MediaPayload::new(png_bytes(ARTIFACT_BYTES), "image/png"))),
            ImageReply::Empty => Ok(None),
            ImageReply::Error => Err(EngineError::ProviderRequestFailed("scripted error".to_string())),
        }
    }

    fn provider_name(&self) -> &str {
        "recording-image"
    }
}

/// Layout provider returning a fixed answer (or error) and recording instructions
pub struct RecordingLayoutProvider {
    answer: Result<String, String>,
    instructions: Mutex<Vec<String>>,
}

impl RecordingLayoutProvider {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err("vision unavailable".to_string()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.instructions.lock().len()
    }
}

#[async_trait]
impl LayoutProvider for RecordingLayoutProvider {
    async fn analyze(
        &self,
        _image: &MediaPayload,
        instruction: &str,
        _model: Option<&str>,
    ) -> Result<String, EngineError> {
        self.instructions.lock().push(instruction.to_string());
        self.answer
            .clone()
            .map_err(EngineError::ProviderRequestFailed)
    }

    fn provider_name(&self) -> &str {
        "recording-layout"
    }
}

/// Video provider that reports `pending_polls` not-done polls before finishing
pub struct RecordingVideoProvider {
    pending_polls: usize,
    failure: Option<String>,
    submits: Mutex<Vec<String>>,
    polls: Mutex<usize>,
    downloads: Mutex<usize>,
}

impl RecordingVideoProvider {
    pub fn finishing_after(pending_polls: usize) -> Self {
        Self {
            pending_polls,
            failure: None,
            submits: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
            downloads: Mutex::new(0),
        }
    }

    pub fn failing_with(message: &str) -> Self {
        let mut provider = Self::finishing_after(0);
        provider.failure = Some(message.to_string());
        provider
    }

    pub fn submitted_prompts(&self) -> Vec<String> {
        self.submits.lock().clone()
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock()
    }

    pub fn download_count(&self) -> usize {
        *self.downloads.lock()
    }
}

#[async_trait]
impl VideoProvider for RecordingVideoProvider {
    async fn submit(
        &self,
        _source_image: &MediaPayload,
        prompt: &str,
        _model: &str,
    ) -> Result<OperationHandle, EngineError> {
        let mut submits = self.submits.lock();
        submits.push(prompt.to_string());
        Ok(OperationHandle::new(format!("operations/{}", submits.len())))
    }

    async fn poll(&self, _handle: &OperationHandle) -> Result<OperationStatus, EngineError> {
        let mut polls = self.polls.lock();
        *polls += 1;
        if let Some(message) = &self.failure {
            return Ok(OperationStatus::failed(message.clone()));
        }
        if *polls > self.pending_polls {
            Ok(OperationStatus::done())
        } else {
            Ok(OperationStatus::pending())
        }
    }

    async fn download(&self, _handle: &OperationHandle) -> Result<Vec<u8>, EngineError> {
        *self.downloads.lock() += 1;
        Ok(vec![7u8; ARTIFACT_BYTES])
    }

    fn provider_name(&self) -> &str {
        "recording-video"
    }
}

/// Refinement provider that echoes a new image, or fails on a marker
pub struct RecordingRefineProvider {
    fail_marker: Option<String>,
    instructions: Mutex<Vec<String>>,
}

impl RecordingRefineProvider {
    pub fn succeeding() -> Self {
        Self {
            fail_marker: None,
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }
}

#[async_trait]
impl RefineProvider for RecordingRefineProvider {
    async fn edit(&self, _image: &MediaPayload, instruction: &str) -> Result<MediaPayload, EngineError> {
        self.instructions.lock().push(instruction.to_string());
        match &self.fail_marker {
            Some(marker) if instruction.contains(marker.as_str()) => {
                Err(EngineError::RefinementTimeout("task still running".to_string()))
            }
            _ => Ok(MediaPayload::new(png_bytes(ARTIFACT_BYTES), "image/png")),
        }
    }

    fn provider_name(&self) -> &str {
        "recording-refine"
    }
}

/// Compositor that records commands and writes a placeholder at each output
pub struct RecordingCompositor {
    clip: ClipInfo,
    fail_mode: Option<&'static str>,
    commands: Mutex<Vec<CompositionCommand>>,
    clip_info_calls: Mutex<Vec<PathBuf>>,
}

impl RecordingCompositor {
    pub fn new() -> Self {
        Self::with_clip(ClipInfo {
            duration: 8.0,
            width: 720,
            height: 1280,
        })
    }

    pub fn with_clip(clip: ClipInfo) -> Self {
        Self {
            clip,
            fail_mode: None,
            commands: Mutex::new(Vec::new()),
            clip_info_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, mode: &'static str) -> Self {
        self.fail_mode = Some(mode);
        self
    }

    pub fn commands(&self) -> Vec<CompositionCommand> {
        self.commands.lock().clone()
    }

    pub fn modes(&self) -> Vec<&'static str> {
        self.commands.lock().iter().map(|c| c.mode()).collect()
    }

    pub fn clip_info_count(&self) -> usize {
        self.clip_info_calls.lock().len()
    }
}

#[async_trait]
impl MediaCompositor for RecordingCompositor {
    async fn compose(&self, command: &CompositionCommand) -> Result<(), CompositorError> {
        self.commands.lock().push(command.clone());
        if self.fail_mode == Some(command.mode()) {
            return Err(CompositorError::CommandFailed {
                tool: "recording".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("{} refused", command.mode()),
            });
        }
        if let Some(parent) = command.output().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(command.output(), vec![1u8; ARTIFACT_BYTES])?;
        Ok(())
    }

    async fn clip_info(&self, clip: &Path) -> Result<ClipInfo, CompositorError> {
        self.clip_info_calls.lock().push(clip.to_path_buf());
        Ok(self.clip)
    }
}

/// Every double the engine can be wired with
pub struct Doubles {
    pub image: Arc<RecordingImageProvider>,
    pub layout: Arc<RecordingLayoutProvider>,
    pub video: Arc<RecordingVideoProvider>,
    pub refiner: Arc<RecordingRefineProvider>,
    pub compositor: Arc<RecordingCompositor>,
    pub sleeper: Arc<InstantSleeper>,
}

impl Doubles {
    pub fn new() -> Self {
        Self {
            image: Arc::new(RecordingImageProvider::succeeding()),
            layout: Arc::new(RecordingLayoutProvider::answering("[]")),
            video: Arc::new(RecordingVideoProvider::finishing_after(2)),
            refiner: Arc::new(RecordingRefineProvider::succeeding()),
            compositor: Arc::new(RecordingCompositor::new()),
            sleeper: Arc::new(InstantSleeper::new()),
        }
    }

    pub fn engine(&self, config: MofaConfig, workspace: &Path) -> Engine {
        self.engine_with_refiner(config, workspace, true)
    }

    pub fn engine_with_refiner(&self, config: MofaConfig, workspace: &Path, refiner: bool) -> Engine {
        let refiner: Option<Arc<dyn RefineProvider>> = if refiner {
            Some(self.refiner.clone())
        } else {
            None
        };
        Engine::new(
            config,
            workspace,
            EngineProviders {
                image: self.image.clone(),
                layout: self.layout.clone(),
                video: self.video.clone(),
                refiner,
                compositor: self.compositor.clone(),
                sleeper: self.sleeper.clone(),
            },
        )
    }
}

/// Write `<workspace>/styles/<name>.toml`
pub fn write_style(workspace: &Path, name: &str, content: &str) {
    let dir = workspace.join("styles");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(format!("{}.toml", name)), content).unwrap();
}
