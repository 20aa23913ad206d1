//! Checkpointed still-to-video pipeline.
//!
//! Steps, strictly sequential:
//!
//! 1. Reuse `<base>-raw.mp4` when it is above the cache threshold, otherwise
//!    submit the image to the video provider, poll until done, download.
//! 2. Read the raw clip duration.
//! 3. Still clip, re-encoded animation, crossfade with fade-out.
//! 4. Mix background music, or rename the silent composite to the output.
//!
//! Intermediates are removed whether the composite succeeds or not; the raw
//! clip stays as the cache key for re-runs.

use crate::cache::ArtifactCache;
use crate::clock::Sleeper;
use crate::compositor::{ClipInfo, CompositionCommand, MediaCompositor};
use crate::error::EngineError;
use crate::provider::{MediaPayload, OperationHandle, VideoProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-generate-preview";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub struct VideoAssemblyOptions {
    pub model: String,
    pub still_duration: f64,
    pub crossfade: f64,
    pub fade_out: f64,
    pub music_volume: f64,
    pub music_fade_in: f64,
    pub poll_interval: Duration,
}

impl Default for VideoAssemblyOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_VIDEO_MODEL.to_string(),
            still_duration: 2.0,
            crossfade: 1.0,
            fade_out: 1.5,
            music_volume: 0.3,
            music_fade_in: 2.0,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// On-disk artifacts of one assembly, keyed by the source image's base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAssemblyPaths {
    pub raw: PathBuf,
    pub still: PathBuf,
    pub anim: PathBuf,
    pub noaudio: PathBuf,
}

impl VideoAssemblyPaths {
    pub fn new(dir: &Path, image: &Path) -> Self {
        let base = image
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let at = |suffix: &str| dir.join(format!("{}-{}.mp4", base, suffix));
        Self {
            raw: at("raw"),
            still: at("still"),
            anim: at("anim"),
            noaudio: at("noaudio"),
        }
    }

    /// Everything except the raw clip
    pub fn intermediates(&self) -> [&Path; 3] {
        [&self.still, &self.anim, &self.noaudio]
    }
}

/// Long-running video operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Submitted(OperationHandle),
    Polling { handle: OperationHandle, polls: u32 },
    Done(OperationHandle),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedVideo {
    pub output: PathBuf,
    /// `still_duration + raw clip duration`
    pub duration: f64,
    pub raw_cached: bool,
}

pub struct VideoAssembler {
    provider: Arc<dyn VideoProvider>,
    compositor: Arc<dyn MediaCompositor>,
    sleeper: Arc<dyn Sleeper>,
    cache: ArtifactCache,
    options: VideoAssemblyOptions,
}

impl VideoAssembler {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        compositor: Arc<dyn MediaCompositor>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            provider,
            compositor,
            sleeper,
            cache: ArtifactCache::default(),
            options: VideoAssemblyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VideoAssemblyOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cache(mut self, cache: ArtifactCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &VideoAssemblyOptions {
        &self.options
    }

    /// Turn `image` into an animated clip at `output`
    pub async fn animate(
        &self,
        image: &Path,
        output: &Path,
        prompt: &str,
        music: Option<&Path>,
    ) -> Result<AnimatedVideo, EngineError> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;
        let paths = VideoAssemblyPaths::new(&dir, image);
        let label = paths
            .raw
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let raw_cached = self.cache.is_hit(&paths.raw);
        if raw_cached {
            info!(label = %label, "Using cached raw video");
        } else {
            info!(label = %label, model = %self.options.model, "Generating video");
            self.generate_raw(image, prompt, &paths.raw).await?;
        }

        let clip = self.compositor.clip_info(&paths.raw).await?;
        let result = self.composite(image, output, music, &paths, clip).await;
        remove_intermediates(&paths).await;
        let duration = result?;

        info!(label = %label, path = %output.display(), duration, "Video assembled");
        Ok(AnimatedVideo {
            output: output.to_path_buf(),
            duration,
            raw_cached,
        })
    }

    async fn generate_raw(&self, image: &Path, prompt: &str, raw: &Path) -> Result<(), EngineError> {
        let source = MediaPayload::load_image(image).await?;
        let handle = self
            .provider
            .submit(&source, prompt, &self.options.model)
            .await?;
        let handle = self.await_operation(handle).await?;

        let bytes = self.provider.download(&handle).await?;
        if bytes.is_empty() {
            return Err(EngineError::VideoGenerationFailed(format!(
                "Operation {} returned an empty clip",
                handle.name
            )));
        }
        tokio::fs::write(raw, &bytes).await?;
        info!(path = %raw.display(), size = bytes.len(), "Downloaded raw video");
        Ok(())
    }

    /// Drive the operation to completion. Polls until done, with no ceiling.
    async fn await_operation(&self, handle: OperationHandle) -> Result<OperationHandle, EngineError> {
        let mut state = OperationState::Submitted(handle);
        loop {
            state = match state {
                OperationState::Submitted(handle) => {
                    debug!(operation = %handle.name, "Video operation submitted");
                    OperationState::Polling { handle, polls: 0 }
                }
                OperationState::Polling { handle, polls } => {
                    self.sleeper.sleep(self.options.poll_interval).await;
                    let status = self.provider.poll(&handle).await?;
                    match status.error {
                        Some(message) => OperationState::Failed(message),
                        None if status.done => OperationState::Done(handle),
                        None => {
                            debug!(operation = %handle.name, polls = polls + 1, "Video still generating");
                            OperationState::Polling {
                                handle,
                                polls: polls + 1,
                            }
                        }
                    }
                }
                OperationState::Done(handle) => return Ok(handle),
                OperationState::Failed(message) => {
                    return Err(EngineError::VideoGenerationFailed(message))
                }
            };
        }
    }

    async fn composite(
        &self,
        image: &Path,
        output: &Path,
        music: Option<&Path>,
        paths: &VideoAssemblyPaths,
        clip: ClipInfo,
    ) -> Result<f64, EngineError> {
        let opts = &self.options;
        let total = opts.still_duration + clip.duration;
        let fade_out_start = total - opts.fade_out;
        info!(
            animation = clip.duration,
            still = opts.still_duration,
            width = clip.width,
            height = clip.height,
            "Compositing"
        );

        self.compositor
            .compose(&CompositionCommand::StillClip {
                image: image.to_path_buf(),
                duration: opts.still_duration,
                width: clip.width,
                height: clip.height,
                output: paths.still.clone(),
            })
            .await?;
        self.compositor
            .compose(&CompositionCommand::ReEncode {
                input: paths.raw.clone(),
                output: paths.anim.clone(),
            })
            .await?;
        self.compositor
            .compose(&CompositionCommand::Crossfade {
                first: paths.still.clone(),
                second: paths.anim.clone(),
                duration: opts.crossfade,
                offset: (opts.still_duration - opts.crossfade).max(0.0),
                fade_out_start,
                fade_out: opts.fade_out,
                output: paths.noaudio.clone(),
            })
            .await?;

        match music.filter(|m| m.is_file()) {
            Some(track) => {
                self.compositor
                    .compose(&CompositionCommand::AudioMix {
                        video: paths.noaudio.clone(),
                        audio: track.to_path_buf(),
                        fade_in: opts.music_fade_in,
                        fade_out_start,
                        fade_out: opts.fade_out,
                        volume: opts.music_volume,
                        output: output.to_path_buf(),
                    })
                    .await?;
            }
            None => {
                if let Some(track) = music {
                    warn!(path = %track.display(), "Background music not found, output is silent");
                }
                tokio::fs::rename(&paths.noaudio, output).await?;
            }
        }
        Ok(total)
    }
}

async fn remove_intermediates(paths: &VideoAssemblyPaths) {
    for path in paths.intermediates() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed intermediate"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove intermediate"),
        }
    }
}
