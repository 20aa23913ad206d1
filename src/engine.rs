//! Engine: wires configuration, providers and the compositor into the
//! components each pipeline runs on.

use crate::assembler::{VideoAssembler, VideoAssemblyOptions};
use crate::autolayout::{AutoLayoutPipeline, AutoLayoutSettings};
use crate::cache::ArtifactCache;
use crate::clock::{Sleeper, TokioSleeper};
use crate::compositor::process::ProcessCompositor;
use crate::compositor::MediaCompositor;
use crate::config::MofaConfig;
use crate::error::EngineError;
use crate::provider::{
    DashscopeClient, GeminiClient, ImageProvider, LayoutProvider, MediaPayload, RefineProvider,
    VideoProvider,
};
use crate::style::{style_path, StyleSheet};
use crate::synthesis::{RetryPolicy, SynthesisClient};
use crate::types::{sibling_with_suffix, JobResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Provider and tool implementations an [`Engine`] runs against
#[derive(Clone)]
pub struct EngineProviders {
    pub image: Arc<dyn ImageProvider>,
    pub layout: Arc<dyn LayoutProvider>,
    pub video: Arc<dyn VideoProvider>,
    /// Absent when no refinement credential is configured
    pub refiner: Option<Arc<dyn RefineProvider>>,
    pub compositor: Arc<dyn MediaCompositor>,
    pub sleeper: Arc<dyn Sleeper>,
}

pub struct Engine {
    config: MofaConfig,
    workspace: PathBuf,
    providers: EngineProviders,
    synthesis: Arc<SynthesisClient>,
}

impl Engine {
    pub fn new(config: MofaConfig, workspace: impl Into<PathBuf>, providers: EngineProviders) -> Self {
        let synthesis = Arc::new(
            SynthesisClient::new(
                providers.image.clone(),
                providers.sleeper.clone(),
                config.models.image.clone(),
            )
            .with_cache(ArtifactCache::new(config.cache.min_bytes))
            .with_retry(RetryPolicy::new(
                config.retry.max_attempts,
                Duration::from_secs(config.retry.backoff_secs),
            )),
        );
        Self {
            config,
            workspace: workspace.into(),
            providers,
            synthesis,
        }
    }

    /// Build the HTTP providers and process compositor from `config`.
    ///
    /// The Gemini credential is required. The Dashscope one is optional and
    /// only gates refinement.
    pub fn from_config(config: MofaConfig, workspace: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let gemini_key = config.gemini_api_key().ok_or_else(|| {
            EngineError::ProviderNotConfigured(
                "Gemini API key required. Set GEMINI_API_KEY or api_keys.gemini".to_string(),
            )
        })?;
        let gemini = Arc::new(GeminiClient::new(gemini_key, None)?);
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);

        let refiner: Option<Arc<dyn RefineProvider>> = match config.dashscope_api_key() {
            Some(key) => Some(Arc::new(
                DashscopeClient::new(key, Some(config.models.refine.clone()))?
                    .with_polling(
                        Duration::from_secs(config.refinement.poll_interval_secs),
                        config.refinement.max_polls,
                    )
                    .with_sleeper(sleeper.clone()),
            )),
            None => None,
        };

        let providers = EngineProviders {
            image: gemini.clone(),
            layout: gemini.clone(),
            video: gemini,
            refiner,
            compositor: Arc::new(ProcessCompositor::new()),
            sleeper,
        };
        Ok(Self::new(config, workspace, providers))
    }

    pub fn config(&self) -> &MofaConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Relative paths resolve against the workspace
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.resolve(&self.config.styles_dir)
    }

    /// Load `<styles_dir>/<name>.toml`
    pub fn load_style(&self, name: &str) -> Result<StyleSheet, EngineError> {
        StyleSheet::load(&style_path(&self.styles_dir(), name)?)
    }

    pub fn synthesis(&self) -> Arc<SynthesisClient> {
        self.synthesis.clone()
    }

    pub fn auto_layout(&self, settings: AutoLayoutSettings) -> AutoLayoutPipeline {
        AutoLayoutPipeline::new(self.synthesis.clone(), self.providers.layout.clone(), settings)
    }

    pub fn video_assembler(&self) -> VideoAssembler {
        let video = &self.config.video;
        VideoAssembler::new(
            self.providers.video.clone(),
            self.providers.compositor.clone(),
            self.providers.sleeper.clone(),
        )
        .with_cache(ArtifactCache::new(self.config.cache.min_bytes))
        .with_options(VideoAssemblyOptions {
            model: self.config.models.video.clone(),
            still_duration: video.still_duration,
            crossfade: video.crossfade,
            fade_out: video.fade_out,
            music_volume: video.music_volume,
            music_fade_in: video.music_fade_in,
            poll_interval: Duration::from_secs(video.poll_interval_secs),
        })
    }

    pub fn compositor(&self) -> &dyn MediaCompositor {
        self.providers.compositor.as_ref()
    }

    pub fn has_refiner(&self) -> bool {
        self.providers.refiner.is_some()
    }

    /// Pass successful results through the refinement provider, one at a
    /// time in index order.
    ///
    /// `instructions[i]` belongs to `results[i]`; results without an
    /// instruction are left alone. A refined image is written next to the
    /// original as `<stem>-refined.png` and replaces it in `results`. Any
    /// failure keeps the unrefined image.
    pub async fn refine_results(&self, results: &mut [JobResult], instructions: &[Option<String>]) {
        let Some(refiner) = &self.providers.refiner else {
            warn!("Refinement requested but no Dashscope credential is configured, skipping");
            return;
        };
        let cache = ArtifactCache::new(self.config.cache.min_bytes);

        info!(provider = refiner.provider_name(), "Refining results");
        for (index, (slot, instruction)) in results.iter_mut().zip(instructions).enumerate() {
            let (Some(source), Some(instruction)) = (slot.as_ref(), instruction.as_deref()) else {
                continue;
            };
            if instruction.trim().is_empty() {
                continue;
            }

            let refined = sibling_with_suffix(source, "refined");
            if cache.is_hit(&refined) {
                info!(index, path = %refined.display(), "Cached refinement");
                *slot = Some(refined);
                continue;
            }

            match refine_one(refiner.as_ref(), source, instruction, &refined).await {
                Ok(()) => {
                    info!(index, path = %refined.display(), "Refined");
                    *slot = Some(refined);
                }
                Err(e) => warn!(index, error = %e, "Refinement failed, keeping original"),
            }
        }
    }
}

async fn refine_one(
    refiner: &dyn RefineProvider,
    source: &Path,
    instruction: &str,
    output: &Path,
) -> Result<(), EngineError> {
    let image = MediaPayload::load_image(source).await?;
    let edited = refiner.edit(&image, instruction).await?;
    if edited.is_empty() {
        return Err(EngineError::RefinementFailed(
            "Provider returned an empty image".to_string(),
        ));
    }
    tokio::fs::write(output, &edited.bytes).await?;
    Ok(())
}
