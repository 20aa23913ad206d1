//! Auto-Layout Pipeline
//!
//! Three phases per job:
//!
//! 1. **Reference**: synthesize the image with text baked in, at the reference
//!    resolution, to `<stem>-ref.png`.
//! 2. **Extraction**: one vision call reads text placement out of the
//!    reference image. Any failure is logged and leaves the job without text
//!    elements.
//! 3. **Regeneration**: synthesize the final image from the same prompt, with
//!    the reference image as the first anchor and an instruction to drop all
//!    text.
//!
//! The reference image is left on disk. Extracted elements are saved to
//! `<stem>-layout.json`; a re-run whose final image is cached reuses that file
//! and makes no provider calls.

use crate::layout::{extract_text_layout, Canvas, TextLayoutElement};
use crate::provider::LayoutProvider;
use crate::queue::JobProcessor;
use crate::synthesis::{SynthesisClient, SynthesisRequest};
use crate::types::{sibling_with_suffix, ImageSize, Job};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Appended to prompts whose text is supplied as overlays by the caller
pub const NO_TEXT_INSTRUCTION: &str = "\n\nCRITICAL: DO NOT render any text, words, labels, numbers, \
or letters anywhere on the image. The image must be purely visual with no readable \
content whatsoever. Leave clean space where text would normally appear.";

/// Appended to the regeneration prompt
pub const CLEAN_REGENERATION_INSTRUCTION: &str = "\n\nCRITICAL: DO NOT render any text, words, labels, numbers, \
or letters anywhere on the image. The image must be purely visual with no readable \
content whatsoever. Recreate the exact same layout, colors, and visual elements as the \
reference image, but remove ALL text.";

#[derive(Debug, Clone, Default)]
pub struct AutoLayoutSettings {
    /// Resolution for the reference phase; falls back to the job's size
    pub ref_image_size: Option<ImageSize>,
    pub vision_model: Option<String>,
    pub canvas: Canvas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Job was not auto-laid-out, or extraction never ran
    #[default]
    Skipped,
    Extracted,
    Failed,
}

/// Per-job output of the slide processor
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AutoLayoutOutcome {
    pub image: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub texts: Option<Vec<TextLayoutElement>>,
    pub extraction: ExtractionStatus,
}

/// `<dir>/<stem>-layout.json` next to the job's output image
pub fn layout_cache_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output_path.with_file_name(format!("{}-layout.json", stem))
}

async fn load_saved_layout(path: &Path) -> Option<Vec<TextLayoutElement>> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    match serde_json::from_str(&content) {
        Ok(texts) => Some(texts),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable saved layout");
            None
        }
    }
}

async fn save_layout(path: &Path, texts: &[TextLayoutElement]) {
    let written = match serde_json::to_string_pretty(texts) {
        Ok(json) => tokio::fs::write(path, json).await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = written {
        warn!(path = %path.display(), error = %e, "Failed to save extracted layout");
    }
}

async fn discard_saved_layout(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed stale saved layout"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove stale saved layout"),
    }
}

enum Phase {
    Reference,
    Extraction { reference: PathBuf },
    Regeneration { reference: Option<PathBuf> },
}

pub struct AutoLayoutPipeline {
    synthesis: Arc<SynthesisClient>,
    layout: Arc<dyn LayoutProvider>,
    settings: AutoLayoutSettings,
}

impl AutoLayoutPipeline {
    pub fn new(
        synthesis: Arc<SynthesisClient>,
        layout: Arc<dyn LayoutProvider>,
        settings: AutoLayoutSettings,
    ) -> Self {
        Self {
            synthesis,
            layout,
            settings,
        }
    }

    pub fn settings(&self) -> &AutoLayoutSettings {
        &self.settings
    }

    pub async fn run(&self, job: &Job) -> AutoLayoutOutcome {
        let layout_path = layout_cache_path(&job.output_path);
        if let Some(outcome) = self.reuse_finished(job, &layout_path).await {
            return outcome;
        }

        let mut outcome = AutoLayoutOutcome::default();
        let mut phase = Phase::Reference;

        loop {
            phase = match phase {
                Phase::Reference => {
                    let reference_path = sibling_with_suffix(&job.output_path, "ref");
                    let mut request = SynthesisRequest::from_job(job);
                    request.output_path = reference_path;
                    request.image_size = self.settings.ref_image_size.or(job.image_size);
                    request.label = format!("{} (ref)", job.label);

                    match self.synthesis.synthesize(&request).await {
                        Some(reference) => {
                            outcome.reference = Some(reference.clone());
                            Phase::Extraction { reference }
                        }
                        None => {
                            warn!(label = %job.label, "Reference image failed, skipping layout extraction");
                            Phase::Regeneration { reference: None }
                        }
                    }
                }
                Phase::Extraction { reference } => {
                    match extract_text_layout(
                        self.layout.as_ref(),
                        &reference,
                        &self.settings.canvas,
                        job.style_hint.as_deref(),
                        self.settings.vision_model.as_deref(),
                    )
                    .await
                    {
                        Ok(texts) => {
                            info!(label = %job.label, elements = texts.len(), "Extracted text layout");
                            save_layout(&layout_path, &texts).await;
                            outcome.texts = Some(texts);
                            outcome.extraction = ExtractionStatus::Extracted;
                        }
                        Err(e) => {
                            warn!(label = %job.label, error = %e, "Layout extraction failed");
                            discard_saved_layout(&layout_path).await;
                            outcome.extraction = ExtractionStatus::Failed;
                        }
                    }
                    Phase::Regeneration {
                        reference: Some(reference),
                    }
                }
                Phase::Regeneration { reference } => {
                    let mut request = SynthesisRequest::from_job(job);
                    request.prompt = format!("{}{}", job.prompt, CLEAN_REGENERATION_INSTRUCTION);
                    request.reference_images = reference
                        .into_iter()
                        .chain(job.reference_images.iter().cloned())
                        .collect();
                    outcome.image = self.synthesis.synthesize(&request).await;
                    return outcome;
                }
            };
        }
    }
}

impl AutoLayoutPipeline {
    /// Final image cached and its layout saved: nothing to call
    async fn reuse_finished(&self, job: &Job, layout_path: &Path) -> Option<AutoLayoutOutcome> {
        let cache = self.synthesis.cache();
        if !cache.is_hit(&job.output_path) {
            return None;
        }
        let texts = load_saved_layout(layout_path).await?;
        info!(label = %job.label, elements = texts.len(), "Cached auto-layout");

        let reference = sibling_with_suffix(&job.output_path, "ref");
        Some(AutoLayoutOutcome {
            image: Some(job.output_path.clone()),
            reference: cache.is_hit(&reference).then_some(reference),
            texts: Some(texts),
            extraction: ExtractionStatus::Extracted,
        })
    }
}

/// Slide processor: flagged jobs go through the three phases, the rest are
/// plain synthesis.
#[async_trait]
impl JobProcessor for AutoLayoutPipeline {
    type Output = AutoLayoutOutcome;

    async fn process(&self, job: &Job) -> AutoLayoutOutcome {
        if job.auto_layout {
            self.run(job).await
        } else {
            AutoLayoutOutcome {
                image: self.synthesis.synthesize(&SynthesisRequest::from_job(job)).await,
                ..AutoLayoutOutcome::default()
            }
        }
    }

    fn succeeded(output: &AutoLayoutOutcome) -> bool {
        output.image.is_some()
    }
}
