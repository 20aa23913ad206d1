//! Slide deck pipeline: PNG backgrounds plus a JSON overlay manifest.
//!
//! Slides flagged `autoLayout` go through the three-phase auto-layout
//! pipeline and carry the extracted text elements into the manifest. Slides
//! with manual `texts` are rendered without text and keep the caller's
//! overlays. Everything else is plain synthesis with text baked in.

use super::{log_summary, prepare_output_dir};
use crate::autolayout::{AutoLayoutSettings, ExtractionStatus, NO_TEXT_INSTRUCTION};
use crate::config::SlideDefaults;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::layout::Canvas;
use crate::overlay::{Table, TextOverlay};
use crate::queue::run_batch;
use crate::style::{styled_prompt, StyleSheet};
use crate::types::{numbered_file_name, BatchSummary, ImageSize, Job, JobResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_MANIFEST_NAME: &str = "slides.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDeckRequest {
    pub slide_dir: PathBuf,
    /// Style sheet name under the styles directory
    pub style: String,
    pub slides: Vec<SlideSpec>,
    /// Defaults to `<slide_dir>/slides.json`
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    #[serde(default)]
    pub ref_image_size: Option<ImageSize>,
    #[serde(default)]
    pub gen_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideSpec {
    pub prompt: String,
    /// Style variant tag
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub auto_layout: bool,
    #[serde(default)]
    pub texts: Option<Vec<TextOverlay>>,
    #[serde(default)]
    pub tables: Option<Vec<Table>>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub gen_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideEntry {
    pub index: usize,
    pub image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<TextOverlay>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,
    pub extraction: ExtractionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideManifest {
    pub generated_at: DateTime<Utc>,
    pub style: String,
    pub canvas: Canvas,
    pub summary: BatchSummary,
    pub slides: Vec<SlideEntry>,
}

#[derive(Debug, Clone)]
pub struct SlideDeckOutcome {
    pub manifest_path: PathBuf,
    pub manifest: SlideManifest,
    pub summary: BatchSummary,
}

/// One job per slide, in request order
pub fn slide_jobs(
    request: &SlideDeckRequest,
    sheet: &StyleSheet,
    defaults: &SlideDefaults,
    slide_dir: &Path,
    workspace: &Path,
) -> Vec<Job> {
    request
        .slides
        .iter()
        .enumerate()
        .map(|(index, slide)| {
            let variant = slide.style.clone().unwrap_or_else(|| defaults.variant.clone());
            let prefix = sheet.prompt_for(&variant);
            let mut prompt = styled_prompt(prefix, &slide.prompt);
            if !slide.auto_layout && slide.texts.is_some() {
                prompt.push_str(NO_TEXT_INSTRUCTION);
            }

            let mut job = Job::new(index, prompt, slide_dir.join(numbered_file_name("slide", index, "png")))
                .with_variant(variant)
                .with_image_size(request.image_size.or(defaults.image_size))
                .with_model(slide.gen_model.clone().or_else(|| request.gen_model.clone()))
                .with_reference_images(slide.images.iter().map(|p| workspace.join(p)).collect())
                .with_label(format!("Slide {}", index + 1))
                .with_auto_layout(slide.auto_layout);
            if slide.auto_layout {
                job = job.with_style_hint(prefix);
            }
            job
        })
        .collect()
}

pub async fn generate_slides(
    engine: &Engine,
    request: &SlideDeckRequest,
) -> Result<SlideDeckOutcome, EngineError> {
    let config = engine.config();
    let defaults = &config.defaults.slides;
    let sheet = engine.load_style(&request.style)?;
    let slide_dir = engine.resolve(&request.slide_dir);
    prepare_output_dir(&slide_dir).await?;

    let jobs = slide_jobs(request, &sheet, defaults, &slide_dir, engine.workspace());
    let concurrency = request.concurrency.unwrap_or(defaults.concurrency);
    info!(slides = jobs.len(), concurrency, style = %request.style, "Generating slides");

    let pipeline = engine.auto_layout(AutoLayoutSettings {
        ref_image_size: request.ref_image_size.or(defaults.ref_image_size),
        vision_model: Some(config.models.vision.clone()),
        canvas: config.canvas,
    });
    let outcomes = run_batch(&jobs, &pipeline, concurrency).await?;

    let results: Vec<JobResult> = outcomes.iter().map(|o| o.image.clone()).collect();
    let summary = log_summary("slides", &results, &slide_dir);

    let slides = outcomes
        .into_iter()
        .zip(&request.slides)
        .enumerate()
        .map(|(index, (outcome, slide))| SlideEntry {
            index,
            image: outcome.image,
            reference: outcome.reference,
            texts: outcome
                .texts
                .map(|texts| texts.into_iter().map(TextOverlay::from).collect())
                .or_else(|| slide.texts.clone()),
            tables: slide.tables.clone(),
            extraction: outcome.extraction,
        })
        .collect();

    let manifest = SlideManifest {
        generated_at: Utc::now(),
        style: request.style.clone(),
        canvas: config.canvas,
        summary,
        slides,
    };
    let manifest_path = match &request.manifest {
        Some(path) => engine.resolve(path),
        None => slide_dir.join(DEFAULT_MANIFEST_NAME),
    };
    if let Some(parent) = manifest_path.parent() {
        prepare_output_dir(parent).await?;
    }
    tokio::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).await?;
    info!(path = %manifest_path.display(), "Wrote slide manifest");

    Ok(SlideDeckOutcome {
        manifest_path,
        manifest,
        summary,
    })
}
