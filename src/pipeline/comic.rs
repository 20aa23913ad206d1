//! Comic strips: numbered panels, optional refinement, stitched strip or grid.

use super::{log_summary, numbered_prompt, prepare_output_dir};
use crate::assembler::{stitch_images, StitchLayout, StitchOutcome};
use crate::config::ComicDefaults;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::queue::run_batch;
use crate::style::StyleSheet;
use crate::types::{numbered_file_name, BatchSummary, ImageSize, Job, JobResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const PANEL_VARIANT: &str = "panel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicRequest {
    /// Working directory for panel images
    pub out_dir: PathBuf,
    /// Stitched output
    pub out_file: PathBuf,
    pub panels: Vec<PanelSpec>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub layout: Option<StitchLayout>,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub refine: Option<bool>,
    #[serde(default)]
    pub gutter: Option<u32>,
    #[serde(default)]
    pub gen_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSpec {
    pub prompt: String,
    #[serde(default)]
    pub refine_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComicOutcome {
    pub panels: Vec<JobResult>,
    pub summary: BatchSummary,
    pub stitched: StitchOutcome,
}

/// Panel aspect: wide panels stack vertically, square ones otherwise
pub fn panel_aspect_ratio(layout: StitchLayout) -> &'static str {
    match layout {
        StitchLayout::Vertical => "16:9",
        StitchLayout::Horizontal | StitchLayout::Grid => "1:1",
    }
}

pub fn comic_jobs(
    request: &ComicRequest,
    sheet: &StyleSheet,
    defaults: &ComicDefaults,
    out_dir: &Path,
) -> Vec<Job> {
    let layout = request.layout.unwrap_or(defaults.layout);
    let variant = if sheet.has_variant(PANEL_VARIANT) {
        PANEL_VARIANT
    } else {
        crate::style::DEFAULT_VARIANT
    };
    let prefix = sheet.prompt_for(variant);
    let total = request.panels.len();

    request
        .panels
        .iter()
        .enumerate()
        .map(|(index, panel)| {
            Job::new(
                index,
                numbered_prompt(prefix, "Panel", index, total, &panel.prompt),
                out_dir.join(numbered_file_name("panel", index, "png")),
            )
            .with_variant(variant)
            .with_image_size(Some(request.image_size.unwrap_or(defaults.image_size)))
            .with_aspect_ratio(Some(panel_aspect_ratio(layout).to_string()))
            .with_model(request.gen_model.clone())
            .with_label(format!("Panel {}", index + 1))
        })
        .collect()
}

pub async fn generate_comic(engine: &Engine, request: &ComicRequest) -> Result<ComicOutcome, EngineError> {
    let defaults = &engine.config().defaults.comic;
    let style = request.style.as_deref().unwrap_or(&defaults.style);
    let sheet = engine.load_style(style)?;
    let layout = request.layout.unwrap_or(defaults.layout);
    let out_dir = engine.resolve(&request.out_dir);
    prepare_output_dir(&out_dir).await?;

    let jobs = comic_jobs(request, &sheet, defaults, &out_dir);
    let concurrency = request.concurrency.unwrap_or(defaults.concurrency);
    info!(panels = jobs.len(), style, layout = %layout, "Generating comic");

    let synthesis = engine.synthesis();
    let mut panels = run_batch(&jobs, synthesis.as_ref(), concurrency).await?;
    let summary = log_summary("comic", &panels, &out_dir);

    if request.refine.unwrap_or(defaults.refine) {
        let instructions: Vec<Option<String>> =
            request.panels.iter().map(|p| p.refine_prompt.clone()).collect();
        engine.refine_results(&mut panels, &instructions).await;
    }

    let out_file = engine.resolve(&request.out_file);
    let stitched = stitch_images(
        engine.compositor(),
        &panels,
        layout,
        request.gutter.unwrap_or(defaults.gutter),
        &out_file,
    )
    .await?;

    Ok(ComicOutcome {
        panels,
        summary,
        stitched,
    })
}
