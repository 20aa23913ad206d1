//! Infographics: header/body/footer sections stacked vertically.

use super::{log_summary, numbered_prompt, prepare_output_dir};
use crate::assembler::{stitch_images, StitchLayout, StitchOutcome};
use crate::config::InfographicDefaults;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::queue::run_batch;
use crate::style::{StyleSheet, DEFAULT_VARIANT};
use crate::types::{numbered_file_name, BatchSummary, ImageSize, Job, JobResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfographicRequest {
    pub out_dir: PathBuf,
    pub out_file: PathBuf,
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
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
pub struct SectionSpec {
    pub prompt: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub refine_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfographicOutcome {
    pub sections: Vec<JobResult>,
    pub summary: BatchSummary,
    pub stitched: StitchOutcome,
}

/// Explicit variant, else `header` first, `footer` last, `normal` between
pub fn section_variant(section: &SectionSpec, index: usize, total: usize) -> String {
    if let Some(variant) = section.variant.as_deref().filter(|v| !v.trim().is_empty()) {
        return variant.to_string();
    }
    if index == 0 {
        "header".to_string()
    } else if index + 1 == total {
        "footer".to_string()
    } else {
        DEFAULT_VARIANT.to_string()
    }
}

pub fn infographic_jobs(
    request: &InfographicRequest,
    sheet: &StyleSheet,
    defaults: &InfographicDefaults,
    out_dir: &Path,
) -> Vec<Job> {
    let total = request.sections.len();
    let aspect_ratio = request
        .aspect_ratio
        .clone()
        .unwrap_or_else(|| defaults.aspect_ratio.clone());

    request
        .sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let variant = section_variant(section, index, total);
            let prefix = sheet.prompt_for(&variant);
            Job::new(
                index,
                numbered_prompt(prefix, "Section", index, total, &section.prompt),
                out_dir.join(numbered_file_name("section", index, "png")),
            )
            .with_variant(variant)
            .with_image_size(Some(request.image_size.unwrap_or(defaults.image_size)))
            .with_aspect_ratio(Some(aspect_ratio.clone()))
            .with_model(request.gen_model.clone())
            .with_label(format!("Section {}", index + 1))
        })
        .collect()
}

pub async fn generate_infographic(
    engine: &Engine,
    request: &InfographicRequest,
) -> Result<InfographicOutcome, EngineError> {
    let defaults = &engine.config().defaults.infographic;
    let style = request.style.as_deref().unwrap_or(&defaults.style);
    let sheet = engine.load_style(style)?;
    let out_dir = engine.resolve(&request.out_dir);
    prepare_output_dir(&out_dir).await?;

    let jobs = infographic_jobs(request, &sheet, defaults, &out_dir);
    let concurrency = request.concurrency.unwrap_or(defaults.concurrency);
    info!(sections = jobs.len(), style, "Generating infographic");

    let synthesis = engine.synthesis();
    let mut sections = run_batch(&jobs, synthesis.as_ref(), concurrency).await?;
    let summary = log_summary("infographic", &sections, &out_dir);

    if request.refine.unwrap_or(defaults.refine) {
        let instructions: Vec<Option<String>> = request
            .sections
            .iter()
            .map(|s| s.refine_prompt.clone())
            .collect();
        engine.refine_results(&mut sections, &instructions).await;
    }

    let out_file = engine.resolve(&request.out_file);
    let stitched = stitch_images(
        engine.compositor(),
        &sections,
        StitchLayout::Vertical,
        request.gutter.unwrap_or(defaults.gutter),
        &out_file,
    )
    .await?;

    Ok(InfographicOutcome {
        sections,
        summary,
        stitched,
    })
}
