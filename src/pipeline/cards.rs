//! Greeting cards and animated video cards.

use super::{log_summary, prepare_output_dir};
use crate::config::CardDefaults;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::queue::run_batch;
use crate::style::{styled_prompt, StyleSheet};
use crate::types::{BatchSummary, ImageSize, Job, JobResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardBatchRequest {
    pub card_dir: PathBuf,
    /// Style sheet name under the styles directory
    pub style: String,
    pub cards: Vec<CardSpec>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub gen_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSpec {
    pub name: String,
    pub prompt: String,
    /// Style variant tag
    #[serde(default)]
    pub style: Option<String>,
    /// Animation style variant, video cards only
    #[serde(default)]
    pub anim_style: Option<String>,
    /// Scene description appended to the animation prompt
    #[serde(default)]
    pub anim_desc: Option<String>,
}

impl CardSpec {
    pub fn image_file_name(&self) -> String {
        format!("card-{}.png", self.name)
    }

    pub fn video_file_name(&self) -> String {
        format!("card-{}-animated.mp4", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCardRequest {
    #[serde(flatten)]
    pub cards: CardBatchRequest,
    /// Animation style sheet; defaults to the configured one
    #[serde(default)]
    pub anim_sheet: Option<String>,
    /// Background music track
    #[serde(default)]
    pub music: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoCardOutcome {
    pub images: Vec<JobResult>,
    pub videos: Vec<JobResult>,
}

impl VideoCardOutcome {
    pub fn image_summary(&self) -> BatchSummary {
        BatchSummary::from_results(&self.images)
    }

    pub fn video_summary(&self) -> BatchSummary {
        BatchSummary::from_results(&self.videos)
    }
}

/// One job per card, in request order
pub fn card_jobs(
    request: &CardBatchRequest,
    sheet: &StyleSheet,
    defaults: &CardDefaults,
    card_dir: &Path,
) -> Vec<Job> {
    let aspect_ratio = request
        .aspect_ratio
        .clone()
        .unwrap_or_else(|| defaults.aspect_ratio.clone());
    request
        .cards
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let variant = card.style.clone().unwrap_or_else(|| defaults.variant.clone());
            let prompt = styled_prompt(sheet.prompt_for(&variant), &card.prompt);
            Job::new(index, prompt, card_dir.join(card.image_file_name()))
                .with_variant(variant)
                .with_image_size(request.image_size.or(defaults.image_size))
                .with_aspect_ratio(Some(aspect_ratio.clone()))
                .with_model(request.gen_model.clone())
                .with_label(card.name.clone())
        })
        .collect()
}

/// Animation prompt: the variant's prompt, plus the scene description when given
pub fn animation_prompt(sheet: &StyleSheet, variant: &str, description: Option<&str>) -> String {
    let base = sheet.prompt_for(variant);
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => styled_prompt(base, description),
        None => base.to_string(),
    }
}

async fn run_card_batch(
    engine: &Engine,
    request: &CardBatchRequest,
    concurrency: usize,
) -> Result<(PathBuf, Vec<JobResult>), EngineError> {
    let defaults = &engine.config().defaults.cards;
    let sheet = engine.load_style(&request.style)?;
    let card_dir = engine.resolve(&request.card_dir);
    prepare_output_dir(&card_dir).await?;

    let jobs = card_jobs(request, &sheet, defaults, &card_dir);
    info!(cards = jobs.len(), concurrency, style = %request.style, "Generating cards");
    let synthesis = engine.synthesis();
    let results = run_batch(&jobs, synthesis.as_ref(), concurrency).await?;
    log_summary("cards", &results, &card_dir);
    Ok((card_dir, results))
}

pub async fn generate_cards(
    engine: &Engine,
    request: &CardBatchRequest,
) -> Result<Vec<JobResult>, EngineError> {
    let concurrency = request
        .concurrency
        .unwrap_or(engine.config().defaults.cards.concurrency);
    let (_, results) = run_card_batch(engine, request, concurrency).await?;
    Ok(results)
}

/// Generate every card image, then animate the successful ones one at a time.
///
/// A failed animation is recorded as `None` and the remaining cards still run.
pub async fn generate_video_cards(
    engine: &Engine,
    request: &VideoCardRequest,
) -> Result<VideoCardOutcome, EngineError> {
    let defaults = &engine.config().defaults.video_cards;
    let anim_sheet = engine.load_style(request.anim_sheet.as_deref().unwrap_or(&defaults.anim_style))?;
    let music = request
        .music
        .as_ref()
        .or(defaults.music.as_ref())
        .map(|path| engine.resolve(path));

    let concurrency = request.cards.concurrency.unwrap_or(defaults.concurrency);
    let (card_dir, images) = run_card_batch(engine, &request.cards, concurrency).await?;

    let assembler = engine.video_assembler();
    let mut videos = Vec::with_capacity(images.len());
    for (card, image) in request.cards.cards.iter().zip(&images) {
        let Some(image) = image else {
            info!(card = %card.name, "Skipped animation (no image)");
            videos.push(None);
            continue;
        };

        let variant = card.anim_style.as_deref().unwrap_or(&defaults.anim_variant);
        let prompt = animation_prompt(&anim_sheet, variant, card.anim_desc.as_deref());
        let output = card_dir.join(card.video_file_name());
        match assembler.animate(image, &output, &prompt, music.as_deref()).await {
            Ok(video) => videos.push(Some(video.output)),
            Err(e) => {
                error!(card = %card.name, error = %e, "Animation failed");
                videos.push(None);
            }
        }
    }

    let outcome = VideoCardOutcome { images, videos };
    let videos_summary = outcome.video_summary();
    if videos_summary.all_succeeded() {
        info!(images = %outcome.image_summary(), videos = %videos_summary, "Video cards done");
    } else {
        warn!(images = %outcome.image_summary(), videos = %videos_summary, "Video cards done");
    }
    Ok(outcome)
}
