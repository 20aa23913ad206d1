//! End-to-end batch pipelines.
//!
//! Each pipeline creates its output directory, builds one job per request
//! item, drains the batch through the scheduler and logs an `N/total`
//! summary. Requests are plain serde structs so the CLI can read them from
//! JSON files.

pub mod cards;
pub mod comic;
pub mod infographic;
pub mod slides;

pub use cards::{
    animation_prompt, card_jobs, generate_cards, generate_video_cards, CardBatchRequest, CardSpec,
    VideoCardOutcome, VideoCardRequest,
};
pub use comic::{comic_jobs, generate_comic, ComicOutcome, ComicRequest, PanelSpec};
pub use infographic::{
    generate_infographic, infographic_jobs, section_variant, InfographicOutcome,
    InfographicRequest, SectionSpec,
};
pub use slides::{
    generate_slides, slide_jobs, SlideDeckOutcome, SlideDeckRequest, SlideEntry, SlideManifest,
    SlideSpec,
};

use crate::error::EngineError;
use crate::types::{BatchSummary, JobResult};
use std::path::Path;
use tracing::{info, warn};

/// Create `dir` and any missing parents
pub(crate) async fn prepare_output_dir(dir: &Path) -> Result<(), EngineError> {
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Log the batch summary, as a warning when anything failed
pub(crate) fn log_summary(kind: &str, results: &[JobResult], dir: &Path) -> BatchSummary {
    let summary = BatchSummary::from_results(results);
    if summary.all_succeeded() {
        info!(kind, dir = %dir.display(), "{}", summary);
    } else {
        warn!(kind, dir = %dir.display(), "{}", summary);
    }
    summary
}

/// `prefix` + blank line + `Label i of n:` + newline + `prompt`
pub(crate) fn numbered_prompt(prefix: &str, label: &str, index: usize, total: usize, prompt: &str) -> String {
    format!("{}\n\n{} {} of {}:\n{}", prefix, label, index + 1, total, prompt)
}
