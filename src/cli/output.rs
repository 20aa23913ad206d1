//! CLI output: error mapping and plain-text result rendering.

use crate::assembler::{AnimatedVideo, StitchOutcome};
use crate::error::EngineError;
use crate::types::{BatchSummary, JobResult};
use std::fmt::Write;

/// Map engine errors to a string for CLI output.
pub fn map_error(e: &EngineError) -> String {
    match e {
        EngineError::ProviderNotConfigured(message) => format!("Missing credential: {}", message),
        EngineError::StyleNotFound(path) => format!("Style not found: {}", path.display()),
        other => other.to_string(),
    }
}

/// `kind: N/total succeeded` followed by one line per job
pub fn format_batch(kind: &str, results: &[JobResult]) -> String {
    let mut out = format!("{}: {}", kind, BatchSummary::from_results(results));
    for (index, result) in results.iter().enumerate() {
        let _ = match result {
            Some(path) => write!(out, "\n  {:>2}. {}", index + 1, path.display()),
            None => write!(out, "\n  {:>2}. failed", index + 1),
        };
    }
    out
}

pub fn format_stitch(outcome: &StitchOutcome) -> String {
    match outcome.path() {
        Some(path) => format!("Stitched: {}", path.display()),
        None => "Nothing to stitch".to_string(),
    }
}

pub fn format_animation(video: &AnimatedVideo) -> String {
    format!(
        "Video: {} ({:.1}s{})",
        video.output.display(),
        video.duration,
        if video.raw_cached { ", cached raw clip" } else { "" }
    )
}
