//! Core job types shared by the scheduler, synthesis client and pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Requested output resolution tier for image synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single job: the produced file, or `None` for a permanent failure
pub type JobResult = Option<PathBuf>;

/// One request to produce a single media asset (panel, section, slide or card).
///
/// Jobs are built by the caller, never mutated afterwards, and consumed exactly
/// once by a scheduler worker. `index` is the job's identity and its slot in the
/// results array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub index: usize,
    pub prompt: String,
    pub output_path: PathBuf,
    /// Style variant tag the prompt prefix was resolved from
    pub variant: String,
    pub image_size: Option<ImageSize>,
    pub aspect_ratio: Option<String>,
    pub model_override: Option<String>,
    /// Additional reference images sent alongside the prompt
    #[serde(default)]
    pub reference_images: Vec<PathBuf>,
    /// Human-readable tag used in log lines
    pub label: String,
    /// Run through the auto-layout pipeline instead of plain synthesis
    #[serde(default)]
    pub auto_layout: bool,
    /// Style prefix forwarded to layout extraction as a palette/font hint
    #[serde(default)]
    pub style_hint: Option<String>,
}

impl Job {
    pub fn new(index: usize, prompt: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        let output_path = output_path.into();
        let label = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("job-{}", index + 1));
        Self {
            index,
            prompt: prompt.into(),
            output_path,
            variant: "normal".to_string(),
            image_size: None,
            aspect_ratio: None,
            model_override: None,
            reference_images: Vec::new(),
            label,
            auto_layout: false,
            style_hint: None,
        }
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_image_size(mut self, image_size: Option<ImageSize>) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: Option<String>) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model_override = model;
        self
    }

    pub fn with_reference_images(mut self, images: Vec<PathBuf>) -> Self {
        self.reference_images = images;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_auto_layout(mut self, auto_layout: bool) -> Self {
        self.auto_layout = auto_layout;
        self
    }

    pub fn with_style_hint(mut self, hint: impl Into<String>) -> Self {
        let hint = hint.into();
        self.style_hint = if hint.trim().is_empty() { None } else { Some(hint) };
        self
    }
}

/// Success count of a finished batch, rendered as `N/total succeeded`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[JobResult]) -> Self {
        Self {
            succeeded: results.iter().filter(|r| r.is_some()).count(),
            total: results.len(),
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} succeeded", self.succeeded, self.total)
    }
}

/// `slide-03.png` style names: 1-based, zero-padded to two digits
pub fn numbered_file_name(prefix: &str, index: usize, extension: &str) -> String {
    format!("{}-{:02}.{}", prefix, index + 1, extension)
}

/// `dir/name.png` -> `dir/name-<suffix>.png`
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };
    path.with_file_name(file_name)
}
