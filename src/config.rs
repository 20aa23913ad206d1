//! Configuration System
//!
//! `MofaConfig` carries every tunable the engine reads: models, API keys,
//! per-pipeline defaults, retry/cache/refinement/video settings, the layout
//! canvas, the styles directory and logging. Values are layered by
//! [`ConfigLoader`] and validated once at the entry boundary.

use crate::assembler::StitchLayout;
use crate::layout::Canvas;
use crate::logging::LoggingConfig;
use crate::types::ImageSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;
pub use sources::global_file::global_config_path;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-generate-preview";
pub const DEFAULT_REFINE_MODEL: &str = "qwen-image-edit-max-2026-01-16";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MofaConfig {
    #[serde(default)]
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub defaults: PipelineDefaults,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub canvas: Canvas,
    #[serde(default = "default_styles_dir")]
    pub styles_dir: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_styles_dir() -> PathBuf {
    PathBuf::from("styles")
}

impl Default for MofaConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            models: ModelConfig::default(),
            defaults: PipelineDefaults::default(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            refinement: RefinementConfig::default(),
            video: VideoConfig::default(),
            canvas: Canvas::default(),
            styles_dir: default_styles_dir(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Provider credentials. A value of `env:NAME` is read from that variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub gemini: Option<String>,
    #[serde(default)]
    pub dashscope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_image_model")]
    pub image: String,
    #[serde(default = "default_vision_model")]
    pub vision: String,
    #[serde(default = "default_video_model")]
    pub video: String,
    #[serde(default = "default_refine_model")]
    pub refine: String,
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_vision_model() -> String {
    DEFAULT_VISION_MODEL.to_string()
}

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

fn default_refine_model() -> String {
    DEFAULT_REFINE_MODEL.to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            image: default_image_model(),
            vision: default_vision_model(),
            video: default_video_model(),
            refine: default_refine_model(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefaults {
    #[serde(default)]
    pub slides: SlideDefaults,
    #[serde(default)]
    pub cards: CardDefaults,
    #[serde(default)]
    pub video_cards: VideoCardDefaults,
    #[serde(default)]
    pub comic: ComicDefaults,
    #[serde(default)]
    pub infographic: InfographicDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideDefaults {
    #[serde(default = "default_slide_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    /// Reference-phase resolution for auto-layout slides
    #[serde(default)]
    pub ref_image_size: Option<ImageSize>,
    #[serde(default = "default_slide_variant")]
    pub variant: String,
}

fn default_slide_concurrency() -> usize {
    5
}

fn default_slide_variant() -> String {
    "normal".to_string()
}

impl Default for SlideDefaults {
    fn default() -> Self {
        Self {
            concurrency: default_slide_concurrency(),
            image_size: None,
            ref_image_size: None,
            variant: default_slide_variant(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefaults {
    #[serde(default = "default_card_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_card_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub image_size: Option<ImageSize>,
    #[serde(default = "default_card_variant")]
    pub variant: String,
}

fn default_card_concurrency() -> usize {
    5
}

fn default_card_aspect_ratio() -> String {
    "9:16".to_string()
}

fn default_card_variant() -> String {
    "front".to_string()
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            concurrency: default_card_concurrency(),
            aspect_ratio: default_card_aspect_ratio(),
            image_size: None,
            variant: default_card_variant(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoCardDefaults {
    #[serde(default = "default_video_card_concurrency")]
    pub concurrency: usize,
    /// Variant of the animation style sheet
    #[serde(default = "default_anim_variant")]
    pub anim_variant: String,
    /// Animation style sheet name under the styles directory
    #[serde(default = "default_anim_style")]
    pub anim_style: String,
    #[serde(default)]
    pub music: Option<PathBuf>,
}

fn default_video_card_concurrency() -> usize {
    3
}

fn default_anim_variant() -> String {
    "shuimo".to_string()
}

fn default_anim_style() -> String {
    "video-card".to_string()
}

impl Default for VideoCardDefaults {
    fn default() -> Self {
        Self {
            concurrency: default_video_card_concurrency(),
            anim_variant: default_anim_variant(),
            anim_style: default_anim_style(),
            music: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicDefaults {
    #[serde(default = "default_comic_style")]
    pub style: String,
    #[serde(default)]
    pub layout: StitchLayout,
    #[serde(default = "default_two_k")]
    pub image_size: ImageSize,
    #[serde(default = "default_three")]
    pub concurrency: usize,
    #[serde(default = "default_comic_gutter")]
    pub gutter: u32,
    #[serde(default)]
    pub refine: bool,
}

fn default_comic_style() -> String {
    "xkcd".to_string()
}

fn default_two_k() -> ImageSize {
    ImageSize::TwoK
}

fn default_three() -> usize {
    3
}

fn default_comic_gutter() -> u32 {
    20
}

impl Default for ComicDefaults {
    fn default() -> Self {
        Self {
            style: default_comic_style(),
            layout: StitchLayout::default(),
            image_size: default_two_k(),
            concurrency: default_three(),
            gutter: default_comic_gutter(),
            refine: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfographicDefaults {
    #[serde(default = "default_infographic_style")]
    pub style: String,
    #[serde(default = "default_infographic_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_two_k")]
    pub image_size: ImageSize,
    #[serde(default = "default_three")]
    pub concurrency: usize,
    #[serde(default)]
    pub gutter: u32,
    #[serde(default = "default_true")]
    pub refine: bool,
}

fn default_infographic_style() -> String {
    "cyberpunk-neon".to_string()
}

fn default_infographic_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for InfographicDefaults {
    fn default() -> Self {
        Self {
            style: default_infographic_style(),
            aspect_ratio: default_infographic_aspect_ratio(),
            image_size: default_two_k(),
            concurrency: default_three(),
            gutter: 0,
            refine: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    15
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Files at or below this size are treated as missing
    #[serde(default = "default_min_bytes")]
    pub min_bytes: u64,
}

fn default_min_bytes() -> u64 {
    crate::cache::DEFAULT_MIN_ARTIFACT_BYTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementConfig {
    #[serde(default = "default_refine_poll_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_refine_poll_secs() -> u64 {
    5
}

fn default_max_polls() -> u32 {
    60
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_refine_poll_secs(),
            max_polls: default_max_polls(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_video_poll_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_still_duration")]
    pub still_duration: f64,
    #[serde(default = "default_crossfade")]
    pub crossfade: f64,
    #[serde(default = "default_fade_out")]
    pub fade_out: f64,
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,
    #[serde(default = "default_music_fade_in")]
    pub music_fade_in: f64,
}

fn default_video_poll_secs() -> u64 {
    10
}

fn default_still_duration() -> f64 {
    2.0
}

fn default_crossfade() -> f64 {
    1.0
}

fn default_fade_out() -> f64 {
    1.5
}

fn default_music_volume() -> f64 {
    0.3
}

fn default_music_fade_in() -> f64 {
    2.0
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_video_poll_secs(),
            still_duration: default_still_duration(),
            crossfade: default_crossfade(),
            fade_out: default_fade_out(),
            music_volume: default_music_volume(),
            music_fade_in: default_music_fade_in(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub section: String,
    pub message: String,
}

impl ValidationError {
    fn new(section: &str, message: impl Into<String>) -> Self {
        Self {
            section: section.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.section, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// `env:NAME` reads the variable, anything else is the literal key.
/// Blank results count as absent.
pub fn resolve_key(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    let resolved = match value.strip_prefix("env:") {
        Some(var) => std::env::var(var.trim()).ok()?,
        None => value.to_string(),
    };
    if resolved.trim().is_empty() {
        None
    } else {
        Some(resolved)
    }
}

impl MofaConfig {
    /// Configured Gemini key, else `GEMINI_API_KEY`
    pub fn gemini_api_key(&self) -> Option<String> {
        resolve_key(self.api_keys.gemini.as_deref())
            .or_else(|| resolve_key(Some("env:GEMINI_API_KEY")))
    }

    /// Configured Dashscope key, else `DASHSCOPE_API_KEY`
    pub fn dashscope_api_key(&self) -> Option<String> {
        resolve_key(self.api_keys.dashscope.as_deref())
            .or_else(|| resolve_key(Some("env:DASHSCOPE_API_KEY")))
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, model) in [
            ("image", &self.models.image),
            ("vision", &self.models.vision),
            ("video", &self.models.video),
            ("refine", &self.models.refine),
        ] {
            if model.trim().is_empty() {
                errors.push(ValidationError::new("models", format!("{} model cannot be empty", name)));
            }
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::new("retry", "max_attempts must be at least 1"));
        }
        if self.refinement.max_polls == 0 {
            errors.push(ValidationError::new("refinement", "max_polls must be at least 1"));
        }
        if self.video.poll_interval_secs == 0 {
            errors.push(ValidationError::new("video", "poll_interval_secs must be at least 1"));
        }

        let canvas = &self.canvas;
        if canvas.width <= 0.0 || canvas.height <= 0.0 {
            errors.push(ValidationError::new("canvas", "width and height must be positive"));
        }
        if canvas.margin < 0.0
            || canvas.margin * 2.0 >= canvas.width
            || canvas.margin * 2.0 >= canvas.height
        {
            errors.push(ValidationError::new("canvas", "margin must fit twice inside the canvas"));
        }

        let video = &self.video;
        if video.still_duration <= 0.0 {
            errors.push(ValidationError::new("video", "still_duration must be positive"));
        }
        if video.crossfade < 0.0 || video.crossfade > video.still_duration {
            errors.push(ValidationError::new(
                "video",
                "crossfade must be between 0 and still_duration",
            ));
        }
        if video.fade_out < 0.0 || video.music_fade_in < 0.0 {
            errors.push(ValidationError::new("video", "fade durations cannot be negative"));
        }
        if video.music_volume < 0.0 {
            errors.push(ValidationError::new("video", "music_volume cannot be negative"));
        }

        if self.styles_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new("styles_dir", "cannot be empty"));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::new("logging", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
