//! Media Compositor
//!
//! Composition commands the assemblers issue, and the trait that executes
//! them. Failures are fatal to the invoking step and never retried.

pub mod process;

pub use process::ProcessCompositor;

use crate::error::CompositorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoding profile shared by every video intermediate
pub const VIDEO_FPS: u32 = 24;
pub const VIDEO_CRF: u32 = 20;
pub const VIDEO_PRESET: &str = "medium";
pub const VIDEO_PIXEL_FORMAT: &str = "yuv420p";
pub const AUDIO_BITRATE: &str = "128k";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompositionCommand {
    /// Left-to-right strip with a pixel gutter
    AppendHorizontal {
        inputs: Vec<PathBuf>,
        gutter: u32,
        output: PathBuf,
    },
    /// Top-to-bottom strip with a pixel gutter
    AppendVertical {
        inputs: Vec<PathBuf>,
        gutter: u32,
        output: PathBuf,
    },
    /// Grid with a fixed column count and a uniform gutter
    Tile {
        inputs: Vec<PathBuf>,
        columns: usize,
        gutter: u32,
        output: PathBuf,
    },
    /// Still image held for `duration` seconds, letterboxed to `width`×`height`
    StillClip {
        image: PathBuf,
        duration: f64,
        width: u32,
        height: u32,
        output: PathBuf,
    },
    /// Re-encode to the shared video profile, dropping audio
    ReEncode { input: PathBuf, output: PathBuf },
    /// Crossfade `first` into `second`, then fade the result to black
    Crossfade {
        first: PathBuf,
        second: PathBuf,
        duration: f64,
        offset: f64,
        fade_out_start: f64,
        fade_out: f64,
        output: PathBuf,
    },
    /// Mix a music track under a silent video
    AudioMix {
        video: PathBuf,
        audio: PathBuf,
        fade_in: f64,
        fade_out_start: f64,
        fade_out: f64,
        volume: f64,
        output: PathBuf,
    },
}

impl CompositionCommand {
    pub fn output(&self) -> &Path {
        match self {
            CompositionCommand::AppendHorizontal { output, .. }
            | CompositionCommand::AppendVertical { output, .. }
            | CompositionCommand::Tile { output, .. }
            | CompositionCommand::StillClip { output, .. }
            | CompositionCommand::ReEncode { output, .. }
            | CompositionCommand::Crossfade { output, .. }
            | CompositionCommand::AudioMix { output, .. } => output,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CompositionCommand::AppendHorizontal { .. } => "append_horizontal",
            CompositionCommand::AppendVertical { .. } => "append_vertical",
            CompositionCommand::Tile { .. } => "tile",
            CompositionCommand::StillClip { .. } => "still_clip",
            CompositionCommand::ReEncode { .. } => "re_encode",
            CompositionCommand::Crossfade { .. } => "crossfade",
            CompositionCommand::AudioMix { .. } => "audio_mix",
        }
    }
}

/// Duration and frame size of a video clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait MediaCompositor: Send + Sync {
    async fn compose(&self, command: &CompositionCommand) -> Result<(), CompositorError>;

    async fn clip_info(&self, clip: &Path) -> Result<ClipInfo, CompositorError>;
}
