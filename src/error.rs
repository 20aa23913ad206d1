//! Error types for the mofa orchestration engine.

use std::path::PathBuf;
use thiserror::Error;

/// Media compositor errors (ImageMagick / ffmpeg / ffprobe invocations)
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("Failed to spawn {tool} (is it installed and on PATH?): {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status}: {stderr}")]
    CommandFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to read clip info for {path}: {message}")]
    ClipInfoFailed { path: PathBuf, message: String },

    #[error("Compositor I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Style not found: {0}")]
    StyleNotFound(PathBuf),

    #[error("Invalid style file {path}: {message}")]
    InvalidStyle { path: PathBuf, message: String },

    #[error("Layout extraction failed: {0}")]
    LayoutExtractionFailed(String),

    #[error("Refinement failed: {0}")]
    RefinementFailed(String),

    #[error("Refinement timed out: {0}")]
    RefinementTimeout(String),

    #[error("Video generation failed: {0}")]
    VideoGenerationFailed(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Compositor error: {0}")]
    Compositor(#[from] CompositorError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ConfigError(format!("Invalid JSON: {}", err))
    }
}
