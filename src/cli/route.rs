//! CLI route: single route table and run context.

use crate::cli::output::{format_animation, format_batch, format_stitch};
use crate::cli::parse::{AnimateArgs, Commands};
use crate::config::{ConfigLoader, MofaConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::pipeline::{
    animation_prompt, generate_cards, generate_comic, generate_infographic, generate_slides,
    generate_video_cards, CardBatchRequest, ComicRequest, InfographicRequest, SlideDeckRequest,
    VideoCardRequest,
};
use crate::style::StyleCatalog;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace and validated config.
/// The engine is built per command so credential-free commands still run.
pub struct RunContext {
    workspace_root: PathBuf,
    config: MofaConfig,
}

impl RunContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, EngineError> {
        let config = ConfigLoader::load_validated(&workspace_root, config_path.as_deref())?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &MofaConfig {
        &self.config
    }

    fn engine(&self) -> Result<Engine, EngineError> {
        Engine::from_config(self.config.clone(), self.workspace_root.clone())
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, EngineError> {
        match command {
            Commands::Slides { request } => {
                let request: SlideDeckRequest = self.read_request(request).await?;
                let outcome = generate_slides(&self.engine()?, &request).await?;
                let images: Vec<_> = outcome.manifest.slides.iter().map(|s| s.image.clone()).collect();
                Ok(format!(
                    "{}\nManifest: {}",
                    format_batch("slides", &images),
                    outcome.manifest_path.display()
                ))
            }
            Commands::Cards { request } => {
                let request: CardBatchRequest = self.read_request(request).await?;
                let results = generate_cards(&self.engine()?, &request).await?;
                Ok(format_batch("cards", &results))
            }
            Commands::VideoCards { request } => {
                let request: VideoCardRequest = self.read_request(request).await?;
                let outcome = generate_video_cards(&self.engine()?, &request).await?;
                Ok(format!(
                    "{}\n{}",
                    format_batch("images", &outcome.images),
                    format_batch("videos", &outcome.videos)
                ))
            }
            Commands::Comic { request } => {
                let request: ComicRequest = self.read_request(request).await?;
                let outcome = generate_comic(&self.engine()?, &request).await?;
                Ok(format!(
                    "{}\n{}",
                    format_batch("panels", &outcome.panels),
                    format_stitch(&outcome.stitched)
                ))
            }
            Commands::Infographic { request } => {
                let request: InfographicRequest = self.read_request(request).await?;
                let outcome = generate_infographic(&self.engine()?, &request).await?;
                Ok(format!(
                    "{}\n{}",
                    format_batch("sections", &outcome.sections),
                    format_stitch(&outcome.stitched)
                ))
            }
            Commands::Animate(args) => self.animate(args).await,
            Commands::Styles => self.list_styles(),
        }
    }

    async fn animate(&self, args: &AnimateArgs) -> Result<String, EngineError> {
        let engine = self.engine()?;
        let defaults = &self.config.defaults.video_cards;
        let image = engine.resolve(&args.image);
        if !image.is_file() {
            return Err(EngineError::EmptyInput(format!(
                "Image not found: {}",
                image.display()
            )));
        }

        let prompt = match &args.prompt {
            Some(prompt) => prompt.clone(),
            None => {
                let sheet = engine.load_style(args.anim_sheet.as_deref().unwrap_or(&defaults.anim_style))?;
                let variant = args.anim_style.as_deref().unwrap_or(&defaults.anim_variant);
                animation_prompt(&sheet, variant, args.desc.as_deref())
            }
        };
        let output = match &args.output {
            Some(output) => engine.resolve(output),
            None => default_animation_output(&image),
        };
        let music = args
            .music
            .as_ref()
            .or(defaults.music.as_ref())
            .map(|path| engine.resolve(path));

        info!(image = %image.display(), "Animating image");
        let video = engine
            .video_assembler()
            .animate(&image, &output, &prompt, music.as_deref())
            .await?;
        Ok(format_animation(&video))
    }

    fn list_styles(&self) -> Result<String, EngineError> {
        let dir = if self.config.styles_dir.is_absolute() {
            self.config.styles_dir.clone()
        } else {
            self.workspace_root.join(&self.config.styles_dir)
        };
        let catalog = StyleCatalog::load_dir(&dir)?;
        if catalog.is_empty() {
            return Ok(format!("No styles in {}", dir.display()));
        }

        let mut lines = vec![format!("{} styles in {}", catalog.len(), dir.display())];
        for name in catalog.names() {
            let Some(sheet) = catalog.get(name) else {
                continue;
            };
            let variants: Vec<&str> = sheet.variants.keys().map(String::as_str).collect();
            let description = sheet
                .meta
                .as_ref()
                .and_then(|m| m.description.as_deref())
                .unwrap_or("");
            lines.push(format!("  {:<20} [{}] {}", name, variants.join(", "), description));
        }
        Ok(lines.join("\n").trim_end().to_string())
    }

    async fn read_request<T: DeserializeOwned>(&self, path: &Path) -> Result<T, EngineError> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };
        debug!(path = %path.display(), "Reading request");
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            EngineError::ConfigError(format!("Cannot read request {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `<dir>/<stem>-animated.mp4`
fn default_animation_output(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    image.with_file_name(format!("{}-animated.mp4", stem))
}
