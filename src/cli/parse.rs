//! CLI parse: clap types for mofa. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// mofa - generative media orchestration
#[derive(Parser)]
#[command(name = "mofa")]
#[command(about = "Batch image synthesis, auto-layout slides, stitched strips and animated cards")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides layered config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a slide deck from a JSON request file
    Slides {
        /// Request file
        request: PathBuf,
    },
    /// Generate greeting cards from a JSON request file
    Cards {
        request: PathBuf,
    },
    /// Generate cards, then animate each into a video
    VideoCards {
        request: PathBuf,
    },
    /// Generate and stitch a comic strip
    Comic {
        request: PathBuf,
    },
    /// Generate and stitch a vertical infographic
    Infographic {
        request: PathBuf,
    },
    /// Animate one existing image
    Animate(AnimateArgs),
    /// List the style sheets in the styles directory
    Styles,
}

#[derive(Args, Debug, Clone)]
pub struct AnimateArgs {
    /// Source image
    pub image: PathBuf,

    /// Output clip (default: <image stem>-animated.mp4 next to the image)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Literal animation prompt; overrides the style sheet
    #[arg(long)]
    pub prompt: Option<String>,

    /// Animation style sheet name
    #[arg(long)]
    pub anim_sheet: Option<String>,

    /// Animation style variant
    #[arg(long)]
    pub anim_style: Option<String>,

    /// Scene description appended to the animation prompt
    #[arg(long)]
    pub desc: Option<String>,

    /// Background music track
    #[arg(long)]
    pub music: Option<PathBuf>,
}
