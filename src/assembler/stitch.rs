//! Still-image stitching (strip or grid).

use crate::compositor::{CompositionCommand, MediaCompositor};
use crate::error::EngineError;
use crate::types::JobResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchLayout {
    #[default]
    Horizontal,
    Vertical,
    Grid,
}

impl fmt::Display for StitchLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StitchLayout::Horizontal => "horizontal",
            StitchLayout::Vertical => "vertical",
            StitchLayout::Grid => "grid",
        })
    }
}

impl FromStr for StitchLayout {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "horizontal" => Ok(StitchLayout::Horizontal),
            "vertical" => Ok(StitchLayout::Vertical),
            "grid" => Ok(StitchLayout::Grid),
            other => Err(EngineError::ConfigError(format!(
                "Unknown layout '{}'. Expected horizontal, vertical or grid",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StitchOutcome {
    Stitched(PathBuf),
    /// Every job failed; the compositor was not invoked
    NothingToStitch,
}

impl StitchOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            StitchOutcome::Stitched(path) => Some(path),
            StitchOutcome::NothingToStitch => None,
        }
    }
}

/// Smallest `c` with `c * c >= n`
pub fn grid_columns(n: usize) -> usize {
    let mut columns = 1;
    while columns * columns < n {
        columns += 1;
    }
    columns
}

/// Stitch the successful results, in order, into `output`
pub async fn stitch_images(
    compositor: &dyn MediaCompositor,
    results: &[JobResult],
    layout: StitchLayout,
    gutter: u32,
    output: &Path,
) -> Result<StitchOutcome, EngineError> {
    if results.is_empty() {
        return Err(EngineError::EmptyInput(
            "No job results to stitch".to_string(),
        ));
    }

    let inputs: Vec<PathBuf> = results.iter().flatten().cloned().collect();
    if inputs.is_empty() {
        warn!(total = results.len(), "No images generated, skipping stitch");
        return Ok(StitchOutcome::NothingToStitch);
    }

    let output = output.to_path_buf();
    let count = inputs.len();
    let command = match layout {
        StitchLayout::Horizontal => CompositionCommand::AppendHorizontal {
            inputs,
            gutter,
            output: output.clone(),
        },
        StitchLayout::Vertical => CompositionCommand::AppendVertical {
            inputs,
            gutter,
            output: output.clone(),
        },
        StitchLayout::Grid => CompositionCommand::Tile {
            columns: grid_columns(count),
            inputs,
            gutter,
            output: output.clone(),
        },
    };

    info!(images = count, layout = %layout, gutter, "Stitching");
    compositor.compose(&command).await?;
    info!(path = %output.display(), "Stitched");
    Ok(StitchOutcome::Stitched(output))
}
