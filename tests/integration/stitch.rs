//! Still-image stitching through the compositor seam

use mofa::assembler::{stitch_images, StitchLayout, StitchOutcome};
use mofa::compositor::CompositionCommand;
use mofa::error::EngineError;
use mofa::types::JobResult;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::integration::test_utils::RecordingCompositor;

fn results(pattern: &[bool]) -> Vec<JobResult> {
    pattern
        .iter()
        .enumerate()
        .map(|(i, ok)| ok.then(|| PathBuf::from(format!("/tmp/mofa-stitch/panel-{:02}.png", i + 1))))
        .collect()
}

#[tokio::test]
async fn test_horizontal_strip_keeps_order_and_skips_failures() {
    let compositor = RecordingCompositor::new();
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("strip.png");

    let outcome = stitch_images(&compositor, &results(&[true, false, true]), StitchLayout::Horizontal, 20, &output)
        .await
        .unwrap();

    assert_eq!(outcome, StitchOutcome::Stitched(output.clone()));
    assert_eq!(
        compositor.commands(),
        vec![CompositionCommand::AppendHorizontal {
            inputs: vec![
                PathBuf::from("/tmp/mofa-stitch/panel-01.png"),
                PathBuf::from("/tmp/mofa-stitch/panel-03.png"),
            ],
            gutter: 20,
            output,
        }]
    );
}

#[tokio::test]
async fn test_grid_uses_square_root_columns() {
    let compositor = RecordingCompositor::new();
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("grid.png");

    stitch_images(&compositor, &results(&[true; 5]), StitchLayout::Grid, 10, &output)
        .await
        .unwrap();

    match &compositor.commands()[0] {
        CompositionCommand::Tile { inputs, columns, gutter, .. } => {
            assert_eq!(inputs.len(), 5);
            assert_eq!(*columns, 3);
            assert_eq!(*gutter, 10);
        }
        other => panic!("expected tile, got {:?}", other),
    }
}

#[tokio::test]
async fn test_all_failed_is_noop() {
    let compositor = RecordingCompositor::new();
    let outcome = stitch_images(
        &compositor,
        &results(&[false, false]),
        StitchLayout::Vertical,
        0,
        &PathBuf::from("/tmp/never.png"),
    )
    .await
    .unwrap();

    assert_eq!(outcome, StitchOutcome::NothingToStitch);
    assert!(compositor.commands().is_empty());
}

#[tokio::test]
async fn test_empty_input_is_error() {
    let compositor = RecordingCompositor::new();
    let err = stitch_images(&compositor, &[], StitchLayout::Vertical, 0, &PathBuf::from("/tmp/x.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::EmptyInput(_)));
}

#[tokio::test]
async fn test_compositor_failure_propagates() {
    let compositor = RecordingCompositor::new().failing_on("append_vertical");
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("fail.png");
    let err = stitch_images(&compositor, &results(&[true]), StitchLayout::Vertical, 0, &output)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Compositor(_)));
}
