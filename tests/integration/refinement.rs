//! Post-generation refinement of batch results

use mofa::config::MofaConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::test_utils::{write_artifact, Doubles, RecordingRefineProvider};

fn generated(temp_dir: &TempDir, names: &[&str]) -> Vec<Option<PathBuf>> {
    names
        .iter()
        .map(|name| {
            let path = temp_dir.path().join(name);
            write_artifact(&path);
            Some(path)
        })
        .collect()
}

#[tokio::test]
async fn test_refines_in_order_and_skips_missing_instructions() {
    let temp_dir = TempDir::new().unwrap();
    let doubles = Doubles::new();
    let engine = doubles.engine(MofaConfig::default(), temp_dir.path());

    let mut results = generated(&temp_dir, &["panel-01.png", "panel-02.png", "panel-03.png"]);
    results.push(None);
    let instructions = vec![
        Some("fix hands".to_string()),
        None,
        Some("sharpen lines".to_string()),
        Some("never reached".to_string()),
    ];

    engine.refine_results(&mut results, &instructions).await;

    assert_eq!(doubles.refiner.instructions(), vec!["fix hands", "sharpen lines"]);
    assert_eq!(results[0], Some(temp_dir.path().join("panel-01-refined.png")));
    assert_eq!(results[1], Some(temp_dir.path().join("panel-02.png")));
    assert_eq!(results[2], Some(temp_dir.path().join("panel-03-refined.png")));
    assert_eq!(results[3], None);
    assert!(temp_dir.path().join("panel-01-refined.png").exists());
}

#[tokio::test]
async fn test_failure_keeps_original() {
    let temp_dir = TempDir::new().unwrap();
    let doubles = Doubles {
        refiner: Arc::new(RecordingRefineProvider::failing_on("impossible")),
        ..Doubles::new()
    };
    let engine = doubles.engine(MofaConfig::default(), temp_dir.path());

    let mut results = generated(&temp_dir, &["section-01.png", "section-02.png"]);
    let instructions = vec![Some("impossible edit".to_string()), Some("brighten".to_string())];
    engine.refine_results(&mut results, &instructions).await;

    assert_eq!(results[0], Some(temp_dir.path().join("section-01.png")));
    assert_eq!(results[1], Some(temp_dir.path().join("section-02-refined.png")));
    assert!(!temp_dir.path().join("section-01-refined.png").exists());
}

#[tokio::test]
async fn test_skipped_without_refiner() {
    let temp_dir = TempDir::new().unwrap();
    let doubles = Doubles::new();
    let engine = doubles.engine_with_refiner(MofaConfig::default(), temp_dir.path(), false);
    assert!(!engine.has_refiner());

    let mut results = generated(&temp_dir, &["panel-01.png"]);
    let before = results.clone();
    engine
        .refine_results(&mut results, &[Some("fix hands".to_string())])
        .await;

    assert_eq!(results, before);
    assert!(doubles.refiner.instructions().is_empty());
}

#[tokio::test]
async fn test_existing_refined_image_is_reused() {
    let temp_dir = TempDir::new().unwrap();
    let doubles = Doubles::new();
    let engine = doubles.engine(MofaConfig::default(), temp_dir.path());

    let mut results = generated(&temp_dir, &["panel-01.png"]);
    write_artifact(&temp_dir.path().join("panel-01-refined.png"));
    engine
        .refine_results(&mut results, &[Some("fix hands".to_string())])
        .await;

    assert_eq!(results[0], Some(temp_dir.path().join("panel-01-refined.png")));
    assert!(doubles.refiner.instructions().is_empty());
}
