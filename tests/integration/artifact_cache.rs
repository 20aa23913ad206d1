//! Filesystem cache: existing outputs above the size floor skip the provider

use mofa::cache::{ArtifactCache, DEFAULT_MIN_ARTIFACT_BYTES};
use mofa::clock::InstantSleeper;
use mofa::queue::run_batch;
use mofa::synthesis::SynthesisClient;
use mofa::types::Job;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::test_utils::{write_artifact, RecordingImageProvider};

fn client(provider: Arc<RecordingImageProvider>) -> SynthesisClient {
    SynthesisClient::new(provider, Arc::new(InstantSleeper::new()), "test-model")
}

#[tokio::test]
async fn test_rerun_with_existing_outputs_makes_no_provider_calls() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(RecordingImageProvider::succeeding());
    let client = client(provider.clone());
    let jobs: Vec<Job> = (0..4)
        .map(|i| Job::new(i, format!("panel {}", i), temp_dir.path().join(format!("panel-{}.png", i))))
        .collect();

    let first = run_batch(&jobs, &client, 2).await.unwrap();
    assert_eq!(provider.call_count(), 4);

    let second = run_batch(&jobs, &client, 2).await.unwrap();
    assert_eq!(provider.call_count(), 4);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_placeholder_below_floor_is_regenerated() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("slide-01.png");
    std::fs::write(&target, vec![0u8; DEFAULT_MIN_ARTIFACT_BYTES as usize]).unwrap();

    let provider = Arc::new(RecordingImageProvider::succeeding());
    let client = client(provider.clone());
    let results = run_batch(&[Job::new(0, "title", &target)], &client, 1).await.unwrap();

    assert_eq!(results[0].as_deref(), Some(target.as_path()));
    assert_eq!(provider.call_count(), 1);
    assert!(std::fs::metadata(&target).unwrap().len() > DEFAULT_MIN_ARTIFACT_BYTES);
}

#[tokio::test]
async fn test_custom_floor() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("card-fox.png");
    write_artifact(&target);

    let cache = ArtifactCache::new(50_000);
    assert!(!cache.is_hit(&target));
    assert!(ArtifactCache::default().is_hit(&target));
    assert!(!cache.is_hit(temp_dir.path()));
}
