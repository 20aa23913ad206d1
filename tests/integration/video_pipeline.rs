//! Checkpointed still-to-video assembly

use mofa::assembler::{VideoAssembler, VideoAssemblyOptions, VideoAssemblyPaths};
use mofa::clock::InstantSleeper;
use mofa::compositor::CompositionCommand;
use mofa::error::EngineError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::integration::test_utils::{
    write_artifact, RecordingCompositor, RecordingVideoProvider, ARTIFACT_BYTES,
};

struct Fixture {
    temp_dir: TempDir,
    video: Arc<RecordingVideoProvider>,
    compositor: Arc<RecordingCompositor>,
    sleeper: Arc<InstantSleeper>,
}

impl Fixture {
    fn new(video: RecordingVideoProvider) -> Self {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(&temp_dir.path().join("card-fox.png"));
        Self {
            temp_dir,
            video: Arc::new(video),
            compositor: Arc::new(RecordingCompositor::new()),
            sleeper: Arc::new(InstantSleeper::new()),
        }
    }

    fn assembler(&self) -> VideoAssembler {
        VideoAssembler::new(self.video.clone(), self.compositor.clone(), self.sleeper.clone())
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.temp_dir.path().join(name)
    }
}

fn assert_intermediates_removed(dir: &Path, image: &Path) {
    let paths = VideoAssemblyPaths::new(dir, image);
    for intermediate in paths.intermediates() {
        assert!(!intermediate.exists(), "{} left behind", intermediate.display());
    }
}

#[tokio::test]
async fn test_fresh_run_polls_until_done_and_composites() {
    let fixture = Fixture::new(RecordingVideoProvider::finishing_after(3));
    let image = fixture.path("card-fox.png");
    let output = fixture.path("card-fox-animated.mp4");

    let video = fixture
        .assembler()
        .animate(&image, &output, "ink wash motion", None)
        .await
        .unwrap();

    assert!(!video.raw_cached);
    assert_eq!(video.duration, 10.0);
    assert_eq!(fixture.video.submitted_prompts(), vec!["ink wash motion".to_string()]);
    assert_eq!(fixture.video.poll_count(), 4);
    assert_eq!(fixture.video.download_count(), 1);
    assert_eq!(fixture.sleeper.requested(), vec![Duration::from_secs(10); 4]);
    assert_eq!(fixture.compositor.modes(), vec!["still_clip", "re_encode", "crossfade"]);

    match &fixture.compositor.commands()[2] {
        CompositionCommand::Crossfade { duration, offset, fade_out_start, fade_out, .. } => {
            assert_eq!(*duration, 1.0);
            assert_eq!(*offset, 1.0);
            assert_eq!(*fade_out_start, 8.5);
            assert_eq!(*fade_out, 1.5);
        }
        other => panic!("expected crossfade, got {:?}", other),
    }

    assert!(output.exists());
    assert_eq!(std::fs::metadata(fixture.path("card-fox-raw.mp4")).unwrap().len(), ARTIFACT_BYTES as u64);
    assert_intermediates_removed(fixture.temp_dir.path(), &image);
}

#[tokio::test]
async fn test_cached_raw_clip_skips_submission() {
    let fixture = Fixture::new(RecordingVideoProvider::finishing_after(0));
    let image = fixture.path("card-fox.png");
    write_artifact(&fixture.path("card-fox-raw.mp4"));

    let video = fixture
        .assembler()
        .animate(&image, &fixture.path("card-fox-animated.mp4"), "motion", None)
        .await
        .unwrap();

    assert!(video.raw_cached);
    assert_eq!(video.duration, 2.0 + 8.0);
    assert!(fixture.video.submitted_prompts().is_empty());
    assert_eq!(fixture.video.poll_count(), 0);
    assert!(fixture.sleeper.requested().is_empty());
    assert_eq!(fixture.compositor.clip_info_count(), 1);
}

#[tokio::test]
async fn test_music_is_mixed_when_present() {
    let fixture = Fixture::new(RecordingVideoProvider::finishing_after(0));
    let image = fixture.path("card-fox.png");
    let music = fixture.path("bgm.mp3");
    std::fs::write(&music, b"ID3").unwrap();

    fixture
        .assembler()
        .with_options(VideoAssemblyOptions {
            music_volume: 0.5,
            ..VideoAssemblyOptions::default()
        })
        .animate(&image, &fixture.path("out.mp4"), "motion", Some(&music))
        .await
        .unwrap();

    match fixture.compositor.commands().last().unwrap() {
        CompositionCommand::AudioMix { audio, volume, fade_in, fade_out_start, .. } => {
            assert_eq!(audio, &music);
            assert_eq!(*volume, 0.5);
            assert_eq!(*fade_in, 2.0);
            assert_eq!(*fade_out_start, 8.5);
        }
        other => panic!("expected audio mix, got {:?}", other),
    }
    assert_intermediates_removed(fixture.temp_dir.path(), &image);
}

#[tokio::test]
async fn test_missing_music_produces_silent_output() {
    let fixture = Fixture::new(RecordingVideoProvider::finishing_after(0));
    let image = fixture.path("card-fox.png");
    let output = fixture.path("out.mp4");

    fixture
        .assembler()
        .animate(&image, &output, "motion", Some(&fixture.path("absent.mp3")))
        .await
        .unwrap();

    assert!(!fixture.compositor.modes().contains(&"audio_mix"));
    assert!(output.exists());
    assert_intermediates_removed(fixture.temp_dir.path(), &image);
}

#[tokio::test]
async fn test_failed_operation_is_fatal() {
    let fixture = Fixture::new(RecordingVideoProvider::failing_with("safety filter"));
    let err = fixture
        .assembler()
        .animate(&fixture.path("card-fox.png"), &fixture.path("out.mp4"), "motion", None)
        .await
        .unwrap_err();

    match err {
        EngineError::VideoGenerationFailed(message) => assert_eq!(message, "safety filter"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fixture.video.download_count(), 0);
    assert!(fixture.compositor.commands().is_empty());
}

#[tokio::test]
async fn test_compositor_failure_still_cleans_up() {
    let fixture = Fixture::new(RecordingVideoProvider::finishing_after(0));
    let fixture = Fixture {
        compositor: Arc::new(RecordingCompositor::new().failing_on("crossfade")),
        ..fixture
    };
    let image = fixture.path("card-fox.png");

    let err = fixture
        .assembler()
        .animate(&image, &fixture.path("out.mp4"), "motion", None)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Compositor(_)));
    assert!(fixture.path("card-fox-raw.mp4").exists());
    assert_intermediates_removed(fixture.temp_dir.path(), &image);
}
