//! Three-phase auto-layout: reference, extraction, clean regeneration

use mofa::autolayout::{
    layout_cache_path, AutoLayoutPipeline, AutoLayoutSettings, ExtractionStatus,
    CLEAN_REGENERATION_INSTRUCTION,
};
use mofa::clock::InstantSleeper;
use mofa::layout::{Align, Canvas};
use mofa::queue::{run_batch, JobProcessor};
use mofa::synthesis::SynthesisClient;
use mofa::types::{ImageSize, Job};
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::test_utils::{
    ImageReply, RecordingImageProvider, RecordingLayoutProvider,
};

const COVER_ANSWER: &str = r##"```json
[
  {"text": "Quarterly Review", "x": 2.5, "y": 2.0, "w": 6.0, "h": 1.2, "fontSize": 40, "color": "#ffffff", "bold": true},
  {"text": "Finance team", "x": 4.0, "y": 3.5, "w": 3.0, "h": 0.6, "fontSize": 20}
]
```"##;

fn pipeline(
    image: Arc<RecordingImageProvider>,
    layout: Arc<RecordingLayoutProvider>,
) -> AutoLayoutPipeline {
    let synthesis = Arc::new(SynthesisClient::new(image, Arc::new(InstantSleeper::new()), "image-model"));
    AutoLayoutPipeline::new(
        synthesis,
        layout,
        AutoLayoutSettings {
            ref_image_size: Some(ImageSize::OneK),
            vision_model: Some("vision-model".to_string()),
            canvas: Canvas::default(),
        },
    )
}

fn auto_job(temp_dir: &TempDir) -> Job {
    Job::new(0, "corporate cover", temp_dir.path().join("slide-01.png"))
        .with_image_size(Some(ImageSize::FourK))
        .with_auto_layout(true)
        .with_style_hint("navy and gold, serif headings")
}

#[tokio::test]
async fn test_three_phases_produce_clean_image_and_refined_texts() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let layout = Arc::new(RecordingLayoutProvider::answering(COVER_ANSWER));
    let pipeline = pipeline(image.clone(), layout.clone());

    let outcome = pipeline.run(&auto_job(&temp_dir)).await;

    assert_eq!(outcome.image, Some(temp_dir.path().join("slide-01.png")));
    assert_eq!(outcome.reference, Some(temp_dir.path().join("slide-01-ref.png")));
    assert!(temp_dir.path().join("slide-01-ref.png").exists());
    assert_eq!(outcome.extraction, ExtractionStatus::Extracted);

    let calls = image.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].prompt, "corporate cover");
    assert_eq!(calls[0].image_size, Some(ImageSize::OneK));
    assert_eq!(calls[0].reference_count, 0);
    assert_eq!(calls[1].prompt, format!("corporate cover{}", CLEAN_REGENERATION_INSTRUCTION));
    assert_eq!(calls[1].image_size, Some(ImageSize::FourK));
    assert_eq!(calls[1].reference_count, 1);

    let instructions = layout.instructions();
    assert_eq!(instructions.len(), 1);
    assert!(instructions[0].contains("navy and gold, serif headings"));

    let texts = outcome.texts.unwrap();
    assert_eq!(texts.len(), 2);
    let canvas = Canvas::default();
    for text in &texts {
        assert!((text.x - canvas.margin).abs() < 1e-9);
        assert!((text.w - (canvas.width - 2.0 * canvas.margin)).abs() < 1e-9);
        assert_eq!(text.align, Some(Align::Ctr));
    }
    assert_eq!(texts[0].color.as_deref(), Some("FFFFFF"));
    assert_eq!(texts[1].font_size, 20.0);
}

#[tokio::test]
async fn test_rerun_reuses_saved_layout_without_provider_calls() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let layout = Arc::new(RecordingLayoutProvider::answering(COVER_ANSWER));
    let pipeline = pipeline(image.clone(), layout.clone());
    let job = auto_job(&temp_dir);

    let first = pipeline.run(&job).await;
    assert_eq!(image.call_count(), 2);
    assert_eq!(layout.call_count(), 1);
    assert!(temp_dir.path().join("slide-01-layout.json").exists());

    let second = pipeline.run(&job).await;
    assert_eq!(image.call_count(), 2);
    assert_eq!(layout.call_count(), 1);

    assert_eq!(second.image, first.image);
    assert_eq!(second.reference, first.reference);
    assert_eq!(second.extraction, ExtractionStatus::Extracted);
    let (first_texts, second_texts) = (first.texts.unwrap(), second.texts.unwrap());
    assert_eq!(second_texts.len(), first_texts.len());
    for (a, b) in first_texts.iter().zip(&second_texts) {
        assert_eq!(a.text, b.text);
        assert_eq!(a.align, b.align);
        assert_eq!(a.color, b.color);
        assert!((a.x - b.x).abs() < 1e-9);
        assert!((a.w - b.w).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_rerun_without_saved_layout_extracts_again() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let failing = Arc::new(RecordingLayoutProvider::failing());
    let job = auto_job(&temp_dir);

    let first = pipeline(image.clone(), failing).run(&job).await;
    assert_eq!(first.extraction, ExtractionStatus::Failed);
    assert!(!layout_cache_path(&job.output_path).exists());

    // Both images are cached now; only the vision call is repeated
    let layout = Arc::new(RecordingLayoutProvider::answering(COVER_ANSWER));
    let second = pipeline(image.clone(), layout.clone()).run(&job).await;
    assert_eq!(image.call_count(), 2);
    assert_eq!(layout.call_count(), 1);
    assert_eq!(second.extraction, ExtractionStatus::Extracted);
    assert!(layout_cache_path(&job.output_path).exists());
}

#[tokio::test]
async fn test_extraction_failure_still_regenerates() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let layout = Arc::new(RecordingLayoutProvider::failing());
    let pipeline = pipeline(image.clone(), layout.clone());

    let outcome = pipeline.run(&auto_job(&temp_dir)).await;

    assert!(outcome.image.is_some());
    assert!(outcome.texts.is_none());
    assert_eq!(outcome.extraction, ExtractionStatus::Failed);
    // Extraction is attempted exactly once
    assert_eq!(layout.call_count(), 1);
    assert_eq!(image.call_count(), 2);
}

#[tokio::test]
async fn test_malformed_answer_is_extraction_failure() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let layout = Arc::new(RecordingLayoutProvider::answering("{\"text\": \"not an array\"}"));

    let outcome = pipeline(image, layout).run(&auto_job(&temp_dir)).await;
    assert_eq!(outcome.extraction, ExtractionStatus::Failed);
    assert!(outcome.image.is_some());
}

#[tokio::test]
async fn test_reference_failure_skips_extraction() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::scripted(vec![
        ImageReply::Error,
        ImageReply::Error,
        ImageReply::Error,
    ]));
    let layout = Arc::new(RecordingLayoutProvider::answering(COVER_ANSWER));
    let pipeline = pipeline(image.clone(), layout.clone());

    let outcome = pipeline.run(&auto_job(&temp_dir)).await;

    assert!(outcome.reference.is_none());
    assert_eq!(outcome.extraction, ExtractionStatus::Skipped);
    assert_eq!(layout.call_count(), 0);
    assert!(outcome.image.is_some());

    let calls = image.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[3].reference_count, 0);
}

#[tokio::test]
async fn test_processor_routes_plain_jobs_to_synthesis() {
    let temp_dir = TempDir::new().unwrap();
    let image = Arc::new(RecordingImageProvider::succeeding());
    let layout = Arc::new(RecordingLayoutProvider::answering(COVER_ANSWER));
    let pipeline = pipeline(image.clone(), layout.clone());

    let mut auto = auto_job(&temp_dir);
    auto.index = 1;
    auto.output_path = temp_dir.path().join("slide-02.png");
    let jobs = vec![Job::new(0, "plain slide", temp_dir.path().join("slide-01.png")), auto];

    let outcomes = run_batch(&jobs, &pipeline, 2).await.unwrap();

    assert_eq!(outcomes[0].extraction, ExtractionStatus::Skipped);
    assert!(outcomes[0].reference.is_none());
    assert!(AutoLayoutPipeline::succeeded(&outcomes[0]));
    assert_eq!(outcomes[1].extraction, ExtractionStatus::Extracted);
    assert_eq!(outcomes[1].reference, Some(temp_dir.path().join("slide-02-ref.png")));
    assert_eq!(image.call_count(), 3);
    assert_eq!(layout.call_count(), 1);
}
