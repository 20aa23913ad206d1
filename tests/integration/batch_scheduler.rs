//! Scheduler ordering and exactly-once consumption

use async_trait::async_trait;
use mofa::clock::InstantSleeper;
use mofa::error::EngineError;
use mofa::queue::{run_batch, JobProcessor, JobQueue};
use mofa::synthesis::SynthesisClient;
use mofa::types::{Job, JobResult};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::test_utils::RecordingImageProvider;

/// Yields a job-specific number of times so completion order differs from
/// submission order, and counts how often each index is processed.
struct ShufflingProcessor {
    yields: Vec<usize>,
    processed: Mutex<Vec<usize>>,
}

impl ShufflingProcessor {
    fn new(yields: Vec<usize>) -> Self {
        let processed = Mutex::new(vec![0; yields.len()]);
        Self { yields, processed }
    }
}

#[async_trait]
impl JobProcessor for ShufflingProcessor {
    type Output = JobResult;

    async fn process(&self, job: &Job) -> JobResult {
        for _ in 0..self.yields[job.index] {
            tokio::task::yield_now().await;
        }
        self.processed.lock()[job.index] += 1;
        Some(job.output_path.clone())
    }

    fn succeeded(output: &JobResult) -> bool {
        output.is_some()
    }
}

fn jobs(n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| Job::new(i, format!("prompt {}", i), format!("/tmp/mofa/job-{:02}.png", i)))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_results_indexed_by_job_and_consumed_once(
        yields in prop::collection::vec(0usize..6, 1..24),
        concurrency_seed in 1usize..24,
    ) {
        let n = yields.len();
        let concurrency = 1 + concurrency_seed % n;
        let jobs = jobs(n);
        let processor = ShufflingProcessor::new(yields);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let results = runtime.block_on(run_batch(&jobs, &processor, concurrency)).unwrap();

        prop_assert_eq!(results.len(), n);
        for (i, result) in results.iter().enumerate() {
            prop_assert_eq!(result.as_ref(), Some(&jobs[i].output_path));
        }
        prop_assert!(processor.processed.lock().iter().all(|&count| count == 1));
    }

    #[test]
    fn prop_queue_pops_each_index_once(len in 0usize..64) {
        let queue = JobQueue::new(len);
        let mut popped = Vec::new();
        while let Some(index) = queue.pop() {
            popped.push(index);
        }
        prop_assert_eq!(popped, (0..len).collect::<Vec<_>>());
        prop_assert_eq!(queue.pop(), None);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_workers_keep_positions() {
    let processor = ShufflingProcessor::new((0..40).map(|i| (i * 7) % 5).collect());
    let jobs = jobs(40);
    let results = run_batch(&jobs, &processor, 8).await.unwrap();

    let expected: Vec<JobResult> = jobs.iter().map(|j| Some(j.output_path.clone())).collect();
    assert_eq!(results, expected);
    assert!(processor.processed.lock().iter().all(|&count| count == 1));
}

#[tokio::test]
async fn test_failed_jobs_leave_none_in_their_slot() {
    let temp_dir = TempDir::new().unwrap();
    let provider = Arc::new(RecordingImageProvider::succeeding().failing_on("broken"));
    let client = SynthesisClient::new(provider.clone(), Arc::new(InstantSleeper::new()), "test-model");

    let jobs: Vec<Job> = ["sunrise", "broken bridge", "harbor", "broken clock"]
        .iter()
        .enumerate()
        .map(|(i, prompt)| Job::new(i, *prompt, temp_dir.path().join(format!("img-{}.png", i))))
        .collect();
    let results = run_batch(&jobs, &client, 2).await.unwrap();

    assert!(results[0].is_some());
    assert!(results[1].is_none());
    assert!(results[2].is_some());
    assert!(results[3].is_none());
    // Two good jobs once each, two bad jobs three attempts each
    assert_eq!(provider.call_count(), 2 + 3 * 2);
}

#[tokio::test]
async fn test_misnumbered_batch_rejected() {
    let processor = ShufflingProcessor::new(vec![0, 0]);
    let jobs = vec![
        Job::new(0, "a", PathBuf::from("/tmp/a.png")),
        Job::new(5, "b", PathBuf::from("/tmp/b.png")),
    ];
    let err = run_batch(&jobs, &processor, 2).await.unwrap_err();
    assert!(matches!(err, EngineError::ConfigError(_)));
    assert!(processor.processed.lock().iter().all(|&count| count == 0));
}
