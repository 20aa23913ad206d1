//! Integration tests for the mofa orchestration engine

mod artifact_cache;
mod auto_layout;
mod batch_scheduler;
mod refinement;
mod stitch;
mod test_utils;
mod video_pipeline;
