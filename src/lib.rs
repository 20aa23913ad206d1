//! mofa: generative media orchestration
//!
//! Turns declarative lists of slides, cards, comic panels and infographic
//! sections into finished artifacts by driving image, video, vision and
//! refinement providers through a bounded-concurrency scheduler, a
//! filesystem artifact cache, bounded retries, a three-phase auto-layout
//! pipeline and a checkpointed still-to-video assembler.

pub mod assembler;
pub mod autolayout;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod compositor;
pub mod config;
pub mod engine;
pub mod error;
pub mod layout;
pub mod logging;
pub mod overlay;
pub mod pipeline;
pub mod provider;
pub mod queue;
pub mod style;
pub mod synthesis;
pub mod types;
