//! Media Assembler: turns job results into final artifacts.

pub mod stitch;
pub mod video;

pub use stitch::{grid_columns, stitch_images, StitchLayout, StitchOutcome};
pub use video::{
    AnimatedVideo, OperationState, VideoAssembler, VideoAssemblyOptions, VideoAssemblyPaths,
};
