//! CLI domain: parse, route and output only.
//! No orchestration here; the route table dispatches to the pipelines.

mod output;
mod parse;
mod route;

pub use output::{format_animation, format_batch, format_stitch, map_error};
pub use parse::{AnimateArgs, Cli, Commands};
pub use route::RunContext;
