pub mod config;
mod orchestrator;
mod types;

pub use orchestrator::{
    prepare_stitch, run_stitch, run_stitch_reported, run_stitch_with, PreparedStitch,
};
pub use types::{NoOpReporter, ProgressReporter, StitchReport, StitchStage};
