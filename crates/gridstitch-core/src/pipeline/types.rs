use std::path::PathBuf;

use crate::align::OverlapEstimate;
use crate::canvas::CanvasPlan;
use crate::grid::AxisOrientation;
use crate::tile::{GridDims, TileGeometry};

/// Stitching stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StitchStage {
    Indexing,
    Registration,
    Flatfield,
    Compositing,
    Exporting,
}

impl std::fmt::Display for StitchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indexing => write!(f, "Indexing tiles"),
            Self::Registration => write!(f, "Estimating overlap"),
            Self::Flatfield => write!(f, "Fitting flatfields"),
            Self::Compositing => write!(f, "Compositing"),
            Self::Exporting => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for a stitching run.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (tiles, channels), if known.
    fn begin_stage(&self, _stage: StitchStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that ignores every event.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// What a completed run produced.
#[derive(Clone, Debug)]
pub struct StitchReport {
    pub output: PathBuf,
    pub dims: GridDims,
    pub geometry: TileGeometry,
    pub channel_names: Vec<String>,
    pub orientation: AxisOrientation,
    pub overlap: OverlapEstimate,
    pub plan: CanvasPlan,
    pub memory_mapped: bool,
    pub flatfield_applied: bool,
}
