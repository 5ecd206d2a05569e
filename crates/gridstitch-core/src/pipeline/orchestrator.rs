use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::align::{estimate_shifts, OverlapEstimate};
use crate::canvas::{plan_canvas, Canvas, CanvasPlan, MemoryStrategy};
use crate::compose::compose;
use crate::consts::LOW_MEMORY_THRESHOLD_BYTES;
use crate::error::Result;
use crate::flatfield::{fit_flatfields, FlatfieldEstimator, FlatfieldSet, SmoothedMeanEstimator};
use crate::grid::{index_tiles, read_coordinates, AcquisitionGrid, AxisOrientation};
use crate::io::{export_volume, DiskTileSource, TileSource, VolumeMetadata};
use crate::metadata::{
    read_selected_modes, AcquisitionLayout, AcquisitionParameters, IlluminationMode,
};
use crate::sample::{Sample, SampleType};

use super::config::StitchConfig;
use super::types::{NoOpReporter, ProgressReporter, StitchReport, StitchStage};

/// Everything known about an acquisition before any canvas is allocated.
#[derive(Clone, Debug)]
pub struct PreparedStitch {
    pub layout: AcquisitionLayout,
    pub parameters: AcquisitionParameters,
    pub modes: Vec<IlluminationMode>,
    pub grid: AcquisitionGrid,
    pub orientation: AxisOrientation,
    pub overlap: OverlapEstimate,
    pub plan: CanvasPlan,
}

/// Index, read metadata, estimate shifts and plan the canvas.
///
/// Touches only the reference tile and its two neighbours; no output is
/// written. A missing reference tile fails here, before any allocation.
pub fn prepare_stitch(
    config: &StitchConfig,
    source: &dyn TileSource,
    reporter: &dyn ProgressReporter,
) -> Result<PreparedStitch> {
    reporter.begin_stage(StitchStage::Indexing, None);
    let layout = AcquisitionLayout::discover(&config.input)?;
    let parameters = AcquisitionParameters::load(&layout.parameters_path())?;
    let modes = read_selected_modes(&layout.configurations_path())?;
    for mode in &modes {
        info!(
            id = %mode.id,
            name = mode.name.as_deref(),
            exposure = mode.exposure_time.as_deref(),
            source = mode.illumination_source.as_deref(),
            "Selected illumination mode"
        );
    }

    let grid = index_tiles(&layout.image_dir)?;
    let coordinates = read_coordinates(&layout.coordinates_path())?;
    let orientation = AxisOrientation::from_coordinates(&coordinates);
    info!(
        rows_reversed = orientation.rows_reversed,
        cols_reversed = orientation.cols_reversed,
        z_reversed = orientation.z_reversed,
        "Stage orientation"
    );
    reporter.finish_stage();

    reporter.begin_stage(StitchStage::Registration, Some(2));
    let overlap = estimate_shifts(
        &grid,
        source,
        &orientation,
        &parameters,
        &config.registration,
    )?;
    reporter.advance(2);
    reporter.finish_stage();

    let plan = plan_canvas(grid.dims(), grid.geometry(), &overlap.shifts())?;
    info!(
        shape = %plan.shape,
        dtype = %plan.sample_type,
        estimate_bytes = plan.memory_estimate_bytes,
        "Planned canvas"
    );
    if config.memory == MemoryStrategy::InMemory
        && plan.memory_estimate_bytes > LOW_MEMORY_THRESHOLD_BYTES
    {
        warn!(
            estimate_bytes = plan.memory_estimate_bytes,
            "Canvas is large for an in-memory buffer; consider the memory-mapped strategy"
        );
    }

    Ok(PreparedStitch {
        layout,
        parameters,
        modes,
        grid,
        orientation,
        overlap,
        plan,
    })
}

/// Run the full stitching pipeline.
pub fn run_stitch(config: &StitchConfig) -> Result<StitchReport> {
    run_stitch_reported(config, Arc::new(NoOpReporter))
}

/// Run the full stitching pipeline with a thread-safe progress reporter.
pub fn run_stitch_reported(
    config: &StitchConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<StitchReport> {
    let estimator = SmoothedMeanEstimator {
        smoothing: config.flatfield.smoothing,
    };
    run_stitch_with(config, &DiskTileSource, &estimator, reporter.as_ref())
}

/// Run the pipeline with an explicit tile source and flatfield estimator.
pub fn run_stitch_with(
    config: &StitchConfig,
    source: &dyn TileSource,
    estimator: &dyn FlatfieldEstimator,
    reporter: &dyn ProgressReporter,
) -> Result<StitchReport> {
    let prepared = prepare_stitch(config, source, reporter)?;
    let output = prepared
        .layout
        .prepare_output(&config.output_file_name())?;

    let (memory_mapped, flatfield_applied) = match prepared.plan.sample_type {
        SampleType::U8 => {
            stitch_samples::<u8>(&prepared, config, source, estimator, reporter, &output)?
        }
        SampleType::U16 => {
            stitch_samples::<u16>(&prepared, config, source, estimator, reporter, &output)?
        }
    };

    info!(output = %output.display(), "Stitching complete");
    Ok(StitchReport {
        output,
        dims: prepared.grid.dims(),
        geometry: prepared.grid.geometry(),
        channel_names: prepared.grid.channel_names().to_vec(),
        orientation: prepared.orientation,
        overlap: prepared.overlap,
        plan: prepared.plan,
        memory_mapped,
        flatfield_applied,
    })
}

fn stitch_samples<T: Sample>(
    prepared: &PreparedStitch,
    config: &StitchConfig,
    source: &dyn TileSource,
    estimator: &dyn FlatfieldEstimator,
    reporter: &dyn ProgressReporter,
    output: &Path,
) -> Result<(bool, bool)> {
    let grid = &prepared.grid;

    let flatfields: Option<FlatfieldSet> = if config.flatfield.enabled {
        reporter.begin_stage(StitchStage::Flatfield, Some(grid.channel_names().len()));
        let set = fit_flatfields::<T>(grid, source, estimator, &config.flatfield, |done, _| {
            reporter.advance(done)
        })?;
        reporter.finish_stage();
        Some(set)
    } else {
        None
    };

    let spill_dir = prepared.layout.output_dir();
    let mut canvas = Canvas::<T>::allocate(&prepared.plan, config.memory, Some(&spill_dir))?;
    let memory_mapped = canvas.is_memory_mapped();

    reporter.begin_stage(StitchStage::Compositing, Some(grid.len()));
    compose(
        grid,
        source,
        &prepared.overlap.shifts(),
        &prepared.orientation,
        flatfields.as_ref(),
        &mut canvas,
        &|done, _total| reporter.advance(done),
    )?;
    reporter.finish_stage();

    reporter.begin_stage(StitchStage::Exporting, None);
    let metadata = VolumeMetadata {
        name: config.output_file_name(),
        channel_names: grid.channel_names().to_vec(),
        physical_size_z_um: prepared.parameters.dz_um,
        physical_size_xy_um: Some(prepared.overlap.pixel_size_um),
    };
    export_volume(config.format, &canvas, &metadata, output)?;
    reporter.finish_stage();

    Ok((memory_mapped, flatfields.is_some()))
}
