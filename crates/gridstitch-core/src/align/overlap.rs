//! One global shift pair per stitching run, measured on a single tile pair
//! per axis near the centre of the grid.

use ndarray::{s, Array2};
use tracing::{debug, info, warn};

use crate::error::{Result, StitchError};
use crate::grid::{AcquisitionGrid, AxisOrientation};
use crate::io::tile_source::{load_tile_f32, TileSource};
use crate::metadata::AcquisitionParameters;
use crate::pipeline::config::RegistrationConfig;
use crate::sample::SampleType;
use crate::tile::{GridAddress, GridDims, Shift, ShiftPair, Tile, TileGeometry};

use super::phase_correlation::phase_cross_correlation;

/// Why an axis fell back to a zero shift instead of a measured one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Degradation {
    /// Stage spacing is at least the tile size; nothing to register.
    ZeroOverlap,
    /// No tile at the neighbour address.
    MissingNeighbour { row: usize, col: usize },
    /// Neighbour resolves to the reference tile's own file.
    SameSource,
    /// Registration ran but produced no usable offset.
    RegistrationFailed(String),
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroOverlap => write!(f, "no overlap"),
            Self::MissingNeighbour { row, col } => write!(f, "no neighbour at i:{row} j:{col}"),
            Self::SameSource => write!(f, "neighbour is the reference tile"),
            Self::RegistrationFailed(reason) => write!(f, "registration failed: {reason}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShiftSource {
    Measured,
    Defaulted(Degradation),
}

impl ShiftSource {
    pub fn is_measured(&self) -> bool {
        matches!(self, Self::Measured)
    }
}

/// Shift for one axis together with how it was obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxisEstimate {
    pub shift: Shift,
    pub source: ShiftSource,
    /// Nominal overlap from stage spacing, in pixels.
    pub nominal_overlap: usize,
}

impl AxisEstimate {
    fn defaulted(nominal_overlap: usize, reason: Degradation) -> Self {
        Self {
            shift: Shift::ZERO,
            source: ShiftSource::Defaulted(reason),
            nominal_overlap,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlapEstimate {
    pub vertical: AxisEstimate,
    pub horizontal: AxisEstimate,
    /// Sample-plane size of one pixel.
    pub pixel_size_um: f64,
    /// Stage spacing between adjacent tiles, in pixels.
    pub spacing_px: Shift,
    /// Tile both pairs were registered against.
    pub reference: GridAddress,
}

impl OverlapEstimate {
    pub fn shifts(&self) -> ShiftPair {
        ShiftPair {
            vertical: self.vertical.shift,
            horizontal: self.horizontal.shift,
        }
    }
}

/// Grid positions of the reference pair near the centre of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceAnchors {
    pub row_top: usize,
    pub row_bottom: usize,
    pub col_left: usize,
    pub col_right: usize,
}

impl ReferenceAnchors {
    /// Centre column/row and the next one along, swapped on reversed axes so
    /// that `col_left` is physically left of `col_right` and `row_top` above
    /// `row_bottom`.
    pub fn new(dims: &GridDims, orientation: &AxisOrientation) -> Self {
        let mut col_left = dims.num_cols.saturating_sub(1) / 2;
        let mut col_right = col_left + 1;
        if orientation.cols_reversed {
            std::mem::swap(&mut col_left, &mut col_right);
        }
        let mut row_top = dims.num_rows.saturating_sub(1) / 2;
        let mut row_bottom = row_top + 1;
        if orientation.rows_reversed {
            std::mem::swap(&mut row_top, &mut row_bottom);
        }
        Self {
            row_top,
            row_bottom,
            col_left,
            col_right,
        }
    }
}

/// Overlap implied by stage spacing: `max(tile_dimension - spacing, 0)`.
pub fn nominal_overlap(tile_dimension: usize, spacing_px: i64) -> usize {
    (tile_dimension as i64 - spacing_px).max(0) as usize
}

/// Estimate the vertical and horizontal shifts for the whole grid.
///
/// Fails only when the reference tile itself is missing; every other
/// problem degrades the affected axis to a zero shift.
pub fn estimate_shifts(
    grid: &AcquisitionGrid,
    source: &dyn TileSource,
    orientation: &AxisOrientation,
    params: &AcquisitionParameters,
    config: &RegistrationConfig,
) -> Result<OverlapEstimate> {
    let geometry = grid.geometry();
    let optics = params.optics();
    let pixel_size_um = optics.pixel_size_um();
    let spacing_px = Shift::new(
        optics.mm_to_pixels(params.dy_mm),
        optics.mm_to_pixels(params.dx_mm),
    );

    let overlap_y = nominal_overlap(geometry.height, spacing_px.dy);
    let overlap_x = nominal_overlap(geometry.width, spacing_px.dx);
    debug!(
        pixel_size_um,
        spacing_y = spacing_px.dy,
        spacing_x = spacing_px.dx,
        overlap_y,
        overlap_x,
        "Nominal overlap from stage spacing"
    );

    let channel = config
        .registration_channel(grid)
        .ok_or_else(|| StitchError::EmptyTileSet(grid.image_dir().to_path_buf()))?;
    let anchors = ReferenceAnchors::new(&grid.dims(), orientation);
    let address = |row, col| GridAddress {
        channel,
        z: config.z_level,
        row,
        col,
    };

    let reference_addr = address(anchors.row_top, anchors.col_left);
    let reference = grid
        .get(&reference_addr)
        .ok_or_else(|| StitchError::MissingReferenceTile {
            channel: grid.channel_names()[channel].clone(),
            z: config.z_level,
            row: anchors.row_top,
            col: anchors.col_left,
        })?;
    let below = grid.get(&address(anchors.row_bottom, anchors.col_left));
    let right = grid.get(&address(anchors.row_top, anchors.col_right));

    let mut reference_data: Option<Array2<f32>> = None;

    let vertical = match usable_neighbour(
        reference,
        below,
        overlap_y,
        anchors.row_bottom,
        anchors.col_left,
    ) {
        Err(reason) => AxisEstimate::defaulted(overlap_y, reason),
        Ok(neighbour) => {
            let top = load_f32(source, reference, &geometry)?;
            let bottom = load_f32(source, neighbour, &geometry)?;
            let estimate = measure(overlap_y, vertical_shift(&top, &bottom, overlap_y, config));
            reference_data = Some(top);
            estimate
        }
    };

    let horizontal = match usable_neighbour(
        reference,
        right,
        overlap_x,
        anchors.row_top,
        anchors.col_right,
    ) {
        Err(reason) => AxisEstimate::defaulted(overlap_x, reason),
        Ok(neighbour) => {
            let left = match reference_data.take() {
                Some(data) => data,
                None => load_f32(source, reference, &geometry)?,
            };
            let right_data = load_f32(source, neighbour, &geometry)?;
            measure(
                overlap_x,
                horizontal_shift(&left, &right_data, overlap_x, config),
            )
        }
    };

    log_axis("vertical", reference, below, &vertical);
    log_axis("horizontal", reference, right, &horizontal);

    Ok(OverlapEstimate {
        vertical,
        horizontal,
        pixel_size_um,
        spacing_px,
        reference: reference_addr,
    })
}

impl RegistrationConfig {
    /// Configured channel if the grid has it, else the first channel.
    pub fn registration_channel(&self, grid: &AcquisitionGrid) -> Option<usize> {
        self.channel
            .as_deref()
            .and_then(|name| grid.channel_index(name))
            .or_else(|| (!grid.channel_names().is_empty()).then_some(0))
    }
}

fn usable_neighbour<'a>(
    reference: &Tile,
    neighbour: Option<&'a Tile>,
    overlap: usize,
    row: usize,
    col: usize,
) -> std::result::Result<&'a Tile, Degradation> {
    if overlap == 0 {
        return Err(Degradation::ZeroOverlap);
    }
    match neighbour {
        None => Err(Degradation::MissingNeighbour { row, col }),
        Some(tile) if tile.path == reference.path => Err(Degradation::SameSource),
        Some(tile) => Ok(tile),
    }
}

fn measure(nominal_overlap: usize, shift: Result<Shift>) -> AxisEstimate {
    match shift {
        Ok(shift) => AxisEstimate {
            shift,
            source: ShiftSource::Measured,
            nominal_overlap,
        },
        Err(e) => AxisEstimate::defaulted(
            nominal_overlap,
            Degradation::RegistrationFailed(e.to_string()),
        ),
    }
}

fn log_axis(axis: &str, reference: &Tile, neighbour: Option<&Tile>, estimate: &AxisEstimate) {
    let neighbour = neighbour.map(|t| t.filename.as_str()).unwrap_or("-");
    match &estimate.source {
        ShiftSource::Measured => info!(
            axis,
            reference = %reference.filename,
            neighbour,
            shift = %estimate.shift,
            "Measured tile shift"
        ),
        ShiftSource::Defaulted(reason) => {
            if matches!(reason, Degradation::RegistrationFailed(_)) {
                warn!(axis, %reason, "Registration degraded to zero shift");
            } else {
                info!(axis, %reason, "Using zero shift");
            }
        }
    }
}

fn load_f32(
    source: &dyn TileSource,
    tile: &Tile,
    geometry: &TileGeometry,
) -> Result<Array2<f32>> {
    match geometry.sample_type {
        SampleType::U8 => load_tile_f32::<u8>(source, tile, geometry),
        SampleType::U16 => load_tile_f32::<u16>(source, tile, geometry),
    }
}

/// Shift between a tile and its right-hand neighbour.
///
/// Registers the rightmost `overlap` columns of `left` against the leftmost
/// `overlap` columns of `right`, with `height / margin_divisor` rows dropped
/// at the top and bottom.
pub fn horizontal_shift(
    left: &Array2<f32>,
    right: &Array2<f32>,
    overlap: usize,
    config: &RegistrationConfig,
) -> Result<Shift> {
    let (h, w) = left.dim();
    let overlap = overlap.min(w);
    let (top, bottom) = margin_range(h, config.margin_divisor);

    let left_roi = left.slice(s![top..bottom, w - overlap..]);
    let right_roi = right.slice(s![top..bottom, ..overlap]);
    let offset = phase_cross_correlation(left_roi, right_roi, config.upsample_factor)?;
    if !offset.is_finite() {
        return Err(StitchError::InvalidGeometry("non-finite offset".into()));
    }

    Ok(Shift::new(
        offset.dy.round_ties_even() as i64,
        (offset.dx - overlap as f64).round_ties_even() as i64,
    ))
}

/// Shift between a tile and the neighbour below it.
///
/// Registers the bottom `overlap` rows of `top` against the top `overlap`
/// rows of `bottom`, with `width / margin_divisor` columns dropped on both
/// sides.
pub fn vertical_shift(
    top: &Array2<f32>,
    bottom: &Array2<f32>,
    overlap: usize,
    config: &RegistrationConfig,
) -> Result<Shift> {
    let (h, w) = top.dim();
    let overlap = overlap.min(h);
    let (left, right) = margin_range(w, config.margin_divisor);

    let top_roi = top.slice(s![h - overlap.., left..right]);
    let bottom_roi = bottom.slice(s![..overlap, left..right]);
    let offset = phase_cross_correlation(top_roi, bottom_roi, config.upsample_factor)?;
    if !offset.is_finite() {
        return Err(StitchError::InvalidGeometry("non-finite offset".into()));
    }

    Ok(Shift::new(
        (offset.dy - overlap as f64).round_ties_even() as i64,
        offset.dx.round_ties_even() as i64,
    ))
}

/// `[margin, len - margin)` with `margin = len / divisor`.
fn margin_range(len: usize, divisor: usize) -> (usize, usize) {
    let margin = if divisor == 0 { 0 } else { len / divisor };
    if 2 * margin >= len {
        (0, len)
    } else {
        (margin, len - margin)
    }
}
