use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};
use crate::sample::SampleType;
use crate::tile::{GridDims, ShiftPair, TileGeometry};

/// Extent of the `(t=1, c, z, y, x)` output volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasShape {
    pub channels: usize,
    pub z: usize,
    pub height: usize,
    pub width: usize,
}

impl CanvasShape {
    pub fn tczyx(&self) -> [usize; 5] {
        [1, self.channels, self.z, self.height, self.width]
    }

    pub fn plane_len(&self) -> usize {
        self.height * self.width
    }

    pub fn plane_count(&self) -> usize {
        self.channels * self.z
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.plane_count() * self.plane_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for CanvasShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(1, {}, {}, {}, {})",
            self.channels, self.z, self.height, self.width
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasPlan {
    pub shape: CanvasShape,
    pub sample_type: SampleType,
    /// Advisory: half the fully materialised size.
    pub memory_estimate_bytes: u64,
}

impl CanvasPlan {
    /// Size of the volume if every sample is held at once.
    pub fn full_size_bytes(&self) -> u64 {
        self.shape.len() as u64 * self.sample_type.byte_size() as u64
    }
}

/// Compute the canvas shape and memory estimate for a grid.
///
/// ```text
/// width  = W + (cols-1)(W + h.dx) + |(rows-1) v.dx|
/// height = H + (rows-1)(H + v.dy) + |(cols-1) h.dy|
/// ```
pub fn plan_canvas(
    dims: GridDims,
    geometry: TileGeometry,
    shifts: &ShiftPair,
) -> Result<CanvasPlan> {
    if dims.num_rows == 0 || dims.num_cols == 0 || dims.num_z == 0 || dims.num_channels == 0 {
        return Err(StitchError::InvalidGeometry(format!(
            "empty grid: {} rows, {} cols, {} z-planes, {} channels",
            dims.num_rows, dims.num_cols, dims.num_z, dims.num_channels
        )));
    }

    let (h, w) = (geometry.height as i64, geometry.width as i64);
    let (v, hz) = (shifts.vertical, shifts.horizontal);
    let pitch_x = w + hz.dx;
    let pitch_y = h + v.dy;
    if pitch_x <= 0 || pitch_y <= 0 {
        return Err(StitchError::InvalidGeometry(format!(
            "shifts v={} h={} leave no tile pitch for {}x{} tiles",
            v, hz, w, h
        )));
    }

    let rows = dims.num_rows as i64;
    let cols = dims.num_cols as i64;
    let width = w + (cols - 1) * pitch_x + ((rows - 1) * v.dx).abs();
    let height = h + (rows - 1) * pitch_y + ((cols - 1) * hz.dy).abs();

    let shape = CanvasShape {
        channels: dims.num_channels,
        z: dims.num_z,
        height: height as usize,
        width: width as usize,
    };
    let full = shape
        .tczyx()
        .iter()
        .try_fold(geometry.sample_type.byte_size() as u64, |acc, &d| {
            acc.checked_mul(d as u64)
        })
        .ok_or_else(|| StitchError::InvalidGeometry(format!("canvas {shape} overflows")))?;

    Ok(CanvasPlan {
        shape,
        sample_type: geometry.sample_type,
        memory_estimate_bytes: full / 2,
    })
}
