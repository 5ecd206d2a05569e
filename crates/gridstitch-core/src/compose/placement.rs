use crate::error::{Result, StitchError};
use crate::grid::AxisOrientation;
use crate::tile::{GridDims, ShiftPair, TileGeometry};

/// Pixels removed from each edge of a tile before placement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Crop {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// Where, and how much of, a tile lands on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Canvas-space grid row, after axis reversal.
    pub row: usize,
    /// Canvas-space grid column, after axis reversal.
    pub col: usize,
    pub crop: Crop,
    /// Canvas coordinates of the cropped tile's top-left sample.
    pub y: usize,
    pub x: usize,
    /// Size of the cropped tile.
    pub height: usize,
    pub width: usize,
}

/// Place grid tile `(i, j)`.
///
/// Interior edges split the overlap in half, less half the skew of the
/// orthogonal shift; grid-boundary edges are never cropped:
///
/// ```text
/// top/bottom = max(0, floor(-v.dy / 2) - |h.dy| / 2)
/// left/right = max(0, floor(-h.dx / 2) - |v.dx| / 2)
/// ```
///
/// Skew accumulates across the grid from the origin for positive shifts and
/// from the far edge for negative ones.
pub fn tile_placement(
    i: usize,
    j: usize,
    dims: &GridDims,
    orientation: &AxisOrientation,
    shifts: &ShiftPair,
    geometry: &TileGeometry,
) -> Result<Placement> {
    if i >= dims.num_rows || j >= dims.num_cols {
        return Err(StitchError::InvalidGeometry(format!(
            "tile i:{i} j:{j} outside {}x{} grid",
            dims.num_rows, dims.num_cols
        )));
    }

    let row = if orientation.rows_reversed {
        dims.num_rows - 1 - i
    } else {
        i
    };
    let col = if orientation.cols_reversed {
        dims.num_cols - 1 - j
    } else {
        j
    };

    let (v, h) = (shifts.vertical, shifts.horizontal);
    let vertical_crop = ((-v.dy).div_euclid(2) - h.dy.abs() / 2).max(0) as usize;
    let horizontal_crop = ((-h.dx).div_euclid(2) - v.dx.abs() / 2).max(0) as usize;

    let last_row = dims.num_rows - 1;
    let last_col = dims.num_cols - 1;
    let crop = Crop {
        top: if row > 0 { vertical_crop } else { 0 },
        bottom: if row < last_row { vertical_crop } else { 0 },
        left: if col > 0 { horizontal_crop } else { 0 },
        right: if col < last_col { horizontal_crop } else { 0 },
    };

    let (tile_h, tile_w) = (geometry.height as i64, geometry.width as i64);
    let (row_i, col_i) = (row as i64, col as i64);

    let mut y = row_i * (tile_h + v.dy) + crop.top as i64;
    if h.dy < 0 {
        y -= (last_col as i64 - col_i) * h.dy;
    } else {
        y += col_i * h.dy;
    }

    let mut x = col_i * (tile_w + h.dx) + crop.left as i64;
    if v.dx < 0 {
        x -= (last_row as i64 - row_i) * v.dx;
    } else {
        x += row_i * v.dx;
    }

    let height = geometry.height as i64 - (crop.top + crop.bottom) as i64;
    let width = geometry.width as i64 - (crop.left + crop.right) as i64;
    if y < 0 || x < 0 || height <= 0 || width <= 0 {
        return Err(StitchError::InvalidGeometry(format!(
            "tile i:{i} j:{j} placed at ({y}, {x}) with size {height}x{width}"
        )));
    }

    Ok(Placement {
        row,
        col,
        crop,
        y: y as usize,
        x: x as usize,
        height: height as usize,
        width: width as usize,
    })
}
