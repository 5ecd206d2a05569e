use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{s, Array2, ArrayViewMut2};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::canvas::Canvas;
use crate::error::{Result, StitchError};
use crate::flatfield::{FlatfieldModel, FlatfieldSet};
use crate::grid::{AcquisitionGrid, AxisOrientation};
use crate::io::tile_source::{load_tile, TileSource};
use crate::sample::Sample;
use crate::tile::{ShiftPair, Tile};

use super::placement::{tile_placement, Placement};

/// Write every tile of `grid` into `canvas`.
///
/// Planes are independent slices of the canvas and are composited in
/// parallel. Within a plane, tiles are decoded and corrected in parallel
/// batches and written in address order, each overwriting its region.
/// `on_tile(done, total)` runs after each tile; a panic inside it is logged
/// and otherwise ignored.
pub fn compose<T: Sample>(
    grid: &AcquisitionGrid,
    source: &dyn TileSource,
    shifts: &ShiftPair,
    orientation: &AxisOrientation,
    flatfields: Option<&FlatfieldSet>,
    canvas: &mut Canvas<T>,
    on_tile: &(dyn Fn(usize, usize) + Sync),
) -> Result<()> {
    let dims = grid.dims();
    let shape = canvas.shape();
    if shape.channels != dims.num_channels || shape.z != dims.num_z {
        return Err(StitchError::InvalidGeometry(format!(
            "canvas {shape} does not fit {} channels x {} z-planes",
            dims.num_channels, dims.num_z
        )));
    }

    let total = grid.len();
    let done = AtomicUsize::new(0);
    let batch_size = rayon::current_num_threads().max(1);

    canvas
        .as_mut_slice()
        .par_chunks_mut(shape.plane_len())
        .enumerate()
        .try_for_each(|(plane_index, plane)| {
            let channel = plane_index / shape.z;
            let z = plane_index % shape.z;
            let mut plane = ArrayViewMut2::from_shape((shape.height, shape.width), plane)?;
            let flatfield = flatfields.and_then(|set| set.get(channel));

            let tiles: Vec<&Tile> = grid.tiles_in_plane(channel, z).collect();
            debug!(channel, z, tiles = tiles.len(), "Compositing plane");

            for batch in tiles.chunks(batch_size) {
                let prepared = batch
                    .par_iter()
                    .map(|&tile| {
                        prepare_tile::<T>(grid, source, shifts, orientation, flatfield, tile)
                    })
                    .collect::<Result<Vec<_>>>()?;

                for (tile, placement, data) in prepared {
                    write_tile(&mut plane, tile, &placement, &data)?;
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    report(on_tile, n, total);
                }
            }
            Ok(())
        })
}

fn prepare_tile<'a, T: Sample>(
    grid: &AcquisitionGrid,
    source: &dyn TileSource,
    shifts: &ShiftPair,
    orientation: &AxisOrientation,
    flatfield: Option<&FlatfieldModel>,
    tile: &'a Tile,
) -> Result<(&'a Tile, Placement, Array2<T>)> {
    let geometry = grid.geometry();
    let mut data = load_tile::<T>(source, tile, &geometry)?;
    if let Some(model) = flatfield {
        data = model.apply(&data)?;
    }
    let placement = tile_placement(
        tile.address.row,
        tile.address.col,
        &grid.dims(),
        orientation,
        shifts,
        &geometry,
    )?;
    Ok((tile, placement, data))
}

fn write_tile<T: Sample>(
    plane: &mut ArrayViewMut2<T>,
    tile: &Tile,
    placement: &Placement,
    data: &Array2<T>,
) -> Result<()> {
    let (canvas_h, canvas_w) = plane.dim();
    let (y, x) = (placement.y, placement.x);
    let (h, w) = (placement.height, placement.width);
    if y + h > canvas_h || x + w > canvas_w {
        return Err(StitchError::InvalidGeometry(format!(
            "{} at ({y}, {x}) size {h}x{w} exceeds canvas {canvas_h}x{canvas_w}",
            tile.filename
        )));
    }

    let crop = placement.crop;
    let cropped = data.slice(s![crop.top..crop.top + h, crop.left..crop.left + w]);
    plane.slice_mut(s![y..y + h, x..x + w]).assign(&cropped);
    Ok(())
}

fn report(on_tile: &(dyn Fn(usize, usize) + Sync), done: usize, total: usize) {
    if catch_unwind(AssertUnwindSafe(|| on_tile(done, total))).is_err() {
        warn!(done, total, "Progress callback panicked");
    }
}
