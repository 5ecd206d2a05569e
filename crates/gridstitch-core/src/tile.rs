use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::sample::SampleType;

/// Position of a tile in the acquisition grid.
///
/// Field order gives the derived ordering channel, z, row, col, which is the
/// order tiles are composited in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridAddress {
    /// Index into the sorted channel-name list.
    pub channel: usize,
    pub z: usize,
    pub row: usize,
    pub col: usize,
}

/// One acquired tile image.
#[derive(Clone, Debug)]
pub struct Tile {
    pub address: GridAddress,
    pub channel_name: String,
    /// Well label, present only for `well_i_j_k_channel` names.
    pub well: Option<String>,
    pub filename: String,
    pub path: PathBuf,
}

/// Raster size and sample type shared by every tile of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGeometry {
    pub height: usize,
    pub width: usize,
    pub sample_type: SampleType,
}

/// Grid extents: maxima+1 over observed addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct GridDims {
    pub num_rows: usize,
    pub num_cols: usize,
    pub num_z: usize,
    pub num_channels: usize,
}

/// Integer pixel offset between two adjacent tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub dy: i64,
    pub dx: i64,
}

impl Shift {
    pub const ZERO: Shift = Shift { dy: 0, dx: 0 };

    pub fn new(dy: i64, dx: i64) -> Self {
        Self { dy, dx }
    }
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.dy, self.dx)
    }
}

/// Shifts applied uniformly to the whole grid.
///
/// `vertical` relates a tile to the one below it (dominant `dy`, skew `dx`);
/// `horizontal` relates a tile to the one on its right (dominant `dx`, skew `dy`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftPair {
    pub vertical: Shift,
    pub horizontal: Shift,
}
