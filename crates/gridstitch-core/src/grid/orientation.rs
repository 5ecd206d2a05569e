use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};

/// One row of `coordinates.csv`. Extra columns are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CoordinateRecord {
    pub i: usize,
    pub j: usize,
    pub k: usize,
    #[serde(rename = "x (mm)")]
    pub x_mm: f64,
    #[serde(rename = "y (mm)")]
    pub y_mm: f64,
    #[serde(rename = "z (um)")]
    pub z_um: f64,
}

pub fn read_coordinates(path: &Path) -> Result<Vec<CoordinateRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StitchError::config(path, format!("cannot read coordinates: {e}")))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(line, record)| {
            record.map_err(|e| {
                StitchError::config(path, format!("bad coordinate record {}: {e}", line + 1))
            })
        })
        .collect()
}

/// Whether increasing grid index runs against the stage coordinate on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisOrientation {
    /// `i` against `y (mm)`.
    pub rows_reversed: bool,
    /// `j` against `x (mm)`.
    pub cols_reversed: bool,
    /// `k` against `z (um)`.
    pub z_reversed: bool,
}

impl AxisOrientation {
    pub fn from_coordinates(records: &[CoordinateRecord]) -> Self {
        Self {
            rows_reversed: is_reversed(records, |r| r.i, |r| r.y_mm),
            cols_reversed: is_reversed(records, |r| r.j, |r| r.x_mm),
            z_reversed: is_reversed(records, |r| r.k, |r| r.z_um),
        }
    }
}

/// An axis is reversed unless the coordinate is non-decreasing once the
/// records are (stably) ordered by grid index.
fn is_reversed(
    records: &[CoordinateRecord],
    index: impl Fn(&CoordinateRecord) -> usize,
    coordinate: impl Fn(&CoordinateRecord) -> f64,
) -> bool {
    let mut sorted: Vec<&CoordinateRecord> = records.iter().collect();
    sorted.sort_by_key(|r| index(*r));
    !sorted
        .windows(2)
        .all(|pair| coordinate(pair[0]) <= coordinate(pair[1]))
}
