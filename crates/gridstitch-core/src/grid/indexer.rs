use std::path::Path;

use tracing::{debug, info};

use crate::consts::{FOCUS_CAMERA_MARKER, TILE_EXTENSIONS};
use crate::error::{Result, StitchError};
use crate::sample::SampleType;
use crate::tile::TileGeometry;

use super::filename::{file_stem, parse_tile_name, FilenameLayout};
use super::AcquisitionGrid;

/// Sorted names of the tile rasters in `image_dir`, focus-calibration
/// captures excluded.
pub fn list_tile_files(image_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(image_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let is_tile = TILE_EXTENSIONS
            .iter()
            .any(|ext| name.ends_with(&format!(".{ext}")));
        if is_tile && !name.contains(FOCUS_CAMERA_MARKER) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Scan a tile directory into an [`AcquisitionGrid`].
///
/// The filename layout, raster size and sample type come from the first
/// sorted tile and are assumed for the rest.
pub fn index_tiles(image_dir: &Path) -> Result<AcquisitionGrid> {
    let files = list_tile_files(image_dir)?;
    let Some(first) = files.first() else {
        return Err(StitchError::EmptyTileSet(image_dir.to_path_buf()));
    };

    let layout = FilenameLayout::detect(file_stem(first));
    debug!(%layout, first = %first, "Detected tile filename layout");

    let geometry = read_geometry(&image_dir.join(first))?;

    let entries = files
        .into_iter()
        .map(|name| {
            let parsed = parse_tile_name(file_stem(&name), layout)?;
            Ok((name, parsed))
        })
        .collect::<Result<Vec<_>>>()?;

    let grid = AcquisitionGrid::new(image_dir, layout, geometry, entries)?;
    let dims = grid.dims();
    info!(
        tiles = grid.len(),
        rows = dims.num_rows,
        cols = dims.num_cols,
        z_planes = dims.num_z,
        channels = dims.num_channels,
        width = geometry.width,
        height = geometry.height,
        dtype = %geometry.sample_type,
        "Indexed tile grid"
    );
    Ok(grid)
}

fn read_geometry(path: &Path) -> Result<TileGeometry> {
    let image = image::open(path)?;
    let color = image.color();
    let sample_type =
        SampleType::from_color(color).ok_or_else(|| StitchError::UnsupportedSampleType {
            path: path.to_path_buf(),
            color,
        })?;
    Ok(TileGeometry {
        height: image.height() as usize,
        width: image.width() as usize,
        sample_type,
    })
}
