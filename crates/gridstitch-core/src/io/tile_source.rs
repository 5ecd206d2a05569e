use std::collections::HashMap;
use std::path::Path;

use image::{ColorType, DynamicImage};
use ndarray::Array2;

use crate::error::{Result, StitchError};
use crate::sample::{Sample, SampleType};
use crate::tile::{GridAddress, Tile, TileGeometry};

/// Where tile rasters come from. Decoding is delegated to the implementor.
pub trait TileSource: Sync {
    fn read(&self, tile: &Tile) -> Result<DynamicImage>;
}

/// Reads tiles from their paths on disk with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskTileSource;

impl TileSource for DiskTileSource {
    fn read(&self, tile: &Tile) -> Result<DynamicImage> {
        Ok(image::open(&tile.path)?)
    }
}

/// Pre-decoded tiles keyed by grid address.
#[derive(Clone, Debug, Default)]
pub struct MemoryTileSource {
    images: HashMap<GridAddress, DynamicImage>,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: GridAddress, image: DynamicImage) {
        self.images.insert(address, image);
    }
}

impl TileSource for MemoryTileSource {
    fn read(&self, tile: &Tile) -> Result<DynamicImage> {
        self.images.get(&tile.address).cloned().ok_or_else(|| {
            StitchError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no image for tile {}", tile.filename),
            ))
        })
    }
}

/// Decode a tile as `T` samples and check it matches the grid geometry.
///
/// A tile whose bit depth differs from the grid's is rejected rather than
/// rescaled.
pub fn load_tile<T: Sample>(
    source: &dyn TileSource,
    tile: &Tile,
    geometry: &TileGeometry,
) -> Result<Array2<T>> {
    let image = source.read(tile)?;
    check_sample_type(&tile.path, image.color(), geometry.sample_type)?;
    if T::TYPE != geometry.sample_type {
        return Err(StitchError::SampleTypeMismatch {
            path: tile.path.clone(),
            found: geometry.sample_type,
            expected: T::TYPE,
        });
    }
    let data = T::from_image(image)?;
    check_shape(&tile.path, &data, geometry)?;
    Ok(data)
}

/// Decode a tile as `f32` intensities in the tile's own sample range.
pub fn load_tile_f32<T: Sample>(
    source: &dyn TileSource,
    tile: &Tile,
    geometry: &TileGeometry,
) -> Result<Array2<f32>> {
    Ok(load_tile::<T>(source, tile, geometry)?.mapv(|v| v.as_()))
}

fn check_sample_type(path: &Path, color: ColorType, expected: SampleType) -> Result<()> {
    let found = SampleType::from_color(color).ok_or_else(|| StitchError::UnsupportedSampleType {
        path: path.to_path_buf(),
        color,
    })?;
    if found != expected {
        return Err(StitchError::SampleTypeMismatch {
            path: path.to_path_buf(),
            found,
            expected,
        });
    }
    Ok(())
}

fn check_shape<T>(path: &Path, data: &Array2<T>, geometry: &TileGeometry) -> Result<()> {
    let (height, width) = data.dim();
    if height != geometry.height || width != geometry.width {
        return Err(StitchError::TileShape {
            path: path.to_path_buf(),
            width,
            height,
            expected_width: geometry.width,
            expected_height: geometry.height,
        });
    }
    Ok(())
}
