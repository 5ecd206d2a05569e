//! Tile catalogue addressed by `(channel, z, row, col)`.

pub mod filename;
mod indexer;
pub mod orientation;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, StitchError};
use crate::tile::{GridAddress, GridDims, Tile, TileGeometry};

pub use filename::{parse_tile_name, FilenameLayout, ParsedName};
pub use indexer::{index_tiles, list_tile_files};
pub use orientation::{read_coordinates, AxisOrientation, CoordinateRecord};

/// Every tile of an acquisition, at most one per address.
#[derive(Clone, Debug)]
pub struct AcquisitionGrid {
    image_dir: PathBuf,
    layout: FilenameLayout,
    geometry: TileGeometry,
    channel_names: Vec<String>,
    tiles: BTreeMap<GridAddress, Tile>,
    dims: GridDims,
}

impl AcquisitionGrid {
    /// Build the grid from `(filename, parsed name)` pairs.
    ///
    /// Channel indices follow the sorted channel names. Two files resolving to
    /// the same address are rejected.
    pub fn new(
        image_dir: &Path,
        layout: FilenameLayout,
        geometry: TileGeometry,
        entries: Vec<(String, ParsedName)>,
    ) -> Result<Self> {
        let mut channel_names: Vec<String> =
            entries.iter().map(|(_, p)| p.channel.clone()).collect();
        channel_names.sort();
        channel_names.dedup();

        let mut tiles = BTreeMap::new();
        let mut dims = GridDims {
            num_channels: channel_names.len(),
            ..Default::default()
        };

        for (filename, parsed) in entries {
            let channel = channel_names
                .binary_search(&parsed.channel)
                .unwrap_or_default();
            let address = GridAddress {
                channel,
                z: parsed.k,
                row: parsed.i,
                col: parsed.j,
            };
            dims.num_rows = dims.num_rows.max(parsed.i + 1);
            dims.num_cols = dims.num_cols.max(parsed.j + 1);
            dims.num_z = dims.num_z.max(parsed.k + 1);

            let tile = Tile {
                address,
                path: image_dir.join(&filename),
                channel_name: parsed.channel,
                well: parsed.well,
                filename,
            };
            match tiles.entry(address) {
                Entry::Vacant(slot) => {
                    slot.insert(tile);
                }
                Entry::Occupied(existing) => {
                    return Err(StitchError::DuplicateTile {
                        channel: tile.channel_name,
                        z: address.z,
                        row: address.row,
                        col: address.col,
                        first: existing.get().filename.clone(),
                        second: tile.filename,
                    });
                }
            }
        }

        Ok(Self {
            image_dir: image_dir.to_path_buf(),
            layout,
            geometry,
            channel_names,
            tiles,
            dims,
        })
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn layout(&self) -> FilenameLayout {
        self.layout
    }

    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, address: &GridAddress) -> Option<&Tile> {
        self.tiles.get(address)
    }

    /// All tiles in channel, z, row, col order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Tiles of one `(channel, z)` plane in row-major grid order.
    pub fn tiles_in_plane(&self, channel: usize, z: usize) -> impl Iterator<Item = &Tile> {
        let start = GridAddress {
            channel,
            z,
            row: 0,
            col: 0,
        };
        let end = GridAddress {
            channel,
            z,
            row: usize::MAX,
            col: usize::MAX,
        };
        self.tiles.range(start..=end).map(|(_, tile)| tile)
    }

    /// Tiles of one channel across every z-plane.
    pub fn tiles_in_channel(&self, channel: usize) -> impl Iterator<Item = &Tile> {
        self.tiles
            .values()
            .filter(move |tile| tile.address.channel == channel)
    }
}
