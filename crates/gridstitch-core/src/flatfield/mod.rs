//! Per-channel illumination correction.
//!
//! A gain field is fitted per channel from a random sample of its tiles and
//! tiles are divided by it at composition time.

mod estimator;

use std::panic::{catch_unwind, AssertUnwindSafe};

use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, StitchError};
use crate::grid::AcquisitionGrid;
use crate::io::tile_source::{load_tile_f32, TileSource};
use crate::pipeline::config::FlatfieldConfig;
use crate::sample::Sample;
use crate::tile::Tile;

pub use estimator::{FlatfieldEstimator, SmoothedMeanEstimator};

/// Gain field of one channel.
#[derive(Clone, Debug)]
pub struct FlatfieldModel {
    pub channel: String,
    pub gain: Array2<f32>,
}

impl FlatfieldModel {
    /// `clip(raw / gain, T::MIN, T::MAX)`, truncated to `T`.
    pub fn apply<T: Sample>(&self, tile: &Array2<T>) -> Result<Array2<T>> {
        if tile.dim() != self.gain.dim() {
            return Err(StitchError::InvalidGeometry(format!(
                "tile is {:?} but the {} flatfield is {:?}",
                tile.dim(),
                self.channel,
                self.gain.dim()
            )));
        }
        Ok(Zip::from(tile)
            .and(&self.gain)
            .map_collect(|&raw, &gain| T::from_f32_clipped(raw.as_() / gain)))
    }
}

/// One model per channel, indexed like the grid's channel list.
#[derive(Clone, Debug, Default)]
pub struct FlatfieldSet {
    models: Vec<FlatfieldModel>,
}

impl FlatfieldSet {
    pub fn new(models: Vec<FlatfieldModel>) -> Self {
        Self { models }
    }

    pub fn get(&self, channel: usize) -> Option<&FlatfieldModel> {
        self.models.get(channel)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Up to `count` tiles of `channel`, drawn uniformly without replacement
/// across all z-planes.
pub fn sample_channel_tiles<'a, R: rand::Rng + ?Sized>(
    grid: &'a AcquisitionGrid,
    channel: usize,
    count: usize,
    rng: &mut R,
) -> Vec<&'a Tile> {
    let tiles: Vec<&Tile> = grid.tiles_in_channel(channel).collect();
    tiles.choose_multiple(rng, count).copied().collect()
}

/// Fit one flatfield per channel. `on_channel(done, total)` fires after each;
/// a panic inside it is logged and otherwise ignored.
pub fn fit_flatfields<T: Sample>(
    grid: &AcquisitionGrid,
    source: &dyn TileSource,
    estimator: &dyn FlatfieldEstimator,
    config: &FlatfieldConfig,
    mut on_channel: impl FnMut(usize, usize),
) -> Result<FlatfieldSet> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let geometry = grid.geometry();
    let channels = grid.channel_names();

    let mut models = Vec::with_capacity(channels.len());
    for (index, name) in channels.iter().enumerate() {
        let sample = sample_channel_tiles(grid, index, config.sample_count, &mut rng);
        let stack = sample
            .par_iter()
            .map(|tile| load_tile_f32::<T>(source, tile, &geometry))
            .collect::<Result<Vec<_>>>()?;

        let gain = estimator.fit(&stack)?;
        info!(channel = %name, samples = stack.len(), "Fitted flatfield");
        models.push(FlatfieldModel {
            channel: name.clone(),
            gain,
        });
        let (done, total) = (index + 1, channels.len());
        if catch_unwind(AssertUnwindSafe(|| on_channel(done, total))).is_err() {
            warn!(done, total, "Progress callback panicked");
        }
    }

    Ok(FlatfieldSet::new(models))
}
