#[allow(dead_code)]
mod common;

use approx::assert_abs_diff_eq;
use gridstitch_core::canvas::{plan_canvas, Canvas};
use gridstitch_core::compose::compose;
use gridstitch_core::flatfield::{
    fit_flatfields, sample_channel_tiles, FlatfieldEstimator, FlatfieldModel, FlatfieldSet,
    SmoothedMeanEstimator,
};
use gridstitch_core::grid::{AcquisitionGrid, AxisOrientation};
use gridstitch_core::io::MemoryTileSource;
use gridstitch_core::pipeline::config::FlatfieldConfig;
use gridstitch_core::tile::ShiftPair;
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `rows x cols` grid of one channel whose tiles all carry the same
/// vignetted pattern.
fn vignetted_grid(rows: usize, cols: usize) -> (AcquisitionGrid, MemoryTileSource, Array2<u16>) {
    let names: Vec<String> = (0..rows)
        .flat_map(|i| (0..cols).map(move |j| format!("{i}_{j}_0_BF.tiff")))
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let grid = common::grid_from_names(&refs, common::geometry(16, 16));

    let tile = Array2::from_shape_fn((16, 16), |(y, x)| {
        let dy = y as f32 - 7.5;
        let dx = x as f32 - 7.5;
        (20_000.0 - 50.0 * (dy * dy + dx * dx)) as u16
    });
    let mut source = MemoryTileSource::new();
    for t in grid.tiles() {
        source.insert(t.address, common::u16_image(&tile));
    }
    (grid, source, tile)
}

/// Estimator returning a fixed gain regardless of the stack.
struct FixedGain(Array2<f32>);

impl FlatfieldEstimator for FixedGain {
    fn fit(&self, _stack: &[Array2<f32>]) -> gridstitch_core::error::Result<Array2<f32>> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_apply_divides_and_clips() {
    let model = FlatfieldModel {
        channel: "BF".into(),
        gain: array![[0.5, 2.0], [1.0, 0.0001]],
    };
    let tile: Array2<u16> = array![[40_000, 1001], [7, 60_000]];
    let corrected = model.apply(&tile).unwrap();
    assert_eq!(corrected, array![[65_535, 500], [7, 65_535]]);
}

#[test]
fn test_apply_rejects_shape_mismatch() {
    let model = FlatfieldModel {
        channel: "BF".into(),
        gain: Array2::ones((4, 4)),
    };
    assert!(model.apply(&Array2::<u8>::zeros((4, 5))).is_err());
}

#[test]
fn test_smoothed_mean_has_unit_mean() {
    let stack = vec![
        Array2::from_shape_fn((20, 30), |(y, x)| 100.0 + (y + x) as f32),
        Array2::from_shape_fn((20, 30), |(y, x)| 300.0 + (y * x) as f32 * 0.1),
    ];
    let gain = SmoothedMeanEstimator::default().fit(&stack).unwrap();
    assert_eq!(gain.dim(), (20, 30));
    assert_abs_diff_eq!(gain.mean().unwrap(), 1.0, epsilon = 1e-4);
    assert!(gain.iter().all(|&g| g > 0.0));
}

#[test]
fn test_estimator_rejects_empty_and_ragged_stacks() {
    let estimator = SmoothedMeanEstimator::default();
    assert!(estimator.fit(&[]).is_err());
    assert!(estimator
        .fit(&[Array2::zeros((4, 4)), Array2::zeros((4, 5))])
        .is_err());
}

#[test]
fn test_sampling_is_bounded_and_unique() {
    let (grid, _, _) = vignetted_grid(3, 3);
    let mut rng = StdRng::seed_from_u64(42);

    let few = sample_channel_tiles(&grid, 0, 4, &mut rng);
    assert_eq!(few.len(), 4);
    let mut addresses: Vec<_> = few.iter().map(|t| t.address).collect();
    addresses.sort();
    addresses.dedup();
    assert_eq!(addresses.len(), 4);

    // Fewer tiles than requested: every tile is used once.
    let all = sample_channel_tiles(&grid, 0, 32, &mut rng);
    assert_eq!(all.len(), 9);
}

#[test]
fn test_seeded_sampling_is_reproducible() {
    let (grid, _, _) = vignetted_grid(6, 6);
    let pick = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        sample_channel_tiles(&grid, 0, 5, &mut rng)
            .iter()
            .map(|t| t.address)
            .collect::<Vec<_>>()
    };
    assert_eq!(pick(9), pick(9));
}

#[test]
fn test_fit_flatfields_one_model_per_channel() {
    let (grid, source, _) = vignetted_grid(2, 3);
    let config = FlatfieldConfig {
        enabled: true,
        seed: Some(1),
        ..Default::default()
    };
    let mut progress = Vec::new();
    let set = fit_flatfields::<u16>(
        &grid,
        &source,
        &SmoothedMeanEstimator::default(),
        &config,
        |done, total| progress.push((done, total)),
    )
    .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(0).unwrap().channel, "BF");
    assert_eq!(progress, vec![(1, 1)]);
}

#[test]
fn test_panicking_progress_callback_does_not_abort_fit() {
    let (grid, source, _) = vignetted_grid(2, 2);
    let set = fit_flatfields::<u16>(
        &grid,
        &source,
        &SmoothedMeanEstimator::default(),
        &FlatfieldConfig::default(),
        |_, _| panic!("progress sink failed"),
    )
    .unwrap();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_flatfield_flattens_composited_tiles() {
    let (grid, source, tile) = vignetted_grid(1, 2);
    let gain = tile.mapv(|v| v as f32 / 20_000.0);
    let set = fit_flatfields::<u16>(
        &grid,
        &source,
        &FixedGain(gain),
        &FlatfieldConfig::default(),
        |_, _| {},
    )
    .unwrap();

    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::in_memory(plan.shape);
    compose(
        &grid,
        &source,
        &shifts,
        &AxisOrientation::default(),
        Some(&set),
        &mut canvas,
        &|_, _| {},
    )
    .unwrap();

    assert!(canvas
        .as_slice()
        .iter()
        .all(|&v| (19_990..=20_000).contains(&v)));
}

#[test]
fn test_empty_set() {
    let set = FlatfieldSet::default();
    assert!(set.is_empty());
    assert!(set.get(0).is_none());
}
