#[allow(dead_code)]
mod common;

use gridstitch_core::canvas::{plan_canvas, Canvas, CanvasShape, MemoryStrategy};
use gridstitch_core::compose::{compose, tile_placement, Crop};
use gridstitch_core::error::StitchError;
use gridstitch_core::grid::{AcquisitionGrid, AxisOrientation};
use gridstitch_core::io::MemoryTileSource;
use gridstitch_core::sample::SampleType;
use gridstitch_core::tile::{GridDims, Shift, ShiftPair};
use ndarray::s;

fn dims(rows: usize, cols: usize) -> GridDims {
    GridDims {
        num_rows: rows,
        num_cols: cols,
        num_z: 1,
        num_channels: 1,
    }
}

/// 2x2 grid of constant 100x100 tiles; tile `(i, j)` holds `1000 * (2i + j + 1)`.
fn constant_grid() -> (AcquisitionGrid, MemoryTileSource) {
    let names = [
        "A1_0_0_0_BF.tiff",
        "A1_0_1_0_BF.tiff",
        "A1_1_0_0_BF.tiff",
        "A1_1_1_0_BF.tiff",
    ];
    let grid = common::grid_from_names(&names, common::geometry(100, 100));
    let mut source = MemoryTileSource::new();
    for t in grid.tiles() {
        let value = 1000 * (2 * t.address.row + t.address.col + 1) as u16;
        source.insert(
            t.address,
            common::u16_image(&common::constant_tile(100, 100, value)),
        );
    }
    (grid, source)
}

fn noop(_done: usize, _total: usize) {}

#[test]
fn test_zero_shift_plan_is_tile_multiple() {
    let plan = plan_canvas(dims(2, 2), common::geometry(100, 100), &ShiftPair::default()).unwrap();
    assert_eq!(plan.shape.tczyx(), [1, 1, 1, 200, 200]);
    assert_eq!(plan.sample_type, SampleType::U16);
    assert_eq!(plan.full_size_bytes(), 200 * 200 * 2);
    assert_eq!(plan.memory_estimate_bytes, plan.full_size_bytes() / 2);
}

#[test]
fn test_plan_with_skew() {
    let shifts = ShiftPair {
        vertical: Shift::new(-10, 3),
        horizontal: Shift::new(-2, -12),
    };
    let geometry = common::geometry(50, 60);
    let plan = plan_canvas(dims(3, 4), geometry, &shifts).unwrap();
    // width = 60 + 3 * 48 + |2 * 3|, height = 50 + 2 * 40 + |3 * -2|
    assert_eq!((plan.shape.height, plan.shape.width), (136, 210));
}

#[test]
fn test_plan_grows_with_grid() {
    let shifts = ShiftPair {
        vertical: Shift::new(-20, 1),
        horizontal: Shift::new(1, -20),
    };
    let geometry = common::geometry(100, 100);
    let mut previous = (0, 0);
    for n in 1..6 {
        let plan = plan_canvas(dims(n, n), geometry, &shifts).unwrap();
        let size = (plan.shape.height, plan.shape.width);
        assert!(size.0 > previous.0 && size.1 > previous.1);
        previous = size;
    }
}

#[test]
fn test_plan_rejects_degenerate_pitch() {
    let shifts = ShiftPair {
        vertical: Shift::ZERO,
        horizontal: Shift::new(0, -100),
    };
    let err = plan_canvas(dims(2, 2), common::geometry(100, 100), &shifts).unwrap_err();
    assert!(matches!(err, StitchError::InvalidGeometry(_)));
    assert!(plan_canvas(dims(0, 2), common::geometry(100, 100), &ShiftPair::default()).is_err());
}

#[test]
fn test_zero_shift_placements() {
    let d = dims(2, 2);
    let g = common::geometry(100, 100);
    let shifts = ShiftPair::default();
    let origin = tile_placement(0, 0, &d, &AxisOrientation::default(), &shifts, &g).unwrap();
    assert_eq!((origin.y, origin.x, origin.height, origin.width), (0, 0, 100, 100));
    let last = tile_placement(1, 1, &d, &AxisOrientation::default(), &shifts, &g).unwrap();
    assert_eq!((last.y, last.x, last.height, last.width), (100, 100, 100, 100));
}

#[test]
fn test_reversed_rows_swap_blocks() {
    let d = dims(2, 1);
    let g = common::geometry(100, 100);
    let orientation = AxisOrientation {
        rows_reversed: true,
        ..Default::default()
    };
    let first = tile_placement(0, 0, &d, &orientation, &ShiftPair::default(), &g).unwrap();
    let second = tile_placement(1, 0, &d, &orientation, &ShiftPair::default(), &g).unwrap();
    assert_eq!((first.row, first.y), (1, 100));
    assert_eq!((second.row, second.y), (0, 0));
}

#[test]
fn test_interior_edges_split_overlap() {
    let d = dims(3, 3);
    let g = common::geometry(100, 100);
    let shifts = ShiftPair {
        vertical: Shift::new(-20, 0),
        horizontal: Shift::new(0, -10),
    };
    let corner = tile_placement(0, 0, &d, &AxisOrientation::default(), &shifts, &g).unwrap();
    assert_eq!(
        corner.crop,
        Crop {
            top: 0,
            bottom: 10,
            left: 0,
            right: 5,
        }
    );
    let centre = tile_placement(1, 1, &d, &AxisOrientation::default(), &shifts, &g).unwrap();
    assert_eq!(
        centre.crop,
        Crop {
            top: 10,
            bottom: 10,
            left: 5,
            right: 5,
        }
    );
    assert_eq!((centre.y, centre.x), (90, 95));
    assert_eq!((centre.height, centre.width), (80, 90));

    // Cropped tiles tile the canvas without gaps.
    let right = tile_placement(1, 2, &d, &AxisOrientation::default(), &shifts, &g).unwrap();
    assert_eq!(centre.x + centre.width, right.x);
}

#[test]
fn test_out_of_grid_placement_is_rejected() {
    let err = tile_placement(
        2,
        0,
        &dims(2, 2),
        &AxisOrientation::default(),
        &ShiftPair::default(),
        &common::geometry(10, 10),
    )
    .unwrap_err();
    assert!(matches!(err, StitchError::InvalidGeometry(_)));
}

#[test]
fn test_compose_writes_each_tile_block() {
    let (grid, source) = constant_grid();
    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::allocate(&plan, MemoryStrategy::InMemory, None).unwrap();
    compose(
        &grid,
        &source,
        &shifts,
        &AxisOrientation::default(),
        None,
        &mut canvas,
        &noop,
    )
    .unwrap();

    let plane = canvas.plane(0, 0).unwrap();
    assert!(plane.slice(s![0..100, 0..100]).iter().all(|&v| v == 1000));
    assert!(plane.slice(s![0..100, 100..200]).iter().all(|&v| v == 2000));
    assert!(plane.slice(s![100..200, 0..100]).iter().all(|&v| v == 3000));
    assert!(plane.slice(s![100..200, 100..200]).iter().all(|&v| v == 4000));
}

#[test]
fn test_compose_reversed_rows() {
    let (grid, source) = constant_grid();
    let orientation = AxisOrientation {
        rows_reversed: true,
        ..Default::default()
    };
    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::allocate(&plan, MemoryStrategy::InMemory, None).unwrap();
    compose(&grid, &source, &shifts, &orientation, None, &mut canvas, &noop).unwrap();

    let plane = canvas.plane(0, 0).unwrap();
    assert_eq!(plane[[150, 50]], 1000);
    assert_eq!(plane[[50, 50]], 3000);
    assert_eq!(plane[[50, 150]], 4000);
}

#[test]
fn test_compose_is_idempotent() {
    let (grid, source) = constant_grid();
    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::in_memory(plan.shape);
    let orientation = AxisOrientation::default();

    compose(&grid, &source, &shifts, &orientation, None, &mut canvas, &noop).unwrap();
    let once = canvas.as_slice().to_vec();
    compose(&grid, &source, &shifts, &orientation, None, &mut canvas, &noop).unwrap();
    assert_eq!(canvas.as_slice(), once.as_slice());
}

#[test]
fn test_memory_mapped_canvas_matches_heap() {
    let (grid, source) = constant_grid();
    let shifts = ShiftPair {
        vertical: Shift::new(-10, 2),
        horizontal: Shift::new(-3, -8),
    };
    let orientation = AxisOrientation::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let spill = tempfile::TempDir::new().unwrap();

    let mut heap = Canvas::<u16>::allocate(&plan, MemoryStrategy::InMemory, None).unwrap();
    let mut mapped =
        Canvas::<u16>::allocate(&plan, MemoryStrategy::MemoryMapped, Some(spill.path())).unwrap();
    assert!(!heap.is_memory_mapped());
    assert!(mapped.is_memory_mapped());

    compose(&grid, &source, &shifts, &orientation, None, &mut heap, &noop).unwrap();
    compose(&grid, &source, &shifts, &orientation, None, &mut mapped, &noop).unwrap();
    assert_eq!(heap.as_slice(), mapped.as_slice());
    assert_eq!(mapped.view().unwrap().dim(), (1, 1, 1, plan.shape.height, plan.shape.width));
}

#[test]
fn test_progress_reaches_tile_count() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let (grid, source) = constant_grid();
    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::in_memory(plan.shape);
    let calls = AtomicUsize::new(0);
    let on_tile = |_done: usize, total: usize| {
        assert_eq!(total, 4);
        calls.fetch_add(1, Ordering::Relaxed);
    };
    compose(
        &grid,
        &source,
        &shifts,
        &AxisOrientation::default(),
        None,
        &mut canvas,
        &on_tile,
    )
    .unwrap();
    assert_eq!(calls.load(Ordering::Relaxed), 4);
}

#[test]
fn test_compose_rejects_mixed_bit_depth() {
    let names = ["A1_0_0_0_BF.tiff", "A1_0_1_0_BF.tiff"];
    let grid = common::grid_from_names(&names, common::geometry(8, 8));
    let mut source = MemoryTileSource::new();
    for t in grid.tiles() {
        let image = if t.address.col == 0 {
            common::u16_image(&common::constant_tile(8, 8, 100))
        } else {
            common::u8_image(&ndarray::Array2::from_elem((8, 8), 100u8))
        };
        source.insert(t.address, image);
    }

    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::in_memory(plan.shape);
    let err = compose(
        &grid,
        &source,
        &shifts,
        &AxisOrientation::default(),
        None,
        &mut canvas,
        &noop,
    )
    .unwrap_err();

    assert_eq!(err.kind(), gridstitch_core::error::ErrorKind::Data);
    match err {
        StitchError::SampleTypeMismatch {
            path,
            found,
            expected,
        } => {
            assert!(path.ends_with("A1_0_1_0_BF.tiff"));
            assert_eq!(found, SampleType::U8);
            assert_eq!(expected, SampleType::U16);
        }
        other => panic!("expected SampleTypeMismatch, got {other:?}"),
    }
}

#[test]
fn test_panicking_progress_callback_does_not_abort_compose() {
    let (grid, source) = constant_grid();
    let shifts = ShiftPair::default();
    let plan = plan_canvas(grid.dims(), grid.geometry(), &shifts).unwrap();
    let mut canvas = Canvas::<u16>::in_memory(plan.shape);
    let on_tile = |_done: usize, _total: usize| panic!("progress sink failed");
    compose(
        &grid,
        &source,
        &shifts,
        &AxisOrientation::default(),
        None,
        &mut canvas,
        &on_tile,
    )
    .unwrap();
    assert_eq!(canvas.plane(0, 0).unwrap()[[150, 150]], 4000);
}

#[test]
fn test_canvas_type_must_match_plan() {
    let plan = plan_canvas(dims(1, 1), common::geometry(4, 4), &ShiftPair::default()).unwrap();
    let err = Canvas::<u8>::allocate(&plan, MemoryStrategy::Auto, None).unwrap_err();
    assert!(matches!(err, StitchError::InvalidGeometry(_)));
}

#[test]
fn test_auto_strategy_stays_in_memory_for_small_canvases() {
    let plan = plan_canvas(dims(2, 2), common::geometry(10, 10), &ShiftPair::default()).unwrap();
    assert!(!MemoryStrategy::Auto.use_memory_map(&plan));
    assert!(MemoryStrategy::MemoryMapped.use_memory_map(&plan));
    let shape = CanvasShape {
        channels: 2,
        z: 3,
        height: 4,
        width: 5,
    };
    assert_eq!(shape.len(), 120);
    assert_eq!(shape.to_string(), "(1, 2, 3, 4, 5)");
}
