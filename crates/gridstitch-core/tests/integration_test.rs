#[allow(dead_code)]
mod common;

use std::fs::File;
use std::sync::{Arc, Mutex};

use gridstitch_core::align::{Degradation, ShiftSource};
use gridstitch_core::error::{ErrorKind, StitchError};
use gridstitch_core::io::raw::RawHeader;
use gridstitch_core::io::{DiskTileSource, ExportFormat, RawExporter};
use gridstitch_core::pipeline::config::StitchConfig;
use gridstitch_core::pipeline::{
    prepare_stitch, run_stitch, run_stitch_reported, NoOpReporter, ProgressReporter,
    StitchStage,
};
use gridstitch_core::tile::Shift;
use tiff::decoder::{Decoder, DecodingResult};

/// 2x2 acquisition of constant 100x100 tiles with no stage overlap; tile
/// `(i, j)` holds `1000 * (2i + j + 1)`.
fn constant_acquisition(rows_reversed: bool) -> common::Acquisition {
    let acq = common::Acquisition::new(100, 100);
    for i in 0..2 {
        for j in 0..2 {
            let value = 1000 * (2 * i + j + 1) as u16;
            acq.write_tile(
                &format!("A1_{i}_{j}_0_BF_LED_matrix_full.tiff"),
                &common::constant_tile(100, 100, value),
            );
        }
    }
    acq.write_coordinates(2, 2, rows_reversed, false);
    acq
}

fn read_u16_page(path: &std::path::Path) -> Vec<u16> {
    let mut decoder = Decoder::new(File::open(path).unwrap()).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (200, 200));
    match decoder.read_image().unwrap() {
        DecodingResult::U16(data) => data,
        other => panic!("expected 16-bit samples, got {:?}", std::mem::discriminant(&other)),
    }
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<StitchStage>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: StitchStage, _total_items: Option<usize>) {
        self.stages.lock().unwrap().push(stage);
    }
}

#[test]
fn test_end_to_end_zero_overlap() {
    let acq = constant_acquisition(false);
    let report = run_stitch(&StitchConfig::new(acq.input())).unwrap();

    assert_eq!(report.plan.shape.tczyx(), [1, 1, 1, 200, 200]);
    assert_eq!(report.overlap.shifts().vertical, Shift::ZERO);
    assert_eq!(report.overlap.shifts().horizontal, Shift::ZERO);
    assert_eq!(
        report.overlap.vertical.source,
        ShiftSource::Defaulted(Degradation::ZeroOverlap)
    );
    assert!(!report.memory_mapped);
    assert!(!report.flatfield_applied);

    let dir_name = acq.input().file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(
        report.output,
        acq.input()
            .join("stitched")
            .join(format!("{dir_name}_stitched.ome.tiff"))
    );

    let data = read_u16_page(&report.output);
    assert_eq!(data[50 * 200 + 50], 1000);
    assert_eq!(data[50 * 200 + 150], 2000);
    assert_eq!(data[150 * 200 + 50], 3000);
    assert_eq!(data[150 * 200 + 150], 4000);
}

#[test]
fn test_end_to_end_reversed_rows() {
    let acq = constant_acquisition(true);
    let report = run_stitch(&StitchConfig::new(acq.input())).unwrap();
    assert!(report.orientation.rows_reversed);
    assert!(!report.orientation.cols_reversed);

    let data = read_u16_page(&report.output);
    assert_eq!(data[150 * 200 + 50], 1000);
    assert_eq!(data[50 * 200 + 50], 3000);
}

#[test]
fn test_end_to_end_raw_with_flatfield() {
    let acq = constant_acquisition(false);
    let mut config = StitchConfig::new(acq.input());
    config.format = ExportFormat::Raw;
    config.output_name = Some("plate".into());
    config.flatfield.enabled = true;
    config.flatfield.seed = Some(5);

    let reporter = Arc::new(RecordingReporter::default());
    let report = run_stitch_reported(&config, reporter.clone()).unwrap();
    assert!(report.flatfield_applied);
    assert_eq!(report.output.file_name().unwrap(), "plate.raw");
    assert_eq!(
        *reporter.stages.lock().unwrap(),
        vec![
            StitchStage::Indexing,
            StitchStage::Registration,
            StitchStage::Flatfield,
            StitchStage::Compositing,
            StitchStage::Exporting,
        ]
    );

    let sidecar = RawExporter::sidecar_path(&report.output);
    let header: RawHeader =
        serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
    assert_eq!(header.shape, [1, 1, 1, 200, 200]);
    assert_eq!(header.metadata.channel_names, vec!["BF_LED_matrix_full"]);
    assert_eq!(header.metadata.physical_size_z_um, Some(1.5));
    let xy = header.metadata.physical_size_xy_um.unwrap();
    assert!((xy - common::PIXEL_SIZE_UM).abs() < 1e-12);
    assert_eq!(
        std::fs::metadata(&report.output).unwrap().len(),
        200 * 200 * 2
    );
}

#[test]
fn test_prepare_reads_modes_and_plan() {
    let acq = constant_acquisition(false);
    let prepared = prepare_stitch(
        &StitchConfig::new(acq.input()),
        &DiskTileSource,
        &NoOpReporter,
    )
    .unwrap();
    assert_eq!(prepared.modes.len(), 1);
    assert_eq!(prepared.modes[0].name.as_deref(), Some("BF LED matrix full"));
    assert_eq!(prepared.grid.len(), 4);
    assert_eq!(prepared.plan.shape.tczyx(), [1, 1, 1, 200, 200]);
    assert!(!acq.input().join("stitched").exists());
}

#[test]
fn test_missing_reference_fails_before_output() {
    let acq = constant_acquisition(false);
    std::fs::remove_file(acq.image_dir().join("A1_0_0_0_BF_LED_matrix_full.tiff")).unwrap();

    let err = run_stitch(&StitchConfig::new(acq.input())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(matches!(
        err,
        StitchError::MissingReferenceTile { row: 0, col: 0, z: 0, .. }
    ));
    assert_eq!(
        err.to_string(),
        "No input file found for c:BF_LED_matrix_full k:0 j:0 i:0"
    );
    assert!(!acq.input().join("stitched").exists());
}

#[test]
fn test_mixed_bit_depth_tiles_fail_loudly() {
    let acq = constant_acquisition(false);
    // The first tile fixes the grid at 16 bits.
    acq.write_tile_u8(
        "A1_1_1_0_BF_LED_matrix_full.tiff",
        &ndarray::Array2::from_elem((100, 100), 100u8),
    );

    let err = run_stitch(&StitchConfig::new(acq.input())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(err.to_string().contains("A1_1_1_0_BF_LED_matrix_full.tiff"));
    assert!(matches!(err, StitchError::SampleTypeMismatch { .. }));
}

#[test]
fn test_missing_image_directory_is_config_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = run_stitch(&StitchConfig::new(dir.path())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_missing_parameters_is_config_error() {
    let acq = constant_acquisition(false);
    std::fs::remove_file(acq.input().join("acquisition parameters.json")).unwrap();
    let err = run_stitch(&StitchConfig::new(acq.input())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_malformed_parameters_is_config_error() {
    let acq = constant_acquisition(false);
    std::fs::write(acq.input().join("acquisition parameters.json"), "{ \"dx(mm)\": ").unwrap();
    let err = run_stitch(&StitchConfig::new(acq.input())).unwrap_err();
    assert!(matches!(err, StitchError::Json { .. }));
}
