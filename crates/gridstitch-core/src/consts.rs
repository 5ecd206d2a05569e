/// File extensions accepted as tile rasters.
pub const TILE_EXTENSIONS: [&str; 2] = ["bmp", "tiff"];

/// Substring marking focus-calibration captures, which are not grid tiles.
pub const FOCUS_CAMERA_MARKER: &str = "focus_camera";

/// Name of the subdirectory holding the tiles of the first time point.
pub const IMAGE_SUBDIR: &str = "0";

/// Stage coordinate table inside the image directory.
pub const COORDINATES_FILE: &str = "coordinates.csv";

/// Acquisition parameter document in the input folder.
pub const ACQUISITION_PARAMETERS_FILE: &str = "acquisition parameters.json";

/// Illumination mode document in the input folder.
pub const CONFIGURATIONS_FILE: &str = "configurations.xml";

/// Output subdirectory created inside the input folder.
pub const OUTPUT_SUBDIR: &str = "stitched";

/// Maximum number of tiles per channel handed to the flatfield estimator.
pub const DEFAULT_FLATFIELD_SAMPLE_COUNT: usize = 32;

/// Gaussian sigma, as a fraction of the shorter tile side, used by the
/// built-in flatfield estimator.
pub const DEFAULT_FLATFIELD_SMOOTHING: f32 = 0.05;

/// Upsampling factor for registration refinement; 10 gives ~0.1 px accuracy.
pub const DEFAULT_REGISTRATION_UPSAMPLE: usize = 10;

/// Registration ROIs lose `dimension / MARGIN_DIVISOR` pixels at both ends of
/// the axis orthogonal to the overlap.
pub const DEFAULT_MARGIN_DIVISOR: usize = 10;

/// Search window (in pixels) around the coarse peak for upsampled DFT refinement.
pub const REGISTRATION_SEARCH_WINDOW: f64 = 1.5;

/// Canvas estimate (in bytes) above which `MemoryStrategy::Auto` backs the
/// canvas with a memory-mapped temporary file. Default: 8 GiB.
pub const LOW_MEMORY_THRESHOLD_BYTES: u64 = 8 * 1_073_741_824;

/// Volumes larger than this are written as BigTIFF.
pub const CLASSIC_TIFF_LIMIT_BYTES: u64 = 4 * 1_073_741_824 - 1;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;
