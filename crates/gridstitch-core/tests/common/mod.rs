use std::path::{Path, PathBuf};

use gridstitch_core::grid::{parse_tile_name, AcquisitionGrid, FilenameLayout};
use gridstitch_core::sample::SampleType;
use gridstitch_core::tile::TileGeometry;
use image::{DynamicImage, ImageBuffer, Luma};
use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// Optics giving exactly 0.1 µm per pixel: 10x objective, matching tube lens,
/// 1 µm sensor pixels.
pub const PIXEL_SIZE_UM: f64 = 0.1;

/// Stage distance in millimetres for `pixels` at [`PIXEL_SIZE_UM`].
pub fn pixels_to_mm(pixels: usize) -> f64 {
    pixels as f64 * PIXEL_SIZE_UM / 1000.0
}

pub fn parameters_json(dx_mm: f64, dy_mm: f64) -> String {
    format!(
        r#"{{
  "dx(mm)": {dx_mm},
  "dy(mm)": {dy_mm},
  "dz(um)": 1.5,
  "Nx": 2,
  "Ny": 2,
  "Nz": 1,
  "tube_lens_mm": 180.0,
  "sensor_pixel_size_um": 1.0,
  "objective": {{
    "magnification": 10.0,
    "NA": 0.3,
    "tube_lens_f_mm": 180.0
  }}
}}"#
    )
}

pub const CONFIGURATIONS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<modes>
  <mode ID="1" Name="BF LED matrix full" ExposureTime="12" AnalogGain="0"
        IlluminationSource="0" IlluminationIntensity="5" Selected="1"/>
  <mode ID="5" Name="Fluorescence 405 nm Ex" ExposureTime="100" Selected="0"/>
</modes>
"#;

/// Geometry used by most synthetic grids.
pub fn geometry(height: usize, width: usize) -> TileGeometry {
    TileGeometry {
        height,
        width,
        sample_type: SampleType::U16,
    }
}

/// Build a grid straight from filenames, without touching the disk.
pub fn grid_from_names(names: &[&str], geometry: TileGeometry) -> AcquisitionGrid {
    let layout = FilenameLayout::detect(names[0].trim_end_matches(".tiff"));
    let entries = names
        .iter()
        .map(|name| {
            let parsed = parse_tile_name(name.trim_end_matches(".tiff"), layout).unwrap();
            (name.to_string(), parsed)
        })
        .collect();
    AcquisitionGrid::new(Path::new("/tiles"), layout, geometry, entries).unwrap()
}

/// Uniform noise in `[0, 1)`.
pub fn noise(height: usize, width: usize, seed: u64) -> Array2<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((height, width), |_| rng.random::<f32>())
}

/// Noise scaled into the 16-bit range, clear of both ends.
pub fn noise_scene(height: usize, width: usize, seed: u64) -> Array2<u16> {
    noise(height, width, seed).mapv(|v| 1000 + (v * 50_000.0) as u16)
}

pub fn crop(scene: &Array2<u16>, y: usize, x: usize, height: usize, width: usize) -> Array2<u16> {
    scene.slice(s![y..y + height, x..x + width]).to_owned()
}

pub fn u16_image(data: &Array2<u16>) -> DynamicImage {
    let (h, w) = data.dim();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(w as u32, h as u32, data.iter().copied().collect()).unwrap();
    DynamicImage::ImageLuma16(buffer)
}

pub fn u8_image(data: &Array2<u8>) -> DynamicImage {
    let (h, w) = data.dim();
    let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
        ImageBuffer::from_raw(w as u32, h as u32, data.iter().copied().collect()).unwrap();
    DynamicImage::ImageLuma8(buffer)
}

pub fn constant_tile(height: usize, width: usize, value: u16) -> Array2<u16> {
    Array2::from_elem((height, width), value)
}

/// An acquisition folder on disk.
pub struct Acquisition {
    pub dir: TempDir,
}

impl Acquisition {
    /// Empty acquisition with parameters for the given stage spacing and the
    /// default configurations document.
    pub fn new(spacing_y_px: usize, spacing_x_px: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let acquisition = Self { dir };
        std::fs::create_dir_all(acquisition.image_dir()).unwrap();
        std::fs::write(
            acquisition.input().join("acquisition parameters.json"),
            parameters_json(pixels_to_mm(spacing_x_px), pixels_to_mm(spacing_y_px)),
        )
        .unwrap();
        std::fs::write(
            acquisition.input().join("configurations.xml"),
            CONFIGURATIONS_XML,
        )
        .unwrap();
        acquisition
    }

    pub fn input(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn image_dir(&self) -> PathBuf {
        self.dir.path().join("0")
    }

    pub fn write_tile(&self, name: &str, data: &Array2<u16>) {
        u16_image(data).save(self.image_dir().join(name)).unwrap();
    }

    pub fn write_tile_u8(&self, name: &str, data: &Array2<u8>) {
        u8_image(data).save(self.image_dir().join(name)).unwrap();
    }

    /// `coordinates.csv` for a `rows x cols` grid with one z-plane. Reversed
    /// axes get decreasing stage coordinates.
    pub fn write_coordinates(
        &self,
        rows: usize,
        cols: usize,
        rows_reversed: bool,
        cols_reversed: bool,
    ) {
        let mut csv = String::from("i,j,k,x (mm),y (mm),z (um),time\n");
        for i in 0..rows {
            for j in 0..cols {
                let y = if rows_reversed { rows - 1 - i } else { i } as f64;
                let x = if cols_reversed { cols - 1 - j } else { j } as f64;
                csv.push_str(&format!("{i},{j},0,{:.3},{:.3},4500.0,0\n", x * 0.5, y * 0.5));
            }
        }
        std::fs::write(self.image_dir().join("coordinates.csv"), csv).unwrap();
    }
}
