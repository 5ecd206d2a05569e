use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StitchError};

/// Stage and optics parameters from `acquisition parameters.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionParameters {
    /// Physical distance between horizontally adjacent captures.
    #[serde(rename = "dx(mm)")]
    pub dx_mm: f64,
    /// Physical distance between vertically adjacent captures.
    #[serde(rename = "dy(mm)")]
    pub dy_mm: f64,
    /// Z step, when the acquisition recorded one.
    #[serde(rename = "dz(um)", default)]
    pub dz_um: Option<f64>,
    /// Focal length of the tube lens actually fitted to the system.
    pub tube_lens_mm: f64,
    pub sensor_pixel_size_um: f64,
    pub objective: Objective,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Objective {
    pub magnification: f64,
    /// Tube lens focal length the objective's magnification is specified for.
    pub tube_lens_f_mm: f64,
}

impl AcquisitionParameters {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StitchError::config(path, format!("cannot read: {e}")))?;
        serde_json::from_str(&text).map_err(|source| StitchError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn optics(&self) -> Optics {
        Optics {
            sensor_pixel_size_um: self.sensor_pixel_size_um,
            tube_lens_mm: self.tube_lens_mm,
            objective_tube_lens_mm: self.objective.tube_lens_f_mm,
            objective_magnification: self.objective.magnification,
        }
    }
}

/// Optical train used to convert stage distances into sensor pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Optics {
    pub sensor_pixel_size_um: f64,
    pub tube_lens_mm: f64,
    pub objective_tube_lens_mm: f64,
    pub objective_magnification: f64,
}

impl Optics {
    /// Magnification with the fitted tube lens rather than the nominal one.
    pub fn actual_magnification(&self) -> f64 {
        let objective_focal_length_mm = self.objective_tube_lens_mm / self.objective_magnification;
        self.tube_lens_mm / objective_focal_length_mm
    }

    /// Size of one sensor pixel projected onto the sample plane.
    pub fn pixel_size_um(&self) -> f64 {
        self.sensor_pixel_size_um / self.actual_magnification()
    }

    /// Stage distance in millimetres expressed in whole pixels.
    pub fn mm_to_pixels(&self, distance_mm: f64) -> i64 {
        (distance_mm * 1000.0 / self.pixel_size_um()).round_ties_even() as i64
    }
}
