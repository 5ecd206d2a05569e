use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::canvas::MemoryStrategy;
use crate::consts::{
    DEFAULT_FLATFIELD_SAMPLE_COUNT, DEFAULT_FLATFIELD_SMOOTHING, DEFAULT_MARGIN_DIVISOR,
    DEFAULT_REGISTRATION_UPSAMPLE,
};
use crate::io::ExportFormat;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Acquisition folder (contains `0/`, the JSON parameters and XML modes).
    pub input: PathBuf,
    /// Output file name inside `<input>/stitched/`. Defaults to the input
    /// folder name; the format's extension is appended when missing.
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub flatfield: FlatfieldConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub memory: MemoryStrategy,
}

impl StitchConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_name: None,
            format: ExportFormat::default(),
            flatfield: FlatfieldConfig::default(),
            registration: RegistrationConfig::default(),
            memory: MemoryStrategy::default(),
        }
    }

    pub fn output_file_name(&self) -> String {
        let base = match &self.output_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self
                .input
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| format!("{n}_stitched"))
                .unwrap_or_else(|| "stitched".to_string()),
        };
        let extension = self.format.extension();
        if base.ends_with(&format!(".{extension}")) {
            base
        } else {
            format!("{base}.{extension}")
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatfieldConfig {
    /// Divide every tile by its channel's flatfield during composition.
    pub enabled: bool,
    /// Maximum tiles per channel fed to the estimator.
    pub sample_count: usize,
    /// Seed for tile sampling; `None` draws from the OS.
    pub seed: Option<u64>,
    /// Smoothing sigma of the built-in estimator, as a fraction of the
    /// shorter tile side.
    pub smoothing: f32,
}

impl Default for FlatfieldConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_count: DEFAULT_FLATFIELD_SAMPLE_COUNT,
            seed: None,
            smoothing: DEFAULT_FLATFIELD_SMOOTHING,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Channel whose tiles are registered; the first channel when unset or unknown.
    pub channel: Option<String>,
    /// Z-plane whose tiles are registered.
    pub z_level: usize,
    /// Sub-pixel refinement factor.
    pub upsample_factor: usize,
    /// ROI margin is `tile dimension / margin_divisor` on the non-overlap axis.
    pub margin_divisor: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            channel: None,
            z_level: 0,
            upsample_factor: DEFAULT_REGISTRATION_UPSAMPLE,
            margin_divisor: DEFAULT_MARGIN_DIVISOR,
        }
    }
}
