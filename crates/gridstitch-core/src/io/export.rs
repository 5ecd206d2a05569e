use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::canvas::Canvas;
use crate::error::{Result, StitchError};
use crate::sample::Sample;

use super::ome_tiff::OmeTiffExporter;
use super::raw::RawExporter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Multi-page OME-TIFF, one page per `(c, z)` plane.
    #[default]
    OmeTiff,
    /// Little-endian raw samples with a JSON sidecar.
    Raw,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::OmeTiff => "ome.tiff",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OmeTiff => write!(f, "OME-TIFF"),
            Self::Raw => write!(f, "Raw"),
        }
    }
}

/// Descriptive metadata written alongside the samples.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    pub name: String,
    /// One name per canvas channel, in channel-axis order.
    pub channel_names: Vec<String>,
    pub physical_size_z_um: Option<f64>,
    pub physical_size_xy_um: Option<f64>,
}

/// Serialises a finished canvas.
pub trait VolumeExporter {
    fn export<T: Sample>(
        &self,
        canvas: &Canvas<T>,
        metadata: &VolumeMetadata,
        path: &Path,
    ) -> Result<()>;
}

pub fn export_volume<T: Sample>(
    format: ExportFormat,
    canvas: &Canvas<T>,
    metadata: &VolumeMetadata,
    path: &Path,
) -> Result<()> {
    match format {
        ExportFormat::OmeTiff => OmeTiffExporter.export(canvas, metadata, path),
        ExportFormat::Raw => RawExporter.export(canvas, metadata, path),
    }
}

/// Write `path` through a temporary file in the same directory, renamed into
/// place only once `write` has succeeded and the buffer is flushed.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(|e| StitchError::export(path, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush().map_err(|e| StitchError::export(path, e))?;
    }
    temp.persist(path).map_err(|e| StitchError::export(path, e.error))?;
    Ok(())
}
