use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canvas::Canvas;
use crate::error::{Result, StitchError};
use crate::sample::{Sample, SampleType};

use super::export::{write_atomically, VolumeExporter, VolumeMetadata};

/// Contents of the `.json` sidecar written next to a raw volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawHeader {
    pub dimension_order: String,
    pub shape: [usize; 5],
    pub dtype: SampleType,
    pub byte_order: String,
    #[serde(flatten)]
    pub metadata: VolumeMetadata,
}

/// Plane-by-plane little-endian samples in TCZYX order plus a sidecar.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawExporter;

impl RawExporter {
    pub fn sidecar_path(path: &Path) -> PathBuf {
        path.with_extension("json")
    }
}

impl VolumeExporter for RawExporter {
    fn export<T: Sample>(
        &self,
        canvas: &Canvas<T>,
        metadata: &VolumeMetadata,
        path: &Path,
    ) -> Result<()> {
        let shape = canvas.shape();

        write_atomically(path, |writer| {
            for channel in 0..shape.channels {
                for z in 0..shape.z {
                    T::write_le(canvas.plane_slice(channel, z), writer)
                        .map_err(|e| StitchError::export(path, e))?;
                }
            }
            Ok(())
        })?;

        let header = RawHeader {
            dimension_order: "TCZYX".to_string(),
            shape: shape.tczyx(),
            dtype: T::TYPE,
            byte_order: "little".to_string(),
            metadata: metadata.clone(),
        };
        let sidecar = Self::sidecar_path(path);
        write_atomically(&sidecar, |writer| {
            serde_json::to_writer_pretty(writer, &header)
                .map_err(|e| StitchError::export(&sidecar, e))
        })?;

        info!(path = %path.display(), "Wrote raw volume");
        Ok(())
    }
}
