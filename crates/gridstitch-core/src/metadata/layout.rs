use std::path::{Path, PathBuf};

use crate::consts::{
    ACQUISITION_PARAMETERS_FILE, CONFIGURATIONS_FILE, COORDINATES_FILE, IMAGE_SUBDIR,
    OUTPUT_SUBDIR,
};
use crate::error::{Result, StitchError};

/// Files and directories of one acquisition folder.
///
/// ```text
/// <input>/
///   acquisition parameters.json
///   configurations.xml
///   0/                  tiles + coordinates.csv
///   stitched/           created on export
/// ```
#[derive(Clone, Debug)]
pub struct AcquisitionLayout {
    pub input: PathBuf,
    pub image_dir: PathBuf,
}

impl AcquisitionLayout {
    pub fn discover(input: &Path) -> Result<Self> {
        let image_dir = input.join(IMAGE_SUBDIR);
        if !image_dir.is_dir() {
            return Err(StitchError::config(
                &image_dir,
                format!("{}/{} is not a valid directory", input.display(), IMAGE_SUBDIR),
            ));
        }
        Ok(Self {
            input: input.to_path_buf(),
            image_dir,
        })
    }

    pub fn coordinates_path(&self) -> PathBuf {
        self.image_dir.join(COORDINATES_FILE)
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.input.join(ACQUISITION_PARAMETERS_FILE)
    }

    pub fn configurations_path(&self) -> PathBuf {
        self.input.join(CONFIGURATIONS_FILE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.input.join(OUTPUT_SUBDIR)
    }

    /// Create the output directory if needed and return the output file path.
    pub fn prepare_output(&self, name: &str) -> Result<PathBuf> {
        let dir = self.output_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(name))
    }
}
