use std::path::PathBuf;

use thiserror::Error;

use crate::sample::SampleType;

/// Broad category of a [`StitchError`], used for exit codes and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed acquisition metadata.
    Config,
    /// Tile set is empty, ambiguous or geometrically unusable.
    Data,
    /// Reading or decoding a file failed.
    Io,
    /// The volume writer failed.
    Export,
}

#[derive(Error, Debug)]
pub enum StitchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("No tile images found in {}", .0.display())]
    EmptyTileSet(PathBuf),

    #[error("Cannot parse tile filename '{0}' as well_i_j_k_channel or i_j_k_channel")]
    UnparsableFilename(String),

    #[error("Duplicate tile at c:{channel} k:{z} i:{row} j:{col} ('{first}' and '{second}')")]
    DuplicateTile {
        channel: String,
        z: usize,
        row: usize,
        col: usize,
        first: String,
        second: String,
    },

    #[error("No input file found for c:{channel} k:{z} j:{col} i:{row}")]
    MissingReferenceTile {
        channel: String,
        z: usize,
        row: usize,
        col: usize,
    },

    #[error("Invalid stitching geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported sample type {color:?} in {}", path.display())]
    UnsupportedSampleType { path: PathBuf, color: image::ColorType },

    #[error("Tile {} holds {found} samples, expected {expected} like the first tile", path.display())]
    SampleTypeMismatch {
        path: PathBuf,
        found: SampleType,
        expected: SampleType,
    },

    #[error("Tile {} is {width}x{height}, expected {expected_width}x{expected_height}", path.display())]
    TileShape {
        path: PathBuf,
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
    },

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Export to {} failed: {reason}", path.display())]
    Export { path: PathBuf, reason: String },
}

impl StitchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::Json { .. } => ErrorKind::Config,
            Self::EmptyTileSet(_)
            | Self::UnparsableFilename(_)
            | Self::DuplicateTile { .. }
            | Self::MissingReferenceTile { .. }
            | Self::InvalidGeometry(_)
            | Self::UnsupportedSampleType { .. }
            | Self::SampleTypeMismatch { .. }
            | Self::TileShape { .. }
            | Self::Shape(_) => ErrorKind::Data,
            Self::Io(_) | Self::ImageError(_) => ErrorKind::Io,
            Self::Export { .. } => ErrorKind::Export,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
