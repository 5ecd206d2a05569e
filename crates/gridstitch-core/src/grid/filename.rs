use std::path::Path;

use crate::error::{Result, StitchError};

/// Naming scheme shared by every tile of an acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilenameLayout {
    /// `{well}_{i}_{j}_{k}_{channel}`
    WellPrefixed,
    /// `{i}_{j}_{k}_{channel}`
    Plain,
}

impl FilenameLayout {
    /// Try the well-prefixed layout on `stem`, falling back to the plain one.
    pub fn detect(stem: &str) -> Self {
        if parse_tile_name(stem, Self::WellPrefixed).is_ok() {
            Self::WellPrefixed
        } else {
            Self::Plain
        }
    }

    fn field_count(self) -> usize {
        match self {
            Self::WellPrefixed => 5,
            Self::Plain => 4,
        }
    }
}

impl std::fmt::Display for FilenameLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WellPrefixed => write!(f, "well_i_j_k_channel"),
            Self::Plain => write!(f, "i_j_k_channel"),
        }
    }
}

/// Grid coordinates encoded in a tile filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedName {
    pub well: Option<String>,
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub channel: String,
}

/// Parse a filename stem (no extension). The channel is the remainder after
/// the index fields and may itself contain underscores.
pub fn parse_tile_name(stem: &str, layout: FilenameLayout) -> Result<ParsedName> {
    let unparsable = || StitchError::UnparsableFilename(stem.to_string());

    let parts: Vec<&str> = stem.splitn(layout.field_count(), '_').collect();
    if parts.len() != layout.field_count() {
        return Err(unparsable());
    }

    let (well, fields) = match layout {
        FilenameLayout::WellPrefixed => (Some(parts[0].to_string()), &parts[1..]),
        FilenameLayout::Plain => (None, &parts[..]),
    };

    let index = |s: &str| s.parse::<usize>().map_err(|_| unparsable());
    let channel = fields[3];
    if channel.is_empty() {
        return Err(unparsable());
    }

    Ok(ParsedName {
        well,
        i: index(fields[0])?,
        j: index(fields[1])?,
        k: index(fields[2])?,
        channel: channel.to_string(),
    })
}

/// Filename without its final extension.
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}
