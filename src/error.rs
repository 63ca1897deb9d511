//! Error types for loading and applying color cubes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::lut3d::ParseWarning;

/// Errors raised while turning a `.cube` resource into a [`CubeLut`](crate::lut3d::CubeLut).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The LUT file could not be located or opened.
    #[error("LUT file not found: {}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The content is not valid UTF-8.
    #[error("LUT content is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// No usable `LUT_3D_SIZE` line was found.
    #[error("LUT_3D_SIZE is missing or invalid")]
    MissingSize,

    /// Fewer data triples than `size³`.
    #[error("LUT data truncated: size {size} needs {expected} entries, found {found}")]
    TruncatedData {
        size: usize,
        expected: usize,
        found: usize,
    },

    /// Strict parsing rejected lines the permissive parser would skip.
    #[error("LUT has {} malformed line(s), first: {}", warnings.len(), first_warning(warnings))]
    Malformed { warnings: Vec<ParseWarning> },
}

fn first_warning(warnings: &[ParseWarning]) -> String {
    warnings
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Errors raised while applying a color cube to an image.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Cubes need at least two lattice points per axis to interpolate.
    #[error("color cube of size {size} cannot be interpolated (need at least 2)")]
    DegenerateLut { size: usize },

    /// The source image could not be read or decoded.
    #[error("failed to decode {}: {source}", path.display())]
    DecodeFailure {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The destination image could not be built or written.
    #[error("failed to encode image: {0}")]
    EncodeFailure(String),
}

/// Errors raised by the preset catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors raised while reading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
