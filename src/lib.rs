//! Color grading with 3D `.cube` lookup tables.
//!
//! [`lut3d`] parses `.cube` text into an immutable [`CubeLut`], and
//! [`color_cube`] maps image pixels through it with trilinear interpolation.
//! The remaining modules are the host plumbing around those two: decoding and
//! writing image files, resolving preset names, and reading `config.toml`.

pub mod color_cube;
pub mod config;
pub mod error;
pub mod image_handler;
pub mod lut3d;
pub mod metadata_handler;
pub mod preset;

pub use color_cube::{ColorCube, Parallelism, apply, apply_with};
pub use error::{ApplyError, CatalogError, ConfigError, LoadError};
pub use lut3d::{CubeLut, ParseMode, ParseWarning};
