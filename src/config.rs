use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Configuration for the batch host, loaded from `config.toml`.
///
/// ```toml
/// [input]
/// image_dir = "photos"
/// output = "graded"
///
/// [lut]
/// dir = "assets/luts"
/// selected = "Fujicolor Super HR 100"
///
/// [presets]
/// "Fujicolor Super HR 100" = "PRESET_Fujicolor_SuperHR100.cube"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub input: InputPaths,
    pub lut: LutConfig,
    /// Preset name to `.cube` file name, relative to [`LutConfig::dir`].
    #[serde(default)]
    pub presets: BTreeMap<String, String>,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Where source images are read from and graded images written to.
#[derive(Debug, Clone, Deserialize)]
pub struct InputPaths {
    /// Directory containing input images to be processed
    pub image_dir: PathBuf,
    /// Directory where processed files will be saved
    pub output: PathBuf,
}

/// LUT selection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LutConfig {
    /// Directory holding the `.cube` files.
    #[serde(default = "default_lut_dir")]
    pub dir: PathBuf,
    /// Preset name, or a `.cube` file name inside `dir`.
    pub selected: String,
    /// Reject LUT files containing lines that would otherwise be skipped.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingConfig {
    /// Worker threads for pixel work; 0 leaves the choice to rayon.
    #[serde(default)]
    pub threads: usize,
}

fn default_lut_dir() -> PathBuf {
    PathBuf::from("assets/luts")
}

impl Config {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml_str.parse()
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let cfg: Config = r#"
[input]
image_dir = "photos"
output = "graded"

[lut]
dir = "luts"
selected = "Fuji"
strict = true

[presets]
"Fuji" = "PRESET_Fujicolor_SuperHR100.cube"

[processing]
threads = 4
"#
        .parse()
        .unwrap();

        assert_eq!(cfg.input.image_dir, PathBuf::from("photos"));
        assert_eq!(cfg.lut.dir, PathBuf::from("luts"));
        assert!(cfg.lut.strict);
        assert_eq!(cfg.presets["Fuji"], "PRESET_Fujicolor_SuperHR100.cube");
        assert_eq!(cfg.processing.threads, 4);
    }

    #[test]
    fn optional_sections_default() {
        let cfg: Config = "[input]\nimage_dir = \"a\"\noutput = \"b\"\n[lut]\nselected = \"x.cube\"\n"
            .parse()
            .unwrap();

        assert_eq!(cfg.lut.dir, PathBuf::from("assets/luts"));
        assert!(!cfg.lut.strict);
        assert!(cfg.presets.is_empty());
        assert_eq!(cfg.processing.threads, 0);
    }

    #[test]
    fn missing_lut_section_is_a_parse_error() {
        let err = "[input]\nimage_dir = \"a\"\noutput = \"b\"\n".parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load(Path::new("no/such/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
