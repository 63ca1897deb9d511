//! Maps human-readable preset names to `.cube` files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::CatalogError;
use crate::lut3d::{CubeLut, ParseMode};

/// A catalog of color-grading presets backed by a directory of `.cube` files.
#[derive(Debug, Clone)]
pub struct PresetCatalog {
    lut_dir: PathBuf,
    presets: BTreeMap<String, String>,
}

impl PresetCatalog {
    /// Creates an empty catalog rooted at `lut_dir`.
    pub fn new(lut_dir: impl Into<PathBuf>) -> Self {
        PresetCatalog {
            lut_dir: lut_dir.into(),
            presets: BTreeMap::new(),
        }
    }

    /// Builds the catalog described by the `[lut]` and `[presets]` config sections.
    pub fn from_config(config: &Config) -> Self {
        config
            .presets
            .iter()
            .fold(Self::new(&config.lut.dir), |catalog, (name, file)| {
                catalog.with_preset(name, file)
            })
    }

    /// Registers `name` for the `.cube` file `file` inside the LUT directory.
    pub fn with_preset(mut self, name: impl Into<String>, file: impl Into<String>) -> Self {
        self.presets.insert(name.into(), file.into());
        self
    }

    pub fn lut_dir(&self) -> &Path {
        &self.lut_dir
    }

    /// Registered preset names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Resolves a preset name to its `.cube` path.
    ///
    /// Registered names win. Otherwise `name` is taken as a file name inside
    /// the LUT directory, with or without its `.cube` extension.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, CatalogError> {
        if let Some(file) = self.presets.get(name) {
            return Ok(self.lut_dir.join(file));
        }

        let direct = self.lut_dir.join(name);
        if is_cube_file(&direct) && direct.is_file() {
            return Ok(direct);
        }
        let with_ext = self.lut_dir.join(format!("{name}.cube"));
        if with_ext.is_file() {
            return Ok(with_ext);
        }

        Err(CatalogError::UnknownPreset(name.to_string()))
    }

    /// Resolves `name` and loads its LUT.
    pub fn load(&self, name: &str, mode: ParseMode) -> Result<CubeLut, CatalogError> {
        let path = self.resolve(name)?;
        Ok(CubeLut::from_cube_with(path, mode)?)
    }
}

fn is_cube_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("cube"))
}

/// Scans a directory for available LUT files and returns their names.
///
/// Only files with the `.cube` extension (any case) are listed, sorted
/// alphabetically. A missing or unreadable directory yields an empty list.
pub fn discover(lut_dir: &Path) -> Vec<String> {
    let mut entries = Vec::new();
    if let Ok(read_dir) = fs::read_dir(lut_dir) {
        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_cube_file(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                entries.push(name.to_string());
            }
        }
    }
    entries.sort();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use tempfile::tempdir;

    const LINEAR_2: &str = "LUT_3D_SIZE 2\n0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";

    #[test]
    fn discover_lists_cube_files_sorted() {
        let dir = tempdir().unwrap();
        for name in ["b.cube", "A.CUBE", "notes.txt", "c.cube.bak"] {
            fs::write(dir.path().join(name), LINEAR_2).unwrap();
        }
        fs::create_dir(dir.path().join("folder.cube")).unwrap();

        assert_eq!(discover(dir.path()), vec!["A.CUBE", "b.cube"]);
        assert!(discover(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn resolves_registered_names_and_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("PRESET_Fujicolor_SuperHR100.cube"), LINEAR_2).unwrap();
        let catalog = PresetCatalog::new(dir.path())
            .with_preset("Fujicolor Super HR 100", "PRESET_Fujicolor_SuperHR100.cube");

        let expected = dir.path().join("PRESET_Fujicolor_SuperHR100.cube");
        assert_eq!(catalog.resolve("Fujicolor Super HR 100").unwrap(), expected);
        assert_eq!(catalog.resolve("PRESET_Fujicolor_SuperHR100.cube").unwrap(), expected);
        assert_eq!(catalog.resolve("PRESET_Fujicolor_SuperHR100").unwrap(), expected);
        assert!(matches!(
            catalog.resolve("Kodak"),
            Err(CatalogError::UnknownPreset(name)) if name == "Kodak"
        ));
    }

    #[test]
    fn load_reads_the_resolved_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("linear.cube"), LINEAR_2).unwrap();
        let catalog = PresetCatalog::new(dir.path()).with_preset("Linear", "linear.cube");

        let lut = catalog.load("Linear", ParseMode::Strict).unwrap();
        assert_eq!(lut.size(), 2);
    }

    #[test]
    fn registered_but_missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let catalog = PresetCatalog::new(dir.path()).with_preset("Gone", "gone.cube");

        let err = catalog.load("Gone", ParseMode::Permissive).unwrap_err();
        assert!(matches!(err, CatalogError::Load(LoadError::NotFound { .. })));
    }

    #[test]
    fn from_config_registers_presets() {
        let cfg: Config = "[input]\nimage_dir = \"a\"\noutput = \"b\"\n[lut]\ndir = \"luts\"\nselected = \"Fuji\"\n[presets]\nFuji = \"fuji.cube\"\n"
            .parse()
            .unwrap();
        let catalog = PresetCatalog::from_config(&cfg);

        assert_eq!(catalog.lut_dir(), Path::new("luts"));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Fuji"]);
        assert_eq!(catalog.resolve("Fuji").unwrap(), PathBuf::from("luts/fuji.cube"));
    }
}
