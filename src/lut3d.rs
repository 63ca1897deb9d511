use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::LoadError;

/// Keyword introducing the cube resolution in a `.cube` file.
const SIZE_KEYWORD: &str = "LUT_3D_SIZE";

/// Header keywords that are understood but carry nothing this loader uses.
/// They are skipped without producing a warning.
const IGNORED_KEYWORDS: &[&str] = &["TITLE", "DOMAIN_MIN", "DOMAIN_MAX", "LUT_3D_INPUT_RANGE"];

/// Represents a parsed 3D Look-Up Table (LUT).
///
/// The table stores `size³` RGBA samples in the `.cube` file's native order:
/// red varies fastest, then green, then blue. Alpha is always `1.0` since the
/// format carries no alpha channel. Values are not clamped, so out-of-range
/// samples pass through unchanged.
///
/// A `CubeLut` is immutable once built and can be shared freely between
/// threads applying it.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeLut {
    /// The size of one dimension of the cube (e.g., 33 for a 33x33x33 LUT).
    size: usize,
    /// Flattened `[R, G, B, A]` samples, exactly `size³` of them.
    samples: Vec<[f32; 4]>,
}

/// How strictly lines that do not fit the format are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Skip malformed lines silently (the behavior `.cube` tooling expects).
    #[default]
    Permissive,
    /// Fail with [`LoadError::Malformed`] if any line had to be skipped.
    Strict,
}

/// A line the parser skipped, or data it dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarning {
    /// `LUT_3D_SIZE` followed by something that is not a non-negative integer.
    InvalidSize { line: usize, value: String },
    /// A three-token line with a token that is not a number.
    InvalidNumber { line: usize, token: String },
    /// A line with a token count that matches nothing in the format.
    UnrecognizedLine { line: usize, tokens: usize },
    /// More data triples than the declared size needs; the tail was dropped.
    ExcessSamples { expected: usize, found: usize },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::InvalidSize { line, value } => {
                write!(f, "line {line}: invalid {SIZE_KEYWORD} value `{value}`")
            }
            ParseWarning::InvalidNumber { line, token } => {
                write!(f, "line {line}: `{token}` is not a number")
            }
            ParseWarning::UnrecognizedLine { line, tokens } => {
                write!(f, "line {line}: unrecognized line with {tokens} token(s)")
            }
            ParseWarning::ExcessSamples { expected, found } => {
                write!(f, "{found} data entries found, only the first {expected} are used")
            }
        }
    }
}

impl CubeLut {
    /// Parses a `.cube` file and creates a `CubeLut` instance.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.cube` file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if the file cannot be opened or read,
    /// and the parse errors described on [`CubeLut::parse`] otherwise.
    pub fn from_cube<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_cube_with(path, ParseMode::Permissive)
    }

    /// Same as [`CubeLut::from_cube`], with an explicit [`ParseMode`].
    pub fn from_cube_with<P: AsRef<Path>>(path: P, mode: ParseMode) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| LoadError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        let lut = Self::parse_bytes_with(&bytes, mode)?;
        info!(path = %path.display(), size = lut.size, "loaded cube LUT");
        Ok(lut)
    }

    /// Parses raw bytes, checking they are UTF-8 first.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, LoadError> {
        Self::parse_bytes_with(bytes, ParseMode::Permissive)
    }

    fn parse_bytes_with(bytes: &[u8], mode: ParseMode) -> Result<Self, LoadError> {
        let text = std::str::from_utf8(bytes)?;
        Self::parse_with(text, mode)
    }

    /// Parses `.cube` text permissively.
    ///
    /// # Errors
    ///
    /// * [`LoadError::MissingSize`] if no valid, non-zero `LUT_3D_SIZE` line exists.
    /// * [`LoadError::TruncatedData`] if fewer than `size³` data triples exist.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        Self::parse_with(text, ParseMode::Permissive)
    }

    /// Parses `.cube` text with an explicit [`ParseMode`].
    pub fn parse_with(text: &str, mode: ParseMode) -> Result<Self, LoadError> {
        let (lut, warnings) = Self::parse_with_warnings(text)?;
        if mode == ParseMode::Strict && !warnings.is_empty() {
            return Err(LoadError::Malformed { warnings });
        }
        Ok(lut)
    }

    /// Parses `.cube` text permissively, returning every skipped line as a warning.
    pub fn parse_with_warnings(text: &str) -> Result<(Self, Vec<ParseWarning>), LoadError> {
        let mut size = 0usize;
        let mut triples: Vec<[f32; 3]> = Vec::new();
        let mut warnings = Vec::new();

        // CRLF counts as one break; a lone CR (classic Mac) is a break too
        let text = text.replace("\r\n", "\n");
        for (idx, raw) in text.split(['\n', '\r']).enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [keyword, value] if *keyword == SIZE_KEYWORD => match value.parse::<usize>() {
                    // Later size lines override earlier ones
                    Ok(parsed) => size = parsed,
                    Err(_) => warnings.push(ParseWarning::InvalidSize {
                        line: line_no,
                        value: value.to_string(),
                    }),
                },
                [keyword, ..] if IGNORED_KEYWORDS.contains(keyword) => {}
                [r, g, b] => match parse_triple(r, g, b) {
                    Ok(rgb) => triples.push(rgb),
                    Err(token) => warnings.push(ParseWarning::InvalidNumber {
                        line: line_no,
                        token: token.to_string(),
                    }),
                },
                _ => warnings.push(ParseWarning::UnrecognizedLine {
                    line: line_no,
                    tokens: tokens.len(),
                }),
            }
        }

        for warning in &warnings {
            debug!(%warning, "skipped cube line");
        }

        if size == 0 {
            return Err(LoadError::MissingSize);
        }

        // Saturating so absurd declared sizes become truncation, not overflow
        let expected = size.saturating_pow(3);
        if triples.len() < expected {
            return Err(LoadError::TruncatedData {
                size,
                expected,
                found: triples.len(),
            });
        }
        if triples.len() > expected {
            warnings.push(ParseWarning::ExcessSamples {
                expected,
                found: triples.len(),
            });
            triples.truncate(expected);
        }

        let samples = triples
            .into_iter()
            .map(|[r, g, b]| [r, g, b, 1.0])
            .collect();

        Ok((CubeLut { size, samples }, warnings))
    }

    /// Creates an identity (pass-through) cube. Sizes below 2 are raised to 2.
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let step = (size - 1) as f32;
        let mut samples = Vec::with_capacity(size * size * size);

        // Red fastest, then green, then blue
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    samples.push([r as f32 / step, g as f32 / step, b as f32 / step, 1.0]);
                }
            }
        }

        CubeLut { size, samples }
    }

    /// The number of lattice points along each axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// All samples, `size³` of them, red fastest-varying.
    pub fn samples(&self) -> &[[f32; 4]] {
        &self.samples
    }

    /// Samples as one flat RGBA float slice, the layout color-cube filters take.
    pub fn cube_data(&self) -> &[f32] {
        self.samples.as_flattened()
    }

    /// Returns the sample at lattice position `(r, g, b)`, or `None` outside the cube.
    pub fn get(&self, r: usize, g: usize, b: usize) -> Option<[f32; 4]> {
        if r >= self.size || g >= self.size || b >= self.size {
            return None;
        }
        self.samples.get(self.index(r, g, b)).copied()
    }

    /// Flat index of lattice position `(r, g, b)`.
    #[inline]
    pub(crate) fn index(&self, r: usize, g: usize, b: usize) -> usize {
        r + self.size * g + self.size * self.size * b
    }
}

/// Parses three float tokens, returning the first offending token on failure.
fn parse_triple<'a>(r: &'a str, g: &'a str, b: &'a str) -> Result<[f32; 3], &'a str> {
    let parse = |s: &'a str| s.parse::<f32>().map_err(|_| s);
    Ok([parse(r)?, parse(g)?, parse(b)?])
}
