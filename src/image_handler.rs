use crate::color_cube;
use crate::error::ApplyError;
use crate::lut3d::CubeLut;
use crate::metadata_handler::{carries_exif, copy_metadata};
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, Rgba32FImage};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use walkdir::WalkDir;

/// File extensions (lowercase) that are decoded and recolored in batch runs.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// An image decoded into normalized float RGBA, remembering its source layout.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Pixels with every channel normalized to `[0, 1]`.
    pub pixels: Rgba32FImage,
    /// Channel layout and bit depth of the file it came from.
    pub color: ColorType,
}

impl DecodedImage {
    /// Returns a copy holding new pixels but the same source layout.
    pub fn with_pixels(&self, pixels: Rgba32FImage) -> Self {
        DecodedImage {
            pixels,
            color: self.color,
        }
    }

    /// Converts the float pixels back to the source's channel layout and bit depth.
    ///
    /// Grayscale sources come back as RGB since a color grade rarely stays gray.
    pub fn to_dynamic(&self) -> DynamicImage {
        let img = DynamicImage::ImageRgba32F(self.pixels.clone());
        match self.color {
            ColorType::L8 | ColorType::Rgb8 => DynamicImage::ImageRgb8(img.to_rgb8()),
            ColorType::La8 | ColorType::Rgba8 => DynamicImage::ImageRgba8(img.to_rgba8()),
            ColorType::L16 | ColorType::Rgb16 => DynamicImage::ImageRgb16(img.to_rgb16()),
            ColorType::La16 | ColorType::Rgba16 => DynamicImage::ImageRgba16(img.to_rgba16()),
            ColorType::Rgb32F => DynamicImage::ImageRgb32F(img.to_rgb32f()),
            ColorType::Rgba32F => img,
            _ => DynamicImage::ImageRgba8(img.to_rgba8()),
        }
    }
}

/// Summary of a batch run over a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Images recolored and written.
    pub processed: usize,
    /// Images that could not be decoded, recolored, or written.
    pub failed: usize,
    /// Files ignored because they are not supported images.
    pub skipped: usize,
}

/// Reads and decodes an image file into normalized float RGBA.
///
/// The format is guessed from the file contents, falling back to the extension.
///
/// # Errors
/// [`ApplyError::DecodeFailure`] if the file cannot be opened or decoded.
pub fn decode(path: &Path) -> Result<DecodedImage, ApplyError> {
    let decode_failure = |source: image::ImageError| ApplyError::DecodeFailure {
        path: path.to_path_buf(),
        source,
    };

    let img = ImageReader::open(path)
        .map_err(|e| decode_failure(e.into()))?
        .with_guessed_format()
        .map_err(|e| decode_failure(e.into()))?
        .decode()
        .map_err(decode_failure)?;

    Ok(DecodedImage {
        color: img.color(),
        pixels: img.to_rgba32f(),
    })
}

/// Encodes an image and writes it to `path`, in the format implied by its extension.
///
/// JPEG has no alpha channel, so alpha is dropped when writing one. The image
/// is encoded into a temporary file beside `path` and renamed into place, so
/// `path` either holds the complete image or is left as it was.
///
/// # Errors
/// [`ApplyError::EncodeFailure`] if the format is unsupported or the write fails.
pub fn encode(image: &DecodedImage, path: &Path) -> Result<(), ApplyError> {
    let encode_failure = |e: &dyn std::fmt::Display| {
        ApplyError::EncodeFailure(format!("{}: {}", path.display(), e))
    };

    let format = ImageFormat::from_path(path).map_err(|e| encode_failure(&e))?;
    let mut out = image.to_dynamic();
    if format == ImageFormat::Jpeg && out.color().has_alpha() {
        out = DynamicImage::ImageRgb8(out.to_rgb8());
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| encode_failure(&e))?;

    let mut writer = BufWriter::new(tmp.as_file_mut());
    out.write_to(&mut writer, format)
        .map_err(|e| encode_failure(&e))?;
    writer.flush().map_err(|e| encode_failure(&e))?;
    drop(writer);

    // Dropping `tmp` on any error above removes the partial file
    tmp.persist(path).map_err(|e| encode_failure(&e.error))?;
    Ok(())
}

/// Decodes `input`, applies `lut`, and writes the result to `output`.
///
/// Nothing is written unless every step succeeds.
pub fn apply_to_file(input: &Path, output: &Path, lut: &CubeLut) -> Result<(), ApplyError> {
    let decoded = decode(input)?;
    let graded = color_cube::apply(&decoded.pixels, lut)?;
    encode(&decoded.with_pixels(graded), output)
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

/// Returns true when the path has one of the [`IMAGE_EXTENSIONS`] (any case).
pub fn is_supported_image(path: &Path) -> bool {
    lowercase_extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Recolors every supported image under `input_dir` into `output_dir`.
///
/// Walks the input directory recursively and writes each recolored image to
/// the same relative path under `output_dir`. JPEG and TIFF files also get
/// their EXIF metadata copied over.
/// A failure on one file is logged and counted, and the batch moves on.
/// Files that are not supported images are skipped.
///
/// # Errors
/// Only if `input_dir` does not exist; per-file problems land in the summary.
pub fn process_images(
    input_dir: &Path,
    output_dir: &Path,
    lut: &CubeLut,
) -> std::io::Result<BatchSummary> {
    // Validate input directory exists
    if !input_dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("image input directory not found: {}", input_dir.display()),
        ));
    }

    let files: Vec<PathBuf> = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    let total = files.len();
    info!(total, dir = %input_dir.display(), "found files to process");

    let mut summary = BatchSummary::default();
    for (i, path) in files.iter().enumerate() {
        if !is_supported_image(path) {
            summary.skipped += 1;
            continue;
        }
        // Keep the directory structure of the input
        let Ok(rel) = path.strip_prefix(input_dir) else {
            summary.skipped += 1;
            continue;
        };
        let out_path = output_dir.join(rel);

        info!("Processing {}/{}: {}", i + 1, total, path.display());
        match process_one(path, &out_path, lut) {
            Ok(()) => summary.processed += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to recolor image");
                summary.failed += 1;
            }
        }
    }

    info!(
        processed = summary.processed,
        failed = summary.failed,
        skipped = summary.skipped,
        "finished batch"
    );
    Ok(summary)
}

fn process_one(path: &Path, out_path: &Path, lut: &CubeLut) -> Result<(), ApplyError> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ApplyError::EncodeFailure(format!("creating {}: {}", parent.display(), e))
        })?;
    }

    apply_to_file(path, out_path, lut)?;

    // The recolored image is already written at this point
    if carries_exif(path) {
        if let Err(e) = copy_metadata(path, out_path) {
            warn!(path = %path.display(), error = %e, "failed to copy metadata");
        }
    }
    Ok(())
}
