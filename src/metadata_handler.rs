//! Carries camera EXIF data from a source photo over to its graded copy.

use little_exif::metadata::Metadata;
use std::io;
use std::path::Path;

/// Extensions (lowercase) whose EXIF block survives grading.
///
/// PNG and BMP exports rarely carry EXIF, and the graded file is re-encoded
/// from scratch, so only formats where cameras write EXIF natively are copied.
const EXIF_EXTENSIONS: &[&str] = &["jpg", "jpeg", "tif", "tiff"];

/// Whether [`copy_metadata`] should be attempted for a file at `path`.
///
/// Callers skip the copy for anything else; a missing EXIF block would only
/// turn into a warning per image.
pub fn carries_exif(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| EXIF_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)))
}

/// Copies the EXIF block of the photo at `src` onto the graded file at `dst`.
///
/// Grading rewrites every pixel, so the encoder drops the source's camera
/// settings and timestamps; this writes them back. Only call it once `dst`
/// is complete, and only when [`carries_exif`] holds for `src`. Failures are
/// meant to be logged by the caller, never to discard the graded image.
pub fn copy_metadata(src: &Path, dst: &Path) -> io::Result<()> {
    let exif = Metadata::new_from_path(src)
        .map_err(|e| io::Error::other(format!("EXIF from {}: {e}", src.display())))?;

    exif.write_to_file(dst)
        .map_err(|e| io::Error::other(format!("EXIF to {}: {e}", dst.display())))
}
