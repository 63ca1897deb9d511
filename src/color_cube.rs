//! Applies a [`CubeLut`] to whole images with trilinear interpolation.
//!
//! Every pixel is mapped on its own, so the work splits across rayon's pool
//! without changing results: all strategies run the same kernel per pixel and
//! produce bitwise-identical output.

use image::{DynamicImage, Rgba32FImage};
use rayon::prelude::*;
use tracing::debug;

use crate::error::ApplyError;
use crate::lut3d::CubeLut;

/// Channels per pixel in the float RGBA buffers this module works on.
const CHANNELS: usize = 4;

/// How pixel work is spread over threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parallelism {
    /// Single thread, in scanline order.
    Sequential,
    /// One rayon task per image row.
    #[default]
    Rows,
    /// Individual pixels handed to rayon.
    Pixels,
}

/// A [`CubeLut`] checked to be large enough for trilinear sampling.
#[derive(Debug, Clone, Copy)]
pub struct ColorCube<'a> {
    lut: &'a CubeLut,
}

impl<'a> ColorCube<'a> {
    /// Wraps a LUT for sampling.
    ///
    /// # Errors
    ///
    /// [`ApplyError::DegenerateLut`] when the cube has fewer than 2 points per axis.
    pub fn new(lut: &'a CubeLut) -> Result<Self, ApplyError> {
        if lut.size() < 2 {
            return Err(ApplyError::DegenerateLut { size: lut.size() });
        }
        Ok(ColorCube { lut })
    }

    /// Maps one normalized RGB color through the cube.
    ///
    /// Inputs are clamped to `[0, 1]` (NaN counts as 0) before being scaled
    /// onto the lattice. The lower corner of the surrounding cell is clamped to
    /// `size - 2`, so a channel at exactly 1.0 lands on the far face of the last
    /// cell with a fraction of 1.
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = self.lut.size();
        let max = (n - 1) as f32;

        let (x0, fx) = lattice_cell(rgb[0], max, n);
        let (y0, fy) = lattice_cell(rgb[1], max, n);
        let (z0, fz) = lattice_cell(rgb[2], max, n);

        let samples = self.lut.samples();
        let corner =
            |dx: usize, dy: usize, dz: usize| samples[self.lut.index(x0 + dx, y0 + dy, z0 + dz)];

        let (gx, gy, gz) = (1.0 - fx, 1.0 - fy, 1.0 - fz);
        let weighted = [
            (corner(0, 0, 0), gx * gy * gz),
            (corner(1, 0, 0), fx * gy * gz),
            (corner(0, 1, 0), gx * fy * gz),
            (corner(1, 1, 0), fx * fy * gz),
            (corner(0, 0, 1), gx * gy * fz),
            (corner(1, 0, 1), fx * gy * fz),
            (corner(0, 1, 1), gx * fy * fz),
            (corner(1, 1, 1), fx * fy * fz),
        ];

        let mut out = [0.0f32; 3];
        for (c, w) in weighted {
            out[0] += c[0] * w;
            out[1] += c[1] * w;
            out[2] += c[2] * w;
        }
        out
    }

    /// Maps one RGBA pixel, keeping its alpha untouched.
    #[inline]
    pub fn sample_pixel(&self, px: [f32; 4]) -> [f32; 4] {
        let [r, g, b] = self.sample([px[0], px[1], px[2]]);
        [r, g, b, px[3]]
    }

    fn map_into(&self, src: &[f32], dst: &mut [f32]) {
        for (s, d) in src.chunks_exact(CHANNELS).zip(dst.chunks_exact_mut(CHANNELS)) {
            d.copy_from_slice(&self.sample_pixel([s[0], s[1], s[2], s[3]]));
        }
    }
}

/// Splits a normalized channel into its lattice cell and fractional offset.
#[inline]
fn lattice_cell(v: f32, max: f32, n: usize) -> (usize, f32) {
    let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
    let x = v * max;
    let x0 = (x.floor() as usize).min(n - 2);
    (x0, x - x0 as f32)
}

/// Applies the LUT to every pixel of `image` using row-parallel execution.
///
/// The output has the same dimensions; alpha is copied from the source.
pub fn apply(image: &Rgba32FImage, lut: &CubeLut) -> Result<Rgba32FImage, ApplyError> {
    apply_with(image, lut, Parallelism::default())
}

/// Applies the LUT with an explicit [`Parallelism`] strategy.
pub fn apply_with(
    image: &Rgba32FImage,
    lut: &CubeLut,
    parallelism: Parallelism,
) -> Result<Rgba32FImage, ApplyError> {
    let cube = ColorCube::new(lut)?;
    let (w, h) = image.dimensions();
    let src = image.as_raw();

    debug!(width = w, height = h, lut_size = lut.size(), ?parallelism, "applying color cube");

    let mut dst = vec![0.0f32; src.len()];
    if !src.is_empty() {
        let row_len = w as usize * CHANNELS;
        match parallelism {
            Parallelism::Sequential => cube.map_into(src, &mut dst),
            Parallelism::Rows => dst
                .par_chunks_mut(row_len)
                .zip(src.par_chunks(row_len))
                .for_each(|(d, s)| cube.map_into(s, d)),
            Parallelism::Pixels => dst
                .par_chunks_mut(CHANNELS)
                .zip(src.par_chunks(CHANNELS))
                .for_each(|(d, s)| cube.map_into(s, d)),
        }
    }

    Rgba32FImage::from_raw(w, h, dst).ok_or_else(|| {
        ApplyError::EncodeFailure(format!("pixel buffer does not fit a {w}x{h} RGBA image"))
    })
}

/// Converts any decoded image to float RGBA and applies the LUT to it.
pub fn apply_dynamic(image: &DynamicImage, lut: &CubeLut) -> Result<Rgba32FImage, ApplyError> {
    apply(&image.to_rgba32f(), lut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Rgba;

    const LINEAR_2: &str = "LUT_3D_SIZE 2\n0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";

    /// A deterministic spread of colors with varying alpha.
    fn gradient(w: u32, h: u32) -> Rgba32FImage {
        Rgba32FImage::from_fn(w, h, |x, y| {
            let r = x as f32 / w.max(2) as f32;
            let g = y as f32 / h.max(2) as f32;
            let b = ((x * 7 + y * 13) % 17) as f32 / 16.0;
            let a = ((x + y) % 5) as f32 / 4.0;
            Rgba([r, g, b, a])
        })
    }

    /// Swaps red and blue, a non-trivial but easy to predict cube.
    fn swap_red_blue(size: usize) -> CubeLut {
        let step = (size - 1) as f32;
        let mut text = format!("LUT_3D_SIZE {size}\n");
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    let (rf, gf, bf) = (r as f32 / step, g as f32 / step, b as f32 / step);
                    text.push_str(&format!("{bf} {gf} {rf}\n"));
                }
            }
        }
        CubeLut::parse(&text).unwrap()
    }

    #[test]
    fn midpoint_of_linear_cube() {
        let lut = CubeLut::parse(LINEAR_2).unwrap();
        let img = Rgba32FImage::from_pixel(1, 1, Rgba([0.5, 0.5, 0.5, 0.3]));

        let out = apply(&img, &lut).unwrap();
        let px = out.get_pixel(0, 0).0;

        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.5, epsilon = 1e-6);
        assert_eq!(px[3], 0.3);
    }

    #[test]
    fn identity_cube_is_pass_through() {
        let img = gradient(23, 11);
        for size in [2, 5, 17] {
            let out = apply(&img, &CubeLut::identity(size)).unwrap();
            for (a, b) in img.as_raw().iter().zip(out.as_raw()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn alpha_is_preserved_exactly() {
        let lut = swap_red_blue(4);
        let img = gradient(16, 9);
        let out = apply(&img, &lut).unwrap();

        for (src, dst) in img.pixels().zip(out.pixels()) {
            assert_eq!(src.0[3].to_bits(), dst.0[3].to_bits());
        }
    }

    #[test]
    fn corners_hit_lattice_points() {
        let lut = swap_red_blue(3);
        let cube = ColorCube::new(&lut).unwrap();

        assert_eq!(cube.sample([1.0, 0.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(cube.sample([0.0, 0.5, 1.0]), [1.0, 0.5, 0.0]);
        assert_eq!(cube.sample([1.0, 1.0, 1.0]), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn interpolates_between_lattice_points() {
        let lut = swap_red_blue(2);
        let cube = ColorCube::new(&lut).unwrap();
        let out = cube.sample([0.25, 0.5, 0.75]);

        assert_abs_diff_eq!(out[0], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let lut = CubeLut::identity(3);
        let cube = ColorCube::new(&lut).unwrap();

        assert_eq!(cube.sample([-1.0, 2.0, f32::INFINITY]), [0.0, 1.0, 1.0]);
        assert_eq!(cube.sample([f32::NAN, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn degenerate_cube_is_rejected() {
        let lut = CubeLut::parse("LUT_3D_SIZE 1\n0.2 0.4 0.6\n").unwrap();
        let img = gradient(4, 4);

        let err = apply(&img, &lut).unwrap_err();
        assert!(matches!(err, ApplyError::DegenerateLut { size: 1 }));
    }

    #[test]
    fn strategies_agree_bitwise() {
        let lut = swap_red_blue(5);
        let img = gradient(37, 19);

        let seq = apply_with(&img, &lut, Parallelism::Sequential).unwrap();
        let rows = apply_with(&img, &lut, Parallelism::Rows).unwrap();
        let pixels = apply_with(&img, &lut, Parallelism::Pixels).unwrap();

        let bits = |img: &Rgba32FImage| img.as_raw().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&seq), bits(&rows));
        assert_eq!(bits(&seq), bits(&pixels));
    }

    #[test]
    fn empty_image_passes_through() {
        let img = Rgba32FImage::new(0, 7);
        let out = apply(&img, &CubeLut::identity(2)).unwrap();
        assert_eq!(out.dimensions(), (0, 7));
    }

    #[test]
    fn dynamic_images_are_converted() {
        let rgb8 = image::RgbImage::from_pixel(2, 2, image::Rgb([255, 0, 51]));
        let out = apply_dynamic(&DynamicImage::ImageRgb8(rgb8), &swap_red_blue(2)).unwrap();
        let px = out.get_pixel(1, 1).0;

        assert_abs_diff_eq!(px[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 1.0, epsilon = 1e-6);
        assert_eq!(px[3], 1.0);
    }
}
