//! Image enhancements.
//!
//! The factor-based operations share one model: interpolate between the
//! original and a "degenerate" version of it,
//! `out = degenerate + (original - degenerate) * factor`.
//! A factor of 1.0 is the identity, above 1.0 strengthens the effect.
//!
//! | enhancement | degenerate image                         |
//! |-------------|------------------------------------------|
//! | brightness  | black                                    |
//! | contrast    | uniform grey at the mean luminance       |
//! | sharpness   | gaussian-smoothed copy (unsharp masking) |
//! | color       | per-pixel greyscale                      |

use crate::error::ConvertError;
use crate::session::Enhancement;
use image::{DynamicImage, Rgba, RgbaImage};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest stem kept in enhanced file names before switching to a random one.
const MAX_STEM_CHARS: usize = 30;

fn luma(p: &Rgba<u8>) -> f32 {
    // ITU-R 601-2
    p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114
}

fn blend_with<F>(img: &DynamicImage, factor: f32, degenerate: F) -> DynamicImage
where
    F: Fn(u32, u32, &Rgba<u8>) -> [f32; 3],
{
    let mut out: RgbaImage = img.to_rgba8();
    for (x, y, px) in out.enumerate_pixels_mut() {
        let d = degenerate(x, y, px);
        for (c, base) in d.iter().enumerate() {
            let v = base + (px[c] as f32 - base) * factor;
            px[c] = v.round().clamp(0.0, 255.0) as u8;
        }
    }
    DynamicImage::ImageRgba8(out)
}

pub fn brightness(img: &DynamicImage, factor: f32) -> DynamicImage {
    blend_with(img, factor, |_, _, _| [0.0; 3])
}

pub fn contrast(img: &DynamicImage, factor: f32) -> DynamicImage {
    let rgba = img.to_rgba8();
    let n = (rgba.width() as f64 * rgba.height() as f64).max(1.0);
    let mean = (rgba.pixels().map(|p| luma(p) as f64).sum::<f64>() / n) as f32;
    let mean = mean.round();
    blend_with(img, factor, |_, _, _| [mean; 3])
}

pub fn sharpness(img: &DynamicImage, factor: f32) -> DynamicImage {
    let smooth = img.blur(1.0).to_rgba8();
    blend_with(img, factor, |x, y, _| {
        let p = smooth.get_pixel(x, y);
        [p[0] as f32, p[1] as f32, p[2] as f32]
    })
}

pub fn color(img: &DynamicImage, factor: f32) -> DynamicImage {
    blend_with(img, factor, |_, _, p| [luma(p); 3])
}

/// Apply `enhancement` in memory. `strength` drives the factor-based ones.
pub fn apply(img: &DynamicImage, enhancement: Enhancement, strength: f32) -> DynamicImage {
    match enhancement {
        Enhancement::Brightness => brightness(img, strength),
        Enhancement::Contrast => contrast(img, strength),
        Enhancement::Sharpness => sharpness(img, strength),
        Enhancement::Color => color(img, strength),
        Enhancement::AutoEnhance => {
            let img = brightness(img, 1.1);
            let img = contrast(&img, 1.2);
            sharpness(&img, 1.1)
        }
        Enhancement::Grayscale => DynamicImage::ImageRgb8(img.grayscale().to_rgb8()),
        Enhancement::Blur => img.blur(2.0),
    }
}

/// File name for the enhanced copy of `source`, in the same directory.
///
/// `photo_enh_contrast.jpg` for short stems; `enhanced_<id>_contrast.jpg`
/// once the stem passes 30 characters, so repeated enhancement does not grow
/// names without bound.
pub fn output_path(source: &Path, enhancement: Enhancement) -> PathBuf {
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = if stem.chars().count() > MAX_STEM_CHARS {
        format!("enhanced_{}", super::short_id())
    } else {
        format!("{stem}_enh")
    };
    dir.join(format!("{base}_{}.jpg", enhancement.as_str()))
}

/// Create the destination for an enhanced copy without touching existing files.
///
/// The preferred name is [`output_path`]. When that file already exists
/// (another queued image with the same stem, or an earlier run) a random
/// suffix is added. `create_new` makes the claim atomic, so concurrent
/// enhancements of same-stem images never share a file.
fn claim_output(source: &Path, enhancement: Enhancement) -> io::Result<(PathBuf, File)> {
    let preferred = output_path(source, enhancement);
    match OpenOptions::new().write(true).create_new(true).open(&preferred) {
        Ok(file) => return Ok((preferred, file)),
        Err(e) if e.kind() != io::ErrorKind::AlreadyExists => return Err(e),
        Err(_) => {}
    }

    let dir = preferred.parent().unwrap_or_else(|| Path::new(""));
    let stem = preferred
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = stem
        .strip_suffix(&format!("_{}", enhancement.as_str()))
        .unwrap_or(&stem)
        .to_string();
    loop {
        let candidate = dir.join(format!("{base}_{}_{}.jpg", super::short_id(), enhancement.as_str()));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Load `source`, enhance it, and save a JPEG copy beside it.
///
/// The copy never replaces an existing file; see [`claim_output`].
pub fn enhance_file(source: &Path, enhancement: Enhancement, strength: f32) -> Result<PathBuf, ConvertError> {
    let err = |detail: String| ConvertError::Enhance {
        path: source.to_path_buf(),
        detail,
    };
    let img = super::open_image(source).map_err(|e| err(e.to_string()))?;
    let enhanced = apply(&img, enhancement, strength);
    let (dest, file) = claim_output(source, enhancement).map_err(|e| err(e.to_string()))?;
    if let Err(e) = super::encode_jpeg(&enhanced, file) {
        let _ = std::fs::remove_file(&dest);
        return Err(err(e.to_string()));
    }
    debug!(source = %source.display(), dest = %dest.display(), %enhancement, "enhanced");
    Ok(dest)
}
