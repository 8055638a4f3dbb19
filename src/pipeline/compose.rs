//! Images → PDF: one image per A4 page.
//!
//! Layout: 36 pt margins on every side, each image scaled to fit 95% of the
//! printable box and centred on the page. Images are never scaled up; a
//! pixel counts as one point at natural size. Pixel data is downsampled when
//! it carries more detail than the chosen DPI can show at the printed size,
//! which keeps a 48-megapixel phone photo from producing a 20 MB page.

use crate::error::ConvertError;
use image::imageops::FilterType;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A4 in points.
pub const A4: (f32, f32) = (595.0, 842.0);
pub const MARGIN_PT: f32 = 36.0;
const FIT_FRACTION: f32 = 0.95;

/// Where an image lands on a page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Fit a `px_w` × `px_h` image onto a page of `page` points.
pub fn fit_on_page(px_w: u32, px_h: u32, page: (f32, f32), margin: f32) -> Placement {
    let (page_w, page_h) = page;
    let box_w = (page_w - 2.0 * margin).max(1.0);
    let box_h = (page_h - 2.0 * margin).max(1.0);
    let img_w = px_w.max(1) as f32;
    let img_h = px_h.max(1) as f32;

    let scale = (box_w * FIT_FRACTION / img_w)
        .min(box_h * FIT_FRACTION / img_h)
        .min(1.0);
    let width = img_w * scale;
    let height = img_h * scale;

    Placement {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
    }
}

/// Pixel size worth keeping for an image printed `placement` large at `dpi`.
///
/// Returns `None` when the image is already at or below that resolution.
pub fn downsample_target(px_w: u32, px_h: u32, placement: &Placement, dpi: u32) -> Option<(u32, u32)> {
    let max_w = (placement.width / 72.0 * dpi as f32).round().max(1.0) as u32;
    if px_w <= max_w {
        return None;
    }
    let ratio = max_w as f32 / px_w as f32;
    let h = (px_h as f32 * ratio).round().max(1.0) as u32;
    Some((max_w, h))
}

/// Write `images` to `output` as a PDF, one page each.
///
/// Unreadable images are skipped with a warning. Returns the page count;
/// zero usable images is an error and nothing is written.
pub fn compose_pdf(
    pdfium: &Pdfium,
    images: &[PathBuf],
    output: &Path,
    dpi: u32,
) -> Result<usize, ConvertError> {
    let compose_err = |e: PdfiumError| ConvertError::Compose(format!("{e:?}"));

    let decoded: Vec<(usize, DynamicImage)> = images
        .iter()
        .enumerate()
        .filter_map(|(i, path)| match super::open_image(path) {
            Ok(img) => Some((i, img)),
            Err(e) => {
                warn!(path = %path.display(), "skipping unreadable image: {e}");
                None
            }
        })
        .collect();

    if decoded.is_empty() {
        return Err(ConvertError::NoUsableInput(format!(
            "none of {} images could be read",
            images.len()
        )));
    }

    let mut document = pdfium.create_new_pdf().map_err(compose_err)?;
    for (i, img) in &decoded {
        let placement = fit_on_page(img.width(), img.height(), A4, MARGIN_PT);
        let scaled;
        let img = match downsample_target(img.width(), img.height(), &placement, dpi) {
            Some((w, h)) => {
                scaled = img.resize_exact(w, h, FilterType::Lanczos3);
                &scaled
            }
            None => img,
        };
        debug!(
            image = i + 1,
            px_w = img.width(),
            px_h = img.height(),
            pt_w = placement.width,
            pt_h = placement.height,
            "placing image"
        );

        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(compose_err)?;
        page.objects_mut()
            .create_image_object(
                PdfPoints::new(placement.x),
                PdfPoints::new(placement.y),
                img,
                Some(PdfPoints::new(placement.width)),
                Some(PdfPoints::new(placement.height)),
            )
            .map_err(compose_err)?;
    }

    document.save_to_file(output).map_err(compose_err)?;
    info!(pages = decoded.len(), output = %output.display(), "PDF composed");
    Ok(decoded.len())
}
