//! PDF rasterisation and text extraction via pdfium.
//!
//! Both entry points are blocking; callers run them inside
//! `tokio::task::spawn_blocking` because pdfium keeps thread-local state and
//! rendering is CPU-bound.
//!
//! Pages render at the user's quality DPI (`scale = dpi / 72`), but the
//! longest edge is capped at `max_pixels`: an A0 poster at 600 DPI would
//! otherwise be a ~20,000 × 28,000 px bitmap.

use crate::config::OutputFormat;
use crate::error::ConvertError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pixel size of a page of `width_pt` × `height_pt` points at `dpi`,
/// scaled down uniformly so neither edge exceeds `max_pixels`.
pub fn page_pixel_size(width_pt: f32, height_pt: f32, dpi: u32, max_pixels: u32) -> (u32, u32) {
    let scale = dpi as f32 / 72.0;
    let mut w = (width_pt * scale).max(1.0);
    let mut h = (height_pt * scale).max(1.0);
    let longest = w.max(h);
    if longest > max_pixels as f32 {
        let shrink = max_pixels as f32 / longest;
        w *= shrink;
        h *= shrink;
    }
    (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
}

/// `page_001.png`, `page_002.jpg`, ...
pub fn page_file_name(index: usize, format: OutputFormat) -> String {
    format!("page_{:03}.{}", index + 1, format.extension())
}

fn load<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, ConvertError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::Render {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

/// Render every page of `pdf_path` into `out_dir`.
///
/// Returns the written files in page order.
pub fn render_pages_to_files(
    pdfium: &Pdfium,
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
    max_pixels: u32,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, ConvertError> {
    let document = load(pdfium, pdf_path)?;
    let pages = document.pages();
    let total = pages.len() as usize;
    info!(pages = total, dpi, "PDF loaded for rendering");

    let render_err = |page: usize, detail: String| ConvertError::Render {
        path: pdf_path.to_path_buf(),
        detail: format!("page {}: {detail}", page + 1),
    };

    let mut written = Vec::with_capacity(total);
    for idx in 0..total {
        let page = pages
            .get(idx as u16)
            .map_err(|e| render_err(idx, format!("{e:?}")))?;

        let (w, h) = page_pixel_size(page.width().value, page.height().value, dpi, max_pixels);
        let render_config = PdfRenderConfig::new().set_target_size(w as i32, h as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_err(idx, format!("{e:?}")))?;
        let image = bitmap.as_image();
        debug!(page = idx + 1, width = image.width(), height = image.height(), "rendered");

        let path = out_dir.join(page_file_name(idx, format));
        match format {
            OutputFormat::Png => image
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| render_err(idx, e.to_string()))?,
            OutputFormat::Jpeg => {
                super::write_jpeg(&image, &path).map_err(|e| render_err(idx, e.to_string()))?
            }
        }
        written.push(path);
    }

    if written.is_empty() {
        warn!(path = %pdf_path.display(), "PDF has no pages");
        return Err(ConvertError::NoUsableInput(format!(
            "'{}' has no pages",
            pdf_path.display()
        )));
    }
    Ok(written)
}

/// Concatenate the text layer of every page, pages separated by a blank line.
pub fn extract_text(pdfium: &Pdfium, pdf_path: &Path) -> Result<String, ConvertError> {
    let document = load(pdfium, pdf_path)?;
    let mut parts = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(text) => parts.push(text.all()),
            Err(e) => warn!(page = idx + 1, "no text layer: {e:?}"),
        }
    }
    Ok(parts.join("\n\n"))
}
