//! Conversion engines.
//!
//! Each submodule wraps one external engine behind plain functions. Most are
//! blocking and CPU-bound; [`crate::convert::Engines`] runs them on the
//! blocking pool behind a semaphore.
//!
//! ```text
//! input ──▶ (queue) ──▶ enhance ──▶ compose ──▶ PDF
//! input ──▶ (pdf)   ──▶ render  ──▶ archive ──▶ ZIP
//! input ──▶ (docx/xlsx/txt) ──▶ office ──▶ PDF
//! ```
//!
//! 1. [`input`]   — validate downloaded files, pick safe local names
//! 2. [`enhance`] — brightness/contrast/... on queued images (`image` crate)
//! 3. [`compose`] — lay images out on A4 pages (pdfium)
//! 4. [`render`]  — rasterise PDF pages, extract text (pdfium)
//! 5. [`archive`] — package rendered pages as a ZIP
//! 6. [`office`]  — LibreOffice subprocess for Word/Excel/text

pub mod archive;
pub mod compose;
pub mod enhance;
pub mod input;
pub mod office;
pub mod render;

use crate::error::ConvertError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JPEG quality for every JPEG the bot writes.
pub const JPEG_QUALITY: u8 = 95;

/// Bind pdfium from `lib_dir`, or from the system library path when `None`.
pub fn bind_pdfium(lib_dir: Option<&Path>) -> Result<Pdfium, ConvertError> {
    let bindings = match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ConvertError::PdfiumUnavailable(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Decode an image, sniffing the format from its content.
///
/// Uploaded files often carry a wrong or missing extension.
pub(crate) fn open_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    image::ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Encode `img` as an RGB JPEG at [`JPEG_QUALITY`].
pub(crate) fn write_jpeg(img: &DynamicImage, path: &Path) -> Result<(), image::ImageError> {
    encode_jpeg(img, File::create(path)?)
}

/// [`write_jpeg`] into a file the caller already opened.
pub(crate) fn encode_jpeg(img: &DynamicImage, file: File) -> Result<(), image::ImageError> {
    let mut writer = BufWriter::new(file);
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))
}

/// First eight hex digits of a fresh v4 UUID, for collision-free file names.
pub(crate) fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_is_eight_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, short_id());
    }

    #[test]
    fn jpeg_written_from_rgba_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.jpg");
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 128])));
        write_jpeg(&img, &path).unwrap();
        let back = image::open(&path).unwrap();
        assert_eq!((back.width(), back.height()), (4, 4));
    }
}
