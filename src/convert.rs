//! Conversion entry points used by the dispatcher.
//!
//! [`DocumentConverter`] is the contract between the bot and whatever turns
//! bytes into other bytes. The dispatcher only ever talks to this trait,
//! which lets tests swap in a recording fake.
//!
//! [`Engines`] is the production implementation. Every CPU-heavy job takes a
//! permit from a semaphore sized by `max_concurrent_conversions` and runs on
//! tokio's blocking pool, so event handling never stalls behind pdfium or an
//! image codec. LibreOffice runs as a subprocess and holds a permit for its
//! whole lifetime too.

use crate::config::{BotConfig, OutputFormat, Quality};
use crate::error::ConvertError;
use crate::pipeline::{archive, bind_pdfium, compose, enhance, office, render};
use crate::session::Enhancement;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Per-user knobs for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub quality: Quality,
    pub format: OutputFormat,
}

/// The conversion collaborator.
///
/// Every method either produces its output file(s) or returns an error;
/// there is no partial success. Inputs are never modified.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Compose `images` into a PDF at `output`. Returns the page count.
    async fn images_to_pdf(
        &self,
        images: &[PathBuf],
        output: &Path,
        options: ConvertOptions,
    ) -> Result<usize, ConvertError>;

    /// Render every page of `pdf` and package them as a ZIP at `output`.
    /// Returns the page count.
    async fn pdf_to_images(
        &self,
        pdf: &Path,
        output: &Path,
        options: ConvertOptions,
    ) -> Result<usize, ConvertError>;

    /// Word, Excel or text document → PDF at `output`.
    async fn office_to_pdf(&self, input: &Path, output: &Path) -> Result<(), ConvertError>;

    /// Write an enhanced copy of `image`; returns the copy's path.
    async fn enhance_image(&self, image: &Path, enhancement: Enhancement) -> Result<PathBuf, ConvertError>;

    /// Text layer of every page of `pdf`.
    async fn extract_text(&self, pdf: &Path) -> Result<String, ConvertError>;
}

/// Production [`DocumentConverter`]: pdfium, the `image` crate and LibreOffice.
pub struct Engines {
    permits: Arc<Semaphore>,
    pdfium_lib_path: Option<PathBuf>,
    max_rendered_pixels: u32,
    enhancement_strength: f32,
    office_path: Option<PathBuf>,
    office_timeout: Duration,
}

impl Engines {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrent_conversions)),
            pdfium_lib_path: config.pdfium_lib_path.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
            enhancement_strength: config.enhancement_strength,
            office_path: config.office_path.clone(),
            office_timeout: config.office_timeout,
        }
    }

    /// Run `job` on the blocking pool once a worker permit is free.
    async fn run_blocking<T, F>(&self, operation: &'static str, job: F) -> Result<T, ConvertError>
    where
        F: FnOnce() -> Result<T, ConvertError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;
        let start = Instant::now();
        let result = tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| ConvertError::WorkerPool(format!("{operation} worker failed: {e}")))?;
        debug!(operation, elapsed_ms = start.elapsed().as_millis() as u64, ok = result.is_ok(), "job finished");
        result
    }
}

#[async_trait]
impl DocumentConverter for Engines {
    async fn images_to_pdf(
        &self,
        images: &[PathBuf],
        output: &Path,
        options: ConvertOptions,
    ) -> Result<usize, ConvertError> {
        let images = images.to_vec();
        let output = output.to_path_buf();
        let lib = self.pdfium_lib_path.clone();
        let dpi = options.quality.dpi();
        info!(images = images.len(), dpi, "images → PDF");

        self.run_blocking("images_to_pdf", move || {
            let pdfium = bind_pdfium(lib.as_deref())?;
            compose::compose_pdf(&pdfium, &images, &output, dpi)
        })
        .await
    }

    async fn pdf_to_images(
        &self,
        pdf: &Path,
        output: &Path,
        options: ConvertOptions,
    ) -> Result<usize, ConvertError> {
        let pdf = pdf.to_path_buf();
        let output = output.to_path_buf();
        let lib = self.pdfium_lib_path.clone();
        let max_pixels = self.max_rendered_pixels;
        info!(pdf = %pdf.display(), quality = %options.quality, format = %options.format, "PDF → images");

        self.run_blocking("pdf_to_images", move || {
            let parent = output.parent().unwrap_or_else(|| Path::new("."));
            let scratch = tempfile::Builder::new()
                .prefix(".pages-")
                .tempdir_in(parent)
                .map_err(|e| ConvertError::io(parent, e))?;
            let pdfium = bind_pdfium(lib.as_deref())?;
            let pages = render::render_pages_to_files(
                &pdfium,
                &pdf,
                scratch.path(),
                options.quality.dpi(),
                max_pixels,
                options.format,
            )?;
            archive::zip_files(&pages, &output)
        })
        .await
    }

    async fn office_to_pdf(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let _permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| ConvertError::WorkerPool(e.to_string()))?;
        info!(input = %input.display(), "office → PDF");
        office::convert_to_pdf(input, output, self.office_path.as_deref(), self.office_timeout).await
    }

    async fn enhance_image(&self, image: &Path, enhancement: Enhancement) -> Result<PathBuf, ConvertError> {
        let image = image.to_path_buf();
        let strength = self.enhancement_strength;
        self.run_blocking("enhance_image", move || {
            enhance::enhance_file(&image, enhancement, strength)
        })
        .await
    }

    async fn extract_text(&self, pdf: &Path) -> Result<String, ConvertError> {
        let pdf = pdf.to_path_buf();
        let lib = self.pdfium_lib_path.clone();
        self.run_blocking("extract_text", move || {
            let pdfium = bind_pdfium(lib.as_deref())?;
            render::extract_text(&pdfium, &pdf)
        })
        .await
    }
}
