//! Configuration types for the bot.
//!
//! All limits and engine knobs live in [`BotConfig`], built via its
//! [`BotConfigBuilder`]. The binary maps CLI flags and environment variables
//! onto the builder; tests build configs directly.

use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Bot-wide configuration.
///
/// # Example
/// ```rust
/// use docbot::{BotConfig, Quality};
///
/// let config = BotConfig::builder()
///     .work_dir("/tmp/docbot")
///     .max_images_per_pdf(20)
///     .default_quality(Quality::High)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_quality.dpi(), 300);
/// ```
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Directory where per-user upload folders are created.
    pub work_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 50 MB.
    pub max_file_size: u64,

    /// Advisory cap on queued images. Default: 50.
    ///
    /// Reaching it produces a warning; uploads are still appended.
    pub max_images_per_pdf: usize,

    /// Size of the conversion worker pool. Default: 5.
    pub max_concurrent_conversions: usize,

    /// Longest filename kept after sanitisation. Default: 255.
    pub max_filename_length: usize,

    /// Quality assigned to new sessions. Default: medium.
    pub default_quality: Quality,

    /// Page-image format assigned to new sessions. Default: PNG.
    pub default_format: OutputFormat,

    /// Whether new sessions start with auto-enhance on. Default: false.
    pub auto_enhance_default: bool,

    /// Decode uploaded images / check PDF magic bytes after download. Default: false.
    pub validate_files: bool,

    /// How long the custom-name dialogue waits for a filename. Default: 300 s.
    pub naming_timeout: Duration,

    /// Factor used by the brightness/contrast/sharpness/color enhancements. Default: 1.2.
    pub enhancement_strength: f32,

    /// Longest edge of a rendered PDF page in pixels. Default: 8000.
    ///
    /// An ultra (600 DPI) render of an A4 page is ~4960 × 7016 px; larger
    /// pages are scaled down so one poster cannot exhaust memory.
    pub max_rendered_pixels: u32,

    /// Explicit LibreOffice executable, tried before `libreoffice` / `soffice`.
    pub office_path: Option<PathBuf>,

    /// Upper bound for a single LibreOffice run. Default: 120 s.
    pub office_timeout: Duration,

    /// Directory holding the pdfium shared library. `None` binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("docbot"),
            max_file_size: 52_428_800,
            max_images_per_pdf: 50,
            max_concurrent_conversions: 5,
            max_filename_length: 255,
            default_quality: Quality::default(),
            default_format: OutputFormat::default(),
            auto_enhance_default: false,
            validate_files: false,
            naming_timeout: Duration::from_secs(300),
            enhancement_strength: 1.2,
            max_rendered_pixels: 8000,
            office_path: None,
            office_timeout: Duration::from_secs(120),
            pdfium_lib_path: None,
        }
    }
}

impl BotConfig {
    /// Create a new builder for `BotConfig`.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder {
            config: Self::default(),
        }
    }

    /// Upload limit expressed in whole megabytes, for user-facing texts.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / (1024 * 1024)
    }
}

/// Builder for [`BotConfig`].
#[derive(Debug)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_images_per_pdf(mut self, n: usize) -> Self {
        self.config.max_images_per_pdf = n.max(1);
        self
    }

    pub fn max_concurrent_conversions(mut self, n: usize) -> Self {
        self.config.max_concurrent_conversions = n.max(1);
        self
    }

    pub fn max_filename_length(mut self, n: usize) -> Self {
        self.config.max_filename_length = n;
        self
    }

    pub fn default_quality(mut self, quality: Quality) -> Self {
        self.config.default_quality = quality;
        self
    }

    pub fn default_format(mut self, format: OutputFormat) -> Self {
        self.config.default_format = format;
        self
    }

    pub fn auto_enhance_default(mut self, v: bool) -> Self {
        self.config.auto_enhance_default = v;
        self
    }

    pub fn validate_files(mut self, v: bool) -> Self {
        self.config.validate_files = v;
        self
    }

    pub fn naming_timeout(mut self, timeout: Duration) -> Self {
        self.config.naming_timeout = timeout;
        self
    }

    pub fn enhancement_strength(mut self, factor: f32) -> Self {
        self.config.enhancement_strength = factor.clamp(0.0, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn office_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.office_path = Some(path.into());
        self
    }

    pub fn office_timeout(mut self, timeout: Duration) -> Self {
        self.config.office_timeout = timeout;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BotConfig, BotError> {
        let c = &self.config;
        if c.max_file_size == 0 {
            return Err(BotError::InvalidConfig(
                "max file size must be > 0".into(),
            ));
        }
        if c.max_filename_length < 8 {
            return Err(BotError::InvalidConfig(format!(
                "max filename length must be ≥ 8, got {}",
                c.max_filename_length
            )));
        }
        if c.naming_timeout.is_zero() {
            return Err(BotError::InvalidConfig(
                "naming timeout must be > 0".into(),
            ));
        }
        if c.work_dir.as_os_str().is_empty() {
            return Err(BotError::InvalidConfig("work dir must be set".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Rendering quality, chosen per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// 72 DPI.
    Low,
    /// 150 DPI. (default)
    #[default]
    Medium,
    /// 300 DPI.
    High,
    /// 600 DPI.
    Ultra,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Low, Quality::Medium, Quality::High, Quality::Ultra];

    pub fn dpi(self) -> u32 {
        match self {
            Quality::Low => 72,
            Quality::Medium => 150,
            Quality::High => 300,
            Quality::Ultra => 600,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
            Quality::Ultra => "ultra",
        }
    }

    /// Capitalised name for menus.
    pub fn title(self) -> &'static str {
        match self {
            Quality::Low => "Low",
            Quality::Medium => "Medium",
            Quality::High => "High",
            Quality::Ultra => "Ultra",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            "ultra" => Ok(Quality::Ultra),
            other => Err(BotError::InvalidConfig(format!(
                "unknown quality '{other}' (expected low, medium, high or ultra)"
            ))),
        }
    }
}

/// Image format used for PDF → images output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "JPEG")]
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PNG" => Ok(OutputFormat::Png),
            "JPEG" | "JPG" => Ok(OutputFormat::Jpeg),
            other => Err(BotError::InvalidConfig(format!(
                "unknown output format '{other}' (expected PNG or JPEG)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let c = BotConfig::default();
        assert_eq!(c.max_file_size, 50 * 1024 * 1024);
        assert_eq!(c.max_images_per_pdf, 50);
        assert_eq!(c.max_concurrent_conversions, 5);
        assert_eq!(c.max_filename_length, 255);
        assert_eq!(c.naming_timeout, Duration::from_secs(300));
        assert_eq!(c.max_file_size_mb(), 50);
    }

    #[test]
    fn quality_dpi_table() {
        let dpis: Vec<u32> = Quality::ALL.iter().map(|q| q.dpi()).collect();
        assert_eq!(dpis, vec![72, 150, 300, 600]);
    }

    #[test]
    fn quality_parses_case_insensitively() {
        assert_eq!("ULTRA".parse::<Quality>().unwrap(), Quality::Ultra);
        assert!("extreme".parse::<Quality>().is_err());
    }

    #[test]
    fn format_accepts_jpg_alias() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("PNG".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("gif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn builder_clamps_pool_size() {
        let c = BotConfig::builder()
            .max_concurrent_conversions(0)
            .build()
            .unwrap();
        assert_eq!(c.max_concurrent_conversions, 1);
    }

    #[test]
    fn builder_rejects_zero_file_size() {
        let err = BotConfig::builder().max_file_size(0).build().unwrap_err();
        assert!(matches!(err, BotError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_tiny_filename_limit() {
        assert!(BotConfig::builder().max_filename_length(3).build().is_err());
    }
}
