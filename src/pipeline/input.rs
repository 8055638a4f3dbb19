//! Downloaded-file handling: local names and content validation.
//!
//! Uploads land in `<work_dir>/<user_id>/`. Photos get generated names;
//! documents keep their sanitised original name, made unique if a file of
//! that name already exists. When validation is enabled, a PDF must start
//! with the `%PDF` magic bytes and an image must decode; anything else is
//! rejected before the session sees it, so a corrupt upload fails with a
//! clear message instead of a pdfium or codec error at conversion time.

use crate::error::BotError;
use crate::sanitize::{is_safe_filename, sanitize_filename_with_limit, PLACEHOLDER};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name for the `n`-th queued photo: `img_<n>_<id>.jpg`.
pub fn photo_file_name(n: usize) -> String {
    format!("img_{n}_{}.jpg", super::short_id())
}

/// Local name for an uploaded image document.
///
/// Falls back to `image_<id>.jpg` when the sanitised name is unusable.
pub fn image_document_name(original: Option<&str>, max_len: usize) -> String {
    let name = sanitize_filename_with_limit(original.unwrap_or("image.jpg"), max_len);
    if name == PLACEHOLDER || name.starts_with(&format!("{PLACEHOLDER}.")) || !is_safe_filename(&name) {
        format!("image_{}.jpg", super::short_id())
    } else {
        name
    }
}

/// Local name for any other uploaded document.
pub fn document_name(original: Option<&str>, fallback: &str, max_len: usize) -> String {
    let name = sanitize_filename_with_limit(original.unwrap_or(fallback), max_len);
    if is_safe_filename(&name) {
        name
    } else {
        fallback.to_string()
    }
}

/// `dir/name`, or `dir/<stem>_<id>.<ext>` if that already exists.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let id = super::short_id();
    let renamed = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{id}.{ext}"),
        _ => format!("{name}_{id}"),
    };
    dir.join(renamed)
}

/// Check the `%PDF` magic bytes.
pub fn check_pdf(path: &Path) -> Result<(), BotError> {
    let mut file = std::fs::File::open(path).map_err(|e| BotError::io(path, e))?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(BotError::InvalidFile {
            path: path.to_path_buf(),
            expected: "PDF",
            detail: format!("bad magic bytes {magic:?}"),
        });
    }
    debug!(path = %path.display(), "PDF magic ok");
    Ok(())
}

/// Decode the image fully; format is guessed from content, not extension.
pub fn check_image(path: &Path) -> Result<(), BotError> {
    let invalid = |detail: String| BotError::InvalidFile {
        path: path.to_path_buf(),
        expected: "image",
        detail,
    };
    if let Err(e) = std::fs::metadata(path) {
        return Err(BotError::io(path, e));
    }
    super::open_image(path).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}
