//! Error types for the docbot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BotError`] — failures while handling an inbound event: transport
//!   hiccups, rejected uploads, unknown button payloads, bad configuration.
//!   Caught at the router boundary in [`crate::bot::Bot::handle`], logged, and
//!   turned into a short user-facing message via [`BotError::user_message`].
//!
//! * [`ConvertError`] — an external engine (pdfium, LibreOffice, the image
//!   codecs) failed. The dispatcher reports these generically and leaves the
//!   user's queue untouched so they can retry from the menu.
//!
//! Technical detail lives in the `Display` output, which only goes to the log.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while routing and handling one inbound event.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Transport errors ──────────────────────────────────────────────────
    /// Delivering or acknowledging a message failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Fetching an uploaded file from the transport failed.
    #[error("download of '{file_id}' failed: {reason}")]
    Download { file_id: String, reason: String },

    // ── Validation errors ─────────────────────────────────────────────────
    /// Upload exceeds the configured size limit.
    #[error("file of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// Downloaded file failed content validation.
    #[error("invalid {expected} file at '{path}': {detail}")]
    InvalidFile {
        path: PathBuf,
        expected: &'static str,
        detail: String,
    },

    /// A button payload that no handler recognises.
    #[error("unknown button payload '{0}'")]
    UnknownPayload(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Non-technical message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            BotError::FileTooLarge { limit, .. } => format!(
                "❌ File too large! Maximum size is {} MB.",
                limit / (1024 * 1024)
            ),
            BotError::InvalidFile { expected, .. } => format!("❌ Invalid {expected} file!"),
            BotError::Download { .. } => "❌ Error downloading file. Please try again.".into(),
            BotError::UnknownPayload(_) => "❌ Unknown option. Please use the menu again.".into(),
            BotError::Transport(_)
            | BotError::InvalidConfig(_)
            | BotError::Io { .. }
            | BotError::Internal(_) => "❌ An error occurred. Please try again.".into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BotError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A conversion engine failed.
///
/// Never retried automatically; the user re-triggers from the menu.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The pdfium shared library could not be bound.
    #[error("pdfium library unavailable: {0}")]
    PdfiumUnavailable(String),

    /// pdfium could not load or rasterise a document.
    #[error("PDF rendering failed for '{path}': {detail}")]
    Render { path: PathBuf, detail: String },

    /// Building a PDF out of images failed.
    #[error("PDF composition failed: {0}")]
    Compose(String),

    /// No source item could be used.
    #[error("nothing to convert: {0}")]
    NoUsableInput(String),

    /// LibreOffice ran but produced no PDF.
    #[error("office conversion of '{path}' failed: {detail}")]
    Office { path: PathBuf, detail: String },

    /// None of the LibreOffice executables could be started.
    #[error("no office converter found (tried {tried:?})")]
    OfficeUnavailable { tried: Vec<String> },

    /// An image could not be decoded, processed or encoded.
    #[error("image enhancement failed for '{path}': {detail}")]
    Enhance { path: PathBuf, detail: String },

    /// Packaging rendered pages failed.
    #[error("archive creation failed: {0}")]
    Archive(String),

    /// The engine did not finish in time.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The worker pool is closed or a worker panicked.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }
}
