//! Per-user session state.
//!
//! A [`Session`] is created lazily on a user's first event and lives until the
//! process exits. It holds the queued images, the most recent document of each
//! kind, the user's settings, and the one-shot [`PendingIntent`] slot that the
//! dispatcher consumes after every button click.
//!
//! The intent slot is private: callers go through [`Session::set_intent`] and
//! [`Session::take_intent`], so "read then clear" is a single operation and an
//! intent can never be acted on twice by accident.

pub mod store;

pub use store::SessionStore;

use crate::config::{BotConfig, OutputFormat, Quality};
use crate::dialogue::DialogueState;
use crate::error::BotError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Platform user identifier; sessions are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Identifiers carried in button payloads ───────────────────────────────

/// A source → target transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionType {
    ImagesPdf,
    PdfImages,
    WordPdf,
    ExcelPdf,
    TextPdf,
}

impl ConversionType {
    pub const ALL: [ConversionType; 5] = [
        ConversionType::ImagesPdf,
        ConversionType::PdfImages,
        ConversionType::WordPdf,
        ConversionType::ExcelPdf,
        ConversionType::TextPdf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConversionType::ImagesPdf => "images_pdf",
            ConversionType::PdfImages => "pdf_images",
            ConversionType::WordPdf => "word_pdf",
            ConversionType::ExcelPdf => "excel_pdf",
            ConversionType::TextPdf => "text_pdf",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ConversionType::ImagesPdf => "Images → PDF",
            ConversionType::PdfImages => "PDF → Images",
            ConversionType::WordPdf => "Word → PDF",
            ConversionType::ExcelPdf => "Excel → PDF",
            ConversionType::TextPdf => "Text → PDF",
        }
    }

    /// Document slot this conversion reads from; `None` means the image queue.
    pub fn source_document(self) -> Option<DocumentKind> {
        match self {
            ConversionType::ImagesPdf => None,
            ConversionType::PdfImages => Some(DocumentKind::Pdf),
            ConversionType::WordPdf => Some(DocumentKind::Word),
            ConversionType::ExcelPdf => Some(DocumentKind::Excel),
            ConversionType::TextPdf => Some(DocumentKind::Text),
        }
    }

    /// Extension of the file delivered to the user.
    pub fn output_extension(self) -> &'static str {
        match self {
            ConversionType::PdfImages => "zip",
            _ => "pdf",
        }
    }
}

impl fmt::Display for ConversionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionType {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConversionType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| BotError::UnknownPayload(format!("conversion '{s}'")))
    }
}

/// An image enhancement applied to every queued image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enhancement {
    Brightness,
    Contrast,
    Sharpness,
    Color,
    AutoEnhance,
    Grayscale,
    Blur,
}

impl Enhancement {
    pub const ALL: [Enhancement; 7] = [
        Enhancement::Brightness,
        Enhancement::Contrast,
        Enhancement::Sharpness,
        Enhancement::Color,
        Enhancement::AutoEnhance,
        Enhancement::Grayscale,
        Enhancement::Blur,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Enhancement::Brightness => "brightness",
            Enhancement::Contrast => "contrast",
            Enhancement::Sharpness => "sharpness",
            Enhancement::Color => "color",
            Enhancement::AutoEnhance => "auto_enhance",
            Enhancement::Grayscale => "grayscale",
            Enhancement::Blur => "blur",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Enhancement::Brightness => "Brightness",
            Enhancement::Contrast => "Contrast",
            Enhancement::Sharpness => "Sharpness",
            Enhancement::Color => "Color",
            Enhancement::AutoEnhance => "Auto enhance",
            Enhancement::Grayscale => "Grayscale",
            Enhancement::Blur => "Blur",
        }
    }
}

impl fmt::Display for Enhancement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Enhancement {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The enhance menu has always sent `enhance_auto`.
        if s == "auto" {
            return Ok(Enhancement::AutoEnhance);
        }
        Enhancement::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| BotError::UnknownPayload(format!("enhancement '{s}'")))
    }
}

/// Kinds of single-slot documents a session remembers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Word,
    Excel,
    Text,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::Pdf,
        DocumentKind::Word,
        DocumentKind::Excel,
        DocumentKind::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Word => "word",
            DocumentKind::Excel => "excel",
            DocumentKind::Text => "text",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "Word",
            DocumentKind::Excel => "Excel",
            DocumentKind::Text => "Text",
        }
    }

    /// Noun used in "not found" replies.
    pub fn noun(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Word => "Word document",
            DocumentKind::Excel => "Excel file",
            DocumentKind::Text => "text document",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "📄",
            DocumentKind::Word => "📝",
            DocumentKind::Excel => "📊",
            DocumentKind::Text => "📝",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| BotError::UnknownPayload(format!("document kind '{s}'")))
    }
}

/// Deferred one-off actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ExtractText,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ExtractText => "extract_text",
        }
    }
}

/// What the dispatcher must do next for a user.
///
/// Exactly one intent can be pending; recording a new one replaces the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PendingIntent {
    Conversion(ConversionType),
    Enhancement(Enhancement),
    InfoQuery(DocumentKind),
    Action(Action),
    /// Conversion whose output uses the session's `custom_filename`.
    NamedConversion(ConversionType),
}

// ── Session data ─────────────────────────────────────────────────────────

/// Per-user preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub quality: Quality,
    pub format: OutputFormat,
    pub auto_enhance: bool,
}

impl Settings {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            quality: config.default_quality,
            format: config.default_format,
            auto_enhance: config.auto_enhance_default,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&BotConfig::default())
    }
}

/// A downloaded document remembered as the "current" one of its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub file_id: String,
    /// Name as sent by the user (unsanitised, for display only).
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: Option<String>,
    /// Local copy under the user's work directory.
    pub path: PathBuf,
}

impl StoredDocument {
    pub fn size_mb(&self) -> f64 {
        self.file_size as f64 / (1024.0 * 1024.0)
    }
}

/// Everything the bot remembers about one user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    /// Queued image paths in upload order.
    pub images: Vec<PathBuf>,
    pub settings: Settings,
    pub conversions: u64,
    pub files_processed: u64,
    pub joined_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub current_pdf: Option<StoredDocument>,
    pub current_word: Option<StoredDocument>,
    pub current_excel: Option<StoredDocument>,
    pub current_text: Option<StoredDocument>,
    /// Conversion waiting for the custom-name dialogue to finish.
    pub pending_conversion: Option<ConversionType>,
    /// Sanitised output name chosen in the dialogue.
    pub custom_filename: Option<String>,
    pub dialogue: DialogueState,
    intent: Option<PendingIntent>,
}

impl Session {
    pub fn new(user_id: UserId, settings: Settings) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            images: Vec::new(),
            settings,
            conversions: 0,
            files_processed: 0,
            joined_at: now,
            last_used: now,
            current_pdf: None,
            current_word: None,
            current_excel: None,
            current_text: None,
            pending_conversion: None,
            custom_filename: None,
            dialogue: DialogueState::Idle,
            intent: None,
        }
    }

    pub fn document(&self, kind: DocumentKind) -> Option<&StoredDocument> {
        match kind {
            DocumentKind::Pdf => self.current_pdf.as_ref(),
            DocumentKind::Word => self.current_word.as_ref(),
            DocumentKind::Excel => self.current_excel.as_ref(),
            DocumentKind::Text => self.current_text.as_ref(),
        }
    }

    fn document_slot(&mut self, kind: DocumentKind) -> &mut Option<StoredDocument> {
        match kind {
            DocumentKind::Pdf => &mut self.current_pdf,
            DocumentKind::Word => &mut self.current_word,
            DocumentKind::Excel => &mut self.current_excel,
            DocumentKind::Text => &mut self.current_text,
        }
    }

    /// Store `doc` as the current document of `kind`, returning the one it replaces.
    pub fn set_document(&mut self, kind: DocumentKind, doc: StoredDocument) -> Option<StoredDocument> {
        self.document_slot(kind).replace(doc)
    }

    pub fn clear_document(&mut self, kind: DocumentKind) -> Option<StoredDocument> {
        self.document_slot(kind).take()
    }

    /// Append an image to the queue.
    ///
    /// The cap is advisory: the image is always appended, and the return
    /// value says whether the queue is now at or beyond `max`.
    pub fn push_image(&mut self, path: PathBuf, max: usize) -> bool {
        self.images.push(path);
        self.images.len() >= max
    }

    /// Count an accepted upload and refresh `last_used`.
    pub fn record_upload(&mut self) {
        self.files_processed += 1;
        self.last_used = Utc::now();
    }

    pub fn clear_images(&mut self) {
        self.images.clear();
    }

    /// Reset everything transient; counters, timestamps and settings survive.
    pub fn clear_transient(&mut self) {
        self.images.clear();
        for kind in DocumentKind::ALL {
            self.clear_document(kind);
        }
        self.pending_conversion = None;
        self.custom_filename = None;
        self.dialogue = DialogueState::Idle;
        self.intent = None;
    }

    pub fn intent(&self) -> Option<PendingIntent> {
        self.intent
    }

    /// Record an intent, returning any intent it replaced.
    pub fn set_intent(&mut self, intent: PendingIntent) -> Option<PendingIntent> {
        self.intent.replace(intent)
    }

    /// Read and clear the pending intent.
    pub fn take_intent(&mut self) -> Option<PendingIntent> {
        self.intent.take()
    }
}
