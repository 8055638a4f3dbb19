//! Classification of inbound events.
//!
//! [`route`] decides which family an event belongs to; [`Callback::parse`]
//! turns a button payload into a typed operation. Button payloads are
//! matched by prefix in a fixed order:
//!
//! 1. `custom_name_<conversion>`
//! 2. `convert_<conversion>`
//! 3. `enhance_<enhancement>` (`enhance_menu` opens the picker)
//! 4. `setting_*`, `quality_*`, `format_*`
//! 5. `show_*`
//! 6. everything else ("general")

use crate::config::{OutputFormat, Quality};
use crate::error::BotError;
use crate::session::{ConversionType, DocumentKind, Enhancement};
use crate::transport::{EventPayload, FileRef, MessageId};

/// Slash commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Stats,
    Settings,
    Formats,
    Clear,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse `/name[@bot] [args]`; `None` when `text` is not a command.
    pub fn parse(text: &str) -> Option<Command> {
        let rest = text.trim().strip_prefix('/')?;
        let word = rest.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("").to_ascii_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "stats" => Command::Stats,
            "settings" => Command::Settings,
            "formats" => Command::Formats,
            "clear" => Command::Clear,
            "cancel" => Command::Cancel,
            _ => Command::Unknown(name),
        })
    }
}

/// Settings family (`setting_*`, `quality_*`, `format_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingCallback {
    QualityMenu,
    FormatMenu,
    ToggleAutoEnhance,
    SetQuality(Quality),
    SetFormat(OutputFormat),
}

/// `show_*` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTarget {
    Help,
    Stats,
    Settings,
    Formats,
}

/// Ungrouped button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralCallback {
    ClearSession,
    ClearImages,
    AddMore,
    PreviewImages,
    ConversionSettings,
    BackToMain,
    BackToImages,
    Info(DocumentKind),
    PdfSettings,
    ExtractText,
}

/// A parsed inline-button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    CustomName(ConversionType),
    Convert(ConversionType),
    EnhanceMenu,
    Enhance(Enhancement),
    Setting(SettingCallback),
    Show(ShowTarget),
    General(GeneralCallback),
}

impl Callback {
    pub fn parse(data: &str) -> Result<Callback, BotError> {
        let unknown = || BotError::UnknownPayload(data.to_string());

        if let Some(rest) = data.strip_prefix("custom_name_") {
            return rest.parse().map(Callback::CustomName).map_err(|_| unknown());
        }
        if let Some(rest) = data.strip_prefix("convert_") {
            return rest.parse().map(Callback::Convert).map_err(|_| unknown());
        }
        if let Some(rest) = data.strip_prefix("enhance_") {
            if rest == "menu" {
                return Ok(Callback::EnhanceMenu);
            }
            return rest.parse().map(Callback::Enhance).map_err(|_| unknown());
        }
        if data.starts_with("setting_") || data.starts_with("quality_") || data.starts_with("format_") {
            return parse_setting(data).map(Callback::Setting).ok_or_else(unknown);
        }
        if let Some(rest) = data.strip_prefix("show_") {
            let target = match rest {
                "help" => ShowTarget::Help,
                "stats" => ShowTarget::Stats,
                "settings" => ShowTarget::Settings,
                "formats" => ShowTarget::Formats,
                _ => return Err(unknown()),
            };
            return Ok(Callback::Show(target));
        }
        parse_general(data).map(Callback::General).ok_or_else(unknown)
    }
}

fn parse_setting(data: &str) -> Option<SettingCallback> {
    match data {
        "setting_quality" => return Some(SettingCallback::QualityMenu),
        "setting_format" => return Some(SettingCallback::FormatMenu),
        "setting_auto_enhance" => return Some(SettingCallback::ToggleAutoEnhance),
        _ => {}
    }
    if let Some(q) = data.strip_prefix("quality_") {
        return q.parse().ok().map(SettingCallback::SetQuality);
    }
    if let Some(f) = data.strip_prefix("format_") {
        return f.parse().ok().map(SettingCallback::SetFormat);
    }
    None
}

fn parse_general(data: &str) -> Option<GeneralCallback> {
    let general = match data {
        "clear_session" => GeneralCallback::ClearSession,
        "clear_images" => GeneralCallback::ClearImages,
        "add_more" => GeneralCallback::AddMore,
        "preview_images" => GeneralCallback::PreviewImages,
        "conversion_settings" => GeneralCallback::ConversionSettings,
        "back_to_main" => GeneralCallback::BackToMain,
        "back_to_images" => GeneralCallback::BackToImages,
        "pdf_settings" => GeneralCallback::PdfSettings,
        "extract_text" => GeneralCallback::ExtractText,
        other => {
            let kind = other.strip_suffix("_info")?.parse().ok()?;
            GeneralCallback::Info(kind)
        }
    };
    Some(general)
}

/// What an uploaded file is, for the purpose of picking a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Compressed photo.
    Photo,
    /// Image sent as a document.
    Image,
    Pdf,
    Word,
    Excel,
    Text,
    Other,
}

const WORD_MIMES: [&str; 2] = [
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];
const EXCEL_MIMES: [&str; 2] = [
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];
const IMAGE_EXTENSIONS: [&str; 9] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "ico"];

/// Classify a document upload by MIME type, falling back to the extension.
pub fn classify_document(file: &FileRef) -> UploadKind {
    let mime = file.mime_type.as_deref().unwrap_or("").to_ascii_lowercase();
    let ext = file
        .file_name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();

    if mime.starts_with("image/") || IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        UploadKind::Image
    } else if mime == "application/pdf" || ext == "pdf" {
        UploadKind::Pdf
    } else if WORD_MIMES.contains(&mime.as_str()) || ext == "docx" || ext == "doc" {
        UploadKind::Word
    } else if EXCEL_MIMES.contains(&mime.as_str()) || ext == "xlsx" || ext == "xls" {
        UploadKind::Excel
    } else if mime.starts_with("text/") || matches!(ext.as_str(), "txt" | "md" | "html" | "htm") {
        UploadKind::Text
    } else {
        UploadKind::Other
    }
}

/// Top-level classification of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Command(Command),
    Text(&'a str),
    Callback { data: &'a str, message: MessageId },
    Upload { kind: UploadKind, file: &'a FileRef },
}

pub fn route(payload: &EventPayload) -> Route<'_> {
    match payload {
        EventPayload::Text { text } => match Command::parse(text) {
            Some(cmd) => Route::Command(cmd),
            None => Route::Text(text),
        },
        EventPayload::Callback { data, message_id } => Route::Callback {
            data,
            message: *message_id,
        },
        EventPayload::Photo(file) => Route::Upload {
            kind: UploadKind::Photo,
            file,
        },
        EventPayload::Document(file) => Route::Upload {
            kind: classify_document(file),
            file,
        },
    }
}
