//! User-facing texts and inline keyboards.
//!
//! Pure render functions: they read session data and return a [`Reply`],
//! never mutate anything. Keep button payloads in sync with
//! [`crate::router::Callback::parse`].

use crate::config::{BotConfig, OutputFormat, Quality};
use crate::session::{ConversionType, DocumentKind, Enhancement, Session, StoredDocument};
use crate::transport::{Button, FileRef, Keyboard, Reply};
use std::path::PathBuf;

const PREVIEW_LIMIT: usize = 5;

fn btn(label: &str, payload: &str) -> Button {
    Button::new(label, payload)
}

fn back_to_main() -> Keyboard {
    Keyboard::new().row([btn("🔙 Back to Main", "back_to_main")])
}

fn back_to_settings() -> Keyboard {
    Keyboard::new().row([btn("🔙 Back to Settings", "show_settings")])
}

fn on_off(v: bool) -> &'static str {
    if v {
        "On"
    } else {
        "Off"
    }
}

fn check(selected: bool) -> &'static str {
    if selected {
        " ✅"
    } else {
        ""
    }
}

fn main_keyboard() -> Keyboard {
    Keyboard::new()
        .row([btn("📚 Help", "show_help"), btn("🎛️ Settings", "show_settings")])
        .row([btn("📊 Stats", "show_stats"), btn("📋 Formats", "show_formats")])
        .row([btn("🧹 Clear Session", "clear_session")])
}

// ── Main, help, stats ────────────────────────────────────────────────────

pub fn welcome(first_name: Option<&str>, config: &BotConfig) -> Reply {
    let name = first_name.unwrap_or("there");
    Reply::text(format!(
        "🚀 Welcome {name}!\n\n\
         I convert your files:\n\
         📸 Images → PDF (up to {max} images), with enhancement options\n\
         📄 PDF → Images (PNG or JPEG, delivered as a ZIP)\n\
         📝 Word, 📊 Excel and text files → PDF\n\
         🔍 Text extraction from PDFs\n\
         ✏️ Custom output names\n\n\
         📊 File size limit: {mb}MB\n\n\
         Just send me a file to get started!",
        max = config.max_images_per_pdf,
        mb = config.max_file_size_mb(),
    ))
    .with_keyboard(main_keyboard())
}

pub fn main_menu() -> Reply {
    Reply::text("🚀 Document Converter\n\nReady to convert your files!\nSend me any supported file to get started.")
        .with_keyboard(main_keyboard())
}

pub fn help() -> Reply {
    Reply::text(
        "📚 Help\n\n\
         📸 Images: send photos, then Convert to PDF\n\
         📄 PDFs: send a PDF to extract pages as images or text\n\
         📝 Documents: send DOCX/XLSX/TXT to convert to PDF\n\
         ✏️ Custom Names: click \"📝 Custom Name\" before converting\n\n\
         Commands:\n\
         /start - Main menu\n\
         /help - This help\n\
         /stats - Your statistics\n\
         /settings - Preferences\n\
         /formats - Supported formats\n\
         /clear - Clear session\n\
         /cancel - Cancel custom naming\n\n\
         Tip: send multiple images for batch conversion!",
    )
    .with_keyboard(back_to_main())
}

pub fn stats(session: &Session) -> Reply {
    Reply::text(format!(
        "📊 Your Statistics\n\n\
         🔄 Conversions: {}\n\
         📁 Files Processed: {}\n\
         📸 Images in Queue: {}\n\
         📅 Member Since: {}\n\
         🕐 Last Used: {}",
        session.conversions,
        session.files_processed,
        session.images.len(),
        session.joined_at.format("%Y-%m-%d"),
        session.last_used.format("%Y-%m-%d %H:%M"),
    ))
    .with_keyboard(back_to_main())
}

pub fn formats(config: &BotConfig) -> Reply {
    Reply::text(format!(
        "📋 Supported Formats\n\n\
         📸 Images: JPG, PNG, GIF, BMP, TIFF, WEBP → PDF\n\
         📄 PDF → Images (PNG/JPEG in a ZIP), PDF → Text\n\
         📝 Word: DOCX, DOC → PDF\n\
         📊 Excel: XLSX, XLS → PDF\n\
         📄 Text: TXT, HTML, HTM, MD → PDF\n\n\
         Max file size: {}MB\n\
         Max images per PDF: {}\n\
         Concurrent conversions: {}",
        config.max_file_size_mb(),
        config.max_images_per_pdf,
        config.max_concurrent_conversions,
    ))
    .with_keyboard(back_to_main())
}

// ── Settings ─────────────────────────────────────────────────────────────

fn settings_keyboard(back: (&str, &str)) -> Keyboard {
    Keyboard::new()
        .row([btn("📸 Quality", "setting_quality"), btn("🖼️ Format", "setting_format")])
        .row([btn("✨ Auto-Enhance", "setting_auto_enhance")])
        .row([btn(back.0, back.1)])
}

fn settings_lines(session: &Session) -> String {
    let s = &session.settings;
    format!(
        "📸 Quality: {} ({} DPI)\n🖼️ Format: {}\n✨ Auto-Enhance: {}",
        s.quality.title(),
        s.quality.dpi(),
        s.format,
        on_off(s.auto_enhance)
    )
}

pub fn settings(session: &Session) -> Reply {
    Reply::text(format!(
        "🎛️ Current Settings\n\n{}\n\nClick below to change settings:",
        settings_lines(session)
    ))
    .with_keyboard(settings_keyboard(("🔙 Back to Main", "back_to_main")))
}

pub fn conversion_settings(session: &Session) -> Reply {
    Reply::text(format!(
        "⚙️ Conversion Settings\n\n{}\n\nChange settings before converting:",
        settings_lines(session)
    ))
    .with_keyboard(settings_keyboard(("🔙 Back", "back_to_images")))
}

pub fn pdf_settings(session: &Session) -> Reply {
    let s = &session.settings;
    Reply::text(format!(
        "⚙️ PDF Conversion Settings\n\n📸 Quality: {}\n🖼️ Format: {}\n\n\
         These settings will be used for PDF to images conversion.",
        s.quality.title(),
        s.format
    ))
    .with_keyboard(
        Keyboard::new()
            .row([
                btn("📸 Change Quality", "setting_quality"),
                btn("🖼️ Change Format", "setting_format"),
            ])
            .row([btn("🔙 Back", "back_to_main")]),
    )
}

pub fn quality_picker(current: Quality) -> Reply {
    let mut text = format!("📸 Select Image Quality\n\nCurrent: {}\n", current.title());
    for q in Quality::ALL {
        text.push_str(&format!("\n• {} ({} DPI)", q.title(), q.dpi()));
    }
    let b = |q: Quality, icon: &str| {
        btn(
            &format!("{icon} {}{}", q.title(), check(q == current)),
            &format!("quality_{}", q.as_str()),
        )
    };
    Reply::text(text).with_keyboard(
        Keyboard::new()
            .row([b(Quality::Low, "📉"), b(Quality::Medium, "📊")])
            .row([b(Quality::High, "📈"), b(Quality::Ultra, "🚀")])
            .row([btn("🔙 Back to Settings", "show_settings")]),
    )
}

pub fn format_picker(current: OutputFormat) -> Reply {
    let b = |f: OutputFormat| {
        btn(
            &format!("{}{}", f.as_str(), check(f == current)),
            &format!("format_{}", f.as_str()),
        )
    };
    Reply::text(format!(
        "🖼️ Select Output Format\n\nCurrent: {current}\n\n• PNG: Lossless, larger files\n• JPEG: Compressed, smaller files"
    ))
    .with_keyboard(
        Keyboard::new()
            .row([b(OutputFormat::Png), b(OutputFormat::Jpeg)])
            .row([btn("🔙 Back to Settings", "show_settings")]),
    )
}

pub fn quality_set(q: Quality) -> Reply {
    Reply::text(format!(
        "📸 Quality set to {}!\n\nThis setting will be used for all future conversions.",
        q.title()
    ))
    .with_keyboard(Keyboard::new().row([
        btn("🔙 Back to Settings", "show_settings"),
        btn("📄 Convert Images Now", "convert_images_pdf"),
    ]))
}

pub fn format_set(f: OutputFormat) -> Reply {
    Reply::text(format!(
        "🖼️ Format set to {f}!\n\nThis will be used for PDF to images conversion."
    ))
    .with_keyboard(back_to_settings())
}

pub fn auto_enhance_toggled(enabled: bool) -> Reply {
    let (status, effect) = if enabled {
        ("Enabled", "automatically enhanced")
    } else {
        ("Disabled", "converted without enhancement")
    };
    Reply::text(format!(
        "✨ Auto-enhance {status}!\n\nImages will be {effect} before PDF conversion."
    ))
    .with_keyboard(back_to_settings())
}

// ── Images ───────────────────────────────────────────────────────────────

fn image_keyboard() -> Keyboard {
    Keyboard::new()
        .row([
            btn("📄 Convert to PDF", "convert_images_pdf"),
            btn("📝 Custom Name", "custom_name_images_pdf"),
        ])
        .row([btn("📸 Add More", "add_more"), btn("🎨 Enhance", "enhance_menu")])
        .row([
            btn("👁️ Preview", "preview_images"),
            btn("⚙️ Settings", "conversion_settings"),
        ])
        .row([btn("🗑️ Clear All", "clear_images"), btn("🏠 Main Menu", "back_to_main")])
}

pub fn image_received(count: usize, max: usize) -> Reply {
    Reply::text(format!(
        "📸 Image received! ({count}/{max} total)\n\nWhat would you like to do?"
    ))
    .with_keyboard(image_keyboard())
}

pub fn image_document_received(count: usize, max: usize, mime: Option<&str>) -> Reply {
    Reply::text(format!(
        "🖼️ Image document received! ({count}/{max} total)\nFormat: {}",
        mime.unwrap_or("unknown")
    ))
    .with_keyboard(image_keyboard())
}

pub fn image_limit_reached(max: usize) -> Reply {
    Reply::text(format!(
        "⚠️ Maximum {max} images reached! Please convert current batch first."
    ))
}

pub fn image_menu(count: usize) -> Reply {
    Reply::text(format!("📸 Images in queue: {count}\n\nWhat would you like to do?"))
        .with_keyboard(image_keyboard())
}

pub fn add_more() -> Reply {
    Reply::text("📸 Send more images to add to your collection!")
}

pub fn images_cleared() -> Reply {
    Reply::text("🗑️ Images cleared! Send new images to start over.").with_keyboard(back_to_main())
}

pub fn session_cleared() -> Reply {
    Reply::text("🧹 Session cleared! Ready for new conversions!").with_keyboard(back_to_main())
}

/// First few queued images with their size on disk.
pub fn preview(images: &[PathBuf]) -> Reply {
    if images.is_empty() {
        return Reply::text("📸 No images in queue.")
            .with_keyboard(Keyboard::new().row([btn("🔙 Back", "back_to_main")]));
    }
    let mut text = format!("👁️ Image Preview\n\nTotal images: {}\n\n", images.len());
    for (i, path) in images.iter().take(PREVIEW_LIMIT).enumerate() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match std::fs::metadata(path) {
            Ok(meta) => text.push_str(&format!(
                "{}. {name} ({:.1} KB)\n",
                i + 1,
                meta.len() as f64 / 1024.0
            )),
            Err(_) => text.push_str(&format!("{}. {name}\n", i + 1)),
        }
    }
    if images.len() > PREVIEW_LIMIT {
        text.push_str(&format!("... and {} more", images.len() - PREVIEW_LIMIT));
    }
    Reply::text(text).with_keyboard(
        Keyboard::new()
            .row([
                btn("📄 Convert to PDF", "convert_images_pdf"),
                btn("📝 Custom Name", "custom_name_images_pdf"),
            ])
            .row([btn("🔙 Back", "back_to_images")]),
    )
}

pub fn enhance_menu() -> Reply {
    let b = |e: Enhancement, icon: &str| btn(&format!("{icon} {}", e.title()), &format!("enhance_{}", e.as_str()));
    Reply::text("🎨 Choose enhancement type:").with_keyboard(
        Keyboard::new()
            .row([b(Enhancement::Brightness, "🔆"), b(Enhancement::Contrast, "🌟")])
            .row([b(Enhancement::Sharpness, "📏"), b(Enhancement::Color, "🎨")])
            .row([b(Enhancement::AutoEnhance, "✨"), b(Enhancement::Grayscale, "⚫")])
            .row([b(Enhancement::Blur, "💧"), btn("🔙 Back", "back_to_images")]),
    )
}

// ── Documents ────────────────────────────────────────────────────────────

/// Acknowledgement for a stored document, with its conversion buttons.
pub fn document_received(kind: DocumentKind, doc: &StoredDocument) -> Reply {
    let conversion = match kind {
        DocumentKind::Pdf => ConversionType::PdfImages,
        DocumentKind::Word => ConversionType::WordPdf,
        DocumentKind::Excel => ConversionType::ExcelPdf,
        DocumentKind::Text => ConversionType::TextPdf,
    };
    let convert_label = match kind {
        DocumentKind::Pdf => "🖼️ Convert to Images",
        _ => "📄 Convert to PDF",
    };
    let first_row = [
        btn(convert_label, &format!("convert_{conversion}")),
        btn("📝 Custom Name", &format!("custom_name_{conversion}")),
    ];
    let info = btn(&format!("📊 {} Info", kind.label()), &format!("{}_info", kind.as_str()));
    let main = btn("🏠 Main Menu", "back_to_main");

    let keyboard = match kind {
        DocumentKind::Pdf => Keyboard::new()
            .row(first_row)
            .row([info, btn("🔍 Extract Text", "extract_text")])
            .row([btn("⚙️ Settings", "pdf_settings"), main]),
        _ => Keyboard::new().row(first_row).row([info, main]),
    };

    Reply::text(format!(
        "{} {} received!\n\n📁 Name: {}\n📏 Size: {:.2} MB",
        kind.icon(),
        kind.label(),
        doc.file_name,
        doc.size_mb()
    ))
    .with_keyboard(keyboard)
}

pub fn unsupported_document(file: &FileRef) -> Reply {
    Reply::text(format!(
        "📄 Document received: {}\nType: {}\nSize: {:.2} MB\n\n\
         This file type is not directly supported for conversion, but you can try:\n\
         • Save as PDF if possible\n\
         • Convert to a supported format first\n\
         • Use /formats to see supported types",
        file.file_name.as_deref().unwrap_or("unnamed"),
        file.mime_type.as_deref().unwrap_or("Unknown"),
        file.file_size.unwrap_or(0) as f64 / (1024.0 * 1024.0),
    ))
    .with_keyboard(Keyboard::new().row([btn("🏠 Main Menu", "back_to_main")]))
}

/// Name and size of the stored document of `kind`, or a "not found" note.
pub fn document_info(kind: DocumentKind, doc: Option<&StoredDocument>) -> Reply {
    match doc {
        Some(d) => Reply::text(format!(
            "{} {}: {}\nSize: {:.2} MB",
            kind.icon(),
            kind.label(),
            d.file_name,
            d.size_mb()
        )),
        None => Reply::text(format!("❌ No {} found", kind.noun())),
    }
}

// ── Request acknowledgements ─────────────────────────────────────────────

pub fn conversion_requested(conversion: ConversionType) -> Reply {
    Reply::text(format!("🔄 {} conversion requested! Processing...", conversion.title()))
}

pub fn enhancement_requested(enhancement: Enhancement) -> Reply {
    Reply::text(format!("🎨 {} enhancement requested!", enhancement.title()))
}

pub fn info_requested(kind: DocumentKind) -> Reply {
    Reply::text(format!("📊 {} info requested!", kind.label()))
}

pub fn text_extraction_requested() -> Reply {
    Reply::text("🔍 Text extraction requested!")
}

// ── Custom-name dialogue ─────────────────────────────────────────────────

pub fn naming_prompt() -> Reply {
    Reply::text(
        "📝 Custom Filename\n\n\
         Please send the custom filename you want to use.\n\
         Don't include the file extension (.pdf, .zip etc.) - I'll add it automatically!\n\n\
         Type /cancel to go back to conversion options.",
    )
}

pub fn name_rejected() -> Reply {
    Reply::text(
        "❌ Invalid filename! Please try again with a valid name.\n\
         Use letters, numbers, spaces, dots, hyphens and underscores only.",
    )
}

pub fn name_accepted(name: &str) -> Reply {
    Reply::text(format!("✅ Custom filename set: {name}\n\n🔄 Starting conversion..."))
}

pub fn naming_cancelled() -> Reply {
    Reply::text("❌ Custom naming cancelled.")
}

pub fn naming_reminder() -> Reply {
    Reply::text("📝 I'm waiting for a filename. Send a name, or /cancel to stop custom naming.")
}

pub fn naming_expired() -> Reply {
    Reply::text("⌛ Custom naming timed out. Use the menu to start again.")
}

pub fn unknown_command(name: &str) -> Reply {
    Reply::text(format!("🤔 Unknown command /{name}. Try /help."))
}

pub fn send_a_file() -> Reply {
    Reply::text("📎 Send me a file to convert, or /help to see what I can do.")
}

// ── Dispatcher results ───────────────────────────────────────────────────

pub fn no_images() -> Reply {
    Reply::text("❌ No images found! Send some images first.")
}

pub fn no_document(kind: DocumentKind) -> Reply {
    Reply::text(format!("❌ No {} found! Please upload one first.", kind.noun()))
}

pub fn converting(conversion: ConversionType, items: usize) -> Reply {
    match conversion {
        ConversionType::ImagesPdf => Reply::text(format!("🔄 Converting {items} images to PDF...")),
        other => Reply::text(format!("🔄 Converting {}...", other.title())),
    }
}

/// Caption attached to a delivered conversion result.
pub fn result_caption(conversion: ConversionType) -> String {
    match conversion {
        ConversionType::ImagesPdf => "✅ PDF created successfully! 📄✨".into(),
        ConversionType::PdfImages => "✅ PDF pages converted to images! 🖼️".into(),
        other => format!("✅ {} conversion completed! 📄", other.title()),
    }
}

pub fn conversion_completed() -> Reply {
    Reply::text("🎉 Conversion completed!").with_keyboard(back_to_main())
}

pub fn conversion_failed() -> Reply {
    Reply::text("❌ Conversion failed! Your files are still queued, please try again.")
        .with_keyboard(back_to_main())
}

pub fn no_images_to_enhance() -> Reply {
    Reply::text("❌ No images to enhance!")
}

pub fn enhancing(enhancement: Enhancement, count: usize) -> Reply {
    Reply::text(format!("🎨 Applying {} enhancement to {count} images...", enhancement.title()))
}

pub fn enhancement_applied(enhancement: Enhancement, enhanced: usize, total: usize) -> Reply {
    let mut text = format!("✅ {} enhancement applied to {enhanced} images!", enhancement.title());
    if enhanced < total {
        text.push_str(&format!("
⚠️ {} images could not be enhanced and were kept as-is.", total - enhanced));
    }
    Reply::text(text).with_keyboard(image_keyboard())
}

pub fn extracting_text() -> Reply {
    Reply::text("🔍 Extracting text from PDF...")
}

pub fn no_text_found() -> Reply {
    Reply::text("❌ No text found in the PDF. It may be a scanned document.")
}

pub fn text_caption(chars: usize) -> String {
    format!("📝 Extracted text ({chars} characters)")
}

pub fn extraction_failed() -> Reply {
    Reply::text("❌ Text extraction failed!")
}
