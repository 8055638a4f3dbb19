//! Conversion dispatcher.
//!
//! Runs after every button click and after the custom-name dialogue accepts
//! a name. Takes the pending intent (read-and-clear, before any side effect)
//! and acts on it. Converter failures are reported generically and leave the
//! source queue untouched; nothing is retried.

use super::Bot;
use crate::convert::ConvertOptions;
use crate::error::{BotError, ConvertError};
use crate::menus;
use crate::session::{Action, ConversionType, DocumentKind, Enhancement, PendingIntent, Session, UserId};
use crate::transport::ChatId;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Act on the user's pending intent, if any.
pub(super) async fn run(bot: &Bot, user: UserId, chat: ChatId) -> Result<(), BotError> {
    let Some(intent) = bot.sessions.take_intent(user).await else {
        return Ok(());
    };
    info!(user = %user, ?intent, "dispatching");

    match intent {
        // A name survives a failed named conversion, so a plain retry still uses it.
        PendingIntent::Conversion(conversion) | PendingIntent::NamedConversion(conversion) => {
            let custom = bot.sessions.get_or_create(user).await.custom_filename;
            convert(bot, user, chat, conversion, custom).await
        }
        PendingIntent::Enhancement(enhancement) => enhance_queue(bot, user, chat, enhancement).await,
        PendingIntent::InfoQuery(kind) => {
            let session = bot.sessions.get_or_create(user).await;
            bot.send(chat, menus::document_info(kind, session.document(kind))).await;
            Ok(())
        }
        PendingIntent::Action(Action::ExtractText) => extract_text(bot, user, chat).await,
    }
}

/// Name of the file delivered for `conversion`.
///
/// `custom` wins when set; otherwise images are timestamped and documents
/// keep their stem.
pub(crate) fn output_file_name(
    conversion: ConversionType,
    custom: Option<&str>,
    source: Option<&Path>,
    timestamp: &str,
) -> String {
    let ext = conversion.output_extension();
    if let Some(name) = custom {
        return format!("{name}.{ext}");
    }
    let stem = source
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty());
    match (conversion, stem) {
        (ConversionType::ImagesPdf, _) | (_, None) => format!("converted_{timestamp}.{ext}"),
        (ConversionType::PdfImages, Some(stem)) => format!("{stem}_pages.{ext}"),
        (_, Some(stem)) => format!("{stem}.{ext}"),
    }
}

async fn output_dir(bot: &Bot, user: UserId) -> Result<PathBuf, BotError> {
    let dir = bot.user_dir(user).await?.join("out");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| BotError::io(&dir, e))?;
    Ok(dir)
}

async fn convert(
    bot: &Bot,
    user: UserId,
    chat: ChatId,
    conversion: ConversionType,
    custom: Option<String>,
) -> Result<(), BotError> {
    let session = bot.sessions.get_or_create(user).await;
    let options = ConvertOptions {
        quality: session.settings.quality,
        format: session.settings.format,
    };

    let source = match conversion.source_document() {
        None if session.images.is_empty() => {
            bot.send(chat, menus::no_images()).await;
            return Ok(());
        }
        None => None,
        Some(kind) => match session.document(kind) {
            Some(doc) => Some(doc.path.clone()),
            None => {
                bot.send(chat, menus::no_document(kind)).await;
                return Ok(());
            }
        },
    };

    let file_name = output_file_name(
        conversion,
        custom.as_deref(),
        source.as_deref(),
        &Local::now().format("%Y%m%d_%H%M%S").to_string(),
    );
    let output = output_dir(bot, user).await?.join(&file_name);
    bot.send(chat, menus::converting(conversion, session.images.len())).await;

    let result = match &source {
        None => images_to_pdf(bot, &session, &output, options).await,
        Some(path) if conversion == ConversionType::PdfImages => {
            bot.converter.pdf_to_images(path, &output, options).await.map(|_| ())
        }
        Some(path) => bot.converter.office_to_pdf(path, &output).await,
    };

    if let Err(e) = result {
        warn!(user = %user, %conversion, "conversion failed: {e}");
        bot.send(chat, menus::conversion_failed()).await;
        return Ok(());
    }

    let caption = menus::result_caption(conversion);
    if let Err(e) = bot.transport.send_document(chat, &output, &file_name, &caption).await {
        warn!(user = %user, %conversion, "delivering result failed: {e}");
        bot.send(chat, menus::conversion_failed()).await;
        return Ok(());
    }

    let named = custom.is_some();
    let total = bot
        .sessions
        .update(user, |s| {
            match conversion.source_document() {
                None => s.clear_images(),
                Some(kind) => {
                    s.clear_document(kind);
                }
            }
            if named {
                s.custom_filename = None;
            }
            s.conversions += 1;
            s.conversions
        })
        .await;
    info!(user = %user, %conversion, output = %file_name, conversions = total, "conversion delivered");
    bot.send(chat, menus::conversion_completed()).await;
    Ok(())
}

/// Compose the queue, first running auto-enhance on copies when enabled.
async fn images_to_pdf(
    bot: &Bot,
    session: &Session,
    output: &Path,
    options: ConvertOptions,
) -> Result<(), ConvertError> {
    if !session.settings.auto_enhance {
        return bot
            .converter
            .images_to_pdf(&session.images, output, options)
            .await
            .map(|_| ());
    }

    let copies = enhance_all(bot, &session.images, Enhancement::AutoEnhance).await;
    let result = bot.converter.images_to_pdf(&copies, output, options).await;
    for (copy, original) in copies.iter().zip(&session.images) {
        if copy != original {
            if let Err(e) = tokio::fs::remove_file(copy).await {
                debug!(path = %copy.display(), "could not remove enhanced copy: {e}");
            }
        }
    }
    result.map(|_| ())
}

/// Enhance every image, keeping the original path where enhancement fails.
///
/// Order is preserved; at most `max_concurrent_conversions` run at once.
async fn enhance_all(bot: &Bot, images: &[PathBuf], enhancement: Enhancement) -> Vec<PathBuf> {
    let converter = &bot.converter;
    stream::iter(images.iter().cloned())
        .map(|path| async move {
            match converter.enhance_image(&path, enhancement).await {
                Ok(out) => out,
                Err(e) => {
                    warn!(path = %path.display(), %enhancement, "enhancement failed: {e}");
                    path
                }
            }
        })
        .buffered(bot.config.max_concurrent_conversions)
        .collect()
        .await
}

async fn enhance_queue(
    bot: &Bot,
    user: UserId,
    chat: ChatId,
    enhancement: Enhancement,
) -> Result<(), BotError> {
    let images = bot.sessions.get_or_create(user).await.images;
    if images.is_empty() {
        bot.send(chat, menus::no_images_to_enhance()).await;
        return Ok(());
    }

    bot.send(chat, menus::enhancing(enhancement, images.len())).await;
    let results = enhance_all(bot, &images, enhancement).await;
    let enhanced = results.iter().zip(&images).filter(|(new, old)| new != old).count();
    let total = images.len();

    bot.sessions.update(user, |s| s.images = results).await;
    info!(user = %user, %enhancement, enhanced, total, "queue enhanced");
    bot.send(chat, menus::enhancement_applied(enhancement, enhanced, total)).await;
    Ok(())
}

async fn extract_text(bot: &Bot, user: UserId, chat: ChatId) -> Result<(), BotError> {
    let session = bot.sessions.get_or_create(user).await;
    let Some(pdf) = session.document(DocumentKind::Pdf) else {
        bot.send(chat, menus::no_document(DocumentKind::Pdf)).await;
        return Ok(());
    };

    bot.send(chat, menus::extracting_text()).await;
    let text = match bot.converter.extract_text(&pdf.path).await {
        Ok(text) => text,
        Err(e) => {
            warn!(user = %user, pdf = %pdf.path.display(), "text extraction failed: {e}");
            bot.send(chat, menus::extraction_failed()).await;
            return Ok(());
        }
    };
    if text.trim().is_empty() {
        bot.send(chat, menus::no_text_found()).await;
        return Ok(());
    }

    let stem = pdf
        .path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    let file_name = format!("{stem}.txt");
    let output = output_dir(bot, user).await?.join(&file_name);
    tokio::fs::write(&output, &text)
        .await
        .map_err(|e| BotError::io(&output, e))?;

    let caption = menus::text_caption(text.chars().count());
    if let Err(e) = bot.transport.send_document(chat, &output, &file_name, &caption).await {
        warn!(user = %user, "delivering extracted text failed: {e}");
        bot.send(chat, menus::extraction_failed()).await;
    }
    Ok(())
}
