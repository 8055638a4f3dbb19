//! Upload handlers: size check, download, validation, then session update.
//!
//! Nothing touches the session until the file is on disk and valid. A failed
//! download or validation deletes whatever was written.

use super::Bot;
use crate::error::BotError;
use crate::menus;
use crate::pipeline::input;
use crate::router::UploadKind;
use crate::session::{DocumentKind, StoredDocument, UserId};
use crate::transport::{ChatId, FileRef};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

impl Bot {
    pub(super) async fn handle_upload(
        &self,
        user: UserId,
        chat: ChatId,
        kind: UploadKind,
        file: &FileRef,
    ) -> Result<(), BotError> {
        let document_kind = match kind {
            UploadKind::Photo | UploadKind::Image => None,
            UploadKind::Pdf => Some(DocumentKind::Pdf),
            UploadKind::Word => Some(DocumentKind::Word),
            UploadKind::Excel => Some(DocumentKind::Excel),
            UploadKind::Text => Some(DocumentKind::Text),
            UploadKind::Other => {
                debug!(user = %user, mime = ?file.mime_type, name = ?file.file_name, "unsupported upload");
                self.send(chat, menus::unsupported_document(file)).await;
                return Ok(());
            }
        };

        if let Some(size) = file.file_size.filter(|&s| s > self.config.max_file_size) {
            return Err(BotError::FileTooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }

        let dir = self.user_dir(user).await?;
        let max_len = self.config.max_filename_length;
        let dest = match kind {
            UploadKind::Photo => {
                let n = self.sessions.get_or_create(user).await.images.len() + 1;
                dir.join(input::photo_file_name(n))
            }
            UploadKind::Image => input::unique_destination(
                &dir,
                &input::image_document_name(file.file_name.as_deref(), max_len),
            ),
            _ => {
                let fallback = fallback_name(document_kind.unwrap_or(DocumentKind::Pdf));
                input::unique_destination(
                    &dir,
                    &input::document_name(file.file_name.as_deref(), fallback, max_len),
                )
            }
        };

        self.fetch(file, &dest).await?;
        // Some transports report no size up front; check what actually landed.
        let size = match tokio::fs::metadata(&dest).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                remove_quietly(&dest).await;
                return Err(BotError::io(&dest, e));
            }
        };
        if size > self.config.max_file_size {
            remove_quietly(&dest).await;
            return Err(BotError::FileTooLarge {
                size,
                limit: self.config.max_file_size,
            });
        }
        if self.config.validate_files {
            if let Err(e) = validate(&dest, document_kind).await {
                remove_quietly(&dest).await;
                return Err(e);
            }
        }

        match document_kind {
            None => self.queue_image(user, chat, kind, file, dest).await,
            Some(doc_kind) => {
                let doc = StoredDocument {
                    file_id: file.file_id.clone(),
                    file_name: file.file_name.clone().unwrap_or_else(|| display_name(&dest)),
                    file_size: size,
                    mime_type: file.mime_type.clone(),
                    path: dest,
                };
                let stored = doc.clone();
                let replaced = self
                    .sessions
                    .update(user, move |s| {
                        s.record_upload();
                        s.set_document(doc_kind, stored)
                    })
                    .await;
                info!(
                    user = %user,
                    kind = doc_kind.as_str(),
                    name = %doc.file_name,
                    bytes = doc.file_size,
                    replaced = replaced.is_some(),
                    "document stored"
                );
                self.send(chat, menus::document_received(doc_kind, &doc)).await;
                Ok(())
            }
        }
    }

    async fn queue_image(
        &self,
        user: UserId,
        chat: ChatId,
        kind: UploadKind,
        file: &FileRef,
        path: PathBuf,
    ) -> Result<(), BotError> {
        let max = self.config.max_images_per_pdf;
        let (count, at_cap) = self
            .sessions
            .update(user, move |s| {
                let at_cap = s.push_image(path, max);
                s.record_upload();
                (s.images.len(), at_cap)
            })
            .await;
        info!(user = %user, count, "image queued");

        if at_cap {
            warn!(user = %user, count, max, "image queue at capacity");
            self.send(chat, menus::image_limit_reached(max)).await;
        }
        let reply = match kind {
            UploadKind::Photo => menus::image_received(count, max),
            _ => menus::image_document_received(count, max, file.mime_type.as_deref()),
        };
        self.send(chat, reply).await;
        Ok(())
    }

    /// Download `file` to `dest`, removing any partial file on failure.
    async fn fetch(&self, file: &FileRef, dest: &Path) -> Result<(), BotError> {
        match self.transport.download(file, dest).await {
            Ok(()) => {
                debug!(file_id = %file.file_id, dest = %dest.display(), "downloaded");
                Ok(())
            }
            Err(e) => {
                remove_quietly(dest).await;
                Err(match e {
                    BotError::Download { .. } => e,
                    other => BotError::Download {
                        file_id: file.file_id.clone(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }
}

fn fallback_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Pdf => "document.pdf",
        DocumentKind::Word => "document.docx",
        DocumentKind::Excel => "spreadsheet.xlsx",
        DocumentKind::Text => "document.txt",
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Content checks run off the async threads; decoding an image is CPU work.
async fn validate(path: &Path, kind: Option<DocumentKind>) -> Result<(), BotError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || match kind {
        None => input::check_image(&path),
        Some(DocumentKind::Pdf) => input::check_pdf(&path),
        Some(_) => Ok(()),
    })
    .await
    .map_err(|e| BotError::Internal(format!("validation worker failed: {e}")))?
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "could not remove file: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_names_carry_matching_extensions() {
        assert!(fallback_name(DocumentKind::Pdf).ends_with(".pdf"));
        assert!(fallback_name(DocumentKind::Word).ends_with(".docx"));
        assert!(fallback_name(DocumentKind::Excel).ends_with(".xlsx"));
        assert!(fallback_name(DocumentKind::Text).ends_with(".txt"));
    }

    #[tokio::test]
    async fn removing_a_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        remove_quietly(&dir.path().join("never-written")).await;
    }

    #[tokio::test]
    async fn pdf_validation_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.pdf");
        std::fs::write(&path, b"hello").unwrap();
        assert!(validate(&path, Some(DocumentKind::Pdf)).await.is_err());
        assert!(validate(&path, Some(DocumentKind::Word)).await.is_ok());
    }
}
