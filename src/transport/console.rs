//! JSON-lines transport.
//!
//! Inbound: one [`InboundEvent`] per line, e.g.
//!
//! ```text
//! {"user":1,"chat":1,"type":"text","text":"/start"}
//! {"user":1,"chat":1,"type":"photo","file_id":"/home/me/scan.jpg"}
//! {"user":1,"chat":1,"type":"callback","data":"convert_images_pdf","message_id":2}
//! ```
//!
//! Outbound: one JSON object per action, tagged by `op`. File ids are local
//! paths; "downloading" copies the file into the bot's work directory.

use super::{ChatId, FileRef, InboundEvent, Keyboard, MessageId, Reply, Transport};
use crate::error::BotError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Outbound<'a> {
    SendText {
        chat: ChatId,
        message_id: MessageId,
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<&'a Keyboard>,
    },
    EditText {
        chat: ChatId,
        message_id: MessageId,
        text: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        keyboard: Option<&'a Keyboard>,
    },
    SendDocument {
        chat: ChatId,
        path: &'a Path,
        file_name: &'a str,
        caption: &'a str,
    },
}

/// [`Transport`] writing JSON lines to any async writer (stdout in the binary).
pub struct ConsoleTransport<W> {
    out: Mutex<W>,
    next_message_id: AtomicI64,
}

impl ConsoleTransport<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_message_id: AtomicI64::new(1),
        }
    }

    /// Recover the writer, e.g. to inspect output in tests.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    async fn emit(&self, message: &Outbound<'_>) -> Result<(), BotError> {
        let mut line =
            serde_json::to_vec(message).map_err(|e| BotError::Transport(e.to_string()))?;
        line.push(b'\n');
        let mut out = self.out.lock().await;
        out.write_all(&line)
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))
    }
}

/// Parse one inbound line. Blank lines yield `None`.
pub fn parse_event(line: &str) -> Result<Option<InboundEvent>, BotError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| BotError::Transport(format!("malformed event: {e}")))
}

#[async_trait]
impl<W> Transport for ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_text(&self, chat: ChatId, reply: Reply) -> Result<MessageId, BotError> {
        let message_id = MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed));
        self.emit(&Outbound::SendText {
            chat,
            message_id,
            text: &reply.text,
            keyboard: reply.keyboard.as_ref(),
        })
        .await?;
        Ok(message_id)
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, reply: Reply) -> Result<(), BotError> {
        self.emit(&Outbound::EditText {
            chat,
            message_id: message,
            text: &reply.text,
            keyboard: reply.keyboard.as_ref(),
        })
        .await
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), BotError> {
        self.emit(&Outbound::SendDocument {
            chat,
            path,
            file_name,
            caption,
        })
        .await
    }

    async fn download(&self, file: &FileRef, dest: &Path) -> Result<(), BotError> {
        debug!(file_id = %file.file_id, dest = %dest.display(), "copying upload");
        tokio::fs::copy(&file.file_id, dest)
            .await
            .map(|_| ())
            .map_err(|e| BotError::Download {
                file_id: file.file_id.clone(),
                reason: e.to_string(),
            })
    }
}
