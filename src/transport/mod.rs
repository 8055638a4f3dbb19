//! The messaging-platform boundary.
//!
//! [`Transport`] is everything the bot needs from a chat platform: send or
//! edit a text message (optionally with an inline keyboard), deliver a file,
//! and download a file the user uploaded. Inbound traffic arrives as
//! [`InboundEvent`] values. [`console::ConsoleTransport`] implements the
//! trait over JSON lines for local use and scripting.

pub mod console;

pub use console::ConsoleTransport;

use crate::error::BotError;
use crate::session::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Outbound ─────────────────────────────────────────────────────────────

/// One inline button: a label and the opaque payload sent back on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Inline keyboard, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: impl IntoIterator<Item = Button>) -> Self {
        self.rows.push(buttons.into_iter().collect());
        self
    }

    /// Every payload on the keyboard, in display order.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.payload.as_str())
    }
}

/// A text message with an optional keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::text(text)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::text(text)
    }
}

// ── Inbound ──────────────────────────────────────────────────────────────

/// Metadata of an uploaded file, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Typed text, including `/commands`.
    Text { text: String },
    /// Inline-button click on message `message_id`.
    Callback { data: String, message_id: MessageId },
    /// Compressed photo.
    Photo(FileRef),
    /// File sent as a document.
    Document(FileRef),
}

/// One inbound event from one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub user: UserId,
    pub chat: ChatId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Chat platform collaborator.
///
/// Implementations must be cheap to share; the bot holds one behind an `Arc`
/// and calls it from many tasks at once.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a new message; returns its id.
    async fn send_text(&self, chat: ChatId, reply: Reply) -> Result<MessageId, BotError>;

    /// Replace the text (and keyboard) of an existing message.
    async fn edit_text(&self, chat: ChatId, message: MessageId, reply: Reply) -> Result<(), BotError>;

    /// Deliver a local file to the chat.
    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> Result<(), BotError>;

    /// Fetch an uploaded file into `dest`.
    async fn download(&self, file: &FileRef, dest: &Path) -> Result<(), BotError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_lists_payloads_in_order() {
        let kb = Keyboard::new()
            .row([Button::new("A", "a"), Button::new("B", "b")])
            .row([Button::new("C", "c")]);
        assert_eq!(kb.payloads().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn inbound_event_json_shapes() {
        let ev: InboundEvent = serde_json::from_str(
            r#"{"user":5,"chat":9,"type":"callback","data":"convert_images_pdf","message_id":3}"#,
        )
        .unwrap();
        assert_eq!(ev.user, UserId(5));
        assert_eq!(
            ev.payload,
            EventPayload::Callback {
                data: "convert_images_pdf".into(),
                message_id: MessageId(3)
            }
        );

        let ev: InboundEvent = serde_json::from_str(
            r#"{"user":5,"chat":9,"type":"document","file_id":"/tmp/a.pdf","file_name":"a.pdf","mime_type":"application/pdf","file_size":10}"#,
        )
        .unwrap();
        match ev.payload {
            EventPayload::Document(f) => {
                assert_eq!(f.file_name.as_deref(), Some("a.pdf"));
                assert_eq!(f.file_size, Some(10));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
