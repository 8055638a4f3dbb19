//! # docbot
//!
//! A chat bot that converts documents: queued images → PDF, PDF → page
//! images, Word/Excel/text → PDF, plus image enhancement and PDF text
//! extraction.
//!
//! The bot is written against two collaborators so that it can run on any
//! chat platform and be tested without real engines:
//!
//! * [`Transport`] sends and edits messages, delivers files and downloads
//!   uploads. The binary ships a JSON-lines [`ConsoleTransport`].
//! * [`DocumentConverter`] does the conversions. [`Engines`] is the
//!   production implementation (pdfium, the `image` crate, LibreOffice).
//!
//! ## Event flow
//!
//! ```text
//! InboundEvent
//!  │
//!  ├─ 1. Router     command / text / button payload / upload
//!  ├─ 2. Capture    button → PendingIntent in the user's Session
//!  ├─ 3. Dialogue   custom-name prompt suspends routing for that user
//!  ├─ 4. Dispatch   take_intent → converter → send result
//!  └─ 5. Engines    bounded worker pool (semaphore + spawn_blocking)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docbot::{Bot, BotConfig, ConsoleTransport, Engines, InboundEvent};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::builder().work_dir("/tmp/docbot").build()?;
//!     let engines = Arc::new(Engines::new(&config));
//!     let bot = Bot::new(config, Arc::new(ConsoleTransport::stdout()), engines);
//!
//!     let event: InboundEvent =
//!         serde_json::from_str(r#"{"user":1,"chat":1,"type":"text","text":"/start"}"#)?;
//!     bot.handle(event).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docbot` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bot;
pub mod config;
pub mod convert;
pub mod dialogue;
pub mod error;
pub mod menus;
pub mod pipeline;
pub mod router;
pub mod sanitize;
pub mod session;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bot::Bot;
pub use config::{BotConfig, BotConfigBuilder, OutputFormat, Quality};
pub use convert::{ConvertOptions, DocumentConverter, Engines};
pub use error::{BotError, ConvertError};
pub use session::{
    Action, ConversionType, DocumentKind, Enhancement, PendingIntent, Session, SessionStore, Settings,
    StoredDocument, UserId,
};
pub use transport::{
    Button, ChatId, ConsoleTransport, EventPayload, FileRef, InboundEvent, Keyboard, MessageId, Reply,
    Transport,
};
