//! The bot: event boundary, request capture and menus.
//!
//! ```text
//! InboundEvent
//!   │
//!   ├─ lock_user            one event per user at a time
//!   ├─ expire_if_stale      lazy custom-name timeout
//!   ├─ WaitingForName?  ──▶ dialogue (text, /cancel, else reminder)
//!   └─ route
//!        ├─ Command   ──▶ commands
//!        ├─ Callback  ──▶ capture (intent or menu) ──▶ dispatch
//!        ├─ Upload    ──▶ upload
//!        └─ Text      ──▶ hint
//! ```
//!
//! [`Bot::handle`] never fails: every [`BotError`] is logged with the user
//! and payload, and the user gets [`BotError::user_message`]. Transport
//! errors are logged and dropped.

mod dispatch;
mod upload;

use crate::config::BotConfig;
use crate::convert::DocumentConverter;
use crate::dialogue::{self, NameOutcome};
use crate::error::BotError;
use crate::menus;
use crate::router::{self, Callback, Command, GeneralCallback, Route, SettingCallback, ShowTarget};
use crate::session::{Action, PendingIntent, SessionStore, Settings, UserId};
use crate::transport::{ChatId, InboundEvent, MessageId, Reply, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Document-conversion bot over an abstract [`Transport`].
pub struct Bot {
    transport: Arc<dyn Transport>,
    converter: Arc<dyn DocumentConverter>,
    sessions: SessionStore,
    config: BotConfig,
}

impl Bot {
    pub fn new(
        config: BotConfig,
        transport: Arc<dyn Transport>,
        converter: Arc<dyn DocumentConverter>,
    ) -> Self {
        Self {
            transport,
            converter,
            sessions: SessionStore::new(Settings::from_config(&config)),
            config,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Handle one inbound event to completion.
    pub async fn handle(&self, event: InboundEvent) {
        let _guard = self.sessions.lock_user(event.user).await;
        let start = Instant::now();

        if let Err(e) = self.process(&event).await {
            match e {
                BotError::Transport(_) => {
                    warn!(user = %event.user, payload = ?event.payload, "transport error: {e}");
                }
                _ => {
                    error!(user = %event.user, payload = ?event.payload, "event failed: {e}");
                    self.send(event.chat, Reply::text(e.user_message())).await;
                }
            }
        }
        debug!(user = %event.user, elapsed_ms = start.elapsed().as_millis() as u64, "event handled");
    }

    async fn process(&self, event: &InboundEvent) -> Result<(), BotError> {
        let (user, chat) = (event.user, event.chat);
        let timeout = self.config.naming_timeout;

        let expired = self
            .sessions
            .update(user, |s| dialogue::expire_if_stale(s, Instant::now(), timeout))
            .await;
        if expired {
            info!(user = %user, "custom naming timed out");
            self.send(chat, menus::naming_expired()).await;
        }

        let waiting = self.sessions.update(user, |s| s.dialogue.is_waiting()).await;
        let route = router::route(&event.payload);
        if waiting {
            return self.handle_naming(user, chat, route).await;
        }

        match route {
            Route::Command(cmd) => self.handle_command(event, cmd).await,
            Route::Text(_) => {
                self.send(chat, menus::send_a_file()).await;
                Ok(())
            }
            Route::Callback { data, message } => {
                self.handle_callback(user, chat, data, message).await?;
                dispatch::run(self, user, chat).await
            }
            Route::Upload { kind, file } => self.handle_upload(user, chat, kind, file).await,
        }
    }

    // ── Custom-name dialogue ─────────────────────────────────────────────

    async fn handle_naming(&self, user: UserId, chat: ChatId, route: Route<'_>) -> Result<(), BotError> {
        match route {
            Route::Command(Command::Cancel) => self.cancel_naming(user, chat).await,
            Route::Text(text) => {
                let max_len = self.config.max_filename_length;
                let outcome = self
                    .sessions
                    .update(user, |s| dialogue::receive_name(s, text, max_len))
                    .await;
                match outcome {
                    NameOutcome::Accepted { name, conversion } => {
                        info!(user = %user, name = %name, ?conversion, "custom filename accepted");
                        self.send(chat, menus::name_accepted(&name)).await;
                        dispatch::run(self, user, chat).await
                    }
                    NameOutcome::Rejected => {
                        debug!(user = %user, input = %text, "custom filename rejected");
                        self.send(chat, menus::name_rejected()).await;
                        Ok(())
                    }
                    NameOutcome::NotWaiting => {
                        self.send(chat, menus::send_a_file()).await;
                        Ok(())
                    }
                }
            }
            _ => {
                self.send(chat, menus::naming_reminder()).await;
                Ok(())
            }
        }
    }

    async fn cancel_naming(&self, user: UserId, chat: ChatId) -> Result<(), BotError> {
        let was_waiting = self.sessions.update(user, dialogue::cancel).await;
        debug!(user = %user, was_waiting, "custom naming cancelled");
        self.send(chat, menus::naming_cancelled()).await;
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────────

    async fn handle_command(&self, event: &InboundEvent, cmd: Command) -> Result<(), BotError> {
        let (user, chat) = (event.user, event.chat);
        debug!(user = %user, ?cmd, "command");

        let reply = match cmd {
            Command::Start => {
                self.sessions.get_or_create(user).await;
                menus::welcome(event.first_name.as_deref(), &self.config)
            }
            Command::Help => menus::help(),
            Command::Stats => menus::stats(&self.sessions.get_or_create(user).await),
            Command::Settings => menus::settings(&self.sessions.get_or_create(user).await),
            Command::Formats => menus::formats(&self.config),
            Command::Clear => {
                self.sessions.update(user, |s| s.clear_transient()).await;
                info!(user = %user, "session cleared");
                menus::session_cleared()
            }
            Command::Cancel => return self.cancel_naming(user, chat).await,
            Command::Unknown(name) => menus::unknown_command(&name),
        };
        self.send(chat, reply).await;
        Ok(())
    }

    // ── Button clicks ────────────────────────────────────────────────────

    /// Record an intent or re-render a menu; never runs a conversion itself.
    async fn handle_callback(
        &self,
        user: UserId,
        chat: ChatId,
        data: &str,
        message: MessageId,
    ) -> Result<(), BotError> {
        let callback = Callback::parse(data)?;
        debug!(user = %user, payload = %data, ?callback, "button");

        let reply = match callback {
            Callback::CustomName(conversion) => {
                self.sessions
                    .update(user, |s| dialogue::begin(s, conversion, Instant::now()))
                    .await;
                menus::naming_prompt()
            }
            Callback::Convert(conversion) => {
                self.sessions.set_intent(user, PendingIntent::Conversion(conversion)).await;
                menus::conversion_requested(conversion)
            }
            Callback::EnhanceMenu => menus::enhance_menu(),
            Callback::Enhance(enhancement) => {
                self.sessions.set_intent(user, PendingIntent::Enhancement(enhancement)).await;
                menus::enhancement_requested(enhancement)
            }
            Callback::Setting(setting) => self.apply_setting(user, setting).await,
            Callback::Show(target) => match target {
                ShowTarget::Help => menus::help(),
                ShowTarget::Stats => menus::stats(&self.sessions.get_or_create(user).await),
                ShowTarget::Settings => menus::settings(&self.sessions.get_or_create(user).await),
                ShowTarget::Formats => menus::formats(&self.config),
            },
            Callback::General(general) => self.handle_general(user, general).await,
        };
        self.show(chat, message, reply).await;
        Ok(())
    }

    /// Settings change immediately; they are never deferred.
    async fn apply_setting(&self, user: UserId, setting: SettingCallback) -> Reply {
        match setting {
            SettingCallback::QualityMenu => {
                menus::quality_picker(self.sessions.get_or_create(user).await.settings.quality)
            }
            SettingCallback::FormatMenu => {
                menus::format_picker(self.sessions.get_or_create(user).await.settings.format)
            }
            SettingCallback::ToggleAutoEnhance => {
                let enabled = self
                    .sessions
                    .update(user, |s| {
                        s.settings.auto_enhance = !s.settings.auto_enhance;
                        s.settings.auto_enhance
                    })
                    .await;
                info!(user = %user, enabled, "auto-enhance toggled");
                menus::auto_enhance_toggled(enabled)
            }
            SettingCallback::SetQuality(quality) => {
                self.sessions.update(user, |s| s.settings.quality = quality).await;
                info!(user = %user, %quality, "quality set");
                menus::quality_set(quality)
            }
            SettingCallback::SetFormat(format) => {
                self.sessions.update(user, |s| s.settings.format = format).await;
                info!(user = %user, %format, "format set");
                menus::format_set(format)
            }
        }
    }

    async fn handle_general(&self, user: UserId, general: GeneralCallback) -> Reply {
        match general {
            GeneralCallback::ClearSession => {
                self.sessions.update(user, |s| s.clear_transient()).await;
                info!(user = %user, "session cleared");
                menus::session_cleared()
            }
            GeneralCallback::ClearImages => {
                self.sessions.update(user, |s| s.clear_images()).await;
                menus::images_cleared()
            }
            GeneralCallback::AddMore => menus::add_more(),
            GeneralCallback::PreviewImages => {
                menus::preview(&self.sessions.get_or_create(user).await.images)
            }
            GeneralCallback::ConversionSettings => {
                menus::conversion_settings(&self.sessions.get_or_create(user).await)
            }
            GeneralCallback::BackToMain => menus::main_menu(),
            GeneralCallback::BackToImages => {
                menus::image_menu(self.sessions.get_or_create(user).await.images.len())
            }
            GeneralCallback::Info(kind) => {
                self.sessions.set_intent(user, PendingIntent::InfoQuery(kind)).await;
                menus::info_requested(kind)
            }
            GeneralCallback::PdfSettings => menus::pdf_settings(&self.sessions.get_or_create(user).await),
            GeneralCallback::ExtractText => {
                self.sessions
                    .set_intent(user, PendingIntent::Action(Action::ExtractText))
                    .await;
                menus::text_extraction_requested()
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    /// `<work_dir>/<user_id>`, created on demand.
    async fn user_dir(&self, user: UserId) -> Result<PathBuf, BotError> {
        let dir = self.config.work_dir.join(user.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BotError::io(&dir, e))?;
        Ok(dir)
    }

    /// Send a message; delivery failures are logged and dropped.
    async fn send(&self, chat: ChatId, reply: Reply) {
        if let Err(e) = self.transport.send_text(chat, reply).await {
            warn!(chat = %chat, "send failed: {e}");
        }
    }

    /// Replace the clicked message, or send a new one if it cannot be edited.
    async fn show(&self, chat: ChatId, message: MessageId, reply: Reply) {
        if let Err(e) = self.transport.edit_text(chat, message, reply.clone()).await {
            debug!(chat = %chat, "edit failed, sending instead: {e}");
            self.send(chat, reply).await;
        }
    }
}
