//! Custom-name sub-dialogue.
//!
//! ```text
//!            custom_name_<T>                 valid text
//!   Idle ─────────────────────▶ WaitingForName ───────────▶ Idle  (intent = NamedConversion(T))
//!                                 │   ▲
//!                   invalid text  └───┘
//!                                 │
//!                /cancel, timeout └──────────────────────▶ Idle  (pending fields cleared)
//! ```
//!
//! The functions here only mutate a [`Session`]; sending prompts and running
//! the resulting conversion is up to the caller. Timeouts are evaluated
//! lazily: [`expire_if_stale`] runs at the start of the user's next event.

use crate::sanitize::{sanitize_stem_with_limit, PLACEHOLDER};
use crate::session::{ConversionType, PendingIntent, Session};
use std::time::{Duration, Instant};

/// Where a user is in the custom-name dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogueState {
    #[default]
    Idle,
    /// Normal routing is suspended until a name, `/cancel`, or the timeout.
    WaitingForName { since: Instant },
}

impl DialogueState {
    pub fn is_waiting(&self) -> bool {
        matches!(self, DialogueState::WaitingForName { .. })
    }
}

/// Result of feeding a text message to the dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOutcome {
    /// Name stored; `conversion` was promoted to a `NamedConversion` intent.
    Accepted {
        name: String,
        conversion: Option<ConversionType>,
    },
    /// Sanitisation left nothing usable; still waiting.
    Rejected,
    /// The user was not in the dialogue.
    NotWaiting,
}

/// Enter `WaitingForName` for `conversion`.
///
/// Any name left over from an earlier dialogue is discarded.
pub fn begin(session: &mut Session, conversion: ConversionType, now: Instant) {
    session.pending_conversion = Some(conversion);
    session.custom_filename = None;
    session.dialogue = DialogueState::WaitingForName { since: now };
}

/// Handle a candidate filename typed by the user.
pub fn receive_name(session: &mut Session, text: &str, max_len: usize) -> NameOutcome {
    if !session.dialogue.is_waiting() {
        return NameOutcome::NotWaiting;
    }

    let name = sanitize_stem_with_limit(text, max_len);
    if name.is_empty() || name == PLACEHOLDER {
        return NameOutcome::Rejected;
    }

    session.custom_filename = Some(name.clone());
    let conversion = session.pending_conversion.take();
    if let Some(c) = conversion {
        session.set_intent(PendingIntent::NamedConversion(c));
    }
    session.dialogue = DialogueState::Idle;

    NameOutcome::Accepted { name, conversion }
}

/// Abort the dialogue. Returns whether the user was waiting.
///
/// Clears `pending_conversion` and `custom_filename` in every case, so a
/// stray `/cancel` also drops a name that was never used.
pub fn cancel(session: &mut Session) -> bool {
    let was_waiting = session.dialogue.is_waiting();
    session.pending_conversion = None;
    session.custom_filename = None;
    session.dialogue = DialogueState::Idle;
    was_waiting
}

/// Abandon the dialogue if it has waited at least `timeout`.
///
/// Returns `true` when the dialogue expired on this call.
pub fn expire_if_stale(session: &mut Session, now: Instant, timeout: Duration) -> bool {
    match session.dialogue {
        DialogueState::WaitingForName { since } if now.saturating_duration_since(since) >= timeout => {
            session.pending_conversion = None;
            session.custom_filename = None;
            session.dialogue = DialogueState::Idle;
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::DEFAULT_MAX_LEN;
    use crate::session::{Settings, UserId};

    fn session() -> Session {
        Session::new(UserId(42), Settings::default())
    }

    #[test]
    fn valid_name_promotes_pending_conversion() {
        let mut s = session();
        begin(&mut s, ConversionType::ImagesPdf, Instant::now());
        assert!(s.dialogue.is_waiting());

        let out = receive_name(&mut s, "My Report", DEFAULT_MAX_LEN);
        assert_eq!(
            out,
            NameOutcome::Accepted {
                name: "My_Report".into(),
                conversion: Some(ConversionType::ImagesPdf)
            }
        );
        assert_eq!(s.custom_filename.as_deref(), Some("My_Report"));
        assert_eq!(s.pending_conversion, None);
        assert_eq!(s.dialogue, DialogueState::Idle);
        assert_eq!(
            s.take_intent(),
            Some(PendingIntent::NamedConversion(ConversionType::ImagesPdf))
        );
    }

    #[test]
    fn placeholder_name_is_rejected_and_keeps_waiting() {
        let mut s = session();
        begin(&mut s, ConversionType::WordPdf, Instant::now());
        assert_eq!(receive_name(&mut s, "###", DEFAULT_MAX_LEN), NameOutcome::Rejected);
        assert!(s.dialogue.is_waiting());
        assert_eq!(s.pending_conversion, Some(ConversionType::WordPdf));
        assert!(s.intent().is_none());
    }

    #[test]
    fn text_outside_dialogue_is_ignored() {
        let mut s = session();
        assert_eq!(receive_name(&mut s, "hello", DEFAULT_MAX_LEN), NameOutcome::NotWaiting);
        assert!(s.custom_filename.is_none());
    }

    #[test]
    fn cancel_clears_pending_fields() {
        let mut s = session();
        begin(&mut s, ConversionType::PdfImages, Instant::now());
        assert!(cancel(&mut s));
        assert_eq!(s.pending_conversion, None);
        assert_eq!(s.custom_filename, None);
        assert_eq!(s.dialogue, DialogueState::Idle);
        assert!(s.intent().is_none());
        assert!(!cancel(&mut s));
    }

    #[test]
    fn timeout_returns_to_idle_and_clears() {
        let mut s = session();
        let start = Instant::now();
        begin(&mut s, ConversionType::ExcelPdf, start);
        let timeout = Duration::from_secs(300);

        assert!(!expire_if_stale(&mut s, start + Duration::from_secs(299), timeout));
        assert!(s.dialogue.is_waiting());

        assert!(expire_if_stale(&mut s, start + Duration::from_secs(300), timeout));
        assert_eq!(s.dialogue, DialogueState::Idle);
        assert_eq!(s.pending_conversion, None);
        assert!(!expire_if_stale(&mut s, start + Duration::from_secs(900), timeout));
    }

    #[test]
    fn begin_discards_stale_custom_name() {
        let mut s = session();
        s.custom_filename = Some("old".into());
        begin(&mut s, ConversionType::TextPdf, Instant::now());
        assert_eq!(s.custom_filename, None);
    }
}
