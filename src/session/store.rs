//! In-memory session store keyed by [`UserId`].
//!
//! Sessions live in a `tokio::sync::RwLock<HashMap>`; nothing is persisted.
//! Every accessor holds the map lock only for the duration of one closure, so
//! a single mutation is atomic but a read-modify-write spanning several calls
//! is not. Handlers that need a whole event to run without interleaving take
//! the per-user advisory lock from [`SessionStore::lock_user`] first.

use super::{PendingIntent, Session, Settings, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Shared, volatile store of every user's [`Session`].
pub struct SessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
    defaults: Settings,
}

impl SessionStore {
    /// Create an empty store; new sessions start with `defaults`.
    pub fn new(defaults: Settings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
            defaults,
        }
    }

    /// Snapshot of the user's session, creating it on first contact.
    pub async fn get_or_create(&self, user: UserId) -> Session {
        if let Some(session) = self.sessions.read().await.get(&user) {
            return session.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user)
            .or_insert_with(|| {
                debug!(user = %user, "creating session");
                Session::new(user, self.defaults)
            })
            .clone()
    }

    /// Snapshot of the user's session, if one exists.
    pub async fn get(&self, user: UserId) -> Option<Session> {
        self.sessions.read().await.get(&user).cloned()
    }

    /// Apply `f` to the user's session under the write lock.
    ///
    /// The session is created first if needed. Whatever `f` returns is
    /// passed back to the caller.
    pub async fn update<F, R>(&self, user: UserId, f: F) -> R
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(user)
            .or_insert_with(|| Session::new(user, self.defaults));
        f(session)
    }

    /// Record `intent` as the user's next dispatcher action.
    pub async fn set_intent(&self, user: UserId, intent: PendingIntent) {
        let replaced = self.update(user, |s| s.set_intent(intent)).await;
        if let Some(old) = replaced {
            debug!(user = %user, ?old, new = ?intent, "pending intent replaced");
        }
    }

    /// Read and clear the user's pending intent in one step.
    pub async fn take_intent(&self, user: UserId) -> Option<PendingIntent> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&user).and_then(Session::take_intent)
    }

    /// Acquire the per-user advisory lock.
    ///
    /// Held for the whole handle-then-dispatch sequence of one event, so two
    /// rapid clicks from the same user run one after the other. Events from
    /// different users never contend.
    pub async fn lock_user(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.user_locks.lock().await;
            Arc::clone(locks.entry(user).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of users seen since start-up.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;
    use crate::session::{ConversionType, Enhancement};
    use std::time::Duration;

    #[tokio::test]
    async fn get_or_create_uses_defaults_once() {
        let defaults = Settings {
            quality: Quality::High,
            ..Settings::default()
        };
        let store = SessionStore::new(defaults);
        let s = store.get_or_create(UserId(7)).await;
        assert_eq!(s.settings.quality, Quality::High);

        store.update(UserId(7), |s| s.settings.quality = Quality::Low).await;
        let again = store.get_or_create(UserId(7)).await;
        assert_eq!(again.settings.quality, Quality::Low);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn take_intent_is_one_shot() {
        let store = SessionStore::default();
        let user = UserId(1);
        assert_eq!(store.take_intent(user).await, None);

        store
            .set_intent(user, PendingIntent::Conversion(ConversionType::WordPdf))
            .await;
        assert_eq!(
            store.take_intent(user).await,
            Some(PendingIntent::Conversion(ConversionType::WordPdf))
        );
        assert_eq!(store.take_intent(user).await, None);
    }

    #[tokio::test]
    async fn later_intent_replaces_earlier() {
        let store = SessionStore::default();
        let user = UserId(2);
        store
            .set_intent(user, PendingIntent::Conversion(ConversionType::ImagesPdf))
            .await;
        store
            .set_intent(user, PendingIntent::Enhancement(Enhancement::Grayscale))
            .await;
        assert_eq!(
            store.take_intent(user).await,
            Some(PendingIntent::Enhancement(Enhancement::Grayscale))
        );
    }

    #[tokio::test]
    async fn user_lock_serialises_same_user() {
        let store = Arc::new(SessionStore::default());
        let guard = store.lock_user(UserId(1)).await;

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let _g = store.lock_user(UserId(1)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different user is not blocked.
        let other = tokio::time::timeout(Duration::from_secs(1), store.lock_user(UserId(2))).await;
        assert!(other.is_ok());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }
}
