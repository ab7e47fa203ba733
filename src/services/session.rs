//! Per-browser session state. Holds the current session, tells subscribers
//! about sign-in and sign-out, and hands out epochs so late async results can
//! be recognised as stale.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;

use crate::models::{Identity, Session};
use crate::providers::{AuthProvider, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}

type Listener = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    epoch: u64,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a bearer token against the auth provider once, at startup.
    /// An unknown or revoked token yields an anonymous store.
    pub async fn restore(
        auth: &dyn AuthProvider,
        access_token: &str,
    ) -> Result<Self, ProviderError> {
        let store = Self::new();
        if let Some(session) = auth.get_session(access_token).await? {
            lock(&store.inner).session = Some(session);
        }
        Ok(store)
    }

    pub fn current_identity(&self) -> Option<Identity> {
        lock(&self.inner)
            .session
            .as_ref()
            .map(|session| session.identity.clone())
    }

    pub fn current_session(&self) -> Option<Session> {
        lock(&self.inner).session.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        lock(&self.inner)
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    /// Bumped on every sign-in and sign-out.
    pub fn epoch(&self) -> u64 {
        lock(&self.inner).epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(on_change)));

        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn sign_in(&self, session: Session) {
        let identity = session.identity.clone();
        {
            let mut inner = lock(&self.inner);
            inner.session = Some(session);
            inner.epoch += 1;
        }
        self.notify(&AuthEvent::SignedIn(identity));
    }

    /// Clears the session. Subscribers are only told if there was one.
    pub fn sign_out(&self) {
        let had_session = {
            let mut inner = lock(&self.inner);
            inner.epoch += 1;
            inner.session.take().is_some()
        };
        if had_session {
            self.notify(&AuthEvent::SignedOut);
        }
    }

    // Listeners run outside the lock so they may call back into the store.
    fn notify(&self, event: &AuthEvent) {
        let listeners: Vec<Listener> = lock(&self.inner)
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        debug!(?event, listeners = listeners.len(), "Auth state changed");
        for listener in listeners {
            listener(event);
        }
    }
}

/// Keeps a listener registered. Dropping it unsubscribes.
pub struct Subscription {
    store: Weak<Mutex<Inner>>,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(inner) = self.store.upgrade() {
            lock(&inner).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            access_token: "token".to_string(),
            expires_at: Utc::now(),
            identity: Identity {
                id: Uuid::new_v4(),
                email: "jane@x.com".to_string(),
            },
        }
    }

    #[test]
    fn test_sign_in_and_out_notify_subscribers() {
        let store = SessionStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = events.clone();
        let _subscription = store.subscribe(move |event| seen.lock().unwrap().push(event.clone()));

        let session = session();
        store.sign_in(session.clone());
        assert_eq!(store.current_identity(), Some(session.identity.clone()));

        store.sign_out();
        store.sign_out();
        assert!(store.current_identity().is_none());

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![AuthEvent::SignedIn(session.identity), AuthEvent::SignedOut]
        );
    }

    #[test]
    fn test_unsubscribe_and_drop_remove_listener() {
        let store = SessionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let first = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = calls.clone();
        let second = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.listener_count(), 2);

        first.unsubscribe();
        drop(second);
        assert_eq!(store.listener_count(), 0);

        store.sign_in(session());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_epoch_changes_on_every_transition() {
        let store = SessionStore::new();
        let start = store.epoch();
        assert!(store.is_current(start));

        store.sign_in(session());
        assert!(!store.is_current(start));
        let signed_in = store.epoch();

        store.sign_out();
        assert!(!store.is_current(signed_in));
    }

    #[test]
    fn test_listener_may_read_store() {
        let store = SessionStore::new();
        let reader = store.clone();
        let observed = Arc::new(Mutex::new(None));
        let slot = observed.clone();
        let _subscription = store.subscribe(move |_| {
            *slot.lock().unwrap() = Some(reader.current_identity().is_some());
        });

        store.sign_in(session());
        assert_eq!(*observed.lock().unwrap(), Some(true));
    }
}
