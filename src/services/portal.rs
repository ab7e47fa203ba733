//! One `Portal` per browser session, cached by access token.

use chrono::Utc;
use moka::sync::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::Result;
use crate::providers::Backends;
use crate::services::{
    account::AccountService,
    retrieval::RetrievalService,
    roles::RoleResolver,
    session::{AuthEvent, SessionStore, Subscription},
    submission::SubmissionService,
};

pub struct Portal {
    session: SessionStore,
    submissions: SubmissionService,
    retrieval: RetrievalService,
    account: AccountService,
    registration: Mutex<Option<Subscription>>,
}

impl Portal {
    pub fn new(backends: &Backends, session: SessionStore, cooldown: Duration) -> Self {
        Self {
            submissions: SubmissionService::new(session.clone(), backends.quotes.clone(), cooldown),
            retrieval: RetrievalService::new(
                session.clone(),
                RoleResolver::new(backends.roles.clone()),
                backends.quotes.clone(),
            ),
            account: AccountService::new(backends.auth.clone(), session.clone()),
            session,
            registration: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.submissions
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    pub fn account(&self) -> &AccountService {
        &self.account
    }

    fn is_live(&self) -> bool {
        self.session
            .current_session()
            .is_some_and(|session| session.expires_at > Utc::now())
    }
}

pub struct PortalRegistry {
    portals: Cache<String, Arc<Portal>>,
    backends: Backends,
    cooldown: Duration,
}

impl PortalRegistry {
    pub fn new(backends: Backends, cooldown: Duration, idle: Duration) -> Self {
        Self {
            portals: Cache::builder().time_to_idle(idle).build(),
            backends,
            cooldown,
        }
    }

    pub fn anonymous(&self) -> Arc<Portal> {
        Arc::new(Portal::new(&self.backends, SessionStore::new(), self.cooldown))
    }

    /// Finds the portal for a bearer token, restoring the session from the
    /// auth provider on first use. Unknown tokens get an anonymous portal.
    pub async fn open(&self, access_token: Option<&str>) -> Result<Arc<Portal>> {
        let Some(token) = access_token else {
            return Ok(self.anonymous());
        };

        if let Some(portal) = self.portals.get(token) {
            if portal.is_live() {
                return Ok(portal);
            }
            self.portals.invalidate(token);
        }

        let session = SessionStore::restore(self.backends.auth.as_ref(), token).await?;
        if session.current_identity().is_none() {
            debug!("Bearer token did not resolve to a session");
            return Ok(self.anonymous());
        }

        let portal = Arc::new(Portal::new(&self.backends, session, self.cooldown));
        Ok(self.register(token, portal))
    }

    /// Caches a signed-in portal under its token. The entry goes away when the
    /// portal's session signs out. Returns whichever portal won the slot.
    pub fn register(&self, access_token: &str, portal: Arc<Portal>) -> Arc<Portal> {
        let portals = self.portals.clone();
        let key = access_token.to_string();
        let subscription = portal.session().subscribe(move |event| {
            if *event == AuthEvent::SignedOut {
                portals.invalidate(&key);
            }
        });
        *portal
            .registration
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(subscription);

        let entry = self
            .portals
            .entry(access_token.to_string())
            .or_insert_with(|| portal);
        if entry.is_fresh() {
            info!("Session portal registered");
        }
        entry.into_value()
    }

    pub fn contains(&self, access_token: &str) -> bool {
        self.portals.contains_key(access_token)
    }

    pub fn len(&self) -> u64 {
        self.portals.run_pending_tasks();
        self.portals.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
