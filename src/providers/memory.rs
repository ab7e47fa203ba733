//! In-process stand-in for the hosted backend. Backs `STORAGE_BACKEND=memory`
//! and the test suites; applies the same row-level policy as Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{AuthProvider, AuthSettings, ProviderError, QuoteStore, RoleStore};
use crate::{
    auth::{JwtService, OneTimeCodes, PasswordService, MIN_PASSWORD_LENGTH},
    config::Config,
    models::{
        Identity, QuoteDetails, QuoteRequest, QuoteScope, Role, RoleAssignment, Session, User,
    },
    services::mailer::{Mailer, OutgoingEmail},
};

struct PendingCode {
    code_hash: String,
    expires_at: DateTime<Utc>,
}

struct PendingReset {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    codes: HashMap<Uuid, PendingCode>,
    resets: HashMap<String, PendingReset>,
    sessions: HashSet<Uuid>,
    roles: Vec<RoleAssignment>,
    quotes: Vec<QuoteRequest>,
    last_created_at: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.values().find(|user| user.email == email)
    }

    fn is_admin(&self, user_id: Uuid) -> bool {
        self.roles
            .iter()
            .any(|assignment| assignment.user_id == user_id && assignment.role == Role::Admin.as_str())
    }

    /// Creation timestamps are strictly increasing so newest-first ordering is total.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_created_at {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created_at = Some(now);
        now
    }

    fn issue_code(&mut self, user_id: Uuid, ttl: Duration) -> String {
        let code = OneTimeCodes::generate_code();
        self.codes.insert(
            user_id,
            PendingCode {
                code_hash: OneTimeCodes::digest(&code),
                expires_at: Utc::now() + ttl,
            },
        );
        code
    }
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    jwt: JwtService,
    mailer: Arc<dyn Mailer>,
    settings: AuthSettings,
}

impl MemoryBackend {
    pub fn new(jwt: JwtService, mailer: Arc<dyn Mailer>, settings: AuthSettings) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            jwt,
            mailer,
            settings,
        }
    }

    pub fn from_config(config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        Self::new(
            JwtService::new(&config.jwt_secret, config.session_ttl()),
            mailer,
            AuthSettings::from_config(config),
        )
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Grants a role out-of-band, the way an operator would in the hosted console.
    pub fn grant_role(&self, user_id: Uuid, role: Role) -> RoleAssignment {
        let mut state = self.state();
        let created_at = state.next_timestamp();
        let assignment = RoleAssignment {
            id: Uuid::new_v4(),
            user_id,
            role: role.as_str().to_string(),
            created_at,
        };
        state.roles.push(assignment.clone());
        assignment
    }

    /// Creates an account whose email is already confirmed.
    pub fn register_confirmed(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let user = User {
            id: Uuid::new_v4(),
            email: normalize_email(email),
            password_hash: PasswordService::hash_password(password)?,
            email_confirmed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        let identity = user.identity();
        self.state().users.insert(user.id, user);
        Ok(identity)
    }

    pub fn user_id_for(&self, email: &str) -> Option<Uuid> {
        self.state()
            .user_by_email(&normalize_email(email))
            .map(|user| user.id)
    }

    pub fn quote_count(&self) -> usize {
        self.state().quotes.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.state().sessions.len()
    }

    fn open_session(&self, identity: Identity) -> Result<Session, ProviderError> {
        let session_id = Uuid::new_v4();
        let (access_token, expires_at) = self.jwt.generate_access_token(&identity, session_id)?;
        self.state().sessions.insert(session_id);

        Ok(Session {
            access_token,
            expires_at,
            identity,
        })
    }

    async fn deliver(&self, email: OutgoingEmail) -> Result<(), ProviderError> {
        self.mailer
            .send(&email)
            .await
            .map_err(|e| ProviderError::Mail(e.to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, ProviderError> {
        let claims = match self.jwt.verify_access_token(access_token) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };
        let (user_id, session_id) = match (claims.user_id(), claims.session_id()) {
            (Ok(user_id), Ok(session_id)) => (user_id, session_id),
            _ => return Ok(None),
        };

        let state = self.state();
        if !state.sessions.contains(&session_id) {
            return Ok(None);
        }

        Ok(state.users.get(&user_id).map(|user| Session {
            access_token: access_token.to_string(),
            expires_at: claims.expires_at(),
            identity: user.identity(),
        }))
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::WeakPassword(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let email = normalize_email(email);
        let password_hash = PasswordService::hash_password(password)?;
        let code = {
            let mut state = self.state();
            let existing = state
                .user_by_email(&email)
                .map(|user| (user.id, user.is_confirmed()));
            let user_id = match existing {
                Some((_, true)) => return Err(ProviderError::AlreadyRegistered),
                Some((id, false)) => id,
                None => {
                    let user = User {
                        id: Uuid::new_v4(),
                        email: email.clone(),
                        password_hash: String::new(),
                        email_confirmed_at: None,
                        created_at: Utc::now(),
                    };
                    let id = user.id;
                    state.users.insert(id, user);
                    id
                }
            };

            if let Some(user) = state.users.get_mut(&user_id) {
                user.password_hash = password_hash;
            }
            state.issue_code(user_id, self.settings.code_ttl)
        };

        debug!("Issued signup code");
        self.deliver(OutgoingEmail::signup_code(&email, &code)).await
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let user = self
            .state()
            .user_by_email(&normalize_email(email))
            .cloned()
            .ok_or(ProviderError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            return Err(ProviderError::InvalidCredentials);
        }
        if !user.is_confirmed() {
            return Err(ProviderError::EmailNotConfirmed);
        }

        self.open_session(user.identity())
    }

    #[instrument(skip(self, code))]
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ProviderError> {
        if !OneTimeCodes::is_well_formed_code(code) {
            return Err(ProviderError::InvalidOtp);
        }

        let identity = {
            let mut state = self.state();
            let user_id = state
                .user_by_email(&normalize_email(email))
                .map(|user| user.id)
                .ok_or(ProviderError::InvalidOtp)?;

            let matches = state.codes.get(&user_id).is_some_and(|pending| {
                pending.code_hash == OneTimeCodes::digest(code) && pending.expires_at > Utc::now()
            });
            if !matches {
                return Err(ProviderError::InvalidOtp);
            }

            state.codes.remove(&user_id);
            let user = state
                .users
                .get_mut(&user_id)
                .ok_or(ProviderError::InvalidOtp)?;
            user.email_confirmed_at.get_or_insert_with(Utc::now);
            user.identity()
        };

        self.open_session(identity)
    }

    #[instrument(skip(self))]
    async fn resend(&self, email: &str) -> Result<(), ProviderError> {
        let email = normalize_email(email);
        let code = {
            let mut state = self.state();
            let pending = state
                .user_by_email(&email)
                .filter(|user| !user.is_confirmed())
                .map(|user| user.id);
            pending.map(|user_id| state.issue_code(user_id, self.settings.code_ttl))
        };

        match code {
            Some(code) => self.deliver(OutgoingEmail::signup_code(&email, &code)).await,
            None => Ok(()),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        if let Ok(session_id) = self
            .jwt
            .verify_access_token(access_token)
            .and_then(|claims| claims.session_id())
        {
            self.state().sessions.remove(&session_id);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn request_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let email = normalize_email(email);
        let token = {
            let mut state = self.state();
            let Some(user_id) = state.user_by_email(&email).map(|user| user.id) else {
                return Ok(());
            };

            let token = OneTimeCodes::generate_reset_token();
            state.resets.insert(
                OneTimeCodes::digest(&token),
                PendingReset {
                    user_id,
                    expires_at: Utc::now() + self.settings.reset_ttl,
                },
            );
            token
        };

        let link = self.settings.reset_link(&token);
        self.deliver(OutgoingEmail::password_reset(&email, &link)).await
    }

    #[instrument(skip(self, token, new_password))]
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ProviderError> {
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::WeakPassword(format!(
                "Password should be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let password_hash = PasswordService::hash_password(new_password)?;
        let mut state = self.state();
        let pending = state
            .resets
            .remove(&OneTimeCodes::digest(token))
            .filter(|pending| pending.expires_at > Utc::now())
            .ok_or(ProviderError::InvalidResetToken)?;

        let user = state
            .users
            .get_mut(&pending.user_id)
            .ok_or(ProviderError::InvalidResetToken)?;
        user.password_hash = password_hash;
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for MemoryBackend {
    async fn insert_quote(
        &self,
        owner: Uuid,
        details: &QuoteDetails,
    ) -> Result<QuoteRequest, ProviderError> {
        let mut state = self.state();
        let quote = QuoteRequest {
            id: Uuid::new_v4(),
            created_at: state.next_timestamp(),
            user_id: owner,
            details: details.clone(),
        };
        state.quotes.push(quote.clone());
        Ok(quote)
    }

    async fn list_quotes(
        &self,
        viewer: Uuid,
        scope: QuoteScope,
    ) -> Result<Vec<QuoteRequest>, ProviderError> {
        let state = self.state();
        let see_all = scope == QuoteScope::All && state.is_admin(viewer);

        let mut quotes: Vec<QuoteRequest> = state
            .quotes
            .iter()
            .filter(|quote| see_all || quote.user_id == viewer)
            .cloned()
            .collect();
        quotes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(quotes)
    }
}

#[async_trait]
impl RoleStore for MemoryBackend {
    async fn find_role(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<RoleAssignment>, ProviderError> {
        Ok(self
            .state()
            .roles
            .iter()
            .find(|assignment| assignment.user_id == user_id && assignment.role == role.as_str())
            .cloned())
    }

    async fn list_role(&self, role: Role) -> Result<Vec<RoleAssignment>, ProviderError> {
        let mut assignments: Vec<RoleAssignment> = self
            .state()
            .roles
            .iter()
            .filter(|assignment| assignment.role == role.as_str())
            .cloned()
            .collect();
        assignments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceType;
    use crate::services::mailer::MemoryMailer;

    fn backend() -> (MemoryBackend, Arc<MemoryMailer>) {
        let mailer = Arc::new(MemoryMailer::new());
        let backend = MemoryBackend::from_config(&Config::for_memory(), mailer.clone());
        (backend, mailer)
    }

    fn details(name: &str) -> QuoteDetails {
        QuoteDetails {
            name: name.to_string(),
            email: "jane@x.com".to_string(),
            phone: None,
            business_name: "Jane's Cafe".to_string(),
            service_type: ServiceType::Business,
            budget: None,
            project_details: "Need a 5-page site".to_string(),
            timeline: None,
        }
    }

    #[tokio::test]
    async fn test_signup_verify_and_session_lookup() {
        let (backend, mailer) = backend();
        backend.sign_up("Jane@X.com ", "abc123").await.unwrap();

        let code = mailer.last_code_for("jane@x.com").unwrap();
        let session = backend.verify_otp("jane@x.com", &code).await.unwrap();
        assert_eq!(session.identity.email, "jane@x.com");

        let restored = backend.get_session(&session.access_token).await.unwrap().unwrap();
        assert_eq!(restored.identity, session.identity);

        // Codes are single use.
        assert!(matches!(
            backend.verify_otp("jane@x.com", &code).await,
            Err(ProviderError::InvalidOtp)
        ));
    }

    #[tokio::test]
    async fn test_unconfirmed_account_cannot_sign_in() {
        let (backend, _) = backend();
        backend.sign_up("jane@x.com", "abc123").await.unwrap();

        assert!(matches!(
            backend.sign_in_with_password("jane@x.com", "abc123").await,
            Err(ProviderError::EmailNotConfirmed)
        ));
        assert!(matches!(
            backend.sign_in_with_password("jane@x.com", "wrong1").await,
            Err(ProviderError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_confirmed_email_is_already_registered() {
        let (backend, _) = backend();
        backend.register_confirmed("jane@x.com", "abc123").unwrap();

        assert!(matches!(
            backend.sign_up("jane@x.com", "abc123").await,
            Err(ProviderError::AlreadyRegistered)
        ));
    }

    #[tokio::test]
    async fn test_passwords_are_stored_as_bcrypt_hashes() {
        let (backend, _) = backend();
        let jane = backend.register_confirmed("jane@x.com", "abc123").unwrap();
        backend.sign_up("bob@x.com", "abc123").await.unwrap();

        let state = backend.state();
        for user in state.users.values() {
            assert!(user.password_hash.starts_with("$2"));
            assert_ne!(user.password_hash, OneTimeCodes::digest("abc123"));
        }
        assert!(PasswordService::verify_password("abc123", &state.users[&jane.id].password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_resend_replaces_outstanding_code() {
        let (backend, mailer) = backend();
        backend.sign_up("jane@x.com", "abc123").await.unwrap();
        let first = mailer.last_code_for("jane@x.com").unwrap();

        backend.resend("jane@x.com").await.unwrap();
        let second = mailer.last_code_for("jane@x.com").unwrap();
        assert_eq!(mailer.sent().len(), 2);

        if first != second {
            assert!(backend.verify_otp("jane@x.com", &first).await.is_err());
        }
        assert!(backend.verify_otp("jane@x.com", &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_out_revokes_session() {
        let (backend, _) = backend();
        backend.register_confirmed("jane@x.com", "abc123").unwrap();
        let session = backend.sign_in_with_password("jane@x.com", "abc123").await.unwrap();

        backend.sign_out(&session.access_token).await.unwrap();
        assert!(backend.get_session(&session.access_token).await.unwrap().is_none());
        assert!(backend.get_session("not-a-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_reset_link_is_single_use() {
        let (backend, mailer) = backend();
        backend.register_confirmed("jane@x.com", "abc123").unwrap();
        backend.request_password_reset("jane@x.com").await.unwrap();
        backend.request_password_reset("nobody@x.com").await.unwrap();

        let link = mailer.last_reset_link_for("jane@x.com").unwrap();
        assert!(link.starts_with("http://localhost:3000/auth/reset?token="));
        let token = link.rsplit('=').next().unwrap();

        backend.reset_password(token, "newpass1").await.unwrap();
        assert!(backend.sign_in_with_password("jane@x.com", "newpass1").await.is_ok());
        assert!(matches!(
            backend.reset_password(token, "another1").await,
            Err(ProviderError::InvalidResetToken)
        ));
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_listing_applies_row_level_policy() {
        let (backend, _) = backend();
        let jane = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let admin = Uuid::new_v4();
        backend.grant_role(admin, Role::Admin);

        let first = backend.insert_quote(jane, &details("first")).await.unwrap();
        let second = backend.insert_quote(bob, &details("second")).await.unwrap();
        let third = backend.insert_quote(jane, &details("third")).await.unwrap();

        let mine = backend.list_quotes(jane, QuoteScope::All).await.unwrap();
        assert_eq!(
            mine.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![third.id, first.id]
        );

        let all = backend.list_quotes(admin, QuoteScope::All).await.unwrap();
        assert_eq!(
            all.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![third.id, second.id, first.id]
        );

        assert!(backend.list_quotes(admin, QuoteScope::Owned).await.unwrap().is_empty());
    }
}
