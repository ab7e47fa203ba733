//! Contracts for the hosted collaborators the portal depends on: identity,
//! quote storage and role storage. The portal never talks to a database or
//! mail API directly; it only sees these traits.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::JwtService,
    config::Config,
    database::Database,
    models::{QuoteDetails, QuoteRequest, QuoteScope, Role, RoleAssignment, Session},
    services::mailer::Mailer,
};

pub use memory::MemoryBackend;
pub use postgres::{PgAuthProvider, PgStore};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("User already registered")]
    AlreadyRegistered,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Token has expired or is invalid")]
    InvalidOtp,

    #[error("Reset link has expired or is invalid")]
    InvalidResetToken,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Email delivery failed: {0}")]
    Mail(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for ProviderError {
    fn from(err: sqlx::Error) -> Self {
        ProviderError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves a bearer token to its live session, or `None` if it is unknown, expired or revoked.
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, ProviderError>;

    /// Creates an unconfirmed account and mails a one-time code.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// Consumes a signup code, confirms the email and opens a session.
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ProviderError>;

    async fn resend(&self, email: &str) -> Result<(), ProviderError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError>;

    async fn request_password_reset(&self, email: &str) -> Result<(), ProviderError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn insert_quote(
        &self,
        owner: Uuid,
        details: &QuoteDetails,
    ) -> Result<QuoteRequest, ProviderError>;

    /// Lists quotes newest first. Row-level policy: unless `viewer` holds the
    /// admin role, only the viewer's own rows come back, whatever the scope.
    async fn list_quotes(
        &self,
        viewer: Uuid,
        scope: QuoteScope,
    ) -> Result<Vec<QuoteRequest>, ProviderError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<RoleAssignment>, ProviderError>;

    async fn list_role(&self, role: Role) -> Result<Vec<RoleAssignment>, ProviderError>;
}

/// Lifetimes and links used by the auth providers.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub code_ttl: chrono::Duration,
    pub reset_ttl: chrono::Duration,
    pub site_url: String,
}

impl AuthSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            code_ttl: config.signup_code_ttl(),
            reset_ttl: config.reset_link_ttl(),
            site_url: config.site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/auth/reset?token={}", self.site_url, token)
    }
}

#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthProvider>,
    pub quotes: Arc<dyn QuoteStore>,
    pub roles: Arc<dyn RoleStore>,
}

impl Backends {
    pub fn memory(backend: Arc<MemoryBackend>) -> Self {
        Self {
            auth: backend.clone(),
            quotes: backend.clone(),
            roles: backend,
        }
    }

    pub fn postgres(database: Database, config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        let jwt = JwtService::new(&config.jwt_secret, config.session_ttl());
        let store = Arc::new(PgStore::new(database.clone()));
        let auth = Arc::new(PgAuthProvider::new(
            database,
            jwt,
            mailer,
            AuthSettings::from_config(config),
        ));

        Self {
            auth,
            quotes: store.clone(),
            roles: store,
        }
    }
}
