use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{AuthProvider, AuthSettings, ProviderError, QuoteStore, RoleStore};
use crate::{
    auth::{JwtService, OneTimeCodes, PasswordService, MIN_PASSWORD_LENGTH},
    database::{
        queries::{CodeQueries, QuoteQueries, ResetQueries, RoleQueries, SessionQueries, UserQueries},
        Database,
    },
    models::{Identity, QuoteDetails, QuoteRequest, QuoteScope, Role, RoleAssignment, Session},
    services::mailer::{Mailer, OutgoingEmail},
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_strength(password: &str) -> Result<(), ProviderError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ProviderError::WeakPassword(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub struct PgAuthProvider {
    database: Database,
    jwt: JwtService,
    mailer: Arc<dyn Mailer>,
    settings: AuthSettings,
}

impl PgAuthProvider {
    pub fn new(
        database: Database,
        jwt: JwtService,
        mailer: Arc<dyn Mailer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            database,
            jwt,
            mailer,
            settings,
        }
    }

    async fn open_session(&self, identity: Identity) -> Result<Session, ProviderError> {
        let session_id = SessionQueries::create_session(self.database.pool(), identity.id).await?;
        let (access_token, expires_at) = self.jwt.generate_access_token(&identity, session_id)?;

        Ok(Session {
            access_token,
            expires_at,
            identity,
        })
    }

    async fn send_code(&self, user_id: Uuid, email: &str) -> Result<(), ProviderError> {
        let code = OneTimeCodes::generate_code();
        let expires_at = Utc::now() + self.settings.code_ttl;
        CodeQueries::upsert_code(
            self.database.pool(),
            user_id,
            &OneTimeCodes::digest(&code),
            expires_at,
        )
        .await?;

        self.mailer
            .send(&OutgoingEmail::signup_code(email, &code))
            .await
            .map_err(|e| ProviderError::Mail(e.to_string()))
    }
}

#[async_trait]
impl AuthProvider for PgAuthProvider {
    async fn get_session(&self, access_token: &str) -> Result<Option<Session>, ProviderError> {
        let claims = match self.jwt.verify_access_token(access_token) {
            Ok(claims) => claims,
            Err(_) => return Ok(None),
        };
        let (user_id, session_id) = match (claims.user_id(), claims.session_id()) {
            (Ok(user_id), Ok(session_id)) => (user_id, session_id),
            _ => return Ok(None),
        };

        let pool = self.database.pool();
        if !SessionQueries::is_active(pool, session_id, user_id).await? {
            return Ok(None);
        }

        Ok(UserQueries::find_by_id(pool, user_id)
            .await?
            .map(|user| Session {
                access_token: access_token.to_string(),
                expires_at: claims.expires_at(),
                identity: user.identity(),
            }))
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        check_strength(password)?;

        let email = normalize_email(email);
        let pool = self.database.pool();
        let password_hash = PasswordService::hash_password(password)?;

        let user = match UserQueries::find_by_email(pool, &email).await? {
            Some(user) if user.is_confirmed() => return Err(ProviderError::AlreadyRegistered),
            Some(user) => {
                UserQueries::update_password(pool, user.id, &password_hash).await?;
                user
            }
            None => UserQueries::create_user(pool, &email, &password_hash).await?,
        };

        info!(user_id = %user.id, "Signup code issued");
        self.send_code(user.id, &user.email).await
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let user = UserQueries::find_by_email(self.database.pool(), &normalize_email(email))
            .await?
            .ok_or(ProviderError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            return Err(ProviderError::InvalidCredentials);
        }
        if !user.is_confirmed() {
            return Err(ProviderError::EmailNotConfirmed);
        }

        self.open_session(user.identity()).await
    }

    #[instrument(skip(self, code))]
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Session, ProviderError> {
        if !OneTimeCodes::is_well_formed_code(code) {
            return Err(ProviderError::InvalidOtp);
        }

        let pool = self.database.pool();
        let user = UserQueries::find_by_email(pool, &normalize_email(email))
            .await?
            .ok_or(ProviderError::InvalidOtp)?;

        if !CodeQueries::consume_code(pool, user.id, &OneTimeCodes::digest(code)).await? {
            return Err(ProviderError::InvalidOtp);
        }
        UserQueries::confirm_email(pool, user.id).await?;

        self.open_session(user.identity()).await
    }

    #[instrument(skip(self))]
    async fn resend(&self, email: &str) -> Result<(), ProviderError> {
        match UserQueries::find_by_email(self.database.pool(), &normalize_email(email)).await? {
            Some(user) if !user.is_confirmed() => self.send_code(user.id, &user.email).await,
            _ => Ok(()),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ProviderError> {
        match self
            .jwt
            .verify_access_token(access_token)
            .and_then(|claims| claims.session_id())
        {
            Ok(session_id) => SessionQueries::revoke(self.database.pool(), session_id).await?,
            Err(_) => warn!("Sign-out with an unrecognised token"),
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn request_password_reset(&self, email: &str) -> Result<(), ProviderError> {
        let pool = self.database.pool();
        let Some(user) = UserQueries::find_by_email(pool, &normalize_email(email)).await? else {
            return Ok(());
        };

        let token = OneTimeCodes::generate_reset_token();
        let expires_at = Utc::now() + self.settings.reset_ttl;
        ResetQueries::create_reset(pool, &OneTimeCodes::digest(&token), user.id, expires_at).await?;

        let link = self.settings.reset_link(&token);
        self.mailer
            .send(&OutgoingEmail::password_reset(&user.email, &link))
            .await
            .map_err(|e| ProviderError::Mail(e.to_string()))
    }

    #[instrument(skip(self, token, new_password))]
    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ProviderError> {
        check_strength(new_password)?;

        let pool = self.database.pool();
        let user_id = ResetQueries::consume_reset(pool, &OneTimeCodes::digest(token))
            .await?
            .ok_or(ProviderError::InvalidResetToken)?;

        let password_hash = PasswordService::hash_password(new_password)?;
        UserQueries::update_password(pool, user_id, &password_hash).await?;
        info!(user_id = %user_id, "Password reset");
        Ok(())
    }
}

pub struct PgStore {
    database: Database,
}

impl PgStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl QuoteStore for PgStore {
    async fn insert_quote(
        &self,
        owner: Uuid,
        details: &QuoteDetails,
    ) -> Result<QuoteRequest, ProviderError> {
        let record = QuoteQueries::create_quote(self.database.pool(), owner, details).await?;
        QuoteRequest::try_from(record).map_err(|e| ProviderError::Unavailable(e.to_string()))
    }

    async fn list_quotes(
        &self,
        viewer: Uuid,
        scope: QuoteScope,
    ) -> Result<Vec<QuoteRequest>, ProviderError> {
        QuoteQueries::list_visible(self.database.pool(), viewer, scope)
            .await?
            .into_iter()
            .map(|record| {
                QuoteRequest::try_from(record).map_err(|e| ProviderError::Unavailable(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_role(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<RoleAssignment>, ProviderError> {
        Ok(RoleQueries::find_role(self.database.pool(), user_id, role).await?)
    }

    async fn list_role(&self, role: Role) -> Result<Vec<RoleAssignment>, ProviderError> {
        Ok(RoleQueries::list_role(self.database.pool(), role).await?)
    }
}
