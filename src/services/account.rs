use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::ValidateEmail;

use crate::auth::PasswordService;
use crate::errors::{AppError, Result, ValidationError};
use crate::models::{Notice, Session};
use crate::providers::AuthProvider;
use crate::services::session::SessionStore;

fn check_email(email: &str) -> std::result::Result<String, ValidationError> {
    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(ValidationError::new("email", "Email is required"));
    }
    if !email.validate_email() {
        return Err(ValidationError::new("email", "Invalid email address"));
    }
    Ok(email)
}

/// Signup with emailed code, password sign-in and recovery. Successful
/// sign-ins land in the session store.
pub struct AccountService {
    auth: Arc<dyn AuthProvider>,
    session: SessionStore,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthProvider>, session: SessionStore) -> Self {
        Self { auth, session }
    }

    /// Password checks run locally; nothing reaches the provider unless they pass.
    #[instrument(skip(self, password, confirm_password))]
    pub async fn sign_up(&self, email: &str, password: &str, confirm_password: &str) -> Result<Notice> {
        PasswordService::validate_new_password(password, confirm_password)?;
        let email = check_email(email)?;

        self.auth.sign_up(&email, password).await?;
        info!("Verification code requested");

        Ok(Notice::success(
            "Verification Email Sent!",
            "Please check your email and enter the verification code.",
        ))
    }

    #[instrument(skip(self, code))]
    pub async fn verify_code(&self, email: &str, code: &str) -> Result<(Session, Notice)> {
        let session = self.auth.verify_otp(email.trim(), code.trim()).await?;
        self.session.sign_in(session.clone());

        Ok((
            session,
            Notice::success("Email Verified!", "Your account is now active."),
        ))
    }

    /// Leaves the session untouched; safe to repeat.
    #[instrument(skip(self))]
    pub async fn resend_code(&self, email: &str) -> Result<Notice> {
        let email = check_email(email)?;
        self.auth.resend(&email).await?;

        Ok(Notice::success(
            "Code Resent!",
            "A new verification code has been sent to your email.",
        ))
    }

    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Auth("Invalid login credentials".to_string()));
        }

        let session = self.auth.sign_in_with_password(email.trim(), password).await?;
        self.session.sign_in(session.clone());
        Ok(session)
    }

    /// The local session is cleared even when the provider call fails.
    pub async fn sign_out(&self) -> Result<Notice> {
        if let Some(token) = self.session.access_token() {
            if let Err(e) = self.auth.sign_out(&token).await {
                warn!(error = %e, "Provider sign-out failed");
            }
        }
        self.session.sign_out();

        Ok(Notice::success("Signed Out", "You have been signed out."))
    }

    #[instrument(skip(self))]
    pub async fn request_password_reset(&self, email: &str) -> Result<Notice> {
        let email = check_email(email)?;
        self.auth.request_password_reset(&email).await?;

        Ok(Notice::success(
            "Check Your Email",
            "If an account exists for that address, a password reset link is on its way.",
        ))
    }

    #[instrument(skip(self, token, password, confirm_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Notice> {
        PasswordService::validate_new_password(password, confirm_password)?;
        self.auth.reset_password(token.trim(), password).await?;

        Ok(Notice::success(
            "Password Updated",
            "You can now sign in with your new password.",
        ))
    }
}
