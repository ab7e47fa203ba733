use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::providers::ProviderError;

/// A single field-level violation, reported back to the form that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Account already registered")]
    AlreadyRegistered,

    #[error("Rate limit exceeded, retry in {remaining_secs}s")]
    RateLimited { remaining_secs: u64 },

    #[error("Failed to save quote request: {0}")]
    PersistenceFailed(String),

    #[error("Unable to confirm admin status: {0}")]
    RoleResolution(String),

    #[error("Failed to load quote requests: {0}")]
    Retrieval(String),

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("Session ended before the request completed")]
    SessionEnded,

    #[error("Email delivery failed: {0}")]
    Mail(String),

    #[error("Auth service error: {0}")]
    Provider(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short heading shown above the message in the UI notification.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Invalid Input",
            AppError::AuthRequired => "Sign In Required",
            AppError::Auth(_) => "Authentication Failed",
            AppError::AlreadyRegistered => "Account Already Exists",
            AppError::RateLimited { .. } => "Please Wait",
            AppError::PersistenceFailed(_) => "Submission Failed",
            AppError::RoleResolution(_) => "Status Unknown",
            AppError::Retrieval(_) => "Error Loading Quotes",
            AppError::SubmissionInFlight => "Already Submitting",
            AppError::SessionEnded => "Session Ended",
            AppError::Mail(_) => "Email Not Sent",
            AppError::Provider(_) => "Request Failed",
            AppError::Forbidden => "Access Denied",
            AppError::Database(_) | AppError::Internal(_) => "Error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::AuthRequired | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::AlreadyRegistered
            | AppError::SubmissionInFlight
            | AppError::SessionEnded => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::PersistenceFailed(_)
            | AppError::Retrieval(_)
            | AppError::Mail(_)
            | AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::RoleResolution(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing description. Backend details are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.message.clone(),
            AppError::AuthRequired => "Please sign in to submit a quote request.".to_string(),
            AppError::Auth(msg) => msg.clone(),
            AppError::AlreadyRegistered => {
                "This account is already signed up with us. Please sign in instead.".to_string()
            }
            AppError::RateLimited { remaining_secs } => format!(
                "Please wait {} seconds before submitting another request.",
                remaining_secs
            ),
            AppError::PersistenceFailed(msg)
            | AppError::Retrieval(msg)
            | AppError::Mail(msg)
            | AppError::Provider(msg) => msg.clone(),
            AppError::RoleResolution(_) => {
                "We could not confirm your access level. Please try again.".to_string()
            }
            AppError::SubmissionInFlight => {
                "Your previous request is still being submitted.".to_string()
            }
            AppError::SessionEnded => "You were signed out before the request finished.".to_string(),
            AppError::Forbidden => "You need admin privileges to access this page.".to_string(),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::AlreadyRegistered => AppError::AlreadyRegistered,
            ProviderError::InvalidCredentials => {
                AppError::Auth("Invalid login credentials".to_string())
            }
            ProviderError::EmailNotConfirmed => AppError::Auth("Email not confirmed".to_string()),
            ProviderError::InvalidOtp => {
                AppError::Auth("Token has expired or is invalid".to_string())
            }
            ProviderError::InvalidResetToken => {
                AppError::Auth("Reset link has expired or is invalid".to_string())
            }
            ProviderError::WeakPassword(msg) => {
                AppError::Validation(ValidationError::new("password", msg))
            }
            ProviderError::Mail(msg) => AppError::Mail(msg),
            ProviderError::Unavailable(msg) => AppError::Provider(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Internal(e) => tracing::error!("Internal error: {}", e),
            AppError::PersistenceFailed(msg) => tracing::error!("Persistence failed: {}", msg),
            AppError::Retrieval(msg) => tracing::error!("Retrieval failed: {}", msg),
            AppError::Mail(msg) => tracing::error!("Mail delivery failed: {}", msg),
            AppError::Provider(msg) => tracing::error!("Auth service error: {}", msg),
            AppError::RoleResolution(msg) => tracing::warn!("Role resolution failed: {}", msg),
            _ => {}
        }

        let mut body = json!({
            "error": self.user_message(),
            "title": self.title(),
            "status": status.as_u16()
        });

        match &self {
            AppError::Validation(e) => {
                body["field"] = json!(e.field);
            }
            AppError::AuthRequired => {
                body["redirect"] = json!("/auth");
            }
            AppError::RateLimited { remaining_secs } => {
                body["retry_after_secs"] = json!(remaining_secs);
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::RateLimited { remaining_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&remaining_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
