use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::{
    errors::AppError,
    handlers::AppState,
    models::Identity,
    services::portal::Portal,
};

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// The caller's portal: restored from the bearer token, or anonymous.
pub struct SessionPortal {
    pub portal: Arc<Portal>,
    pub access_token: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionPortal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let access_token = bearer_token(parts);
        let portal = state.portals.open(access_token.as_deref()).await?;

        Ok(SessionPortal {
            portal,
            access_token,
        })
    }
}

/// Like `SessionPortal`, but rejects anonymous callers with `AuthRequired`.
pub struct SignedIn {
    pub portal: Arc<Portal>,
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for SignedIn {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let SessionPortal { portal, .. } = SessionPortal::from_request_parts(parts, state).await?;
        let identity = portal
            .session()
            .current_identity()
            .ok_or(AppError::AuthRequired)?;

        Ok(SignedIn { portal, identity })
    }
}
