use axum::{extract::State, response::Json};
use serde_json::json;

use crate::{
    errors::Result,
    handlers::AppState,
    middleware::auth::{SessionPortal, SignedIn},
    models::{
        AuthResponse, EmailRequest, LoginRequest, ResetPasswordRequest, SignUpRequest,
        VerifyCodeRequest,
    },
};

fn tally<T>(state: &AppState, action: &str, result: Result<T>) -> Result<T> {
    state.metrics.record_auth_action(action, result.is_ok());
    result
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Verification code sent"),
        (status = 400, description = "Passwords do not match or are too short"),
        (status = 409, description = "Account already registered")
    ),
    tag = "auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let notice = tally(
        &state,
        "signup",
        portal
            .account()
            .sign_up(&request.email, &request.password, &request.confirm_password)
            .await,
    )?;

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice,
        "data": { "email": request.email.trim(), "needs_verification": true }
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Email confirmed, session opened", body = AuthResponse),
        (status = 401, description = "Code expired or invalid")
    ),
    tag = "auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let (session, notice) = tally(
        &state,
        "verify",
        portal.account().verify_code(&request.email, &request.code).await,
    )?;
    state.portals.register(&session.access_token, portal);

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice,
        "data": AuthResponse::from(session)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend",
    request_body = EmailRequest,
    responses((status = 200, description = "Code resent")),
    tag = "auth"
)]
pub async fn resend(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let notice = tally(&state, "resend", portal.account().resend_code(&request.email).await)?;

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials or unconfirmed email")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let session = tally(
        &state,
        "login",
        portal.account().sign_in(&request.email, &request.password).await,
    )?;
    state.portals.register(&session.access_token, portal);

    Ok(Json(json!({
        "message": "Login successful",
        "data": AuthResponse::from(session)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "No session")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    signed_in: SignedIn,
) -> Result<Json<serde_json::Value>> {
    let notice = tally(&state, "logout", signed_in.portal.account().sign_out().await)?;

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/recover",
    request_body = EmailRequest,
    responses((status = 200, description = "Reset link sent if the account exists")),
    tag = "auth"
)]
pub async fn recover(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let notice = tally(
        &state,
        "recover",
        portal.account().request_password_reset(&request.email).await,
    )?;

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Reset link expired or invalid")
    ),
    tag = "auth"
)]
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let portal = state.portals.anonymous();
    let notice = tally(
        &state,
        "reset",
        portal
            .account()
            .reset_password(&request.token, &request.password, &request.confirm_password)
            .await,
    )?;

    Ok(Json(json!({
        "message": notice.description,
        "notice": notice
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses((status = 200, description = "Current identity, or null")),
    tag = "auth"
)]
pub async fn current_session(caller: SessionPortal) -> Json<serde_json::Value> {
    let identity = caller.portal.session().current_identity();

    Json(json!({
        "authenticated": identity.is_some(),
        "data": identity
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/role",
    responses(
        (status = 200, description = "Admin status: admin, non_admin or unknown"),
        (status = 401, description = "No session")
    ),
    tag = "auth"
)]
pub async fn my_role(signed_in: SignedIn) -> Result<Json<serde_json::Value>> {
    let status = signed_in.portal.retrieval().admin_status().await?;

    Ok(Json(json!({
        "data": {
            "user_id": signed_in.identity.id,
            "status": status.as_str(),
            "is_admin": status.is_admin(),
            "error": status.error()
        }
    })))
}
