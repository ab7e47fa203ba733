use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::{
    errors::{AppError, Result},
    handlers::AppState,
    middleware::auth::{SessionPortal, SignedIn},
    models::{QuoteForm, QuoteRequest, SubmitQuoteResponse},
};

fn outcome_label(result: &Result<SubmitQuoteResponse>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(AppError::AuthRequired) => "auth_required",
        Err(AppError::RateLimited { .. }) => "rate_limited",
        Err(AppError::Validation(_)) => "invalid",
        Err(AppError::PersistenceFailed(_)) => "persistence_failed",
        Err(AppError::SubmissionInFlight) => "in_flight",
        Err(AppError::SessionEnded) => "session_ended",
        Err(_) => "error",
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    request_body = QuoteForm,
    responses(
        (status = 201, description = "Quote request saved", body = SubmitQuoteResponse),
        (status = 400, description = "First invalid field"),
        (status = 401, description = "Sign in required"),
        (status = 409, description = "A submission is already in progress"),
        (status = 429, description = "Cooldown active"),
        (status = 502, description = "Storage rejected the request")
    ),
    tag = "quotes"
)]
pub async fn submit_quote(
    State(state): State<AppState>,
    caller: SessionPortal,
    Json(mut form): Json<QuoteForm>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let result = caller.portal.submissions().submit(&mut form).await;
    state.metrics.record_submission(outcome_label(&result));
    let response = result?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": response.notice.description,
            "notice": response.notice,
            "data": response.quote,
            "form": form,
            "retry_after_secs": caller.portal.submissions().cooldown_remaining_secs()
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes",
    responses(
        (status = 200, description = "All quotes for admins, own quotes otherwise", body = [QuoteRequest]),
        (status = 401, description = "Sign in required"),
        (status = 502, description = "Listing failed")
    ),
    tag = "quotes"
)]
pub async fn list_quotes(signed_in: SignedIn) -> Result<Json<serde_json::Value>> {
    let view = signed_in.portal.retrieval().load().await?;

    Ok(Json(json!({
        "admin_status": view.admin_status.as_str(),
        "role_error": view.admin_status.error(),
        "scope": view.scope,
        "count": view.quotes.len(),
        "data": view.quotes
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes/mine",
    responses(
        (status = 200, description = "Quotes submitted by the caller", body = [QuoteRequest]),
        (status = 401, description = "Sign in required")
    ),
    tag = "quotes"
)]
pub async fn my_quotes(signed_in: SignedIn) -> Result<Json<serde_json::Value>> {
    let quotes = signed_in.portal.retrieval().load_mine().await?;

    Ok(Json(json!({
        "count": quotes.len(),
        "data": quotes
    })))
}
