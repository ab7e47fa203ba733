use axum::response::Json;
use serde_json::json;

use crate::{
    errors::Result,
    middleware::auth::SignedIn,
    models::{QuoteRequest, RoleAssignment},
};

#[utoipa::path(
    get,
    path = "/api/v1/admin/quotes",
    responses(
        (status = 200, description = "Every quote request, newest first", body = [QuoteRequest]),
        (status = 403, description = "Not an admin"),
        (status = 503, description = "Admin status could not be confirmed")
    ),
    tag = "admin"
)]
pub async fn all_quotes(signed_in: SignedIn) -> Result<Json<serde_json::Value>> {
    let quotes = signed_in.portal.retrieval().load_all_as_admin().await?;

    Ok(Json(json!({
        "count": quotes.len(),
        "data": quotes
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    responses(
        (status = 200, description = "Admin role assignments, newest first", body = [RoleAssignment]),
        (status = 403, description = "Not an admin"),
        (status = 503, description = "Admin status could not be confirmed")
    ),
    tag = "admin"
)]
pub async fn admin_users(signed_in: SignedIn) -> Result<Json<serde_json::Value>> {
    let admins = signed_in.portal.retrieval().list_admins().await?;

    Ok(Json(json!({
        "count": admins.len(),
        "data": admins
    })))
}
