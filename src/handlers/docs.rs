use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
        crate::handlers::auth::sign_up,
        crate::handlers::auth::verify,
        crate::handlers::auth::resend,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::recover,
        crate::handlers::auth::reset,
        crate::handlers::auth::current_session,
        crate::handlers::auth::my_role,
        crate::handlers::quotes::submit_quote,
        crate::handlers::quotes::list_quotes,
        crate::handlers::quotes::my_quotes,
        crate::handlers::admin::all_quotes,
        crate::handlers::admin::admin_users,
    ),
    components(
        schemas(
            crate::models::QuoteForm,
            crate::models::QuoteDetails,
            crate::models::QuoteRequest,
            crate::models::QuoteScope,
            crate::models::ServiceType,
            crate::models::Budget,
            crate::models::SubmitQuoteResponse,
            crate::models::Notice,
            crate::models::Tone,
            crate::models::Identity,
            crate::models::AuthResponse,
            crate::models::SignUpRequest,
            crate::models::LoginRequest,
            crate::models::VerifyCodeRequest,
            crate::models::EmailRequest,
            crate::models::ResetPasswordRequest,
            crate::models::RoleAssignment,
        )
    ),
    tags(
        (name = "auth", description = "Signup, verification and sessions"),
        (name = "quotes", description = "Quote request submission and listing"),
        (name = "admin", description = "Admin-only listings"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "Quote Portal API",
        version = "1.0.0",
        description = "Authenticated quote requests with role-gated review",
        contact(
            name = "API Support",
            email = "support@example.com"
        )
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
