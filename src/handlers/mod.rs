use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::Config,
    database::Database,
    middleware::metrics_middleware,
    providers::Backends,
    services::{metrics::MetricsService, portal::PortalRegistry},
};

pub mod admin;
pub mod auth;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod quotes;

#[derive(Clone)]
pub struct AppState {
    pub database: Option<Database>,
    pub backends: Backends,
    pub config: Config,
    pub portals: Arc<PortalRegistry>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(config: Config, backends: Backends, database: Option<Database>) -> anyhow::Result<Self> {
        let portals = PortalRegistry::new(
            backends.clone(),
            config.submission_cooldown(),
            config.session_idle(),
        );

        Ok(Self {
            database,
            backends,
            config,
            portals: Arc::new(portals),
            metrics: Arc::new(MetricsService::new()?),
        })
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/resend", post(auth::resend))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/recover", post(auth::recover))
        .route("/auth/reset", post(auth::reset))
        .route("/auth/session", get(auth::current_session))
        .route("/me/role", get(auth::my_role))
        .route("/quotes", post(quotes::submit_quote).get(quotes::list_quotes))
        .route("/quotes/mine", get(quotes::my_quotes))
        .route("/admin/quotes", get(admin::all_quotes))
        .route("/admin/users", get(admin::admin_users))
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_routes())
        .merge(docs::create_docs_router())
        .layer(from_fn_with_state(state.clone(), metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
