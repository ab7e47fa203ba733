use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quote_portal::{
    config::{Config, StorageBackend},
    create_app,
    database::Database,
    providers::{Backends, MemoryBackend},
    services::mailer,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let config = Config::from_env()?;
    info!(backend = ?config.storage_backend, "Starting quote portal");

    let mailer = mailer::from_config(&config);
    if config.resend_api_key.is_none() {
        warn!("RESEND_API_KEY not set, outgoing mail will only be logged");
    }

    let (backends, database) = match config.storage_backend {
        StorageBackend::Postgres => {
            let database = Database::new(&config.database_url).await?;
            database.migrate().await?;
            info!("Database migrations applied");
            (
                Backends::postgres(database.clone(), &config, mailer),
                Some(database),
            )
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            let backend = Arc::new(MemoryBackend::from_config(&config, mailer));
            (Backends::memory(backend), None)
        }
    };

    let state = AppState::new(config.clone(), backends, database)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
