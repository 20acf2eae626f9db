mod auth;
mod backend;
mod booking;
mod cache;
mod catalog;
mod checkout;
mod config;
mod db;
mod entities;
mod error;
mod location;
mod mock;
mod models;
mod payment;
mod realtime;
mod routes;
mod templates;

use std::{sync::Arc, time::Duration};

use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    backend::BackendClient, cache::CacheManager, config::Config, models::Movie,
    realtime::RowChange,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub cache: CacheManager,
    pub backend: Arc<BackendClient>,
    pub changes: broadcast::Sender<RowChange<Movie>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinebook=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = wreq::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = CacheManager::new(db, config.catalog_ttl_secs, config.draft_ttl_minutes);

    let backend = BackendClient::new(
        http,
        config.backend_url.clone(),
        config.backend_anon_key.clone(),
        config.backend_rps,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        cache,
        backend: Arc::new(backend),
        changes: realtime::channel(),
    });

    realtime::spawn_catalog_watcher(state.clone());

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Fresh state per test: mock backend, private in-memory database, no watcher task.
#[cfg(test)]
pub async fn test_state() -> Arc<AppState> {
    test_state_with(Config::for_tests()).await
}

#[cfg(test)]
pub async fn test_state_with(config: Config) -> Arc<AppState> {
    let config = Arc::new(config);
    let db = db::connect_and_migrate(&config.database_url).await.unwrap();
    let cache = CacheManager::new(db, config.catalog_ttl_secs, config.draft_ttl_minutes);
    let backend = BackendClient::new(
        wreq::Client::new(),
        config.backend_url.clone(),
        config.backend_anon_key.clone(),
        config.backend_rps,
    );
    Arc::new(AppState { config, cache, backend: Arc::new(backend), changes: realtime::channel() })
}
