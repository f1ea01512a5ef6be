mod auth;
mod config;
mod db;
mod error;
mod rate_limit;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;
use db::Database;
use routes::{app_router, AppState};

const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(3_600);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plotline_api=info".parse()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting plotline-api with config: {:?}", config);

    let state = AppState::from_config(config)?;
    let bind_addr = state.config.bind_addr.clone();
    spawn_session_pruning(state.db.clone());
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("plotline-api listening on {}", bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("plotline-api stopped");
    Ok(())
}

fn spawn_session_pruning(db: Database) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match db.prune_expired_sessions(chrono::Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Pruned inactive sessions"),
                Err(error) => tracing::warn!("Session pruning failed: {}", error),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", error);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
