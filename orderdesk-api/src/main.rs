use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use orderdesk_api::{app, AppState};
use orderdesk_provider::{HttpProviderClient, ProviderConfig};
use orderdesk_store::{app_config::Config, DbClient, PgOrderStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "orderdesk_api=debug,orderdesk_order=debug,orderdesk_provider=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting orderdesk API on port {}", config.server.port);

    let db = DbClient::new(config.database.url.expose(), config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    if !config.provider.is_complete() {
        tracing::warn!(
            "Provider base URL or API key missing; status pushes will fail with a configuration error"
        );
    }

    // One client for the whole process, reused by every reconciliation.
    let provider = HttpProviderClient::new(ProviderConfig {
        base_url: config.provider.base_url.clone(),
        api_key: config.provider.api_key.clone(),
        timeout: Duration::from_secs(config.provider.timeout_secs),
    })?;

    let app_state = AppState::new(
        Arc::new(PgOrderStore::new(db.pool.clone())),
        Arc::new(provider),
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
