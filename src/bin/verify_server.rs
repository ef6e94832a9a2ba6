//! verify_server - streaming batch verification web front end
//!
//! Reads configuration from the environment (and `.env` when present), see
//! `batch_verify::config` for the full list of variables.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use batch_verify::server::{create_router, AppState};
use batch_verify::{HttpRegistry, VerifyConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batch_verify=info,tower_http=info".into()),
        )
        .init();

    let config = VerifyConfig::from_env().context("invalid configuration")?;
    let registry =
        HttpRegistry::new(config.registry()).context("failed to build registry client")?;

    tracing::info!(
        registry = %registry.config().base_url,
        max_workers = config.max_workers,
        request_delay_ms = config.request_delay_ms,
        max_retries = config.max_retries,
        token_file = %config.token_file.display(),
        "Configuration loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, Arc::new(registry)).context("failed to load templates")?;
    let app = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("verify_server listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
