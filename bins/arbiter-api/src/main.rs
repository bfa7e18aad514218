mod handlers;
mod routes;

use anyhow::{Context, Result};
use arbiter_common::EngineConfig;
use arbiter_engine::{FallbackExecutor, Orchestrator, RemoteExecutionClient, Validator};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub validator: Validator,
}

impl AppState {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = RemoteExecutionClient::new(config).context("Failed to build backend client")?;
        let orchestrator = Orchestrator::new(Arc::new(client), FallbackExecutor::new(), config);
        Ok(Self {
            validator: Validator::new(orchestrator.clone()),
            orchestrator,
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .with_state(Arc::new(state))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Arbiter API booting...");

    let config = EngineConfig::from_env().context("Invalid engine configuration")?;
    info!(
        backend = %config.base_url,
        poll_attempts = config.poll_attempts,
        poll_delay_ms = config.poll_delay_ms,
        max_concurrency = config.max_concurrent_dispatch,
        "Engine configured"
    );

    let app = app(AppState::new(&config)?);

    let addr = std::env::var("ARBITER_API_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
