// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

use beneficios_gateway::api::{self, AppState};
use beneficios_gateway::config::{AppConfig, Mode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cfg = AppConfig::from_env()?;
    init_tracing(cfg.mode);

    let state = AppState::from_config(&cfg)?;
    let app = api::router(state);

    let (host, port) = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        %local_addr,
        mode = %cfg.mode,
        upstream = %cfg.upstream.base_url,
        ttl_seconds = cfg.cache_ttl.as_secs(),
        "starting benefits gateway"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("benefits gateway exited cleanly");

    Ok(())
}

fn init_tracing(mode: Mode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match mode {
        Mode::Production => builder.json().init(),
        Mode::Development | Mode::Test => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term_signal) => term_signal.recv().await,
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                None
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
