// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use idp_account_server::{
    api::router,
    auth::KeySetCache,
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::AccountDatabase,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let accounts = Arc::new(AccountDatabase::open(&config.database_path())?);
    let keys = KeySetCache::new(config.jwks_url.clone(), config.key_fetch_timeout)?;

    let policy = config.validation_policy();
    if policy.audiences.is_empty() {
        tracing::warn!("No client IDs configured; tokens for any audience will be accepted");
    }

    let state = AppState::build(keys, policy, accounts, config.persistence_timeout);
    let app = router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, jwks_url = %config.jwks_url, "Account server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Account server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (json, pretty) = match format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
