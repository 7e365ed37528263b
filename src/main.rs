// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use timeline_agent::app::{create_router, AppState, VERSION};
use timeline_agent::models::config::AgentConfig;
use timeline_agent::services::cache::{PageCache, RowStateStore};
use timeline_agent::services::coordinator::TimelineCoordinator;
use timeline_agent::services::logging::init_tracing;
use timeline_agent::services::search::HttpSearchService;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AgentConfig::parse();
    config.validate()?;

    let search_url = config.search_url()?;
    let search = HttpSearchService::new(
        search_url,
        config.poll_interval(),
        config.request_timeout(),
    )
    .context("failed to build search service client")?;

    let coordinator = TimelineCoordinator::with_all(
        config.timeline_id(),
        Arc::new(search),
        PageCache::new(),
        Some(RowStateStore::new()),
    );

    let app = create_router(AppState {
        coordinator: coordinator.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(
        version = VERSION,
        addr = %config.listen_addr,
        timeline = %coordinator.id(),
        "timeline-agent listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    coordinator.cancel();
    tracing::info!("timeline-agent stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
