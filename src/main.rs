// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use seo_audit_agent::app::{create_router, AppState, VERSION};
use seo_audit_agent::services::auth::TokenAuth;
use seo_audit_agent::services::controller::CrawlController;
use seo_audit_agent::services::crawler::{CrawlConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_URLS};
use seo_audit_agent::services::scheduler::MonthlyScheduler;
use seo_audit_agent::services::storage::StorageClient;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let auth_token = env::var("AUTH_TOKEN").expect("AUTH_TOKEN environment variable must be set");

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data.sqlite?mode=rwc".to_string());

    let port = env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid port number");

    let config = CrawlConfig {
        max_depth: env_bound("CRAWL_MAX_DEPTH", DEFAULT_MAX_DEPTH),
        max_urls: env_bound("CRAWL_MAX_URLS", DEFAULT_MAX_URLS),
    };

    let storage = StorageClient::connect(&database_url)
        .await
        .expect("failed to open the crawl database");
    info!(database_url, "connected to crawl database");

    let controller = CrawlController::new();
    let scheduler = Arc::new(MonthlyScheduler::new(
        storage.clone(),
        controller.clone(),
        config,
    ));

    let state = AppState {
        storage,
        controller,
        scheduler,
        auth: TokenAuth::new(&auth_token),
        config,
    };

    let app = create_router(state);

    // Bind to 0.0.0.0 to accept connections from any network interface (required for Docker)
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");

    info!("seo-audit-agent v{} listening on {}", VERSION, addr);

    axum::serve(listener, app)
        .await
        .expect("server terminated");
}

fn env_bound(name: &str, default: usize) -> usize {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .unwrap_or_else(|_| panic!("{name} must be a positive number")),
        Err(_) => default,
    }
}
