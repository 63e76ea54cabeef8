// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, and router construction.
//!
//! This module is `pub` so that integration tests can build a test router
//! directly without starting the full binary.

use crate::models::api::{
    CrawlIdParams, DomainParams, OkResponse, ScheduleRequest, StartCrawlRequest,
    StartCrawlResponse,
};
use crate::models::crawl::{CrawlProgress, CrawlStatus, CrawlSummary, LatestCrawl};
use crate::models::records::Dataset;
use crate::models::version::VersionResponse;
use crate::services::auth::{RequireAuth, TokenAuth};
use crate::services::controller::CrawlController;
use crate::services::crawler::{run_crawl, CrawlConfig};
use crate::services::scheduler::MonthlyScheduler;
use crate::services::storage::StorageClient;
use axum::{
    body::Body,
    extract::{FromRef, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `SEO_AGENT_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("SEO_AGENT_VERSION");

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageClient,
    pub controller: CrawlController,
    pub scheduler: Arc<MonthlyScheduler>,
    pub auth: TokenAuth,
    pub config: CrawlConfig,
}

impl FromRef<AppState> for TokenAuth {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub async fn healthz_handler() -> Json<OkResponse> {
    Json(OkResponse::ok())
}

pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        agent: "seo-audit-agent".to_string(),
        version: VERSION.to_string(),
    })
}

pub async fn crawl_start_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Json(payload): Json<StartCrawlRequest>,
) -> Result<Json<StartCrawlResponse>, (StatusCode, String)> {
    if payload.domain.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "domain required".to_string()));
    }
    url::Url::parse(&payload.domain)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid domain URL: {e}")))?;

    let crawl_id = Uuid::new_v4().to_string();
    let placeholder = CrawlSummary::started(Utc::now().to_rfc3339());
    state
        .storage
        .write_summary(
            &crawl_id,
            &payload.domain,
            CrawlStatus::Running,
            0,
            &placeholder,
        )
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        })?;

    let task_state = state.clone();
    let domain = payload.domain.clone();
    let id = crawl_id.clone();
    tokio::spawn(async move {
        if let Err(err) = run_crawl(
            &task_state.storage,
            &task_state.controller,
            &domain,
            &id,
            task_state.config,
        )
        .await
        {
            error!(crawl_id = id, %err, "crawl failed");
        }
    });

    Ok(Json(StartCrawlResponse { crawl_id }))
}

pub async fn crawl_stop_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(params): Query<CrawlIdParams>,
) -> Json<OkResponse> {
    state.controller.stop(&params.crawl_id);
    info!(crawl_id = params.crawl_id, "crawl stop requested");
    Json(OkResponse::ok())
}

pub async fn crawl_status_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(params): Query<CrawlIdParams>,
) -> Json<CrawlProgress> {
    Json(
        state
            .controller
            .progress(&params.crawl_id)
            .unwrap_or_default(),
    )
}

pub async fn crawl_latest_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(params): Query<DomainParams>,
) -> Result<Json<LatestCrawl>, (StatusCode, String)> {
    let latest = state.storage.latest_crawl(&params.domain).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {e}"),
        )
    })?;
    latest
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "no data".to_string()))
}

pub async fn schedule_monthly_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Json(payload): Json<ScheduleRequest>,
) -> Result<Json<OkResponse>, (StatusCode, String)> {
    if payload.domain.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "domain required".to_string()));
    }
    state.scheduler.schedule(&payload.domain);
    Ok(Json(OkResponse::ok()))
}

pub async fn unschedule_monthly_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Query(params): Query<DomainParams>,
) -> Json<OkResponse> {
    if !state.scheduler.unschedule(&params.domain) {
        info!(domain = params.domain, "no monthly schedule to remove");
    }
    Json(OkResponse::ok())
}

pub async fn export_csv_handler(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path((crawl_id, dataset)): Path<(String, String)>,
) -> Result<Response, (StatusCode, String)> {
    let name = dataset.strip_suffix(".csv").unwrap_or(&dataset);
    let Some(dataset) = Dataset::from_name(name) else {
        return Err((StatusCode::NOT_FOUND, "dataset not found".to_string()));
    };
    let lines = state
        .storage
        .export_rows(&crawl_id, dataset)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {e}"),
            )
        })?;
    // Rows go out as they are, one chunk per line, instead of being
    // joined into a second full-dataset buffer.
    let body = Body::from_stream(stream::iter(
        lines.into_iter().map(|line| Ok::<_, Infallible>(line + "\n")),
    ));
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        body,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the Axum application router. `/healthz` and `/version` are open;
/// everything else requires the bearer token.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/version", get(version_handler))
        .route("/crawl/start", post(crawl_start_handler))
        .route("/crawl/stop", post(crawl_stop_handler))
        .route("/crawl/status", get(crawl_status_handler))
        .route("/crawl/latest", get(crawl_latest_handler))
        .route(
            "/schedule/monthly",
            post(schedule_monthly_handler).delete(unschedule_monthly_handler),
        )
        .route("/data/{crawl_id}/{dataset}", get(export_csv_handler))
        .with_state(state)
}
