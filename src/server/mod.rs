//! HTTP daemon/server mode for `specscan`.
//!
//! This module exposes a small HTTP+JSON API that mirrors the core
//! scan and index functions:
//!
//! - `POST /v1/scan` – accepts a JSON-encoded `ScanConfig` and
//!   returns a `ScanResult`.
//! - `POST /v1/test-at` – accepts a `TestAtRequest` and returns a
//!   `TestAtResult`.
//! - `POST /v1/index` / `POST /v1/index/info` – accept an
//!   `IndexConfig` and return an `IndexSummary`.
//! - `GET /v1/styles` – the style registry.
//! - `GET /v1/health` – simple health check endpoint.
//!
//! Handlers only do JSON (de)serialization, delegate to the engine,
//! and turn errors into JSON HTTP responses.

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::index;
use crate::models::{
    IndexConfig, IndexSummary, ScanConfig, ScanResult, StyleInfo, TestAtRequest, TestAtResult,
};
use crate::scan;

/// Simple health-check response payload.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// JSON error body returned by the API.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error type used by HTTP handlers to map internal failures into
/// JSON error responses.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let status = if message.starts_with("index not found at ") {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Build the Axum router for the HTTP API.
pub fn router() -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/styles", get(styles))
        .route("/v1/scan", post(scan_files))
        .route("/v1/test-at", post(test_at))
        .route("/v1/index", post(build_index))
        .route("/v1/index/info", post(index_info))
}

/// Run the HTTP server bound to the provided socket address.
///
/// This is used by the CLI `specscan serve` subcommand.
pub async fn run(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_listener(listener).await
}

/// Run the HTTP server using an existing `TcpListener`.
pub async fn serve_with_listener(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "specscan server listening");
    }
    axum::serve(listener, router()).await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn styles() -> Json<Vec<StyleInfo>> {
    Json(scan::style_infos())
}

async fn scan_files(Json(config): Json<ScanConfig>) -> Result<Json<ScanResult>, ApiError> {
    let result = scan::run_scan(config)?;
    Ok(Json(result))
}

async fn test_at(Json(request): Json<TestAtRequest>) -> Result<Json<TestAtResult>, ApiError> {
    let result = scan::test_at(&request)?;
    Ok(Json(result))
}

async fn build_index(Json(config): Json<IndexConfig>) -> Result<Json<IndexSummary>, ApiError> {
    let summary = index::run_index(config)?;
    Ok(Json(summary))
}

async fn index_info(Json(config): Json<IndexConfig>) -> Result<Json<IndexSummary>, ApiError> {
    let summary = index::get_index_info(&config)?;
    Ok(Json(summary))
}
