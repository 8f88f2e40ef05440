//! HTTP server for shorelined.
//!
//! One route matters: `GET /metrics` refreshes the readings from the modem
//! and serves the Prometheus exposition, so every scrape reflects the
//! device's current state. `GET /healthz` answers without touching the
//! device.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use serde::Serialize;
use shoreline_core::{Modem, ModemError};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::coalesce::RefreshCoalescer;
use crate::metrics::SignalMetrics;

/// Application state shared across handlers.
pub struct AppState {
    pub client: Client,
    pub modem: Box<dyn Modem>,
    pub metrics: SignalMetrics,
    pub coalescer: RefreshCoalescer,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(client: Client, modem: Box<dyn Modem>) -> Self {
        let metrics = SignalMetrics::new();
        metrics.set_modem(modem.name());
        Self {
            client,
            modem,
            metrics,
            coalescer: RefreshCoalescer::new(),
            start_time: Instant::now(),
        }
    }
}

type AppStateArc = Arc<AppState>;

pub fn build_router(state: AppStateArc) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .route("/healthz", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Refresh readings, then serve the exposition. Overlapping scrapes share
/// one device poll; a failed poll is a 500 with the scrape error, never a
/// page of stale readings.
async fn serve_metrics(
    State(state): State<AppStateArc>,
) -> Result<([(HeaderName, &'static str); 1], String), (StatusCode, String)> {
    state
        .coalescer
        .run(|| async {
            let report = state.modem.status(&state.client).await?;
            state.metrics.record_report(&report);
            Ok::<(), ModemError>(())
        })
        .await
        .map_err(|e| {
            state.metrics.record_scrape_error();
            error!("scrape of {} failed: {}", state.modem.name(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok((
        [(CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        state.metrics.export(),
    ))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    modem: String,
    uptime_seconds: u64,
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        modem: state.modem.name().to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// Run the HTTP server until the process is stopped.
pub async fn run(state: AppState, port: u16) -> Result<()> {
    let state = Arc::new(state);
    let app = build_router(state);

    // Exporters get scraped from elsewhere on the network, so bind wide.
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("serving metrics on http://{}/metrics", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
