use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    dashboard::{DashboardHandle, DashboardInput},
    render,
    scan::{ScanError, ScanPhase},
};

#[derive(Clone)]
pub struct AppState {
    dashboard: DashboardHandle,
    refresh_secs: u64,
}

impl AppState {
    pub fn new(dashboard: DashboardHandle, refresh_secs: u64) -> Self {
        Self {
            dashboard,
            refresh_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartResponse {
    pub accepted: bool,
    pub state: ScanPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/snapshot", get(get_snapshot))
        .route("/latency", get(get_latency))
        .route("/scan", post(post_scan))
        .with_state(state.clone());

    Router::new()
        .route("/", get(get_index))
        .route("/scan", post(post_scan_form))
        .with_state(state)
        .nest("/api", api)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Serve the web UI on `bind` until `cancel` fires.
pub async fn spawn_server(bind: &str, state: AppState, cancel: CancellationToken) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Serving dashboard UI");
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}

async fn get_index(State(app): State<AppState>) -> impl IntoResponse {
    let snapshot = app.dashboard.snapshot();
    Html(render::render_page(&snapshot, app.refresh_secs))
}

async fn get_snapshot(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.dashboard.snapshot()))
}

async fn get_latency(State(app): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(app.dashboard.snapshot().latency))
}

#[derive(Debug, thiserror::Error)]
enum StartRejected {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("dashboard controller is not running")]
    Unavailable,
}

impl StartRejected {
    fn status(&self) -> StatusCode {
        match self {
            StartRejected::Scan(_) => StatusCode::CONFLICT,
            StartRejected::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Queue a start request unless the current snapshot shows a running scan.
fn request_start(app: &AppState) -> Result<(), StartRejected> {
    if !app.dashboard.snapshot().control_enabled {
        return Err(ScanError::AlreadyRunning.into());
    }
    if !app.dashboard.send(DashboardInput::StartRequested) {
        tracing::error!("Dashboard controller is not running");
        return Err(StartRejected::Unavailable);
    }
    Ok(())
}

async fn post_scan(State(app): State<AppState>) -> impl IntoResponse {
    match request_start(&app) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(StartResponse {
                accepted: true,
                state: ScanPhase::Running,
                error: None,
            }),
        ),
        Err(e) => (
            e.status(),
            Json(StartResponse {
                accepted: false,
                state: app.dashboard.snapshot().scan.phase(),
                error: Some(e.to_string()),
            }),
        ),
    }
}

async fn post_scan_form(State(app): State<AppState>) -> impl IntoResponse {
    if let Err(e) = request_start(&app) {
        tracing::debug!(error = %e, "Ignoring start from web form");
    }
    Redirect::to("/")
}
