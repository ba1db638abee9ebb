//! HTTP gateway for WeatherCanvas.
//!
//! Serves stored images under `/local/<file>`, exposes the latest prompt
//! bundle and image reference, and accepts manual triggers.
//!
//! Built on Axum.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use weathercanvas_config::{AppConfig, ScheduleAction};
use weathercanvas_core::error::{Error, PromptError, StorageError};
use weathercanvas_core::image::ImageModel;
use weathercanvas_gallery::ImageViewer;
use weathercanvas_workflow::{Orchestrator, Trigger};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub viewer: ImageViewer,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let viewer = ImageViewer::new(
            orchestrator.store().clone(),
            orchestrator.state().clone(),
        );
        Self {
            orchestrator,
            viewer,
            started_at: Utc::now(),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/local/{file}", get(local_file_handler))
        .route("/api/prompt", get(prompt_handler).post(compose_handler))
        .route("/api/image", get(image_handler))
        .route("/api/image/latest", get(latest_image_handler))
        .route("/api/cycle", post(cycle_handler))
        .route("/api/render", post(render_handler))
        .route("/api/prune", post(prune_handler))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(
    config: &AppConfig,
    orchestrator: Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(Arc::new(GatewayState::new(orchestrator)));

    info!(
        addr = %addr,
        images = %config.storage.resolved_directory().display(),
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Error mapping ---

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn pipeline_error(err: Error) -> Response {
    let status = match &err {
        Error::Prompt(PromptError::EmptyInput) => StatusCode::CONFLICT,
        Error::Prompt(PromptError::Generation(_)) | Error::Acquisition(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = status.as_u16(), error = %err, "Pipeline request failed");
    error_response(status, err.to_string())
}

fn png(bytes: impl Into<Body>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes.into(),
    )
        .into_response()
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

async fn local_file_handler(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> Response {
    match state.orchestrator.store().read(&file).await {
        Ok(Some(bytes)) => png(bytes),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "image not found"),
        Err(StorageError::InvalidName(name)) => {
            error_response(StatusCode::BAD_REQUEST, format!("invalid file name '{name}'"))
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn prompt_handler(State(state): State<SharedState>) -> Response {
    match state.orchestrator.state().latest_prompt().await {
        Some(bundle) => Json(bundle).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no prompt composed yet"),
    }
}

async fn image_handler(State(state): State<SharedState>) -> Response {
    match state.orchestrator.state().latest_image().await {
        Some(reference) => Json(reference).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no image generated yet"),
    }
}

async fn latest_image_handler(State(state): State<SharedState>) -> Response {
    match state.viewer.latest().await {
        Ok(Some((_, bytes))) => png(bytes.to_vec()),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "no image available"),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn compose_handler(State(state): State<SharedState>) -> Response {
    let trigger = Trigger::manual("gateway", ScheduleAction::Prompt);
    match state.orchestrator.compose_prompt(&trigger).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => pipeline_error(e),
    }
}

async fn cycle_handler(State(state): State<SharedState>) -> Response {
    let trigger = Trigger::manual("gateway", ScheduleAction::Cycle);
    match state.orchestrator.run_cycle(&trigger).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => pipeline_error(e),
    }
}

#[derive(Serialize)]
struct PruneResponse {
    removed: usize,
}

async fn prune_handler(State(state): State<SharedState>) -> Response {
    match state.orchestrator.prune().await {
        Ok(removed) => Json(PruneResponse { removed }).into_response(),
        Err(e) => pipeline_error(e),
    }
}

/// Per-request overrides of the configured image options.
#[derive(Debug, Default, Deserialize)]
struct RenderRequest {
    model: Option<ImageModel>,
    size: Option<String>,
    quality: Option<String>,
    style: Option<String>,
}

async fn render_handler(
    State(state): State<SharedState>,
    body: Option<Json<RenderRequest>>,
) -> Response {
    let Json(overrides) = body.unwrap_or_default();
    let mut options = state.orchestrator.image_options().clone();
    if let Some(model) = overrides.model {
        options.model = model;
    }
    if let Some(size) = overrides.size {
        options.size = size;
    }
    if let Some(quality) = overrides.quality {
        options.quality = quality;
    }
    if let Some(style) = overrides.style {
        options.style = style;
    }

    match state.orchestrator.render_latest(Some(options)).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => pipeline_error(e),
    }
}
