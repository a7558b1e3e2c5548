//! HTTP surface for the dashboard frontend
//!
//! JSON API over the orchestrator and export encoder: select a location, run
//! a query, read the current results, export them, reset the session. Error
//! mapping: invalid settings 400, missing location/results 409, provider
//! failures 502, encode failures 500.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::export::{self, ExportFormat};
use crate::models::{Location, QuerySettings};
use crate::orchestrator::{QueryOrchestrator, ResultsSnapshot};
use crate::{ParadecastError, Result};

/// Shared handler state
pub type AppState = Arc<QueryOrchestrator>;

/// Error payload returned to the frontend
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Run the HTTP server until shutdown
pub async fn run(bind: &str, port: u16, orchestrator: AppState) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", router(orchestrator))
        .layer(cors);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web server running at http://localhost:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// The /api router
pub fn router(orchestrator: AppState) -> Router {
    Router::new()
        .route("/location", post(select_location))
        .route("/query", post(run_query))
        .route("/results", get(get_results))
        .route("/export/{format}", get(export_results))
        .route("/reset", post(reset))
        .with_state(orchestrator)
}

async fn select_location(
    State(orchestrator): State<AppState>,
    Json(location): Json<Location>,
) -> Response {
    match orchestrator.select_location(location) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

async fn run_query(
    State(orchestrator): State<AppState>,
    Json(settings): Json<QuerySettings>,
) -> Response {
    match orchestrator.run_query(settings).await {
        Ok(outcome) => Json(serde_json::json!({
            "metrics": outcome.metrics,
            "distribution": outcome.distribution,
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn get_results(State(orchestrator): State<AppState>) -> Json<ResultsSnapshot> {
    Json(orchestrator.snapshot())
}

async fn export_results(
    State(orchestrator): State<AppState>,
    Path(format): Path<String>,
) -> Response {
    match encode_export(orchestrator, &format).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    }
}

async fn encode_export(orchestrator: AppState, format: &str) -> Result<Response> {
    let format: ExportFormat = format.parse()?;
    let snapshot = orchestrator.export_snapshot()?;
    let blob = export::encode_detached(snapshot, format).await?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", blob.filename),
            ),
        ],
        blob.bytes,
    )
        .into_response())
}

async fn reset(State(orchestrator): State<AppState>) -> StatusCode {
    orchestrator.reset();
    StatusCode::NO_CONTENT
}

fn error_response(err: &ParadecastError) -> Response {
    let status = match err {
        ParadecastError::InvalidSettings { .. } => StatusCode::BAD_REQUEST,
        ParadecastError::NoLocationSelected => StatusCode::CONFLICT,
        ParadecastError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
        ParadecastError::EncodeFailure { .. }
        | ParadecastError::Config { .. }
        | ParadecastError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = ErrorBody {
        error: err.to_string(),
        message: err.user_message(),
    };
    (status, Json(body)).into_response()
}
