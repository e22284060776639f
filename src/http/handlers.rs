use super::state::AppState;
use crate::capture::{RecorderStatus, SessionOutcome};
use crate::error::CaptureError;
use crate::health::HealthReport;
use crate::storage::color_to_jpeg;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PhraseRequest {
    pub phrase: String,
}

#[derive(Debug, Serialize)]
pub struct SessionControlResponse {
    pub recording_requested: bool,
    pub message: String,
    /// Set when stopping closed a session immediately (no sensor ticks)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SessionOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WriteCompleteResponse {
    pub complete: bool,
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: &CaptureError) -> Response {
    let status = match err {
        CaptureError::MissingPhrase => StatusCode::CONFLICT,
        CaptureError::InvalidPhrase(_) => StatusCode::BAD_REQUEST,
        CaptureError::SensorUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Request recording; the session opens on the next body tick
pub async fn start_session(State(state): State<AppState>) -> Response {
    match state.pipeline.start_session().await {
        Ok(()) => (
            StatusCode::OK,
            Json(SessionControlResponse {
                recording_requested: true,
                message: "Recording requested".to_string(),
                outcome: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start session: {}", e);
            error_response(&e)
        }
    }
}

/// POST /session/stop
/// Clear the recording request
pub async fn stop_session(State(state): State<AppState>) -> Response {
    match state.pipeline.stop_session().await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(SessionControlResponse {
                recording_requested: false,
                message: "Recording request cleared".to_string(),
                outcome,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop session: {}", e);
            error_response(&e)
        }
    }
}

/// POST /session/toggle
/// Record-button toggle
pub async fn toggle_session(State(state): State<AppState>) -> Response {
    match state.pipeline.toggle_session().await {
        Ok(now_requested) => (
            StatusCode::OK,
            Json(SessionControlResponse {
                recording_requested: now_requested,
                message: if now_requested {
                    "Recording requested".to_string()
                } else {
                    "Recording request cleared".to_string()
                },
                outcome: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to toggle session: {}", e);
            error_response(&e)
        }
    }
}

/// POST /session/write-complete
/// One-shot poll: true once after each written session
pub async fn poll_write_complete(State(state): State<AppState>) -> Json<WriteCompleteResponse> {
    let (complete, log_path) = state.pipeline.poll_write_complete_with_log().await;
    Json(WriteCompleteResponse { complete, log_path })
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> Json<RecorderStatus> {
    Json(state.pipeline.status().await)
}

/// PUT /phrase
/// Set the phrase for the next session
pub async fn set_phrase(
    State(state): State<AppState>,
    Json(req): Json<PhraseRequest>,
) -> Response {
    match state.pipeline.set_phrase(&req.phrase).await {
        Ok(()) => {
            info!("Phrase updated via HTTP: {}", req.phrase);
            (StatusCode::OK, Json(req)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /preview.jpg
/// Latest color frame, JPEG-encoded
pub async fn get_preview(State(state): State<AppState>) -> Response {
    let Some(frame) = state.pipeline.latest_preview() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "No color frame received yet".to_string(),
            }),
        )
            .into_response();
    };

    let quality = state.preview_quality;
    let encoded = tokio::task::spawn_blocking(move || color_to_jpeg(&frame, quality)).await;

    match encoded {
        Ok(Ok(bytes)) => ([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        Ok(Err(e)) => {
            error!("Failed to encode preview: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to encode preview: {}", e),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Preview encoder panicked: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /health
/// Readiness: disk space, sensor availability, tracked bodies
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    let sensor_available = state.pipeline.sensor_available();
    let tracked = state.pipeline.tracked_bodies();
    let health = state.health.clone();

    let report = tokio::task::spawn_blocking(move || health.check(sensor_available, tracked))
        .await
        .unwrap_or_else(|e| {
            error!("Health check panicked: {}", e);
            crate::health::evaluate(None, 0, sensor_available, tracked)
        });

    Json(report)
}
