use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use photo_click_capture::{take_snapshot, CaptureSource};
use photo_click_common::store::PhotoEntry;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ApiError;
use crate::network::NetworkInfo;
use crate::AppState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    camera_url: Option<String>,
    camera_index: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    filename: String,
    url: String,
    timestamp: i64,
    success: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /network-info. Never fails; unresolved fields read "unknown"
pub async fn network_info(State(state): State<Arc<AppState>>) -> Json<NetworkInfo> {
    Json(state.network.lookup().await)
}

/// POST /snapshot, body: { "camera_url": "...", "camera_index": 0 }
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SnapshotRequest>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let source = CaptureSource::select(req.camera_url.as_deref(), req.camera_index);

    // Camera I/O blocks until the frame arrives.
    let result = tokio::task::spawn_blocking(move || {
        take_snapshot(
            state.camera.as_ref(),
            &source,
            &state.store,
            &state.snapshot_options,
            || chrono::Utc::now().timestamp(),
        )
    })
    .await;

    match result {
        Ok(Ok(saved)) => Ok(Json(SnapshotResponse {
            filename: saved.filename,
            url: saved.url,
            timestamp: saved.timestamp,
            success: true,
        })),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            Err(ApiError::internal("capture task failed"))
        }
    }
}

/// GET /photos, newest first by filename
pub async fn list_photos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PhotoEntry>>, ApiError> {
    let result = tokio::task::spawn_blocking(move || state.store.list()).await;

    match result {
        Ok(Ok(photos)) => Ok(Json(photos)),
        Ok(Err(e)) => {
            error!(error = %e, "listing images failed");
            Err(e.into())
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            Err(ApiError::internal("listing task failed"))
        }
    }
}
