use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use photo_click_capture::SnapshotError;
use photo_click_common::store::StoreError;
use serde_json::json;

/// Error response rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<SnapshotError> for ApiError {
    fn from(value: SnapshotError) -> Self {
        let status = match value {
            SnapshotError::OpenSource(_) => StatusCode::BAD_REQUEST,
            SnapshotError::ReadFrame | SnapshotError::WriteImage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, value.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self::internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photo_click_capture::CaptureError;

    #[test]
    fn open_failure_is_bad_request() {
        let err = ApiError::from(SnapshotError::OpenSource(CaptureError::Open {
            target: "rtsp://invalid".into(),
            reason: "refused".into(),
        }));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Could not open camera source");
    }

    #[test]
    fn read_failure_is_server_error() {
        let err = ApiError::from(SnapshotError::ReadFrame);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail, "Failed to read frame from camera");
    }
}
