use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::message::ErrorResponse;
use crate::services::backend::BackendError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("upstream model error: {0}")]
    Upstream(#[from] BackendError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest(msg) => {
                tracing::info!("rejected chat request: {msg}");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Upstream(err) => {
                tracing::error!(error = %err, "model backend call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Upstream model request failed".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
