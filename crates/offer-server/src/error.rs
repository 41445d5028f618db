use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use offer_core::InferenceError;
use thiserror::Error;

/// Failures surfaced to HTTP clients. Details stay in the server log.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Lookup(#[from] InferenceError),

    #[error("lookup task did not complete")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Join(e) = &self {
            tracing::error!(error = %e, "lookup task failed");
        }
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
    }
}
