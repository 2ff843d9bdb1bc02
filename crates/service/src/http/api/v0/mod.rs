use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use common::error::PipelineError;

pub mod batches;
pub mod reprocess;

use crate::http::api::client::ErrorBody;
use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/reprocess", post(reprocess::handler))
        .route("/batches/:batch_id", get(batches::handler))
        .with_state(state)
}

/// HTTP status for each pipeline error kind.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::DepthExceeded { .. } | PipelineError::CycleDetected { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PipelineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PipelineError::DownstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    let body = ErrorBody {
        error: code.to_string(),
        message,
    };
    (status, Json(body)).into_response()
}

fn pipeline_error_response(err: &PipelineError) -> Response {
    // don't leak internals to callers
    let message = match err {
        PipelineError::Internal(_) => "internal error".to_string(),
        other => other.to_string(),
    };
    error_response(status_for(err), err.code(), message)
}
