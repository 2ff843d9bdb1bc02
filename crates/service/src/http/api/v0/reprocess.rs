use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::error::PipelineError;
use common::pipeline::{ReprocessRequest, ReprocessResponse};
use common::store::Actor;

use super::{error_response, pipeline_error_response};
use crate::clients::USER_ID_HEADER;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Result<Json<ReprocessRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ReprocessError> {
    let Json(req) = body.map_err(|e| ReprocessError::InvalidBody(e.body_text()))?;
    let actor = actor(&headers)?;

    tracing::info!(
        pi = %req.pi,
        phases = ?req.phases,
        cascade = req.cascade,
        actor = ?actor,
        "REPROCESS: received request"
    );

    let response = state.pipeline().submit(req, actor).await?;

    tracing::info!(
        batch_id = %response.batch_id,
        entities_queued = response.entities_queued,
        "REPROCESS: batch queued"
    );
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

fn actor(headers: &HeaderMap) -> Result<Option<Actor>, ReprocessError> {
    match headers.get(USER_ID_HEADER) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| ReprocessError::InvalidHeader(USER_ID_HEADER))?
                .trim();
            Ok((!value.is_empty()).then(|| Actor(value.to_string())))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReprocessError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ReprocessError {
    fn into_response(self) -> Response {
        match self {
            ReprocessError::Pipeline(e) => {
                match &e {
                    PipelineError::Internal(_) | PipelineError::DownstreamUnavailable(_) => {
                        tracing::error!(code = e.code(), "REPROCESS ERROR: {}", e)
                    }
                    _ => tracing::warn!(code = e.code(), "REPROCESS ERROR: {}", e),
                }
                pipeline_error_response(&e)
            }
            other => {
                tracing::warn!("REPROCESS ERROR: {}", other);
                error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", other.to_string())
            }
        }
    }
}

/// Client call for `POST /api/v0/reprocess`.
#[derive(Debug, Clone)]
pub struct ReprocessCall {
    pub request: ReprocessRequest,
    pub user_id: Option<String>,
}

impl ApiRequest for ReprocessCall {
    type Response = ReprocessResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("/api/v0/reprocess")?;
        let mut builder = client.post(full_url).json(&self.request);
        if let Some(user_id) = self.user_id {
            builder = builder.header(USER_ID_HEADER, user_id);
        }
        Ok(builder)
    }
}
