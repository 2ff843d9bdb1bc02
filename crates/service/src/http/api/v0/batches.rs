use axum::extract::{Json, Path, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::error::PipelineError;
use common::manifest::BatchManifest;

use super::pipeline_error_response;
use crate::http::api::client::{ApiError, ApiRequest};
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize, clap::Args)]
pub struct BatchRequest {
    /// Batch identifier returned when the batch was submitted
    #[arg(long)]
    pub batch_id: String,
}

/// Return the staged manifest of a batch.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(batch_id): Path<String>,
) -> Result<Json<BatchManifest>, BatchError> {
    tracing::debug!(batch_id = %batch_id, "BATCH: loading manifest");
    let manifest = state.pipeline().load_manifest(&batch_id).await?;
    Ok(Json(manifest))
}

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct BatchError(#[from] PipelineError);

impl IntoResponse for BatchError {
    fn into_response(self) -> Response {
        tracing::warn!(code = self.0.code(), "BATCH ERROR: {}", self.0);
        pipeline_error_response(&self.0)
    }
}

impl ApiRequest for BatchRequest {
    type Response = BatchManifest;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join(&format!("/api/v0/batches/{}", self.batch_id))?;
        Ok(client.get(full_url))
    }
}
