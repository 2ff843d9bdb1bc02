//! Error taxonomy for the reprocessing pipeline.
//!
//! Every stage failure aborts the whole request, so a single error type
//! flows from the resolver, the materializer and the publish step up to the
//! HTTP layer, which maps each kind to a distinct status.

use crate::entity::{EntityId, InvalidEntityId};
use crate::phase::PhaseError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed or invalid input
    #[error("{0}")]
    Validation(String),

    /// Missing entity or content
    #[error("{0}")]
    NotFound(String),

    /// Cascade walk hit the configured ceiling
    #[error("cascade from {target} exceeded the maximum depth of {max_depth} ancestors")]
    DepthExceeded { target: EntityId, max_depth: usize },

    /// Cascade walk visited the same entity twice
    #[error("cascade from {target} revisited {id}; the ancestor chain contains a cycle")]
    CycleDetected { target: EntityId, id: EntityId },

    #[error("not permitted to edit {0}")]
    PermissionDenied(EntityId),

    /// Staging, queue or store failure that survived retries
    #[error("{0}")]
    DownstreamUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION_ERROR",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            PipelineError::CycleDetected { .. } => "CYCLE_DETECTED",
            PipelineError::PermissionDenied(_) => "PERMISSION_DENIED",
            PipelineError::DownstreamUnavailable(_) => "DOWNSTREAM_UNAVAILABLE",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Wrap a collaborator failure with the operation that produced it.
    pub fn from_store(context: &str, err: StoreError) -> Self {
        let message = format!("{context}: {err}");
        match err {
            StoreError::NotFound(_) => PipelineError::NotFound(message),
            StoreError::Unavailable(_) | StoreError::Invalid(_) => {
                PipelineError::DownstreamUnavailable(message)
            }
        }
    }
}

impl From<InvalidEntityId> for PipelineError {
    fn from(err: InvalidEntityId) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

impl From<PhaseError> for PipelineError {
    fn from(err: PhaseError) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Internal(format!("serialization failed: {err}"))
    }
}
