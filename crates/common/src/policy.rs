//! Cascade boundary selection.
//!
//! Permission is checked once, against the target only. Collection
//! membership is assumed to be transitive along the parent chain, so that
//! single check covers every ancestor up to the collection root. Nothing
//! re-checks ancestors during the walk.

use serde::Serialize;

use crate::entity::EntityId;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use crate::store::{Actor, PermissionGrant, PermissionService, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundarySource {
    /// Supplied by the client
    Override,
    /// Root of the collection the target belongs to
    Collection,
    /// Absolute root; the target belongs to no collection
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeBoundary {
    pub stop: EntityId,
    pub source: BoundarySource,
}

impl CascadeBoundary {
    /// Pick the stop id: explicit override, then collection root, then the
    /// absolute root.
    pub fn select(stop_override: Option<&EntityId>, grant: &PermissionGrant) -> Self {
        if let Some(stop) = stop_override {
            return Self {
                stop: stop.clone(),
                source: BoundarySource::Override,
            };
        }
        match &grant.collection {
            Some(collection) => Self {
                stop: collection.root_id.clone(),
                source: BoundarySource::Collection,
            },
            None => Self {
                stop: EntityId::root(),
                source: BoundarySource::Root,
            },
        }
    }
}

/// Ask the permission service whether `actor` may edit `target`.
pub async fn authorize(
    service: &dyn PermissionService,
    retry: &RetryPolicy,
    target: &EntityId,
    actor: Option<&Actor>,
) -> Result<PermissionGrant, PipelineError> {
    let grant = match retry
        .run("check permission", || service.check(target, actor))
        .await
    {
        Ok(grant) => grant,
        // the service refused to answer for this actor
        Err(StoreError::Invalid(reason)) => {
            tracing::warn!(entity = %target, reason = %reason, "permission check rejected");
            return Err(PipelineError::PermissionDenied(target.clone()));
        }
        Err(err) => {
            return Err(PipelineError::from_store(
                &format!("permission check for {target}"),
                err,
            ))
        }
    };

    if !grant.can_edit {
        return Err(PipelineError::PermissionDenied(target.clone()));
    }
    Ok(grant)
}
