//! Structured progress events emitted by the pipeline orchestrator.
//!
//! Resolution, materialization and manifest building stay free of logging;
//! the orchestrator reports what happened through this trait after each
//! stage. [`TracingEvents`] is the production sink.

use crate::entity::EntityId;
use crate::error::PipelineError;
use crate::manifest::BatchManifest;
use crate::materializer::MaterializedEntity;
use crate::policy::CascadeBoundary;

pub trait PipelineEvents: Send + Sync {
    fn batch_started(&self, batch_id: &str, target: &EntityId, cascade: bool);
    fn permission_checked(&self, batch_id: &str, target: &EntityId, boundary: &CascadeBoundary);
    fn chain_resolved(&self, batch_id: &str, chain: &[EntityId]);
    fn entity_materialized(&self, batch_id: &str, entity: &MaterializedEntity);
    /// An entity had no components; not an error.
    fn empty_entity(&self, batch_id: &str, id: &EntityId);
    fn manifest_built(&self, batch_id: &str, manifest: &BatchManifest);
    fn batch_published(&self, batch_id: &str, manifest_location: &str);
    fn batch_failed(&self, batch_id: &str, error: &PipelineError);
}

/// Emits every pipeline event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvents;

impl PipelineEvents for TracingEvents {
    fn batch_started(&self, batch_id: &str, target: &EntityId, cascade: bool) {
        tracing::info!(batch_id, target = %target, cascade, "reprocess batch started");
    }

    fn permission_checked(&self, batch_id: &str, target: &EntityId, boundary: &CascadeBoundary) {
        tracing::info!(
            batch_id,
            target = %target,
            stop = %boundary.stop,
            source = ?boundary.source,
            "permission granted, cascade boundary selected"
        );
    }

    fn chain_resolved(&self, batch_id: &str, chain: &[EntityId]) {
        tracing::info!(batch_id, entities = chain.len(), "entity chain resolved");
        tracing::debug!(batch_id, chain = ?chain, "resolved chain");
    }

    fn entity_materialized(&self, batch_id: &str, entity: &MaterializedEntity) {
        tracing::debug!(
            batch_id,
            id = %entity.id,
            version = entity.version,
            files = entity.files.len(),
            bytes = entity.total_bytes,
            "entity staged"
        );
    }

    fn empty_entity(&self, batch_id: &str, id: &EntityId) {
        tracing::warn!(batch_id, id = %id, "entity has no components to stage");
    }

    fn manifest_built(&self, batch_id: &str, manifest: &BatchManifest) {
        tracing::info!(
            batch_id,
            directories = manifest.directories.len(),
            total_files = manifest.total_files,
            total_bytes = manifest.total_bytes,
            "batch manifest built"
        );
    }

    fn batch_published(&self, batch_id: &str, manifest_location: &str) {
        tracing::info!(batch_id, manifest_location, "reprocess batch queued");
    }

    fn batch_failed(&self, batch_id: &str, error: &PipelineError) {
        tracing::error!(batch_id, code = error.code(), error = %error, "reprocess batch failed");
    }
}
