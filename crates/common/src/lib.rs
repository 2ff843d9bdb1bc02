/**
 * Entity identifiers, content addresses and the
 *  read-only view of stored entities.
 */
pub mod entity;
/**
 * Pipeline error taxonomy.
 */
pub mod error;
/**
 * Narrow traits for the external systems the
 *  pipeline calls: entity store, content store,
 *  staging area, batch queue, permission service.
 */
pub mod store;
/**
 * Retry with exponential backoff, applied to
 *  every external call.
 */
pub mod retry;
/**
 * Requested processing phases.
 */
pub mod phase;
/**
 * Walks the parent chain from a target entity
 *  up to the cascade boundary.
 */
pub mod resolver;
/**
 * Copies entity components into staging under
 *  bounded concurrency.
 */
pub mod materializer;
/**
 * Pure construction of batch manifests.
 */
pub mod manifest;
/**
 * Permission check and cascade boundary selection.
 */
pub mod policy;
/**
 * Structured pipeline progress events.
 */
pub mod events;
/**
 * The orchestrator tying every stage together.
 */
pub mod pipeline;
/**
 * In-memory collaborators for tests and local runs.
 */
pub mod memory;

mod content_type;

pub mod prelude {
    pub use crate::entity::{ContentAddress, Entity, EntityId};
    pub use crate::error::PipelineError;
    pub use crate::manifest::{BatchManifest, DirectoryGroup, ProcessingConfig};
    pub use crate::materializer::{ConcurrencyLimits, FileInfo, MaterializedEntity};
    pub use crate::phase::{Phase, PhaseSet};
    pub use crate::pipeline::{
        BatchMessage, Collaborators, Pipeline, PipelineConfig, ReprocessRequest,
        ReprocessResponse,
    };
    pub use crate::retry::RetryPolicy;
    pub use crate::store::{
        Actor, BatchPublisher, ContentStore, EntityStore, PermissionGrant, PermissionService,
        StagingStore, StoreError,
    };
}
