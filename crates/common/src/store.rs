//! Narrow interfaces to the external systems the pipeline depends on.
//!
//! The pipeline never owns entity or content data. It reads entities and
//! content from the content-addressed store, writes copies into a staging
//! area, and hands the finished batch to a queue. Authorization decisions
//! come from a separate permission service.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::entity::{ContentAddress, Entity, EntityId};
use crate::pipeline::BatchMessage;

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The requested entity, content or object does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// Transient failure; the call may succeed if retried
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The collaborator rejected the call or answered with garbage
    #[error("invalid response: {0}")]
    Invalid(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch the current version of an entity.
    async fn get_entity(&self, id: &EntityId) -> Result<Entity, StoreError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch raw bytes by content address.
    async fn get_content(&self, address: &ContentAddress) -> Result<Bytes, StoreError>;
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Write an object to the staging area, replacing anything at `key`.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Read an object back from the staging area.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Cheap reachability probe used by readiness checks.
    async fn is_ready(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BatchPublisher: Send + Sync {
    /// Hand a finished batch to the downstream processing queue.
    async fn publish(&self, message: &BatchMessage) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PermissionService: Send + Sync {
    async fn check(
        &self,
        id: &EntityId,
        actor: Option<&Actor>,
    ) -> Result<PermissionGrant, StoreError>;
}

/// Caller identity forwarded to the permission service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    pub can_edit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionGrant>,
}

/// Collection membership reported alongside a permission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionGrant {
    #[serde(alias = "rootPi")]
    pub root_id: EntityId,
    pub role: String,
}
