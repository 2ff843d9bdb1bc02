//! # Component materialization
//!
//! Copies every component of an entity out of the content-addressed store
//! into the staging area under a deterministic key:
//!
//! ```text
//! {staging_prefix}{entity_id}/{component_name}
//! ```
//!
//! Components of one entity are staged concurrently, and so are the entities
//! of a batch. Both fan-outs are bounded ([`ConcurrencyLimits`]) and every
//! external call additionally holds a permit from one shared semaphore, so the
//! number of simultaneous requests against the stores stays capped no matter
//! how wide or deep the batch is.
//!
//! Materialization is all-or-nothing: the first failed download or upload
//! fails the entity, and the first failed entity fails the batch.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::content_type;
use crate::entity::{ContentAddress, EntityId};
use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use crate::store::{ContentStore, EntityStore, StagingStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyLimits {
    /// Entities materialized at once
    pub entities: usize,
    /// Components staged at once within a single entity
    pub components: usize,
    /// External calls in flight across the whole request
    pub in_flight: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            entities: 8,
            components: 16,
            in_flight: 32,
        }
    }
}

/// A single staged component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub staging_key: String,
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// An entity whose components have all been copied into staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedEntity {
    pub id: EntityId,
    pub version: u64,
    pub children: Vec<EntityId>,
    pub parent: Option<EntityId>,
    pub files: Vec<FileInfo>,
    pub total_bytes: u64,
}

impl MaterializedEntity {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn staging_key(prefix: &str, id: &EntityId, component: &str) -> String {
    format!("{prefix}{id}/{component}")
}

pub struct ComponentMaterializer {
    entities: Arc<dyn EntityStore>,
    content: Arc<dyn ContentStore>,
    staging: Arc<dyn StagingStore>,
    retry: RetryPolicy,
    limits: ConcurrencyLimits,
    in_flight: Arc<Semaphore>,
}

impl ComponentMaterializer {
    pub fn new(
        entities: Arc<dyn EntityStore>,
        content: Arc<dyn ContentStore>,
        staging: Arc<dyn StagingStore>,
        retry: RetryPolicy,
        limits: ConcurrencyLimits,
    ) -> Self {
        Self {
            entities,
            content,
            staging,
            retry,
            limits,
            in_flight: Arc::new(Semaphore::new(limits.in_flight.max(1))),
        }
    }

    /// Materialize every entity in `ids`, preserving their order.
    pub async fn materialize_all(
        &self,
        ids: &[EntityId],
        staging_prefix: &str,
    ) -> Result<Vec<MaterializedEntity>, PipelineError> {
        stream::iter(ids.iter().cloned())
            .map(|id| async move { self.materialize(&id, staging_prefix).await })
            .buffered(self.limits.entities.max(1))
            .try_collect()
            .await
    }

    pub async fn materialize(
        &self,
        id: &EntityId,
        staging_prefix: &str,
    ) -> Result<MaterializedEntity, PipelineError> {
        let entity = self
            .retry
            .run("fetch entity", || self.limited(self.entities.get_entity(id)))
            .await
            .map_err(|e| PipelineError::from_store(&format!("entity {id}"), e))?;

        let files: Vec<FileInfo> = stream::iter(entity.components.clone())
            .map(|(name, address)| async move {
                self.stage_component(id, &name, &address, staging_prefix)
                    .await
            })
            .buffered(self.limits.components.max(1))
            .try_collect()
            .await?;

        let total_bytes = files.iter().map(|file| file.size).sum();

        Ok(MaterializedEntity {
            id: entity.id,
            version: entity.version,
            children: entity.children,
            parent: entity.parent,
            files,
            total_bytes,
        })
    }

    async fn stage_component(
        &self,
        id: &EntityId,
        name: &str,
        address: &ContentAddress,
        staging_prefix: &str,
    ) -> Result<FileInfo, PipelineError> {
        let data: Bytes = self
            .retry
            .run("download component", || {
                self.limited(self.content.get_content(address))
            })
            .await
            .map_err(|e| PipelineError::from_store(&format!("component {name} of {id}"), e))?;

        let key = staging_key(staging_prefix, id, name);
        let size = data.len() as u64;

        self.retry
            .run("stage component", || {
                self.limited(self.staging.put(&key, data.clone()))
            })
            .await
            .map_err(|e| PipelineError::from_store(&format!("staging {key}"), e))?;

        Ok(FileInfo {
            staging_key: key,
            name: name.to_string(),
            size,
            content_type: content_type::from_name(name).to_string(),
        })
    }

    /// Run one external call while holding an in-flight permit.
    async fn limited<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let _permit = self
            .in_flight
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("concurrency limiter closed".into()))?;
        call.await
    }
}
