//! In-memory collaborators.
//!
//! Used by tests and by the daemon's `--dev` mode, where the service runs
//! without any of the external systems it normally depends on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::entity::{ContentAddress, Entity, EntityId};
use crate::error::PipelineError;
use crate::events::PipelineEvents;
use crate::manifest::BatchManifest;
use crate::materializer::MaterializedEntity;
use crate::pipeline::BatchMessage;
use crate::policy::CascadeBoundary;
use crate::store::{
    Actor, BatchPublisher, CollectionGrant, ContentStore, EntityStore, PermissionGrant,
    PermissionService, StagingStore, StoreError,
};

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: Mutex<HashMap<EntityId, Entity>>,
    fetches: AtomicUsize,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: Entity) {
        self.entities.lock().insert(entity.id.clone(), entity);
    }

    /// Number of `get_entity` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn get_entity(&self, id: &EntityId) -> Result<Entity, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entities
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("entity {id}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: Mutex<HashMap<ContentAddress, Bytes>>,
    next: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    transient_failures: AtomicU32,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` and return its address.
    pub fn insert(&self, data: Bytes) -> ContentAddress {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let address = ContentAddress::new(format!("mem-{n:08}"));
        self.blobs.lock().insert(address.clone(), data);
        address
    }

    /// Delay every fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Fail the next `count` fetches with a transient error.
    pub fn fail_next(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// Highest number of fetches observed running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get_content(&self, address: &ContentAddress) -> Result<Bytes, StoreError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failing = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable(format!("content {address}")));
        }

        self.blobs
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("content {address}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a transient error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn get_object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().get(key).cloned()
    }

    /// All staged keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Unavailable(format!("staging write {key}")));
        }
        self.objects.lock().insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        Ok(self.get_object(key))
    }

    async fn is_ready(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<BatchMessage>>,
    fail: Mutex<bool>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn messages(&self) -> Vec<BatchMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl BatchPublisher for MemoryPublisher {
    async fn publish(&self, message: &BatchMessage) -> Result<(), StoreError> {
        if *self.fail.lock() {
            return Err(StoreError::Unavailable("queue send".into()));
        }
        tracing::debug!(batch_id = %message.batch_id, "batch queued in memory");
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

/// Grants edit access to everything unless told otherwise.
#[derive(Debug, Default)]
pub struct MemoryPermissionService {
    denied: Mutex<HashSet<EntityId>>,
    collections: Mutex<HashMap<EntityId, EntityId>>,
    checked: Mutex<Vec<(EntityId, Option<Actor>)>>,
    reject: Mutex<bool>,
}

impl MemoryPermissionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, id: EntityId) {
        self.denied.lock().insert(id);
    }

    /// Refuse every check as if the actor were unknown.
    pub fn reject(&self, reject: bool) {
        *self.reject.lock() = reject;
    }

    /// Report `id` as a member of the collection rooted at `root`.
    pub fn set_collection(&self, id: EntityId, root: EntityId) {
        self.collections.lock().insert(id, root);
    }

    /// Every check made so far, in order.
    pub fn checked(&self) -> Vec<(EntityId, Option<Actor>)> {
        self.checked.lock().clone()
    }
}

#[async_trait]
impl PermissionService for MemoryPermissionService {
    async fn check(
        &self,
        id: &EntityId,
        actor: Option<&Actor>,
    ) -> Result<PermissionGrant, StoreError> {
        self.checked.lock().push((id.clone(), actor.cloned()));
        if *self.reject.lock() {
            return Err(StoreError::Invalid(format!("actor rejected for {id}")));
        }
        let collection = self
            .collections
            .lock()
            .get(id)
            .cloned()
            .map(|root_id| CollectionGrant {
                root_id,
                role: "owner".into(),
            });
        Ok(PermissionGrant {
            can_edit: !self.denied.lock().contains(id),
            collection,
        })
    }
}

/// A pipeline event captured by [`RecordingEvents`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Started(String),
    PermissionChecked(EntityId),
    ChainResolved(Vec<EntityId>),
    Materialized(EntityId),
    EmptyEntity(EntityId),
    ManifestBuilt { total_files: u64, total_bytes: u64 },
    Published(String),
    Failed(&'static str),
}

#[derive(Debug, Default, Clone)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    fn push(&self, event: RecordedEvent) {
        self.events.lock().push(event);
    }
}

impl PipelineEvents for RecordingEvents {
    fn batch_started(&self, batch_id: &str, _target: &EntityId, _cascade: bool) {
        self.push(RecordedEvent::Started(batch_id.to_string()));
    }

    fn permission_checked(&self, _batch_id: &str, _target: &EntityId, boundary: &CascadeBoundary) {
        self.push(RecordedEvent::PermissionChecked(boundary.stop.clone()));
    }

    fn chain_resolved(&self, _batch_id: &str, chain: &[EntityId]) {
        self.push(RecordedEvent::ChainResolved(chain.to_vec()));
    }

    fn entity_materialized(&self, _batch_id: &str, entity: &MaterializedEntity) {
        self.push(RecordedEvent::Materialized(entity.id.clone()));
    }

    fn empty_entity(&self, _batch_id: &str, id: &EntityId) {
        self.push(RecordedEvent::EmptyEntity(id.clone()));
    }

    fn manifest_built(&self, _batch_id: &str, manifest: &BatchManifest) {
        self.push(RecordedEvent::ManifestBuilt {
            total_files: manifest.total_files,
            total_bytes: manifest.total_bytes,
        });
    }

    fn batch_published(&self, _batch_id: &str, manifest_location: &str) {
        self.push(RecordedEvent::Published(manifest_location.to_string()));
    }

    fn batch_failed(&self, _batch_id: &str, error: &PipelineError) {
        self.push(RecordedEvent::Failed(error.code()));
    }
}
