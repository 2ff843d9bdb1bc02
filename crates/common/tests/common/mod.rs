//! Shared fixtures for pipeline integration tests
#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use common::entity::{Entity, EntityId};
use common::memory::{
    MemoryContentStore, MemoryEntityStore, MemoryPermissionService, MemoryPublisher,
    MemoryStagingStore, RecordingEvents,
};
use common::pipeline::{Collaborators, Pipeline, PipelineConfig, ReprocessRequest};
use common::retry::RetryPolicy;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Deterministic test id: `n` is rendered into the last four characters.
pub fn id(n: u32) -> EntityId {
    EntityId::parse(&format!("01KA1H53CP2TAW8P8VSZ8J{:04}", n)).unwrap()
}

pub struct TestEnv {
    pub entities: Arc<MemoryEntityStore>,
    pub content: Arc<MemoryContentStore>,
    pub staging: Arc<MemoryStagingStore>,
    pub publisher: Arc<MemoryPublisher>,
    pub permissions: Arc<MemoryPermissionService>,
    pub events: RecordingEvents,
}

impl TestEnv {
    pub fn new() -> Self {
        init_tracing();
        Self {
            entities: Arc::new(MemoryEntityStore::new()),
            content: Arc::new(MemoryContentStore::new()),
            staging: Arc::new(MemoryStagingStore::new()),
            publisher: Arc::new(MemoryPublisher::new()),
            permissions: Arc::new(MemoryPermissionService::new()),
            events: RecordingEvents::new(),
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline_with(PipelineConfig {
            retry: RetryPolicy::none(),
            status_base_url: "https://orchestrator.test/".to_string(),
            ..Default::default()
        })
    }

    pub fn pipeline_with(&self, config: PipelineConfig) -> Pipeline {
        let collaborators = Collaborators {
            entities: self.entities.clone(),
            content: self.content.clone(),
            staging: self.staging.clone(),
            publisher: self.publisher.clone(),
            permissions: self.permissions.clone(),
        };
        Pipeline::new(collaborators, config).with_events(Arc::new(self.events.clone()))
    }

    /// Store an entity with one text component per `(name, body)` pair.
    pub fn add_entity(
        &self,
        id: EntityId,
        parent: Option<EntityId>,
        components: &[(&str, &str)],
    ) {
        let mut entity = Entity::new(id, 1);
        entity.parent = parent;
        for (name, body) in components {
            let address = self.content.insert(Bytes::from(body.to_string()));
            entity = entity.with_component(*name, address);
        }
        self.entities.insert(entity);
    }

    /// Target -> Parent -> Grandparent, grandparent has no parent.
    pub fn three_level_chain(&self) -> (EntityId, EntityId, EntityId) {
        let (target, parent, grandparent) = (id(1), id(2), id(3));
        self.add_entity(target.clone(), Some(parent.clone()), &[("notes.md", "leaf")]);
        self.add_entity(
            parent.clone(),
            Some(grandparent.clone()),
            &[("pinax.json", "{}"), ("description.md", "parent")],
        );
        self.add_entity(grandparent.clone(), None, &[("description.md", "top")]);
        (target, parent, grandparent)
    }
}

pub fn request(pi: &EntityId, phases: &[&str], cascade: bool) -> ReprocessRequest {
    ReprocessRequest {
        pi: pi.to_string(),
        phases: phases.iter().map(|p| p.to_string()).collect(),
        cascade,
        options: None,
    }
}
