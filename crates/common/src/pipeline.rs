//! # Reprocessing pipeline
//!
//! Sequences one reprocessing request end to end:
//!
//! 1. validate the request and check permission on the target
//! 2. pick the cascade boundary and resolve the entity chain
//! 3. materialize every resolved entity into staging
//! 4. build the batch manifest
//! 5. write the manifest to staging and send the batch message
//!
//! Any failure aborts the whole request. Nothing is sent to the queue until
//! every entity has been staged and the manifest written, so the queue send
//! is the single commit point of a batch.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::entity::EntityId;
use crate::error::PipelineError;
use crate::events::{PipelineEvents, TracingEvents};
use crate::manifest::BatchManifest;
use crate::materializer::{ComponentMaterializer, ConcurrencyLimits};
use crate::phase::PhaseSet;
use crate::policy::{authorize, CascadeBoundary};
use crate::resolver::{EntityResolver, DEFAULT_MAX_CASCADE_DEPTH};
use crate::retry::RetryPolicy;
use crate::store::{
    Actor, BatchPublisher, ContentStore, EntityStore, PermissionService, StagingStore,
};

const BATCH_ID_PREFIX: &str = "reprocess_";
const MANIFEST_FILE_NAME: &str = "_manifest.json";
const PUBLISHED_FILE_NAME: &str = "_published";

/// Optional per-phase prompt overrides forwarded to the downstream pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPrompts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinax: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheimarros: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprocessOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at_pi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompts: Option<CustomPrompts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_note: Option<String>,
}

/// A reprocessing request as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprocessRequest {
    pub pi: String,
    pub phases: Vec<String>,
    #[serde(default)]
    pub cascade: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ReprocessOptions>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub target: EntityId,
    pub phases: PhaseSet,
    pub cascade: bool,
    pub stop_override: Option<EntityId>,
    pub custom_prompts: Option<CustomPrompts>,
    pub custom_note: Option<String>,
}

impl ReprocessRequest {
    pub fn validate(self) -> Result<ValidatedRequest, PipelineError> {
        let target = EntityId::parse(&self.pi)?;
        let phases = PhaseSet::parse(self.phases.as_slice())?;
        let options = self.options.unwrap_or_default();
        let stop_override = options
            .stop_at_pi
            .as_deref()
            .map(EntityId::parse)
            .transpose()?;

        Ok(ValidatedRequest {
            target,
            phases,
            cascade: self.cascade,
            stop_override,
            custom_prompts: options.custom_prompts,
            custom_note: options.custom_note,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprocessResponse {
    pub batch_id: String,
    pub entities_queued: usize,
    pub entity_pis: Vec<String>,
    pub status_url: String,
}

/// The message handed to the downstream processing queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMessage {
    pub batch_id: String,
    pub manifest_location: String,
    pub staging_prefix: String,
    pub total_files: u64,
    pub total_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finalized_at: OffsetDateTime,
    pub reprocessing_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompts: Option<CustomPrompts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_note: Option<String>,
}

/// Identifier of one reprocessing batch and the staging locations derived
/// from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchId(String);

impl BatchId {
    pub fn generate() -> Self {
        Self(format!("{BATCH_ID_PREFIX}{}", Uuid::new_v4().simple()))
    }

    /// Accept only ids this service could have generated.
    pub fn parse(value: &str) -> Result<Self, PipelineError> {
        let valid = value
            .strip_prefix(BATCH_ID_PREFIX)
            .and_then(|rest| Uuid::try_parse(rest).ok())
            .is_some_and(|uuid| value == format!("{BATCH_ID_PREFIX}{}", uuid.simple()));
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(PipelineError::Validation(format!(
                "invalid batch id '{value}'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn staging_prefix(&self) -> String {
        format!("staging/{}/", self.0)
    }

    pub fn manifest_location(&self) -> String {
        format!("{}{MANIFEST_FILE_NAME}", self.staging_prefix())
    }

    /// Written once the batch message has been queued.
    pub fn published_marker(&self) -> String {
        format!("{}{PUBLISHED_FILE_NAME}", self.staging_prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub limits: ConcurrencyLimits,
    pub max_cascade_depth: usize,
    /// Base URL of the downstream orchestrator's status endpoint
    pub status_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            limits: ConcurrencyLimits::default(),
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            status_base_url: "http://localhost:8787".to_string(),
        }
    }
}

/// External systems the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub entities: Arc<dyn EntityStore>,
    pub content: Arc<dyn ContentStore>,
    pub staging: Arc<dyn StagingStore>,
    pub publisher: Arc<dyn BatchPublisher>,
    pub permissions: Arc<dyn PermissionService>,
}

#[derive(Clone)]
pub struct Pipeline {
    collaborators: Collaborators,
    config: PipelineConfig,
    events: Arc<dyn PipelineEvents>,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            collaborators,
            config,
            events: Arc::new(TracingEvents),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn PipelineEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn staging(&self) -> &Arc<dyn StagingStore> {
        &self.collaborators.staging
    }

    /// Run a reprocessing request through every stage and queue the batch.
    pub async fn submit(
        &self,
        request: ReprocessRequest,
        actor: Option<Actor>,
    ) -> Result<ReprocessResponse, PipelineError> {
        let request = request.validate()?;
        let batch = BatchId::generate();

        self.events
            .batch_started(batch.as_str(), &request.target, request.cascade);

        match self.run(&batch, &request, actor.as_ref()).await {
            Ok(response) => Ok(response),
            Err(err) => {
                self.events.batch_failed(batch.as_str(), &err);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        batch: &BatchId,
        request: &ValidatedRequest,
        actor: Option<&Actor>,
    ) -> Result<ReprocessResponse, PipelineError> {
        let c = &self.collaborators;
        let retry = self.config.retry;

        let grant = authorize(c.permissions.as_ref(), &retry, &request.target, actor).await?;
        let boundary = CascadeBoundary::select(request.stop_override.as_ref(), &grant);
        self.events
            .permission_checked(batch.as_str(), &request.target, &boundary);

        let chain = EntityResolver::new(c.entities.as_ref(), retry, self.config.max_cascade_depth)
            .resolve_chain(&request.target, request.cascade, &boundary.stop)
            .await?;
        self.events.chain_resolved(batch.as_str(), &chain);

        let uploaded_at = OffsetDateTime::now_utc();
        let staging_prefix = batch.staging_prefix();
        let materializer = ComponentMaterializer::new(
            c.entities.clone(),
            c.content.clone(),
            c.staging.clone(),
            retry,
            self.config.limits,
        );
        let materialized = materializer
            .materialize_all(&chain, &staging_prefix)
            .await?;
        for entity in &materialized {
            if entity.is_empty() {
                self.events.empty_entity(batch.as_str(), &entity.id);
            }
            self.events.entity_materialized(batch.as_str(), entity);
        }

        let manifest = BatchManifest::build(&materialized, &request.phases, batch.as_str());
        self.events.manifest_built(batch.as_str(), &manifest);

        let manifest_location = batch.manifest_location();
        let manifest_bytes = Bytes::from(manifest.to_json()?);
        retry
            .run("write manifest", || {
                c.staging.put(&manifest_location, manifest_bytes.clone())
            })
            .await
            .map_err(|e| PipelineError::from_store("write manifest", e))?;

        let message = BatchMessage {
            batch_id: batch.as_str().to_string(),
            manifest_location: manifest_location.clone(),
            staging_prefix,
            total_files: manifest.total_files,
            total_bytes: manifest.total_bytes,
            uploaded_at,
            finalized_at: OffsetDateTime::now_utc(),
            reprocessing_mode: true,
            custom_prompts: request.custom_prompts.clone(),
            custom_note: request.custom_note.clone(),
        };
        let marker_bytes = Bytes::from(serde_json::to_vec(&message)?);
        retry
            .run("queue batch", || c.publisher.publish(&message))
            .await
            .map_err(|e| PipelineError::from_store("queue batch", e))?;
        self.events
            .batch_published(batch.as_str(), &manifest_location);

        // the batch is already queued; a missing marker only hides it from lookups
        let marker = batch.published_marker();
        if let Err(err) = retry
            .run("mark published", || c.staging.put(&marker, marker_bytes.clone()))
            .await
        {
            tracing::warn!(
                batch_id = batch.as_str(),
                error = %err,
                "failed to write publish marker"
            );
        }

        Ok(ReprocessResponse {
            batch_id: batch.as_str().to_string(),
            entities_queued: chain.len(),
            entity_pis: chain.iter().map(ToString::to_string).collect(),
            status_url: format!(
                "{}/status/{}",
                self.config.status_base_url.trim_end_matches('/'),
                batch.as_str()
            ),
        })
    }

    /// Load the manifest of a previously queued batch from staging.
    ///
    /// Batches whose queue send never succeeded are reported as missing even
    /// though their manifest may still sit in staging.
    pub async fn load_manifest(&self, batch_id: &str) -> Result<BatchManifest, PipelineError> {
        let batch = BatchId::parse(batch_id)?;
        let location = batch.manifest_location();
        let marker = batch.published_marker();
        let staging = &self.collaborators.staging;
        let retry = self.config.retry;

        retry
            .run("read publish marker", || staging.get(&marker))
            .await
            .map_err(|e| PipelineError::from_store("read publish marker", e))?
            .ok_or_else(|| PipelineError::NotFound(format!("batch {batch_id}")))?;

        let bytes = retry
            .run("read manifest", || staging.get(&location))
            .await
            .map_err(|e| PipelineError::from_store("read manifest", e))?
            .ok_or_else(|| PipelineError::NotFound(format!("batch {batch_id}")))?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_minimal_request() {
        let request: ReprocessRequest = serde_json::from_str(
            r#"{"pi": "01KA1H53CP2TAW8P8VSZ8JX3S5", "phases": ["description"]}"#,
        )
        .unwrap();
        let validated = request.validate().unwrap();
        assert!(!validated.cascade);
        assert!(validated.stop_override.is_none());
        assert!(validated.custom_note.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let bad_pi = ReprocessRequest {
            pi: "abc".into(),
            phases: vec!["pinax".into()],
            cascade: false,
            options: None,
        };
        assert_eq!(bad_pi.validate().unwrap_err().code(), "VALIDATION_ERROR");

        let no_phases = ReprocessRequest {
            pi: "01KA1H53CP2TAW8P8VSZ8JX3S5".into(),
            phases: vec![],
            cascade: true,
            options: None,
        };
        assert_eq!(no_phases.validate().unwrap_err().code(), "VALIDATION_ERROR");

        let bad_stop = ReprocessRequest {
            pi: "01KA1H53CP2TAW8P8VSZ8JX3S5".into(),
            phases: vec!["pinax".into()],
            cascade: true,
            options: Some(ReprocessOptions {
                stop_at_pi: Some("root".into()),
                ..Default::default()
            }),
        };
        assert_eq!(bad_stop.validate().unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_batch_id_locations() {
        let batch = BatchId::generate();
        assert!(batch.as_str().starts_with("reprocess_"));
        assert_eq!(
            batch.staging_prefix(),
            format!("staging/{}/", batch.as_str())
        );
        assert_eq!(
            batch.manifest_location(),
            format!("staging/{}/_manifest.json", batch.as_str())
        );
        assert_eq!(
            batch.published_marker(),
            format!("staging/{}/_published", batch.as_str())
        );
        assert_eq!(BatchId::parse(batch.as_str()).unwrap(), batch);
    }

    #[test]
    fn test_batch_id_parse_rejects_foreign_ids() {
        assert!(BatchId::parse("reprocess_../../etc").is_err());
        assert!(BatchId::parse("batch_0123").is_err());
        assert!(BatchId::parse("reprocess_6f1c1e3a-2b7b-4c1e-9a38-6f3c52d2e1a0").is_err());
    }

    #[test]
    fn test_batch_message_optional_fields_omitted() {
        let message = BatchMessage {
            batch_id: "reprocess_x".into(),
            manifest_location: "staging/reprocess_x/_manifest.json".into(),
            staging_prefix: "staging/reprocess_x/".into(),
            total_files: 1,
            total_bytes: 2,
            uploaded_at: OffsetDateTime::UNIX_EPOCH,
            finalized_at: OffsetDateTime::UNIX_EPOCH,
            reprocessing_mode: true,
            custom_prompts: None,
            custom_note: None,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["reprocessing_mode"], true);
        assert_eq!(value["uploaded_at"], "1970-01-01T00:00:00Z");
        assert!(value.get("custom_prompts").is_none());
        assert!(value.get("custom_note").is_none());
    }
}
