use std::sync::Arc;
use std::time::Duration;

use url::Url;

use common::memory::{
    MemoryContentStore, MemoryEntityStore, MemoryPermissionService, MemoryPublisher,
};
use common::pipeline::{Collaborators, Pipeline};
use common::store::StagingStore;
use object_store::{ObjectStaging, StagingError};

use super::clients::{
    build_client, HttpEntityStore, HttpPermissionService, HttpQueuePublisher,
};
use super::config::Config;
use super::fixtures::{DevFixtures, FixturesError};

/// Main service state, shared by every request handler.
#[derive(Clone)]
pub struct State {
    pipeline: Arc<Pipeline>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup staging
        tracing::info!("ServiceState::from_config - opening staging store");
        let staging: Arc<dyn StagingStore> =
            Arc::new(ObjectStaging::new(config.staging.clone()).await?);

        // 2. Setup collaborators
        let collaborators = if config.dev {
            tracing::warn!("dev mode: entity store, permissions and queue are in-memory");
            let entities = Arc::new(MemoryEntityStore::new());
            let content = Arc::new(MemoryContentStore::new());
            let permissions = Arc::new(MemoryPermissionService::new());

            match &config.dev_fixtures {
                Some(path) => {
                    let seeded =
                        DevFixtures::load(path)?.seed(&entities, &content, &permissions);
                    tracing::info!(path = %path.display(), entities = seeded, "loaded dev fixtures");
                }
                None => tracing::warn!("no dev fixtures configured; the entity store is empty"),
            }

            Collaborators {
                entities,
                content,
                staging,
                publisher: Arc::new(MemoryPublisher::new()),
                permissions,
            }
        } else {
            let client = build_client(Duration::from_secs(config.request_timeout_secs))
                .map_err(StateSetupError::HttpClient)?;

            let entity_url = required(&config.entity_url, "entity_url")?;
            let permission_url = required(&config.permission_url, "permission_url")?;
            let queue_url = required(&config.queue_url, "queue_url")?;
            tracing::info!(
                entity_url = %entity_url,
                permission_url = %permission_url,
                queue_url = %queue_url,
                "using HTTP collaborators"
            );

            let store = Arc::new(HttpEntityStore::new(client.clone(), entity_url));
            Collaborators {
                entities: store.clone(),
                content: store,
                staging,
                publisher: Arc::new(HttpQueuePublisher::new(client.clone(), queue_url)),
                permissions: Arc::new(HttpPermissionService::new(client, permission_url)),
            }
        };

        // 3. Build the pipeline
        let pipeline = Pipeline::new(collaborators, config.pipeline_config());
        Ok(Self::new(pipeline))
    }

    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn staging(&self) -> &Arc<dyn StagingStore> {
        self.pipeline.staging()
    }
}

fn required(url: &Option<Url>, name: &'static str) -> Result<Url, StateSetupError> {
    url.clone().ok_or(StateSetupError::MissingUrl(name))
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("staging setup error: {0}")]
    Staging(#[from] StagingError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    #[error("{0} must be set unless running in dev mode")]
    MissingUrl(&'static str),
    #[error("dev fixtures error: {0}")]
    Fixtures(#[from] FixturesError),
}
