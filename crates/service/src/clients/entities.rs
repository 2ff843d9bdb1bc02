use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use common::entity::{ContentAddress, Entity, EntityId};
use common::store::{ContentStore, EntityStore, StoreError};

use super::{base_url, endpoint, status_error, transport_error};

/// Client for the content-addressed entity store.
///
/// Entities are read from `GET <base>/entities/<id>` and raw component
/// bytes from `GET <base>/cat/<address>`.
#[derive(Debug, Clone)]
pub struct HttpEntityStore {
    client: Client,
    base: Url,
}

impl HttpEntityStore {
    pub fn new(client: Client, base: Url) -> Self {
        Self {
            client,
            base: base_url(base),
        }
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn get_entity(&self, id: &EntityId) -> Result<Entity, StoreError> {
        let context = format!("entity {id}");
        let url = endpoint(&self.base, &format!("entities/{id}"))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        if !response.status().is_success() {
            return Err(status_error(&context, response.status()));
        }

        let entity: Entity = response
            .json()
            .await
            .map_err(|e| transport_error(&context, e))?;
        if &entity.id != id {
            return Err(StoreError::Invalid(format!(
                "{context}: store answered with entity {}",
                entity.id
            )));
        }
        Ok(entity)
    }
}

#[async_trait]
impl ContentStore for HttpEntityStore {
    async fn get_content(&self, address: &ContentAddress) -> Result<Bytes, StoreError> {
        let context = format!("content {address}");
        let url = endpoint(&self.base, &format!("cat/{address}"))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        if !response.status().is_success() {
            return Err(status_error(&context, response.status()));
        }

        response
            .bytes()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{context}: {e}")))
    }
}
