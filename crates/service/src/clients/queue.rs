use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use common::pipeline::BatchMessage;
use common::store::{BatchPublisher, StoreError};

use super::{status_error, transport_error};

/// Publishes batch messages by POSTing them as JSON to the queue endpoint.
#[derive(Debug, Clone)]
pub struct HttpQueuePublisher {
    client: Client,
    url: Url,
}

impl HttpQueuePublisher {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl BatchPublisher for HttpQueuePublisher {
    async fn publish(&self, message: &BatchMessage) -> Result<(), StoreError> {
        let context = format!("queue send for {}", message.batch_id);

        let response = self
            .client
            .post(self.url.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        if !response.status().is_success() {
            return Err(status_error(&context, response.status()));
        }
        Ok(())
    }
}
