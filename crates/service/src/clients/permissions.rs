use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use common::entity::EntityId;
use common::store::{Actor, PermissionGrant, PermissionService, StoreError};

use super::{base_url, endpoint, status_error, transport_error, USER_ID_HEADER};

/// Client for the permission service: `GET <base>/permissions/<id>`.
#[derive(Debug, Clone)]
pub struct HttpPermissionService {
    client: Client,
    base: Url,
}

impl HttpPermissionService {
    pub fn new(client: Client, base: Url) -> Self {
        Self {
            client,
            base: base_url(base),
        }
    }
}

#[async_trait]
impl PermissionService for HttpPermissionService {
    async fn check(
        &self,
        id: &EntityId,
        actor: Option<&Actor>,
    ) -> Result<PermissionGrant, StoreError> {
        let context = format!("permissions for {id}");
        let url = endpoint(&self.base, &format!("permissions/{id}"))?;

        let mut request = self.client.get(url);
        if let Some(actor) = actor {
            request = request.header(USER_ID_HEADER, actor.0.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;
        if !response.status().is_success() {
            return Err(status_error(&context, response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| transport_error(&context, e))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::clients::build_client;
    use crate::clients::tests::serve;

    const ROOT: &str = "01KA1H53CP2TAW8P8VSZ8JR00T";

    async fn permissions(Path(_id): Path<String>, headers: HeaderMap) -> Json<Value> {
        match headers.get("x-user-id").and_then(|v| v.to_str().ok()) {
            Some("editor") => Json(json!({
                "canEdit": true,
                "collection": {"rootPi": ROOT, "role": "editor"}
            })),
            _ => Json(json!({"canEdit": false})),
        }
    }

    async fn service() -> HttpPermissionService {
        let router = Router::new().route("/permissions/:id", get(permissions));
        let base = serve(router).await;
        HttpPermissionService::new(build_client(Duration::from_secs(5)).unwrap(), base)
    }

    #[tokio::test]
    async fn test_check_forwards_actor() {
        let service = service().await;
        let target = EntityId::parse("01KA1H53CP2TAW8P8VSZ8JX3S5").unwrap();

        let grant = service
            .check(&target, Some(&Actor("editor".into())))
            .await
            .unwrap();
        assert!(grant.can_edit);
        let collection = grant.collection.unwrap();
        assert_eq!(collection.root_id, EntityId::parse(ROOT).unwrap());
        assert_eq!(collection.role, "editor");

        let grant = service.check(&target, None).await.unwrap();
        assert!(!grant.can_edit);
        assert!(grant.collection.is_none());
    }
}
