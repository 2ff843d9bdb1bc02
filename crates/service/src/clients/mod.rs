//! HTTP implementations of the pipeline's collaborator traits.
//!
//! Status mapping is shared by every client: `404` is a missing resource,
//! any other `4xx` means the collaborator rejected the call, and `5xx` or a
//! transport failure is transient and left to the retry policy.

mod entities;
mod permissions;
mod queue;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use common::store::StoreError;

pub use entities::HttpEntityStore;
pub use permissions::HttpPermissionService;
pub use queue::HttpQueuePublisher;

pub const USER_ID_HEADER: &str = "X-User-Id";

pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Normalize a collaborator base URL so relative joins append to its path.
fn base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn endpoint(base: &Url, path: &str) -> Result<Url, StoreError> {
    base.join(path)
        .map_err(|e| StoreError::Invalid(format!("bad endpoint '{path}': {e}")))
}

fn transport_error(context: &str, err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::Invalid(format!("{context}: {err}"))
    } else {
        StoreError::Unavailable(format!("{context}: {err}"))
    }
}

fn status_error(context: &str, status: StatusCode) -> StoreError {
    if status == StatusCode::NOT_FOUND {
        StoreError::NotFound(context.to_string())
    } else if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        StoreError::Unavailable(format!("{context}: upstream answered {status}"))
    } else {
        StoreError::Invalid(format!("{context}: upstream answered {status}"))
    }
}
