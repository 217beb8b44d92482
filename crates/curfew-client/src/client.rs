//! Policy fetching

use async_trait::async_trait;
use curfew_api::{
    FetchError, FetchResult, Policy, PolicySource, UnlockStatusResponse, YoutubeTimerResponse,
};
use curfew_util::AgentId;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one policy store
#[derive(Clone)]
pub struct PolicyClient {
    pub(crate) http: Client,
    base: String,
}

impl PolicyClient {
    /// Create a client for `endpoint`; every request is bounded by `timeout`
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base: endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        identity: &AgentId,
        resource: &str,
    ) -> FetchResult<T> {
        let url = self.url(&format!("/client/{}/{}", identity, resource));
        debug!(url = %url, "Fetching policy resource");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(identity.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::Unreachable(format!("HTTP {} from {}", status, url)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", resource, e)))
    }
}

#[async_trait]
impl PolicySource for PolicyClient {
    async fn fetch_policy(&self, identity: &AgentId) -> FetchResult<Policy> {
        let unlock: UnlockStatusResponse = self.get_resource(identity, "unlock-status").await?;
        let timer: YoutubeTimerResponse = self.get_resource(identity, "youtube-timer").await?;
        Policy::from_wire(&unlock, &timer)
    }
}
