//! Administrative calls against the policy store

use curfew_api::{ApiMessage, ClientConfigBody, ClientListResponse, MutationResponse};
use curfew_util::AgentId;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::PolicyClient;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Client not found: {0}")]
    NotFound(AgentId),

    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Policy store unreachable: {0}")]
    Unreachable(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Error body of the store (`{"detail": "..."}`)
#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl PolicyClient {
    /// Set the unlock flag for a workstation
    pub async fn set_unlock(&self, identity: &AgentId, allowed: bool) -> AdminResult<MutationResponse> {
        let url = self.url(&format!("/client/{}/unlock-status", identity));
        let request = self.http.post(url).query(&[("unlock_allowed", allowed)]);
        self.send(request, Some(identity)).await
    }

    /// Set the YouTube budget for a workstation
    pub async fn set_timer(&self, identity: &AgentId, seconds: u32) -> AdminResult<MutationResponse> {
        let url = self.url(&format!("/client/{}/youtube-timer", identity));
        let request = self.http.post(url).query(&[("timer_seconds", seconds)]);
        self.send(request, Some(identity)).await
    }

    /// Set both fields at once
    pub async fn configure(
        &self,
        identity: &AgentId,
        body: &ClientConfigBody,
    ) -> AdminResult<MutationResponse> {
        let url = self.url(&format!("/clients/{}/configure", identity));
        let request = self.http.post(url).json(body);
        self.send(request, Some(identity)).await
    }

    /// Remove a workstation from the store
    pub async fn delete_client(&self, identity: &AgentId) -> AdminResult<MutationResponse> {
        let url = self.url(&format!("/client/{}", identity));
        let request = self.http.delete(url);
        self.send(request, Some(identity)).await
    }

    /// All workstations known to the store
    pub async fn list_clients(&self) -> AdminResult<ClientListResponse> {
        let request = self.http.get(self.url("/clients"));
        self.send(request, None).await
    }

    /// Store liveness check
    pub async fn health(&self) -> AdminResult<ApiMessage> {
        let request = self.http.get(self.url("/api"));
        self.send(request, None).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        identity: Option<&AgentId>,
    ) -> AdminResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| AdminError::Unreachable(e.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Store responded");

        let body = response
            .bytes()
            .await
            .map_err(|e| AdminError::Unreachable(e.to_string()))?;

        if status == StatusCode::NOT_FOUND
            && let Some(identity) = identity
        {
            return Err(AdminError::NotFound(identity.clone()));
        }

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| match b.detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(AdminError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice(&body).map_err(|e| AdminError::Malformed(e.to_string()))
    }
}
