//! HTTP client for the control API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::channels::types::{
    ActionResponse, DiscoveryStatus, ErrorBody, HealthResponse, NotifyBody, RequestIdBody,
    RequestsResponse, StatusResponse,
};
use crate::error::ChannelError;
use crate::pairing::PairingSummary;

/// Per-call timeout for listing and dismissing.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Approve waits on the daemon's own preboot callback, so it gets longer.
const APPROVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    client: reqwest::Client,
}

impl ControlClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, ChannelError> {
        let response = self.client.get(self.url("/health")).send().await?;
        decode(response).await
    }

    pub async fn discovery(&self) -> Result<DiscoveryStatus, ChannelError> {
        let response = self.client.get(self.url("/discovery")).send().await?;
        decode(response).await
    }

    /// File a pairing notification, as a preboot agent would.
    pub async fn notify(&self, body: &NotifyBody) -> Result<ActionResponse, ChannelError> {
        let response = self
            .client
            .post(self.url("/pairing"))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn status(&self, request_id: &str) -> Result<StatusResponse, ChannelError> {
        let response = self
            .client
            .get(self.url("/pairing/status"))
            .query(&[("request_id", request_id)])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn list_requests(&self) -> Result<Vec<PairingSummary>, ChannelError> {
        let response = self.client.get(self.url("/pairing/requests")).send().await?;
        let body: RequestsResponse = decode(response).await?;
        Ok(body.requests)
    }

    pub async fn approve(&self, request_id: &str) -> Result<ActionResponse, ChannelError> {
        let response = self
            .client
            .post(self.url("/pairing/approve"))
            .timeout(APPROVE_TIMEOUT)
            .json(&RequestIdBody {
                request_id: Some(request_id.to_string()),
            })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn dismiss(&self, request_id: &str) -> Result<ActionResponse, ChannelError> {
        let response = self
            .client
            .post(self.url("/pairing/dismiss"))
            .json(&RequestIdBody {
                request_id: Some(request_id.to_string()),
            })
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ChannelError> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    Err(ChannelError::UnexpectedStatus {
        status: status.as_u16(),
        body,
    })
}
