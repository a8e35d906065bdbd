//! Preboot confirmation callback.
//!
//! Approving a request tells the flake's preboot agent that the host has
//! accepted it. The preboot is reached at the address the notify call came
//! from, never at an address the flake claims for itself.

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::PrebootConfig;

/// Path of the approval endpoint exposed by preboot agents.
pub const PREBOOT_APPROVE_PATH: &str = "/preboot/pairing/approve";

/// Finalizes trust with the peer that filed a pairing request.
#[async_trait]
pub trait RemoteConfirmer: Send + Sync {
    /// Returns `true` only if the peer acknowledged the approval.
    async fn confirm(&self, request_id: &str, preboot_ip: IpAddr) -> bool;
}

#[derive(Serialize)]
struct ConfirmBody<'a> {
    request_id: &'a str,
}

/// HTTP confirmer talking to the preboot agent.
pub struct PrebootConfirmer {
    config: PrebootConfig,
    client: reqwest::Client,
}

impl PrebootConfirmer {
    pub fn new(config: PrebootConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Base URL for the given preboot address, honoring the override.
    pub fn base_url(&self, preboot_ip: IpAddr) -> String {
        match &self.config.base_url {
            Some(url) => url.as_str().trim_end_matches('/').to_string(),
            None => format!("http://{}", SocketAddr::new(preboot_ip, self.config.port)),
        }
    }

    pub fn approve_url(&self, preboot_ip: IpAddr) -> String {
        format!("{}{}", self.base_url(preboot_ip), PREBOOT_APPROVE_PATH)
    }
}

#[async_trait]
impl RemoteConfirmer for PrebootConfirmer {
    async fn confirm(&self, request_id: &str, preboot_ip: IpAddr) -> bool {
        let url = self.approve_url(preboot_ip);

        match self
            .client
            .post(&url)
            .json(&ConfirmBody { request_id })
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::info!(request_id, preboot = %url, "Pairing approved via preboot");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    request_id,
                    preboot = %url,
                    status = response.status().as_u16(),
                    "Preboot rejected pairing approval"
                );
                false
            }
            Err(e) => {
                tracing::error!(
                    request_id,
                    preboot = %url,
                    error = %e,
                    "Preboot approval failed (network error)"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

    use super::*;

    fn config(base_url: Option<&str>) -> PrebootConfig {
        PrebootConfig {
            base_url: base_url.map(|u| url::Url::parse(u).unwrap()),
            port: 7040,
            timeout: Duration::from_millis(500),
        }
    }

    async fn spawn_preboot(status: StatusCode) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                PREBOOT_APPROVE_PATH,
                post(
                    move |State(seen): State<Arc<Mutex<Vec<String>>>>,
                          Json(body): Json<serde_json::Value>| async move {
                        let id = body["request_id"].as_str().unwrap_or_default().to_string();
                        seen.lock().unwrap().push(id);
                        status
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, seen)
    }

    #[test]
    fn test_url_from_preboot_ip() {
        let confirmer = PrebootConfirmer::new(config(None)).unwrap();
        assert_eq!(
            confirmer.approve_url("10.0.0.5".parse().unwrap()),
            "http://10.0.0.5:7040/preboot/pairing/approve"
        );
        assert_eq!(
            confirmer.base_url("fe80::1".parse().unwrap()),
            "http://[fe80::1]:7040"
        );
    }

    #[test]
    fn test_url_override_wins() {
        let confirmer = PrebootConfirmer::new(config(Some("http://preboot.lan:9000/"))).unwrap();
        assert_eq!(
            confirmer.approve_url("10.0.0.5".parse().unwrap()),
            "http://preboot.lan:9000/preboot/pairing/approve"
        );
    }

    #[tokio::test]
    async fn test_confirm_success() {
        let (addr, seen) = spawn_preboot(StatusCode::OK).await;
        let confirmer =
            PrebootConfirmer::new(config(Some(&format!("http://{}", addr)))).unwrap();

        assert!(confirmer.confirm("r1", addr.ip()).await);
        assert_eq!(seen.lock().unwrap().as_slice(), ["r1".to_string()]);
    }

    #[tokio::test]
    async fn test_confirm_non_success_status_is_failure() {
        let (addr, _) = spawn_preboot(StatusCode::INTERNAL_SERVER_ERROR).await;
        let confirmer =
            PrebootConfirmer::new(config(Some(&format!("http://{}", addr)))).unwrap();

        assert!(!confirmer.confirm("r1", addr.ip()).await);
    }

    #[tokio::test]
    async fn test_confirm_unreachable_is_failure() {
        // Reserve a port, then free it so nothing is listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let confirmer =
            PrebootConfirmer::new(config(Some(&format!("http://{}", addr)))).unwrap();
        assert!(!confirmer.confirm("r1", addr.ip()).await);
    }
}
