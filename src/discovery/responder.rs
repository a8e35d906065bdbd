//! UDP responder answering discovery probes with the host identity.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DiscoveryConfig;
use crate::discovery::{MAX_DATAGRAM, ProbePolicy};
use crate::error::DiscoveryError;
use crate::identity::Identity;

/// Answers every accepted datagram with a snapshot of the identity taken
/// at construction. No session state, no retries.
pub struct DiscoveryResponder {
    bind: SocketAddr,
    policy: ProbePolicy,
    payload: Arc<Vec<u8>>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryResponder {
    /// Serialize the identity once. Fails rather than advertising something
    /// that is not a valid identity document.
    pub fn new(config: &DiscoveryConfig, identity: &Identity) -> Result<Self, DiscoveryError> {
        let payload = identity.to_bytes()?;
        Ok(Self {
            bind: config.bind,
            policy: ProbePolicy::from_strict(config.strict),
            payload: Arc::new(payload),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        })
    }

    /// Bind the socket and spawn the responder loop. Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, DiscoveryError> {
        let socket = UdpSocket::bind(self.bind)
            .await
            .map_err(|source| DiscoveryError::Bind {
                addr: self.bind,
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| DiscoveryError::Bind {
            addr: self.bind,
            source,
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        let payload = self.payload.clone();
        let policy = self.policy;
        self.handle = Some(tokio::spawn(async move {
            run_responder(socket, payload, policy, shutdown_rx).await;
        }));

        tracing::info!(addr = %local_addr, policy = ?self.policy, "Discovery responder listening");
        Ok(local_addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop answering and wait for the loop to exit.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
            tracing::info!("Discovery responder stopped");
        }
    }
}

impl Drop for DiscoveryResponder {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

async fn run_responder(
    socket: UdpSocket,
    payload: Arc<Vec<u8>>,
    policy: ProbePolicy,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            received = socket.recv_from(&mut buf) => {
                let (len, src) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::debug!(error = %e, "Discovery receive failed");
                        continue;
                    }
                };

                if !policy.accepts(&buf[..len]) {
                    tracing::trace!(%src, len, "Dropping discovery datagram");
                    continue;
                }

                match socket.send_to(&payload, src).await {
                    Ok(_) => tracing::debug!(%src, "Answered discovery probe"),
                    Err(e) => tracing::debug!(%src, error = %e, "Discovery reply failed"),
                }
            }
        }
    }
}
