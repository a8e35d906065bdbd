//! Host daemon assembly.
//!
//! Wires the identity, discovery responder, pairing registry, control API
//! and work surfacer together and owns their lifetimes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::approval::WorkSurfacer;
use crate::channels::types::DiscoveryStatus;
use crate::channels::{ControlServer, ControlServerConfig, ControlState, routes};
use crate::config::DaemonConfig;
use crate::discovery::DiscoveryResponder;
use crate::error::{ChannelError, Error};
use crate::identity::{FileIdentityProvider, IdentityProvider, NodeRole};
use crate::pairing::{PairingRegistry, PrebootConfirmer};

pub struct Daemon {
    server: ControlServer,
    control_addr: SocketAddr,
    discovery: Option<DiscoveryResponder>,
    registry: PairingRegistry,
    surfacer: JoinHandle<()>,
}

impl Daemon {
    /// Start every component. Any failure here is fatal: a host that cannot
    /// read its identity or bind its sockets must not come up half-working.
    pub async fn start(config: DaemonConfig) -> Result<Self, Error> {
        let identity_provider: Arc<dyn IdentityProvider> = Arc::new(FileIdentityProvider::new(
            config.identity_path.clone(),
            NodeRole::Host,
        ));
        let identity = identity_provider.load().await?;
        tracing::info!(path = %config.identity_path.display(), "Host identity loaded");

        let mut discovery = None;
        let mut discovery_status = DiscoveryStatus {
            enabled: config.discovery.enabled,
            addr: None,
            strict: config.discovery.strict,
        };
        if config.discovery.enabled {
            let mut responder = DiscoveryResponder::new(&config.discovery, &identity)?;
            discovery_status.addr = Some(responder.start().await?);
            discovery = Some(responder);
        } else {
            tracing::info!("Discovery responder disabled");
        }

        let confirmer = PrebootConfirmer::new(config.preboot.clone()).map_err(ChannelError::from)?;
        let registry = PairingRegistry::new(config.pairing.clone(), Arc::new(confirmer));

        let surfacer = tokio::spawn(
            WorkSurfacer::new(config.surface_url.clone()).run(registry.subscribe()),
        );

        let mut server = ControlServer::new(ControlServerConfig {
            addr: config.control_bind,
        });
        server.add_routes(routes(ControlState {
            registry: registry.clone(),
            identity: identity_provider,
            discovery: discovery_status,
        }));
        let control_addr = match server.start().await {
            Ok(addr) => addr,
            Err(e) => {
                surfacer.abort();
                if let Some(mut responder) = discovery {
                    responder.shutdown().await;
                }
                return Err(e.into());
            }
        };

        Ok(Self {
            server,
            control_addr,
            discovery,
            registry,
            surfacer,
        })
    }

    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    pub fn discovery_addr(&self) -> Option<SocketAddr> {
        self.discovery.as_ref().and_then(|d| d.local_addr())
    }

    pub fn registry(&self) -> &PairingRegistry {
        &self.registry
    }

    /// Resolves if the control API stops on its own.
    pub async fn stopped(&mut self) {
        self.server.stopped().await;
    }

    pub async fn shutdown(mut self) {
        self.server.shutdown().await;
        if let Some(mut responder) = self.discovery.take() {
            responder.shutdown().await;
        }
        self.surfacer.abort();
        tracing::info!("Host daemon stopped");
    }
}
