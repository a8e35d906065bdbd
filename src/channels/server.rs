//! HTTP server hosting the control API.
//!
//! Route fragments are accumulated, then a single `start()` binds the
//! listener and spawns the server task with peer addresses attached to
//! every request.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ChannelError;

/// Configuration for the control server.
pub struct ControlServerConfig {
    /// Address to bind the server to.
    pub addr: SocketAddr,
}

pub struct ControlServer {
    config: ControlServerConfig,
    routes: Vec<Router>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ControlServer {
    pub fn new(config: ControlServerConfig) -> Self {
        Self {
            config,
            routes: Vec::new(),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Accumulate a route fragment. Each fragment should already have its
    /// state applied via `.with_state()`.
    pub fn add_routes(&mut self, router: Router) {
        self.routes.push(router);
    }

    /// Bind the listener, merge all route fragments, and spawn the server.
    /// Returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, ChannelError> {
        let mut app = Router::new();
        for fragment in self.routes.drain(..) {
            app = app.merge(fragment);
        }

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "control_api".to_string(),
                reason: format!("Failed to bind to {}: {}", self.config.addr, e),
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ChannelError::StartupFailed {
                name: "control_api".to_string(),
                reason: format!("Failed to read bound address: {}", e),
            })?;

        tracing::info!("Control API listening on {}", local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Control API shutting down");
            })
            .await
            {
                tracing::error!("Control API server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(local_addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Resolves when the server task exits on its own (e.g. after a fatal
    /// serve error). Pending forever if the server was never started.
    pub async fn stopped(&mut self) {
        match self.handle.as_mut() {
            Some(handle) => {
                let _ = handle.await;
                self.handle = None;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
