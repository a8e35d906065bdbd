//! `icehost serve`: run the host daemon until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use crate::config::DaemonConfig;
use crate::daemon::Daemon;

/// Flags here override the matching `ICE_*` environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Control API bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Discovery responder bind address
    #[arg(long)]
    pub discovery_bind: Option<SocketAddr>,

    /// Do not answer discovery probes
    #[arg(long)]
    pub no_discovery: bool,

    /// Only answer well-formed discovery probes
    #[arg(long)]
    pub strict_discovery: bool,

    /// Path to the host identity document
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// URL to open when a pairing request arrives
    #[arg(long)]
    pub surface_url: Option<String>,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(bind) = self.bind {
            config.control_bind = bind;
        }
        if let Some(bind) = self.discovery_bind {
            config.discovery.bind = bind;
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
        if self.strict_discovery {
            config.discovery.strict = true;
        }
        if let Some(path) = &self.identity {
            config.identity_path = path.clone();
        }
        if let Some(url) = &self.surface_url {
            config.surface_url = Some(url.clone());
        }
    }
}

pub async fn run_serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = DaemonConfig::from_env()?;
    args.apply(&mut config);

    let mut daemon = Daemon::start(config).await?;
    println!("Control API: http://{}", daemon.control_addr());
    match daemon.discovery_addr() {
        Some(addr) => println!("Discovery:   udp://{}", addr),
        None => println!("Discovery:   disabled"),
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
        _ = daemon.stopped() => {
            tracing::error!("Control API stopped unexpectedly");
            daemon.shutdown().await;
            anyhow::bail!("control API stopped unexpectedly");
        }
    }

    daemon.shutdown().await;
    Ok(())
}
