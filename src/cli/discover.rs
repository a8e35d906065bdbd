//! `icehost discover`: broadcast a probe and list the hosts that answer.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;

use crate::config::DEFAULT_DISCOVERY_PORT;
use crate::discovery::probe;

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Where to send the probe
    #[arg(long, default_value_t = SocketAddr::from(([255, 255, 255, 255], DEFAULT_DISCOVERY_PORT)))]
    pub target: SocketAddr,

    /// How long to collect replies, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub wait_ms: u64,

    /// Print raw identity documents
    #[arg(long)]
    pub json: bool,
}

pub async fn run_discover_command(args: DiscoverArgs) -> anyhow::Result<()> {
    let hosts = probe(args.target, Duration::from_millis(args.wait_ms)).await?;

    if hosts.is_empty() {
        println!("No hosts answered on {}", args.target);
        return Ok(());
    }

    for host in &hosts {
        if args.json {
            println!("{} {}", host.addr, serde_json::to_string(&host.identity)?);
        } else {
            let host_id = host
                .identity
                .attributes
                .get("host_id")
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            println!(
                "{:<22} {:<6} {}",
                host.addr.to_string(),
                host.identity.role.to_string(),
                host_id
            );
        }
    }
    Ok(())
}
