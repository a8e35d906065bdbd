//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running the host daemon (`serve`)
//! - Running the approval agent in a terminal (`agent`)
//! - Inspecting and acting on pairing requests (`pairing list`, `pairing status`,
//!   `pairing approve`, `pairing dismiss`, `pairing notify`)
//! - Probing the LAN for hosts (`discover`)

mod agent;
mod discover;
mod pairing;
mod serve;

pub use agent::{AgentArgs, run_agent_command};
pub use discover::{DiscoverArgs, run_discover_command};
pub use pairing::{PairingCommand, run_pairing_command};
pub use serve::{ServeArgs, run_serve_command};

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_DAEMON_URL;

#[derive(Parser, Debug)]
#[command(name = "icehost")]
#[command(about = "Host-side pairing control plane for ICE flakes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Control API base URL used by client commands
    #[arg(long, global = true, env = "ICE_DAEMON_URL", default_value = DEFAULT_DAEMON_URL)]
    pub daemon_url: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the host daemon: discovery responder and control API
    Serve(ServeArgs),

    /// Run the approval agent against a running daemon
    Agent(AgentArgs),

    /// Inspect and act on pairing requests
    #[command(subcommand)]
    Pairing(PairingCommand),

    /// Probe the network for hosts answering discovery
    Discover(DiscoverArgs),
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => run_serve_command(args).await,
        Command::Agent(args) => run_agent_command(&cli.daemon_url, args).await,
        Command::Pairing(cmd) => run_pairing_command(&cli.daemon_url, cmd).await,
        Command::Discover(args) => run_discover_command(args).await,
    }
}
