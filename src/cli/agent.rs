//! `icehost agent`: terminal approval agent.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::approval::{AgentConfig, ApprovalAgent, DEFAULT_POLL_INTERVAL, run_terminal};
use crate::channels::ControlClient;

#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Seconds between polls of the daemon
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_secs: u64,
}

pub async fn run_agent_command(daemon_url: &str, args: AgentArgs) -> anyhow::Result<()> {
    if args.poll_secs == 0 {
        anyhow::bail!("--poll-secs must be at least 1");
    }
    let client = ControlClient::new(daemon_url)?;
    let config = AgentConfig {
        poll_interval: Duration::from_secs(args.poll_secs),
        ..AgentConfig::default()
    };

    let (agent, handle) = ApprovalAgent::new(Arc::new(client), config);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let agent_task = tokio::spawn(agent.run(async {
        let _ = stop_rx.await;
    }));

    println!("Approval agent watching {}", daemon_url);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = run_terminal(handle, stdin, std::io::stdout()) => result?,
        _ = tokio::signal::ctrl_c() => {}
    }

    let _ = stop_tx.send(());
    let _ = agent_task.await;
    Ok(())
}
