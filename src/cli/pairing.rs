//! `icehost pairing ...`: talk to a running daemon's control API.

use clap::Subcommand;
use uuid::Uuid;

use crate::channels::ControlClient;
use crate::channels::types::NotifyBody;
use crate::pairing::PairingSummary;

#[derive(Subcommand, Debug, Clone)]
pub enum PairingCommand {
    /// List pending and recently dismissed requests
    List {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one request
    Status {
        /// Request ID
        request_id: String,
    },

    /// Approve a request and confirm it with the preboot agent
    Approve {
        /// Request ID
        request_id: String,
    },

    /// Dismiss a request
    Dismiss {
        /// Request ID
        request_id: String,
    },

    /// File a pairing request the way a preboot agent would
    Notify {
        /// Host identifier to pair with
        #[arg(long)]
        host_id: String,

        /// Request ID (random if omitted)
        #[arg(long)]
        request_id: Option<String>,

        /// Client address to show the operator
        #[arg(long)]
        client_ip: Option<String>,

        /// Message to show the operator
        #[arg(long)]
        message: Option<String>,
    },
}

pub async fn run_pairing_command(daemon_url: &str, cmd: PairingCommand) -> anyhow::Result<()> {
    let client = ControlClient::new(daemon_url)?;

    match cmd {
        PairingCommand::List { json } => {
            let requests = client.list_requests().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&requests)?);
            } else {
                print_requests(&requests);
            }
        }
        PairingCommand::Status { request_id } => {
            let status = client.status(&request_id).await?;
            println!("Request {}", status.request_id);
            println!("  Status:  {}", status.status);
            println!("  Host:    {}", status.host_id);
            println!(
                "  Client:  {}",
                status.client_ip.as_deref().unwrap_or("unknown")
            );
            println!("  Message: {}", status.message);
        }
        PairingCommand::Approve { request_id } => {
            let response = client.approve(&request_id).await?;
            if response.ok {
                println!("Approved {}", response.request_id);
            } else {
                anyhow::bail!(
                    "preboot did not confirm {}; request is still {}",
                    response.request_id,
                    response.status
                );
            }
        }
        PairingCommand::Dismiss { request_id } => {
            let response = client.dismiss(&request_id).await?;
            println!("Dismissed {}", response.request_id);
        }
        PairingCommand::Notify {
            host_id,
            request_id,
            client_ip,
            message,
        } => {
            let body = NotifyBody {
                host_id: Some(host_id),
                request_id: Some(request_id.unwrap_or_else(|| Uuid::new_v4().to_string())),
                client_ip,
                message,
            };
            let response = client.notify(&body).await?;
            println!("Filed {} ({})", response.request_id, response.status);
        }
    }

    Ok(())
}

fn print_requests(requests: &[PairingSummary]) {
    if requests.is_empty() {
        println!("No pairing requests.");
        return;
    }
    println!(
        "{:<38} {:<10} {:<16} {:<16} {:>6}",
        "REQUEST", "STATUS", "HOST", "CLIENT", "AGE"
    );
    for r in requests {
        println!(
            "{:<38} {:<10} {:<16} {:<16} {:>5}s",
            r.request_id,
            r.status.to_string(),
            r.host_id,
            r.client_ip.as_deref().unwrap_or("-"),
            r.age_sec
        );
    }
}
