//! Line-oriented terminal presentation for the approval agent.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::approval::agent::{AgentCommand, AgentHandle};
use crate::approval::view::AgentView;

pub fn render(view: &AgentView) -> String {
    match view {
        AgentView::Idle => "Waiting for pairing requests...".to_string(),
        AgentView::Prompt { request, notice } => {
            let mut out = format!(
                "New flake pairing request\n  Client:     {}\n  Request ID: {}\n  Host:       {}\n  Age:        {}s\n  {}\n",
                request.client_ip.as_deref().unwrap_or("unknown"),
                request.request_id,
                request.host_id,
                request.age_sec,
                request.message,
            );
            if let Some(notice) = notice {
                out.push_str(&format!("  ! {}\n", notice));
            }
            out.push_str("[a]ccept flake / [i]gnore");
            out
        }
        AgentView::Approving { .. } => "Approving flake...".to_string(),
        AgentView::Approved { .. } => {
            "\u{2744} Flake added: this host is now trusted by ICE Studio.".to_string()
        }
    }
}

pub fn parse_command(line: &str) -> Option<AgentCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "a" | "accept" => Some(AgentCommand::Accept),
        "i" | "ignore" => Some(AgentCommand::Ignore),
        _ => None,
    }
}

/// Render every view change to `out` and forward operator input until the
/// input ends or the agent stops.
pub async fn run_terminal<R, W>(mut handle: AgentHandle, input: R, mut out: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    writeln!(out, "{}", render(&handle.view()))?;

    loop {
        tokio::select! {
            view = handle.changed() => match view {
                Some(view) => {
                    writeln!(out, "{}", render(&view))?;
                    out.flush()?;
                }
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => match parse_command(&line) {
                    Some(command) => {
                        if !handle.send(command).await {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => writeln!(out, "Unknown input {:?}; type 'a' or 'i'", line.trim())?,
                },
                None => break,
            },
        }
    }

    Ok(())
}
