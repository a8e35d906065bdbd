//! Polling approval agent.
//!
//! Polls the daemon for pending requests, publishes an [`AgentView`] on a
//! watch channel and executes accept/ignore commands coming from whatever
//! presentation is attached through the [`AgentHandle`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::approval::view::{AgentView, FAILED_NOTICE, reconcile};
use crate::channels::ControlClient;
use crate::channels::types::ActionResponse;
use crate::error::ChannelError;
use crate::pairing::{PairingStatus, PairingSummary};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_APPROVED_LINGER: Duration = Duration::from_millis(1500);

/// The slice of the control API the agent needs.
#[async_trait]
pub trait ControlApi: Send + Sync {
    async fn list_requests(&self) -> Result<Vec<PairingSummary>, ChannelError>;
    async fn approve(&self, request_id: &str) -> Result<ActionResponse, ChannelError>;
    async fn dismiss(&self, request_id: &str) -> Result<ActionResponse, ChannelError>;
}

#[async_trait]
impl ControlApi for ControlClient {
    async fn list_requests(&self) -> Result<Vec<PairingSummary>, ChannelError> {
        ControlClient::list_requests(self).await
    }

    async fn approve(&self, request_id: &str) -> Result<ActionResponse, ChannelError> {
        ControlClient::approve(self, request_id).await
    }

    async fn dismiss(&self, request_id: &str) -> Result<ActionResponse, ChannelError> {
        ControlClient::dismiss(self, request_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    Accept,
    Ignore,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub poll_interval: Duration,
    /// How long the approved confirmation stays up before going idle.
    pub approved_linger: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            approved_linger: DEFAULT_APPROVED_LINGER,
        }
    }
}

/// Presentation side of the agent: observe views, send commands.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    view: watch::Receiver<AgentView>,
    commands: mpsc::Sender<AgentCommand>,
}

impl AgentHandle {
    pub fn view(&self) -> AgentView {
        self.view.borrow().clone()
    }

    /// Wait for the next view change. Returns `None` once the agent stops.
    pub async fn changed(&mut self) -> Option<AgentView> {
        self.view.changed().await.ok()?;
        Some(self.view.borrow_and_update().clone())
    }

    /// Returns `false` if the agent has stopped.
    pub async fn send(&self, command: AgentCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }
}

pub struct ApprovalAgent {
    api: Arc<dyn ControlApi>,
    config: AgentConfig,
    view: watch::Sender<AgentView>,
    commands: mpsc::Receiver<AgentCommand>,
}

impl ApprovalAgent {
    pub fn new(api: Arc<dyn ControlApi>, config: AgentConfig) -> (Self, AgentHandle) {
        let (view_tx, view_rx) = watch::channel(AgentView::Idle);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let agent = Self {
            api,
            config,
            view: view_tx,
            commands: cmd_rx,
        };
        let handle = AgentHandle {
            view: view_rx,
            commands: cmd_tx,
        };
        (agent, handle)
    }

    /// Run until `shutdown` resolves or every handle is dropped.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut idle_at: Option<Instant> = None;

        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Approval agent started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.poll().await,
                command = self.commands.recv() => match command {
                    Some(AgentCommand::Accept) => {
                        if self.accept().await {
                            idle_at = Some(Instant::now() + self.config.approved_linger);
                        }
                    }
                    Some(AgentCommand::Ignore) => self.ignore().await,
                    None => break,
                },
                _ = async {
                    if let Some(at) = idle_at {
                        tokio::time::sleep_until(at).await;
                    }
                }, if idle_at.is_some() => {
                    idle_at = None;
                    self.publish(AgentView::Idle);
                    self.poll().await;
                }
            }
        }

        tracing::info!("Approval agent stopped");
    }

    fn current(&self) -> AgentView {
        self.view.borrow().clone()
    }

    fn publish(&self, view: AgentView) {
        self.view.send_replace(view);
    }

    async fn poll(&self) {
        let requests = match self.api.list_requests().await {
            Ok(requests) => requests,
            Err(e) => {
                tracing::debug!("Pairing poll failed: {}", e);
                Vec::new()
            }
        };
        if let Some(next) = reconcile(&self.current(), &requests) {
            if let AgentView::Prompt { request, .. } = &next {
                tracing::info!(
                    request_id = %request.request_id,
                    client_ip = request.client_ip.as_deref().unwrap_or("unknown"),
                    "Pairing request awaiting operator"
                );
            }
            self.publish(next);
        }
    }

    /// Returns `true` when the approval went through.
    async fn accept(&self) -> bool {
        let AgentView::Prompt { request, .. } = self.current() else {
            return false;
        };
        let request_id = request.request_id.clone();
        self.publish(AgentView::Approving {
            request: request.clone(),
        });

        match self.api.approve(&request_id).await {
            Ok(response) if response.ok && response.status == PairingStatus::Approved => {
                tracing::info!(%request_id, "Flake approved");
                self.publish(AgentView::Approved { request });
                true
            }
            Ok(response) => {
                tracing::warn!(%request_id, status = %response.status, "Flake approval not confirmed");
                self.fail(request);
                false
            }
            Err(e) => {
                tracing::warn!(%request_id, "Flake approval failed: {}", e);
                self.fail(request);
                false
            }
        }
    }

    fn fail(&self, request: PairingSummary) {
        self.publish(AgentView::Prompt {
            request,
            notice: Some(FAILED_NOTICE.to_string()),
        });
    }

    async fn ignore(&self) {
        let AgentView::Prompt { request, .. } = self.current() else {
            return;
        };
        if let Err(e) = self.api.dismiss(&request.request_id).await {
            tracing::warn!(request_id = %request.request_id, "Dismiss failed: {}", e);
        }
        self.publish(AgentView::Idle);
    }
}
