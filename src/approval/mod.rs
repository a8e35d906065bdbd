//! Operator-facing approval: a polling agent that turns pending pairing
//! requests into accept/ignore prompts, plus the hook that brings the UI
//! forward when new work arrives.

mod agent;
mod surface;
mod terminal;
mod view;

pub use agent::{
    AgentCommand, AgentConfig, AgentHandle, ApprovalAgent, ControlApi, DEFAULT_APPROVED_LINGER,
    DEFAULT_POLL_INTERVAL,
};
pub use surface::WorkSurfacer;
pub use terminal::{parse_command, render, run_terminal};
pub use view::{AgentView, FAILED_NOTICE, reconcile};
