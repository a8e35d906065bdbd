//! Host-side pairing control plane for ICE flakes.
//!
//! A host answers LAN discovery probes with its identity, accepts pairing
//! requests from preboot agents, holds them until an operator decides, and
//! calls back into the preboot agent to confirm approvals.

pub mod approval;
pub mod channels;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod pairing;

pub use config::DaemonConfig;
pub use daemon::Daemon;
pub use error::{Error, Result};
