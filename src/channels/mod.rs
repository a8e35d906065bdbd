//! Control channel: the HTTP surface of the daemon and its client.
//!
//! ```text
//!  preboot ──POST /pairing──────────┐
//!  approval agent ──GET/POST────────┤
//!                                   ▼
//!                          ┌─────────────────┐
//!                          │  ControlServer  │  axum + tower-http
//!                          │  control routes │
//!                          └────────┬────────┘
//!                                   ▼
//!                           PairingRegistry
//! ```

mod client;
mod control;
mod server;
pub mod types;

pub use client::ControlClient;
pub use control::{ApiError, ControlState, routes};
pub use server::{ControlServer, ControlServerConfig};
