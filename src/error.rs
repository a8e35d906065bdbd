//! Error types for icehost.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level error type for the daemon.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Pairing error: {0}")]
    Pairing(#[from] PairingError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while obtaining the local identity document.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity document not found at {path}")]
    NotFound { path: PathBuf },

    #[error("Failed to read identity document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed identity document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Identity role mismatch: expected {expected}, found {found}")]
    RoleMismatch { expected: String, found: String },
}

/// Pairing registry errors.
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    #[error("Unknown pairing request: {request_id}")]
    NotFound { request_id: String },

    #[error("Pairing request {request_id} is already {status}")]
    Closed { request_id: String, status: String },

    #[error("Pairing request {request_id} has no preboot callback address")]
    MissingCallback { request_id: String },
}

/// UDP discovery errors.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Failed to bind discovery socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize identity for discovery: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Discovery probe failed: {0}")]
    Probe(#[source] std::io::Error),
}

/// Control channel (HTTP server and client) errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Daemon responded with {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Result type alias for the daemon.
pub type Result<T> = std::result::Result<T, Error>;
