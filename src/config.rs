//! Daemon configuration.
//!
//! Everything is read from `ICE_*` environment variables (optionally loaded
//! from a `.env` file by the binary). Parsing goes through a lookup function
//! so tests never touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONTROL_PORT: u16 = 7030;
pub const DEFAULT_DISCOVERY_PORT: u16 = 7042;
pub const DEFAULT_PREBOOT_PORT: u16 = 7040;
pub const DEFAULT_PREBOOT_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_DISMISSED_RETENTION: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_CONFIRMATIONS: usize = 8;
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:7030";

/// Where and how approvals call back into the flake's preboot agent.
#[derive(Debug, Clone)]
pub struct PrebootConfig {
    /// Fixed base URL (`ICE_PREBOOT_URL`). When unset the callback goes to
    /// the notify peer address on `port`.
    pub base_url: Option<Url>,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for PrebootConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            port: DEFAULT_PREBOOT_PORT,
            timeout: DEFAULT_PREBOOT_TIMEOUT,
        }
    }
}

/// Registry timing and concurrency limits.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Pending requests older than this are dropped from listings.
    pub pending_ttl: Duration,
    /// Dismissed requests are kept this long after dismissal.
    pub dismissed_retention: Duration,
    /// Upper bound on preboot callbacks in flight at once.
    pub max_concurrent_confirmations: usize,
    /// Hard ceiling on a single confirmation, whatever the confirmer does.
    pub confirm_timeout: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            pending_ttl: DEFAULT_PENDING_TTL,
            dismissed_retention: DEFAULT_DISMISSED_RETENTION,
            max_concurrent_confirmations: DEFAULT_MAX_CONFIRMATIONS,
            confirm_timeout: DEFAULT_PREBOOT_TIMEOUT + Duration::from_millis(500),
        }
    }
}

/// UDP discovery settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    pub bind: SocketAddr,
    /// Only answer well-formed, version-compatible probes.
    pub strict: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_DISCOVERY_PORT)),
            strict: false,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "plain" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("expected 'pretty' or 'json', got '{}'", s)),
        }
    }
}

impl LogFormat {
    /// Read `ICE_LOG_FORMAT`. Tracing starts before any command runs, so an
    /// unrecognized value falls back to the default instead of failing.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        get("ICE_LOG_FORMAT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }
}

/// Full configuration of the `serve` command.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub control_bind: SocketAddr,
    pub discovery: DiscoveryConfig,
    pub identity_path: PathBuf,
    pub preboot: PrebootConfig,
    pub pairing: PairingConfig,
    /// Opened with the platform opener when the first request arrives.
    pub surface_url: Option<String>,
}

impl DaemonConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let control_bind = parse_or(&get, "ICE_CONTROL_BIND", || {
            SocketAddr::from(([0, 0, 0, 0], DEFAULT_CONTROL_PORT))
        })?;

        let discovery = DiscoveryConfig {
            enabled: parse_bool_or(&get, "ICE_DISCOVERY_ENABLED", true)?,
            bind: parse_or(&get, "ICE_DISCOVERY_BIND", || {
                SocketAddr::from(([0, 0, 0, 0], DEFAULT_DISCOVERY_PORT))
            })?,
            strict: parse_bool_or(&get, "ICE_DISCOVERY_STRICT", false)?,
        };

        let identity_path = match get("ICE_IDENTITY_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_identity_path(),
        };

        let base_url = match get("ICE_PREBOOT_URL") {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
                key: "ICE_PREBOOT_URL".to_string(),
                message: e.to_string(),
            })?),
            None => None,
        };

        let preboot_timeout = Duration::from_millis(parse_or(&get, "ICE_PREBOOT_TIMEOUT_MS", || {
            DEFAULT_PREBOOT_TIMEOUT.as_millis() as u64
        })?);

        let preboot = PrebootConfig {
            base_url,
            port: parse_or(&get, "ICE_PREBOOT_PORT", || DEFAULT_PREBOOT_PORT)?,
            timeout: preboot_timeout,
        };

        let max_concurrent_confirmations =
            parse_or(&get, "ICE_MAX_CONFIRMATIONS", || DEFAULT_MAX_CONFIRMATIONS)?;
        if max_concurrent_confirmations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ICE_MAX_CONFIRMATIONS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let pairing = PairingConfig {
            pending_ttl: Duration::from_secs(parse_or(&get, "ICE_PAIRING_TTL_SECS", || {
                DEFAULT_PENDING_TTL.as_secs()
            })?),
            dismissed_retention: Duration::from_secs(parse_or(
                &get,
                "ICE_DISMISSED_RETENTION_SECS",
                || DEFAULT_DISMISSED_RETENTION.as_secs(),
            )?),
            max_concurrent_confirmations,
            confirm_timeout: preboot_timeout + Duration::from_millis(500),
        };

        Ok(Self {
            control_bind,
            discovery,
            identity_path,
            preboot,
            pairing,
            surface_url: get("ICE_SURFACE_URL"),
        })
    }
}

/// `~/.ice/identity.json`, or `./.ice/identity.json` without a home directory.
pub fn default_identity_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ice")
        .join("identity.json")
}

fn parse_or<G, T, D>(get: &G, key: &str, default: D) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
    D: FnOnce() -> T,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default()),
    }
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", v),
        }),
    }
}
