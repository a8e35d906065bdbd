//! Probe format, probe validation, and the client-side probe.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;

use crate::discovery::MAX_DATAGRAM;
use crate::error::DiscoveryError;
use crate::identity::Identity;

pub const PROBE_TYPE: &str = "ice.discover";
pub const PROTOCOL_VERSION: u32 = 1;

/// Discovery request datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryProbe {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: u32,
}

impl Default for DiscoveryProbe {
    fn default() -> Self {
        Self {
            kind: PROBE_TYPE.to_string(),
            version: PROTOCOL_VERSION,
        }
    }
}

/// Which datagrams the responder answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Answer every datagram (wire-compatible with existing preboots).
    #[default]
    Any,
    /// Answer only well-formed probes of a supported version.
    Strict,
}

impl ProbePolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Any }
    }

    pub fn accepts(&self, datagram: &[u8]) -> bool {
        match self {
            Self::Any => true,
            Self::Strict => serde_json::from_slice::<DiscoveryProbe>(datagram)
                .map(|p| p.kind == PROBE_TYPE && (1..=PROTOCOL_VERSION).contains(&p.version))
                .unwrap_or(false),
        }
    }
}

/// A host that answered a probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredHost {
    pub addr: SocketAddr,
    pub identity: Identity,
}

/// Send one probe to `target` (a unicast or broadcast address) and collect
/// every identity reply received within `wait`.
pub async fn probe(target: SocketAddr, wait: Duration) -> Result<Vec<DiscoveredHost>, DiscoveryError> {
    let bind = if target.is_ipv6() {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    };

    let socket = UdpSocket::bind(bind)
        .await
        .map_err(|source| DiscoveryError::Bind { addr: bind, source })?;
    socket.set_broadcast(true).map_err(DiscoveryError::Probe)?;

    let datagram = serde_json::to_vec(&DiscoveryProbe::default())?;
    socket
        .send_to(&datagram, target)
        .await
        .map_err(DiscoveryError::Probe)?;

    let deadline = tokio::time::Instant::now() + wait;
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut hosts: Vec<DiscoveredHost> = Vec::new();

    loop {
        let received = match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
            Err(_) => break,
            Ok(received) => received,
        };
        let (len, addr) = match received {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "Discovery probe receive failed");
                continue;
            }
        };

        match serde_json::from_slice::<Identity>(&buf[..len]) {
            Ok(identity) => {
                if !hosts.iter().any(|h| h.addr == addr) {
                    hosts.push(DiscoveredHost { addr, identity });
                }
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "Ignoring non-identity discovery reply");
            }
        }
    }

    Ok(hosts)
}
