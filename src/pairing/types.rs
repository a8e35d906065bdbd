//! Pairing request records and their status.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message stored when the notifying peer does not supply one.
pub const DEFAULT_MESSAGE: &str = "Pairing request pending approval";

/// Lifecycle state of a pairing request.
///
/// Only `Pending -> Approved` and `Pending -> Dismissed` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStatus {
    Pending,
    Approved,
    Dismissed,
}

impl PairingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PairingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Dismissed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pairing request as held by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairingRequest {
    pub request_id: String,
    pub host_id: String,
    /// Informational address reported by the flake itself.
    pub client_ip: Option<String>,
    /// Peer address of the notify connection. Approval calls back here.
    pub preboot_ip: Option<IpAddr>,
    pub message: String,
    pub status: PairingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PairingRequest {
    /// Age in whole seconds at `now`, never negative.
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.created_at).num_seconds().max(0) as u64
    }

    pub fn summary(&self, now: DateTime<Utc>) -> PairingSummary {
        PairingSummary {
            request_id: self.request_id.clone(),
            status: self.status,
            host_id: self.host_id.clone(),
            client_ip: self.client_ip.clone(),
            message: self.message.clone(),
            age_sec: self.age_secs(now),
        }
    }
}

/// Input to `PairingRegistry::upsert`.
#[derive(Debug, Clone, Default)]
pub struct PairingNotice {
    pub request_id: String,
    pub host_id: String,
    pub client_ip: Option<String>,
    pub preboot_ip: Option<IpAddr>,
    pub message: Option<String>,
}

/// Listing row with derived age, as served by `GET /pairing/requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSummary {
    pub request_id: String,
    pub status: PairingStatus,
    pub host_id: String,
    pub client_ip: Option<String>,
    pub message: String,
    pub age_sec: u64,
}

/// Result of an approve attempt that reached the preboot callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproveOutcome {
    /// Whether the preboot confirmed the pairing.
    pub confirmed: bool,
    /// Status of the request after the attempt.
    pub status: PairingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use PairingStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Dismissed));

        for from in [Approved, Dismissed] {
            for to in [Pending, Approved, Dismissed] {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
            }
        }
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_value(PairingStatus::Dismissed).unwrap(),
            serde_json::json!("dismissed")
        );
        let parsed: PairingStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, PairingStatus::Approved);
    }

    #[test]
    fn test_age_never_negative() {
        let now = Utc::now();
        let request = PairingRequest {
            request_id: "r".into(),
            host_id: "h".into(),
            client_ip: None,
            preboot_ip: None,
            message: DEFAULT_MESSAGE.into(),
            status: PairingStatus::Pending,
            created_at: now + chrono::Duration::seconds(5),
            updated_at: now,
        };
        assert_eq!(request.age_secs(now), 0);
        assert_eq!(request.age_secs(now + chrono::Duration::seconds(65)), 60);
    }
}
