//! JSON bodies of the control API, shared by server and client.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::pairing::{PairingRequest, PairingStatus, PairingSummary};

/// `POST /pairing` body. All fields optional so that validation, not
/// deserialization, decides what is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyBody {
    pub host_id: Option<String>,
    pub request_id: Option<String>,
    pub client_ip: Option<String>,
    pub message: Option<String>,
}

/// `POST /pairing/approve` and `POST /pairing/dismiss` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestIdBody {
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusQuery {
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: i64,
    pub identity: Identity,
}

/// Reply to notify, approve and dismiss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub ok: bool,
    pub request_id: String,
    pub status: PairingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub request_id: String,
    pub status: PairingStatus,
    pub host_id: String,
    pub client_ip: Option<String>,
    pub message: String,
}

impl From<PairingRequest> for StatusResponse {
    fn from(request: PairingRequest) -> Self {
        Self {
            request_id: request.request_id,
            status: request.status,
            host_id: request.host_id,
            client_ip: request.client_ip,
            message: request.message,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestsResponse {
    pub requests: Vec<PairingSummary>,
}

/// `GET /discovery`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryStatus {
    pub enabled: bool,
    pub addr: Option<SocketAddr>,
    pub strict: bool,
}

/// Error body as sent by the server. Only `error` is always present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}
