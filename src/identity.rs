//! Local node identity.
//!
//! The identity document is produced by an external identity provider; this
//! crate only loads it, checks the role, and serializes it verbatim into
//! discovery replies and health responses.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// Role a node plays in the pairing protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Host,
    Flake,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Host => write!(f, "host"),
            NodeRole::Flake => write!(f, "flake"),
        }
    }
}

/// Identity document of this node.
///
/// Only `role` is interpreted. Every other attribute is opaque and
/// round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub role: NodeRole,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// Build an identity with the given role and no extra attributes.
    pub fn new(role: NodeRole) -> Self {
        Self {
            role,
            attributes: serde_json::Map::new(),
        }
    }

    /// Builder: attach an opaque attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Serialized form sent over the wire.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Source of the local identity document.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Load the current identity. Called once at startup and on every
    /// health check.
    async fn load(&self) -> Result<Identity, IdentityError>;
}

/// Reads the identity from a JSON file written by the identity provider.
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    path: PathBuf,
    expected_role: NodeRole,
}

impl FileIdentityProvider {
    pub fn new(path: impl Into<PathBuf>, expected_role: NodeRole) -> Self {
        Self {
            path: path.into(),
            expected_role,
        }
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityProvider {
    async fn load(&self) -> Result<Identity, IdentityError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IdentityError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(IdentityError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let identity: Identity = serde_json::from_slice(&raw)?;
        if identity.role != self.expected_role {
            return Err(IdentityError::RoleMismatch {
                expected: self.expected_role.to_string(),
                found: identity.role.to_string(),
            });
        }
        Ok(identity)
    }
}

/// Fixed in-memory identity, for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    identity: Identity,
}

impl StaticIdentityProvider {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn load(&self) -> Result<Identity, IdentityError> {
        Ok(self.identity.clone())
    }
}
