//! Peer and topic identities.
//!
//! A `PeerId` is an opaque byte string. Its derived ordering (lexicographic
//! over the bytes) is the total order every keyed collection in Murmur uses.
//! A `TopicId` is the name of a pub/sub channel and is only ever compared
//! for equality or used as a set element.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Domain tag mixed into public-key derived peer ids.
const PEER_ID_DOMAIN: &[u8] = b"murmur.peer_id.v1";

// ── PeerId ────────────────────────────────────────────────────────────────────

/// Opaque, totally ordered identity of a remote peer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    /// Wrap raw identity bytes. Fails on an empty byte string.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, IdError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(bytes))
    }

    /// Derive a peer id from an Ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(PEER_ID_DOMAIN);
        hasher.update(public_key);
        Self(hasher.finalize().as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// First 8 hex characters, for log lines.
    pub fn short(&self) -> String {
        let hex = self.to_hex();
        hex[..8.min(hex.len())].to_string()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.short())
    }
}

impl FromStr for PeerId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(IdError::InvalidHex)?;
        Self::from_bytes(bytes)
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ── TopicId ───────────────────────────────────────────────────────────────────

/// Name of a pub/sub topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TopicId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for TopicId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("peer id must not be empty")]
    Empty,
    #[error("peer id is not valid hex: {0}")]
    InvalidHex(hex::FromHexError),
}
