//! Distance-routing table contract.
//!
//! The gossip layer keeps its own peer registry; peer discovery keeps a
//! Kademlia-style table keyed by XOR distance. Both see the same connect
//! and disconnect events, so they share a shape: insert-or-refresh, remove,
//! full listing, and size. Only the contract lives here. Bucket layout and
//! eviction belong to the implementation.

use std::fmt;

use crate::id::PeerId;

/// Position of a peer in the 256-bit routing key space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId([u8; 32]);

impl NodeId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Key-space position of a peer: BLAKE3 of its id bytes.
    pub fn from_peer(peer: &PeerId) -> Self {
        Self(*blake3::hash(peer.as_bytes()).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// XOR distance. The result orders as a big-endian integer, so
    /// comparing two distances with `<` picks the closer node.
    pub fn distance(&self, other: &NodeId) -> NodeId {
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }
        NodeId(out)
    }

    /// Number of leading zero bits, i.e. the bucket index of a distance.
    pub fn leading_zeros(&self) -> u32 {
        let mut zeros = 0;
        for byte in &self.0 {
            if *byte == 0 {
                zeros += 8;
            } else {
                zeros += byte.leading_zeros();
                break;
            }
        }
        zeros
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", &hex::encode(self.0)[..8])
    }
}

impl From<&PeerId> for NodeId {
    fn from(peer: &PeerId) -> Self {
        Self::from_peer(peer)
    }
}

/// Operations the gossip engine calls on the discovery routing table.
pub trait RoutingTable {
    /// Insert a peer or refresh its position as recently seen.
    fn update(&mut self, peer: &PeerId) -> Result<(), RoutingError>;

    /// Forget a peer. Absent peers are ignored.
    fn remove(&mut self, peer: &PeerId);

    fn all_peers(&self) -> Vec<PeerId>;

    /// Up to `count` peers ordered by increasing XOR distance to `target`.
    fn nearest_peers(&self, target: &NodeId, count: usize) -> Vec<PeerId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("bucket {bucket} is full ({capacity} entries)")]
    BucketFull { bucket: u32, capacity: usize },
    #[error("the local peer cannot be added to its own routing table")]
    LocalPeer,
}
