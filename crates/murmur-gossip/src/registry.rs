//! Peer registry — the set of peers the gossip engine knows about.
//!
//! Keyed on `PeerId`, iterated in key order. The engine mutates it on
//! connect, disconnect, and prune, and queries it on every dissemination
//! decision. Removing an entry only unregisters it: handles held by
//! connection handlers stay valid until they are dropped.
//!
//! Driven from a single event loop. There is no internal locking; a
//! registry shared across threads needs an outer lock.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use murmur_core::{PeerId, TopicId};

use crate::peer::{PeerHandle, PeerRecord};
use crate::sampler::{self, UniformRandom};

/// Registered peers, at most one record per peer id.
///
/// Cloning is shallow: both registries reference the same records.
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    peers: BTreeMap<PeerId, PeerHandle>,

    /// Key sequence for random sampling. Built on demand, dropped on every
    /// insert or erase.
    peer_ids: OnceLock<Vec<PeerId>>,
}

impl PeerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a peer by id.
    pub fn find(&self, id: &PeerId) -> Option<PeerHandle> {
        self.peers.get(id).cloned()
    }

    /// Is a peer with this id registered?
    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Register a record. Returns false, leaving the registry unchanged, if
    /// a record with the same peer id is already registered.
    pub fn insert(&mut self, peer: PeerHandle) -> bool {
        if self.peers.contains_key(peer.peer_id()) {
            tracing::debug!(peer = %peer.peer_id().short(), "peer already registered");
            return false;
        }
        tracing::debug!(peer = %peer.peer_id().short(), "peer registered");
        self.peers.insert(peer.peer_id().clone(), peer);
        self.peer_ids.take();
        true
    }

    /// Unregister a peer. Returns false if it was not registered.
    pub fn erase(&mut self, id: &PeerId) -> bool {
        if self.peers.remove(id).is_none() {
            return false;
        }
        tracing::debug!(peer = %id.short(), "peer unregistered");
        self.peer_ids.take();
        true
    }

    /// Unregister every peer at once.
    pub fn clear(&mut self) {
        if !self.peers.is_empty() {
            tracing::debug!(count = self.peers.len(), "peer registry cleared");
        }
        self.peers = BTreeMap::new();
        self.peer_ids.take();
    }

    /// True iff no peers are registered.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Snapshot of registered ids in key order.
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.keys().cloned().collect()
    }

    /// Visit every registered peer once, in key order.
    ///
    /// The registry is borrowed for the whole walk, so `visit` cannot insert
    /// or erase. Collect handles first and mutate afterwards.
    pub fn select_all<V>(&self, mut visit: V)
    where
        V: FnMut(&PeerHandle),
    {
        for peer in self.peers.values() {
            visit(peer);
        }
    }

    /// Visit every registered peer for which `predicate` holds, in key order.
    pub fn select_if<V, P>(&self, mut visit: V, mut predicate: P)
    where
        V: FnMut(&PeerHandle),
        P: FnMut(&PeerRecord) -> bool,
    {
        self.select_all(|peer| {
            if predicate(peer.as_ref()) {
                visit(peer);
            }
        });
    }

    /// Up to `n` distinct peers chosen uniformly at random.
    ///
    /// `n == 0` yields nothing. `n >= len()` yields every peer without
    /// consuming randomness.
    pub fn select_random_peers<R>(&self, n: usize, rng: &mut R) -> Vec<PeerHandle>
    where
        R: UniformRandom + ?Sized,
    {
        if n == 0 || self.peers.is_empty() {
            return Vec::new();
        }
        if n >= self.peers.len() {
            return self.peers.values().cloned().collect();
        }

        let ids = self
            .peer_ids
            .get_or_init(|| self.peers.keys().cloned().collect());
        let picked: Vec<PeerHandle> = sampler::sample(ids.as_slice(), n, rng)
            .into_iter()
            .filter_map(|id| self.find(id))
            .collect();
        tracing::trace!(requested = n, of = ids.len(), "sampled peers");
        picked
    }

    /// Remove every peer for which `predicate` holds. Returns how many
    /// were removed.
    ///
    /// Matches are collected before anything is removed. When every peer
    /// matches the registry is cleared in one step instead of entry by entry.
    pub fn erase_if<P>(&mut self, predicate: P) -> usize
    where
        P: FnMut(&PeerRecord) -> bool,
    {
        let mut matched: Vec<PeerId> = Vec::new();
        self.select_if(|peer| matched.push(peer.peer_id().clone()), predicate);

        if matched.is_empty() {
            return 0;
        }
        if matched.len() == self.peers.len() {
            self.clear();
        } else {
            for id in &matched {
                self.peers.remove(id);
            }
            self.peer_ids.take();
            tracing::debug!(count = matched.len(), remaining = self.peers.len(), "peers pruned");
        }
        matched.len()
    }

    // ── Engine conveniences ───────────────────────────────────────────────

    /// Peers subscribed to `topic`, in key order.
    pub fn subscribers(&self, topic: &TopicId) -> Vec<PeerHandle> {
        let mut out = Vec::new();
        self.select_if(|peer| out.push(Arc::clone(peer)), |peer| peer.is_subscribed(topic));
        out
    }

    /// Peers with a known dial address, in key order.
    pub fn dialable_peers(&self) -> Vec<PeerHandle> {
        let mut out = Vec::new();
        self.select_if(|peer| out.push(Arc::clone(peer)), PeerRecord::is_dialable);
        out
    }
}
