//! Peer record — what the gossip layer knows about one remote peer.
//!
//! Records are shared. The registry holds one handle and connection
//! handlers hold others, so a record outlives its registry entry for as
//! long as anyone still references it. Identity is the allocation: two
//! records with the same fields are still different records.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use multiaddr::Multiaddr;
use murmur_core::{PeerId, TopicId};

use crate::outbound::MessageBuilder;

/// Shared handle to a peer record. Cloning takes another reference.
pub type PeerHandle = Arc<PeerRecord>;

/// State tracked for one remote peer.
///
/// `peer_id` is fixed at construction. The remaining fields are mutated in
/// place by whichever subsystem holds a handle, and every holder sees the
/// change. The per-field mutexes make that sound across threads; callers
/// that need several fields to change together must coordinate themselves.
pub struct PeerRecord {
    peer_id: PeerId,

    /// Topics this peer is subscribed to.
    subscribed_topics: Mutex<BTreeSet<TopicId>>,

    /// Frame being built for this peer, if anything is queued.
    pending_outbound: Mutex<Option<MessageBuilder>>,

    /// Set iff the peer can be dialed. Absent means it is only reachable
    /// over a connection it opened to us.
    dial_address: Mutex<Option<Multiaddr>>,
}

/// Guarded data here has no cross-field invariant a panic could break.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Non-blocking view of a guarded field, for `Debug`.
enum Peek<R> {
    Value(R),
    Locked,
}

fn peek<T, R>(mutex: &Mutex<T>, view: impl FnOnce(&T) -> R) -> Peek<R> {
    match mutex.try_lock() {
        Ok(guard) => Peek::Value(view(&*guard)),
        Err(TryLockError::Poisoned(poisoned)) => Peek::Value(view(&*poisoned.into_inner())),
        Err(TryLockError::WouldBlock) => Peek::Locked,
    }
}

impl<R: fmt::Debug> fmt::Debug for Peek<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Peek::Value(value) => value.fmt(f),
            Peek::Locked => f.write_str("<locked>"),
        }
    }
}

impl PeerRecord {
    /// Create a record with no subscriptions, nothing queued, and no dial address.
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            subscribed_topics: Mutex::new(BTreeSet::new()),
            pending_outbound: Mutex::new(None),
            dial_address: Mutex::new(None),
        }
    }

    /// Build a record that is dialable at `addr`.
    pub fn with_dial_address(self, addr: Multiaddr) -> Self {
        *lock(&self.dial_address) = Some(addr);
        self
    }

    /// Wrap in a shared handle, ready for `PeerRegistry::insert`.
    pub fn into_handle(self) -> PeerHandle {
        Arc::new(self)
    }

    /// The identity this record was created with. Never changes.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    // ── Subscriptions ─────────────────────────────────────────────────────

    /// Direct access to the subscription set. Do not hold the guard across
    /// calls back into this record.
    pub fn subscriptions(&self) -> MutexGuard<'_, BTreeSet<TopicId>> {
        lock(&self.subscribed_topics)
    }

    /// Returns false if already subscribed.
    pub fn subscribe(&self, topic: TopicId) -> bool {
        lock(&self.subscribed_topics).insert(topic)
    }

    /// Returns false if not subscribed.
    pub fn unsubscribe(&self, topic: &TopicId) -> bool {
        lock(&self.subscribed_topics).remove(topic)
    }

    /// Is this peer subscribed to `topic`?
    pub fn is_subscribed(&self, topic: &TopicId) -> bool {
        lock(&self.subscribed_topics).contains(topic)
    }

    /// Snapshot of subscribed topics, in topic order.
    pub fn topics(&self) -> Vec<TopicId> {
        lock(&self.subscribed_topics).iter().cloned().collect()
    }

    // ── Pending outbound ──────────────────────────────────────────────────

    /// Direct access to the pending outbound slot. Same guard rules as
    /// `subscriptions`.
    pub fn outbound(&self) -> MutexGuard<'_, Option<MessageBuilder>> {
        lock(&self.pending_outbound)
    }

    /// Install a builder, returning the one it replaces.
    pub fn attach_outbound(&self, builder: MessageBuilder) -> Option<MessageBuilder> {
        lock(&self.pending_outbound).replace(builder)
    }

    /// Detach the pending builder for flushing.
    pub fn take_outbound(&self) -> Option<MessageBuilder> {
        lock(&self.pending_outbound).take()
    }

    /// Run `f` on the pending builder, creating an empty one if none is queued.
    pub fn with_outbound<R>(&self, f: impl FnOnce(&mut MessageBuilder) -> R) -> R {
        let mut slot = lock(&self.pending_outbound);
        f(slot.get_or_insert_with(MessageBuilder::new))
    }

    /// Is a non-empty builder queued?
    pub fn has_pending_outbound(&self) -> bool {
        lock(&self.pending_outbound)
            .as_ref()
            .map(|b| !b.is_empty())
            .unwrap_or(false)
    }

    // ── Dial address ──────────────────────────────────────────────────────

    /// Current dial address, if the peer is dialable.
    pub fn dial_address(&self) -> Option<Multiaddr> {
        lock(&self.dial_address).clone()
    }

    /// Set the dial address, returning the previous one.
    pub fn set_dial_address(&self, addr: Multiaddr) -> Option<Multiaddr> {
        lock(&self.dial_address).replace(addr)
    }

    /// Mark the peer as reachable only over its own connection. Returns the
    /// address it had.
    pub fn clear_dial_address(&self) -> Option<Multiaddr> {
        lock(&self.dial_address).take()
    }

    /// Does this peer have a dial address?
    pub fn is_dialable(&self) -> bool {
        lock(&self.dial_address).is_some()
    }
}

impl fmt::Debug for PeerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerRecord")
            .field("peer_id", &self.peer_id)
            .field("subscribed_topics", &peek(&self.subscribed_topics, BTreeSet::clone))
            .field(
                "pending_outbound",
                &peek(&self.pending_outbound, |b| b.as_ref().map(MessageBuilder::len)),
            )
            .field("dial_address", &peek(&self.dial_address, Option::clone))
            .finish()
    }
}

// Comparison against a bare key only. Records are never compared with each
// other by value; use `Arc::ptr_eq` on handles for identity.

impl PartialEq<PeerId> for PeerRecord {
    fn eq(&self, other: &PeerId) -> bool {
        self.peer_id == *other
    }
}

impl PartialOrd<PeerId> for PeerRecord {
    fn partial_cmp(&self, other: &PeerId) -> Option<Ordering> {
        Some(self.peer_id.cmp(other))
    }
}
