//! murmur-gossip — peer bookkeeping for the gossip pub/sub overlay.
//!
//! The dissemination engine registers a [`PeerRecord`] per connected peer,
//! mutates it as subscriptions change, and asks the [`PeerRegistry`] which
//! peers should receive each message.

pub mod outbound;
pub mod peer;
pub mod registry;
pub mod sampler;

pub use outbound::{MessageBuilder, MessageId, OutboundItem};
pub use peer::{PeerHandle, PeerRecord};
pub use registry::PeerRegistry;
pub use sampler::UniformRandom;
