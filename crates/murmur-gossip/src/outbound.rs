//! Pending outbound state for a single peer.
//!
//! The engine queues subscription changes, published payloads, and
//! IHAVE/IWANT control entries here between flushes. Encoding to the wire
//! happens elsewhere; `finish` hands the queued items over in order.

use bytes::Bytes;
use murmur_core::TopicId;

/// Content hash identifying a published message.
pub type MessageId = [u8; 32];

/// One queued piece of an outbound gossip frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundItem {
    Subscribe(TopicId),
    Unsubscribe(TopicId),
    Publish { topic: TopicId, payload: Bytes },
    /// Message ids we hold and the peer may want.
    IHave(Vec<MessageId>),
    /// Message ids we want the peer to send.
    IWant(Vec<MessageId>),
}

/// Owned accumulator for one peer's next outbound frame.
///
/// Not `Clone`: there is exactly one pending frame per peer.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    items: Vec<OutboundItem>,
    payload_bytes: usize,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a subscription change. A later change for the same topic
    /// replaces any earlier one still queued.
    pub fn add_subscription(&mut self, topic: TopicId, subscribe: bool) {
        self.items.retain(|item| match item {
            OutboundItem::Subscribe(t) | OutboundItem::Unsubscribe(t) => *t != topic,
            _ => true,
        });
        self.items.push(if subscribe {
            OutboundItem::Subscribe(topic)
        } else {
            OutboundItem::Unsubscribe(topic)
        });
    }

    pub fn add_publish(&mut self, topic: TopicId, payload: Bytes) {
        self.payload_bytes += payload.len();
        self.items.push(OutboundItem::Publish { topic, payload });
    }

    pub fn add_ihave(&mut self, ids: Vec<MessageId>) {
        if !ids.is_empty() {
            self.items.push(OutboundItem::IHave(ids));
        }
    }

    pub fn add_iwant(&mut self, ids: Vec<MessageId>) {
        if !ids.is_empty() {
            self.items.push(OutboundItem::IWant(ids));
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total bytes of queued publish payloads.
    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }

    pub fn items(&self) -> &[OutboundItem] {
        &self.items
    }

    /// Consume the builder, yielding queued items in insertion order.
    pub fn finish(self) -> Vec<OutboundItem> {
        self.items
    }
}
