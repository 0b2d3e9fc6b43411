//! Drives the registry the way the dissemination engine does: connect,
//! subscribe, publish with bounded fanout, flush, disconnect.

use std::sync::Arc;

use bytes::Bytes;
use multiaddr::Multiaddr;
use murmur_core::config::GossipConfig;
use murmur_core::MurmurConfig;
use murmur_gossip::OutboundItem;
use rand::rngs::StdRng;

use crate::*;

struct Engine {
    peers: PeerRegistry,
    routing: LinearRoutingTable,
    rng: StdRng,
    fanout: usize,
}

impl Engine {
    fn new(config: &MurmurConfig) -> Self {
        Self {
            peers: PeerRegistry::new(),
            routing: LinearRoutingTable::new(&peer_id(0), config.routing.bucket_size),
            rng: config.gossip.rng(),
            fanout: config.gossip.fanout,
        }
    }

    fn on_connected(&mut self, n: u8, dial: Option<Multiaddr>) -> Result<PeerHandle> {
        let mut record = PeerRecord::new(peer_id(n));
        if let Some(addr) = dial {
            record = record.with_dial_address(addr);
        }
        let handle = record.into_handle();
        if !self.peers.insert(Arc::clone(&handle)) {
            bail!("peer {n} connected twice");
        }
        self.routing.update(handle.peer_id())?;
        Ok(handle)
    }

    fn on_subscription(&mut self, id: &PeerId, topic: &str, subscribe: bool) -> bool {
        let Some(peer) = self.peers.find(id) else {
            return false;
        };
        if subscribe {
            peer.subscribe(topic.into())
        } else {
            peer.unsubscribe(&topic.into())
        }
    }

    fn on_disconnected(&mut self, id: &PeerId) -> bool {
        self.routing.remove(id);
        self.peers.erase(id)
    }

    /// Push to up to `fanout` random peers, then to every remaining topic
    /// subscriber. Returns the ids that got the message queued.
    fn publish(&mut self, topic: &str, payload: &'static [u8]) -> BTreeSet<PeerId> {
        let topic = TopicId::from(topic);
        let mut targets = id_set(&self.peers.select_random_peers(self.fanout, &mut self.rng));
        let mut subscribers = Vec::new();
        self.peers
            .select_if(|p| subscribers.push(Arc::clone(p)), |p| p.is_subscribed(&topic));
        targets.extend(id_set(&subscribers));

        for id in &targets {
            if let Some(peer) = self.peers.find(id) {
                peer.with_outbound(|b| b.add_publish(topic.clone(), Bytes::from_static(payload)));
            }
        }
        targets
    }

    /// Drain every pending builder. Returns (peer, items) in key order.
    fn flush(&self) -> Vec<(PeerId, Vec<OutboundItem>)> {
        let mut out = Vec::new();
        self.peers.select_if(
            |p| {
                if let Some(builder) = p.take_outbound() {
                    out.push((p.peer_id().clone(), builder.finish()));
                }
            },
            |p| p.has_pending_outbound(),
        );
        out
    }

    /// Drop peers that are neither dialable nor subscribed to anything.
    fn prune_idle(&mut self) -> usize {
        let idle: Vec<PeerId> = {
            let mut ids = Vec::new();
            self.peers.select_if(
                |p| ids.push(p.peer_id().clone()),
                |p| !p.is_dialable() && p.subscriptions().is_empty(),
            );
            ids
        };
        for id in &idle {
            self.routing.remove(id);
        }
        self.peers
            .erase_if(|p| !p.is_dialable() && p.subscriptions().is_empty())
    }
}

fn seeded_config(fanout: usize) -> MurmurConfig {
    MurmurConfig {
        gossip: GossipConfig {
            fanout,
            random_seed: Some(17),
        },
        ..MurmurConfig::default()
    }
}

#[test]
fn test_engine_connect_subscribe_publish_flush() -> Result<()> {
    init_tracing();
    let mut engine = Engine::new(&seeded_config(2));
    for n in 1..=6 {
        engine.on_connected(n, None)?;
    }
    assert_eq!(engine.peers.len(), 6);
    assert_eq!(engine.routing.len(), 6);

    assert!(engine.on_subscription(&peer_id(1), "blocks", true));
    assert!(engine.on_subscription(&peer_id(4), "blocks", true));
    assert!(!engine.on_subscription(&peer_id(4), "blocks", true));
    assert!(!engine.on_subscription(&peer_id(99), "blocks", true));

    let targets = engine.publish("blocks", b"block-1");
    // Subscribers always, plus fanout picks that may overlap them.
    assert!(targets.contains(&peer_id(1)) && targets.contains(&peer_id(4)));
    assert!(targets.len() >= 2 && targets.len() <= 4);

    let flushed = engine.flush();
    let flushed_ids: BTreeSet<PeerId> = flushed.iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(flushed_ids, targets);
    for (_, items) in &flushed {
        assert_eq!(
            items,
            &vec![OutboundItem::Publish {
                topic: "blocks".into(),
                payload: Bytes::from_static(b"block-1"),
            }]
        );
    }
    assert!(engine.flush().is_empty());
    Ok(())
}

#[test]
fn test_engine_seeded_fanout_is_reproducible() -> Result<()> {
    let mut first = Engine::new(&seeded_config(3));
    let mut second = Engine::new(&seeded_config(3));
    for n in 1..=10 {
        first.on_connected(n, None)?;
        second.on_connected(n, None)?;
    }
    for round in 0..5 {
        let a = first.publish("t", b"x");
        let b = second.publish("t", b"x");
        assert_eq!(a, b, "round {round} diverged");
        assert_eq!(a.len(), 3);
    }
    Ok(())
}

#[test]
fn test_engine_rejects_double_connect() -> Result<()> {
    let mut engine = Engine::new(&seeded_config(2));
    engine.on_connected(1, None)?;
    assert!(engine.on_connected(1, None).is_err());
    assert_eq!(engine.peers.len(), 1);
    assert_eq!(engine.routing.len(), 1);
    Ok(())
}

#[test]
fn test_engine_disconnect_keeps_handler_record() -> Result<()> {
    let mut engine = Engine::new(&seeded_config(2));
    let handler_ref = engine.on_connected(1, None)?;
    engine.on_subscription(&peer_id(1), "t", true);
    engine.publish("t", b"late");

    assert!(engine.on_disconnected(&peer_id(1)));
    assert!(!engine.on_disconnected(&peer_id(1)));
    assert!(engine.routing.is_empty());
    assert!(engine.peers.find(&peer_id(1)).is_none());

    // The stream handler can still drain what was queued before disconnect.
    let builder = handler_ref.take_outbound().expect("queued before disconnect");
    assert_eq!(builder.len(), 1);
    Ok(())
}

#[test]
fn test_engine_prune_idle_keeps_dialable_and_subscribed() -> Result<()> {
    let mut engine = Engine::new(&seeded_config(2));
    let addr: Multiaddr = "/dns4/seed.example.com/tcp/4100".parse()?;
    engine.on_connected(1, Some(addr.clone()))?;
    engine.on_connected(2, None)?;
    engine.on_connected(3, None)?;
    engine.on_subscription(&peer_id(3), "t", true);

    assert_eq!(engine.prune_idle(), 1);
    expect_registered(&engine.peers, &[peer_id(1), peer_id(3)])?;
    assert_eq!(engine.routing.len(), 2);

    let dialable = engine.peers.dialable_peers();
    assert_eq!(dialable.len(), 1);
    assert_eq!(dialable[0].dial_address(), Some(addr));
    Ok(())
}
