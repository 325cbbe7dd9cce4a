//! Two-node anti-entropy scenarios over the in-memory network.

#[cfg(test)]
mod tests {
    use crate::harness::{build_gossip_node, InMemoryGossipNetwork};
    use shared_crypto::Keypair;
    use shared_types::{content_hash, Hash, Rumor, SignedRumor};
    use std::sync::Arc;
    use std::time::Duration;
    use vx_01_gossip::domain::{check_all_invariants, GossipConfig};
    use vx_01_gossip::ports::GossipApi;

    fn signed_rumor(keypair: &Keypair, ordinal: u64) -> (Hash, SignedRumor) {
        let rumor = Rumor::Peer {
            origin: keypair.peer_id(),
            ordinal,
            tag: "app.payload".into(),
            payload: vec![ordinal as u8],
        };
        let signed = keypair.sign_value(rumor).expect("signable rumor");
        let hash = content_hash(&signed.value).expect("hashable rumor");
        (hash, signed)
    }

    fn fast_config() -> GossipConfig {
        GossipConfig {
            interval: Duration::from_millis(10),
            fanout: 1,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_node_convergence_with_single_dispatch() {
        let network = Arc::new(InMemoryGossipNetwork::default());
        let a = build_gossip_node(1, &network, fast_config());
        let b = build_gossip_node(2, &network, fast_config());
        a.peers.set(vec![b.id]);
        b.peers.set(vec![a.id]);
        a.service.start().unwrap();
        b.service.start().unwrap();

        let origin = Keypair::from_seed([9; 32]);
        let (h1, r1) = signed_rumor(&origin, 0);
        let (h2, r2) = signed_rumor(&origin, 1);
        a.service
            .submit_rumors(vec![(h1, r1), (h2, r2)])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Both rumors reached the second node.
        let storage = b.service.storage();
        assert!(storage.contains_seen(&h1));
        assert!(storage.contains_seen(&h2));

        // Handlers ran exactly once per rumor despite repeated rounds.
        let routed = b.router.routed.lock();
        assert_eq!(routed.iter().filter(|(h, _)| *h == h1).count(), 1);
        assert_eq!(routed.iter().filter(|(h, _)| *h == h2).count(), 1);
        drop(routed);

        assert!(check_all_invariants(&a.service.storage()).is_empty());
        assert!(check_all_invariants(&b.service.storage()).is_empty());

        a.service.shutdown();
        b.service.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pull_direction_backfills_late_joiner() {
        let network = Arc::new(InMemoryGossipNetwork::default());
        let a = build_gossip_node(1, &network, fast_config());
        let b = build_gossip_node(2, &network, fast_config());
        a.service.start().unwrap();
        b.service.start().unwrap();

        // A holds content but knows no peers yet; B joins later.
        let origin = Keypair::from_seed([9; 32]);
        let (h1, r1) = signed_rumor(&origin, 0);
        a.service.submit_rumors(vec![(h1, r1)]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        a.peers.set(vec![b.id]);
        b.peers.set(vec![a.id]);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(b.service.storage().contains_seen(&h1));

        a.service.shutdown();
        b.service.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tampered_rumor_never_crosses_the_wire() {
        let network = Arc::new(InMemoryGossipNetwork::default());
        let a = build_gossip_node(1, &network, fast_config());
        let b = build_gossip_node(2, &network, fast_config());
        a.peers.set(vec![b.id]);
        b.peers.set(vec![a.id]);
        a.service.start().unwrap();
        b.service.start().unwrap();

        let origin = Keypair::from_seed([9; 32]);
        let (h1, r1) = signed_rumor(&origin, 0);
        let (h2, mut r2) = signed_rumor(&origin, 1);
        let (h3, r3) = signed_rumor(&origin, 2);
        if let Rumor::Peer { payload, .. } = &mut r2.value {
            payload[0] = 0xEE;
        }

        a.service
            .submit_rumors(vec![(h1, r1), (h2, r2), (h3, r3)])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The tampered rumor was dropped at A's intake and never stored or
        // forwarded anywhere.
        assert!(!a.service.storage().contains_seen(&h2));
        assert!(b.service.storage().contains_seen(&h1));
        assert!(b.service.storage().contains_seen(&h3));
        assert!(!b.service.storage().contains_seen(&h2));

        a.service.shutdown();
        b.service.shutdown();
    }
}
