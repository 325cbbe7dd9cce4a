//! Health-check rounds between in-process services.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use shared_crypto::Keypair;
    use shared_types::PeerId;
    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::sync::Arc;
    use vx_03_healthcheck::{
        HealthCheckApi, HealthCheckError, HealthCheckKey, HealthCheckService,
        HealthCheckTransport, HealthDecision, HealthOutcomeDriver, PeerDeclarationRequest,
    };

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Liveness {
        Up,
        Down,
    }

    /// Strict majority of `Up` wins; even splits stay unresolved.
    struct MajorityDriver;

    impl HealthOutcomeDriver<Liveness> for MajorityDriver {
        fn calculate_consensus_outcome(
            &self,
            _key: &HealthCheckKey,
            _own_status: &Liveness,
            _self_id: &PeerId,
            received: &BTreeMap<PeerId, Liveness>,
        ) -> HealthDecision<Liveness> {
            let up = received.values().filter(|s| **s == Liveness::Up).count();
            if up * 2 > received.len() {
                HealthDecision::Agreed(Liveness::Up)
            } else if up * 2 < received.len() {
                HealthDecision::Agreed(Liveness::Down)
            } else {
                HealthDecision::Unresolved
            }
        }
    }

    type Node = HealthCheckService<Liveness, MajorityDriver, HealthWire>;

    /// Routes peer declarations between registered in-process services.
    #[derive(Default)]
    struct InMemoryHealthNetwork {
        nodes: RwLock<HashMap<PeerId, Arc<Node>>>,
    }

    struct HealthWire {
        network: Arc<InMemoryHealthNetwork>,
        self_id: PeerId,
    }

    #[async_trait]
    impl HealthCheckTransport<Liveness> for HealthWire {
        async fn send_peer_declaration(
            &self,
            peer: &PeerId,
            request: PeerDeclarationRequest<Liveness>,
        ) -> Result<Option<Liveness>, HealthCheckError> {
            let node = self.network.nodes.read().get(peer).cloned().ok_or(
                HealthCheckError::Transport {
                    peer: *peer,
                    reason: "peer unreachable".into(),
                },
            )?;
            Ok(node.handle_peer_declaration(self.self_id, request).await)
        }
    }

    fn node(seed: u8, network: &Arc<InMemoryHealthNetwork>) -> (PeerId, Arc<Node>) {
        let id = Keypair::from_seed([seed; 32]).peer_id();
        let service = Arc::new(HealthCheckService::new(
            id,
            Arc::new(MajorityDriver),
            Arc::new(HealthWire {
                network: Arc::clone(network),
                self_id: id,
            }),
        ));
        network.nodes.write().insert(id, Arc::clone(&service));
        (id, service)
    }

    #[tokio::test]
    async fn test_three_participant_round_agrees_on_liveness() {
        let network = Arc::new(InMemoryHealthNetwork::default());
        let (id_a, a) = node(1, &network);
        let (id_b, b) = node(2, &network);
        let (id_c, c) = node(3, &network);
        let subject = Keypair::from_seed([9; 32]).peer_id();
        let key = HealthCheckKey {
            subject,
            round_id: 1,
        };
        let participants: BTreeSet<PeerId> = [id_a, id_b, id_c].into_iter().collect();

        // Everyone opens the same round; two see the subject up, one down.
        a.start_round(key, Liveness::Up, participants.clone());
        b.start_round(key, Liveness::Up, participants.clone());
        c.start_round(key, Liveness::Down, participants);

        // One broadcast from each side is enough: sending also collects the
        // receiver's status from the response.
        a.broadcast_declarations(&key).await;
        b.broadcast_declarations(&key).await;
        c.broadcast_declarations(&key).await;

        for service in [&a, &b, &c] {
            assert!(service.is_finished(&key));
            assert_eq!(
                service.calculate_outcome(&key),
                Some(HealthDecision::Agreed(Liveness::Up))
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_participant_is_pruned_not_fatal() {
        let network = Arc::new(InMemoryHealthNetwork::default());
        let (id_a, a) = node(1, &network);
        let (id_b, b) = node(2, &network);
        let ghost = Keypair::from_seed([7; 32]).peer_id();
        let subject = Keypair::from_seed([9; 32]).peer_id();
        let key = HealthCheckKey {
            subject,
            round_id: 4,
        };
        let participants: BTreeSet<PeerId> = [id_a, id_b, ghost].into_iter().collect();

        a.start_round(key, Liveness::Down, participants.clone());
        b.start_round(key, Liveness::Down, participants);

        // The ghost never answers; the round stalls until the cluster view
        // confirms it is gone.
        a.broadcast_declarations(&key).await;
        assert!(!a.is_finished(&key));

        let remaining: BTreeSet<PeerId> = [id_a, id_b].into_iter().collect();
        a.manage_peers(&key, &remaining);
        assert!(a.is_finished(&key));
        assert_eq!(
            a.calculate_outcome(&key),
            Some(HealthDecision::Agreed(Liveness::Down))
        );
    }
}
