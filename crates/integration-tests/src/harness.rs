//! In-memory networks and node assembly for cross-subsystem tests.
//!
//! The wires route RPCs directly between in-process services; per-node
//! state, validation, and scheduling are the real implementations.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_crypto::Keypair;
use shared_types::{Hash, PeerId, Signed, SignedRumor};
use std::collections::HashMap;
use std::sync::Arc;
use vx_01_gossip::domain::{GossipConfig, GossipError, GossipResult};
use vx_01_gossip::events::{
    EndGossipRoundRequest, EndGossipRoundResponse, StartGossipRoundRequest,
    StartGossipRoundResponse,
};
use vx_01_gossip::ports::{GossipApi, GossipTransport, PeerProvider, RumorRouter};
use vx_01_gossip::service::{GossipDependencies, GossipService};
use vx_02_consensus::domain::{ClusterPeer, ConsensusConfig, ConsensusError, PeerPhase};
use vx_02_consensus::ports::RegistrationApi;
use vx_02_consensus::{
    ClusterView, ConsensusDependencies, ConsensusFunctions, ConsensusManager,
    ConsensusRumorRouter, GossipPublisher, RegistrationTransport,
};

////////////////////////////////////////////////////////////////////////////
// Gossip wiring
////////////////////////////////////////////////////////////////////////////

/// Routes gossip round RPCs between registered in-process nodes.
#[derive(Default)]
pub struct InMemoryGossipNetwork {
    nodes: RwLock<HashMap<PeerId, Arc<dyn GossipApi>>>,
}

impl InMemoryGossipNetwork {
    pub fn register(&self, id: PeerId, api: Arc<dyn GossipApi>) {
        self.nodes.write().insert(id, api);
    }

    fn node(&self, id: &PeerId) -> Option<Arc<dyn GossipApi>> {
        self.nodes.read().get(id).cloned()
    }
}

/// One node's view of the gossip network.
pub struct GossipWire {
    pub network: Arc<InMemoryGossipNetwork>,
    pub self_id: PeerId,
}

#[async_trait]
impl GossipTransport for GossipWire {
    async fn start_round(
        &self,
        peer: &PeerId,
        request: StartGossipRoundRequest,
    ) -> GossipResult<StartGossipRoundResponse> {
        let node = self.network.node(peer).ok_or_else(|| GossipError::Transport {
            peer: *peer,
            reason: "peer unreachable".into(),
        })?;
        Ok(node.handle_round_start(self.self_id, request).await)
    }

    async fn end_round(
        &self,
        peer: &PeerId,
        request: EndGossipRoundRequest,
    ) -> GossipResult<EndGossipRoundResponse> {
        let node = self.network.node(peer).ok_or_else(|| GossipError::Transport {
            peer: *peer,
            reason: "peer unreachable".into(),
        })?;
        node.handle_round_end(self.self_id, request).await
    }
}

/// Mutable peer set shared with a gossip daemon.
#[derive(Default)]
pub struct SharedPeers {
    peers: RwLock<Vec<PeerId>>,
}

impl SharedPeers {
    pub fn set(&self, peers: Vec<PeerId>) {
        *self.peers.write() = peers;
    }
}

impl PeerProvider for SharedPeers {
    fn current_peers(&self) -> Vec<PeerId> {
        self.peers.read().clone()
    }
}

/// Records every routed rumor; used where no consensus is wired.
#[derive(Default)]
pub struct RecordingRouter {
    pub routed: Mutex<Vec<(Hash, SignedRumor)>>,
}

#[async_trait]
impl RumorRouter for RecordingRouter {
    async fn route(&self, hash: Hash, rumor: SignedRumor) -> Option<()> {
        self.routed.lock().push((hash, rumor));
        Some(())
    }
}

/// Router bound after construction, breaking the gossip/consensus
/// construction cycle.
#[derive(Default)]
pub struct LateBoundRouter {
    inner: RwLock<Option<Arc<dyn RumorRouter>>>,
}

impl LateBoundRouter {
    pub fn bind(&self, router: Arc<dyn RumorRouter>) {
        *self.inner.write() = Some(router);
    }
}

#[async_trait]
impl RumorRouter for LateBoundRouter {
    async fn route(&self, hash: Hash, rumor: SignedRumor) -> Option<()> {
        let router = { self.inner.read().clone() }?;
        router.route(hash, rumor).await
    }
}

////////////////////////////////////////////////////////////////////////////
// Consensus wiring
////////////////////////////////////////////////////////////////////////////

/// Consensus-to-gossip publication adapter.
pub struct GossipSubmitter {
    pub api: Arc<dyn GossipApi>,
}

#[async_trait]
impl GossipPublisher for GossipSubmitter {
    async fn publish(&self, rumor: SignedRumor) -> Result<Hash, ConsensusError> {
        self.api
            .submit_signed(rumor)
            .await
            .map_err(|e| ConsensusError::Publish(e.to_string()))
    }
}

/// Mutable cluster view shared with a consensus manager.
pub struct SharedCluster {
    peers: RwLock<Vec<ClusterPeer>>,
    own: RwLock<PeerPhase>,
}

impl SharedCluster {
    pub fn new(own: PeerPhase) -> Self {
        Self {
            peers: RwLock::new(Vec::new()),
            own: RwLock::new(own),
        }
    }

    pub fn set_peers(&self, peers: Vec<ClusterPeer>) {
        *self.peers.write() = peers;
    }
}

impl ClusterView for SharedCluster {
    fn current_peers(&self) -> Vec<ClusterPeer> {
        self.peers.read().clone()
    }

    fn own_phase(&self) -> PeerPhase {
        *self.own.read()
    }

    fn set_own_phase(&self, phase: PeerPhase) {
        *self.own.write() = phase;
    }
}

/// Routes registration exchange RPCs between in-process managers.
#[derive(Default)]
pub struct InMemoryRegistrationNetwork {
    nodes: RwLock<HashMap<PeerId, Arc<dyn RegistrationApi<u64>>>>,
}

impl InMemoryRegistrationNetwork {
    pub fn register(&self, id: PeerId, api: Arc<dyn RegistrationApi<u64>>) {
        self.nodes.write().insert(id, api);
    }

    fn node(&self, id: &PeerId) -> Option<Arc<dyn RegistrationApi<u64>>> {
        self.nodes.read().get(id).cloned()
    }
}

/// One node's view of the registration network.
pub struct RegistrationWire {
    pub network: Arc<InMemoryRegistrationNetwork>,
    pub self_id: PeerId,
}

#[async_trait]
impl RegistrationTransport<u64> for RegistrationWire {
    async fn exchange(
        &self,
        peer: &PeerId,
        own_registration: Option<u64>,
    ) -> Result<Option<u64>, ConsensusError> {
        let node = self
            .network
            .node(peer)
            .ok_or_else(|| ConsensusError::Registration {
                peer: *peer,
                reason: "peer unreachable".into(),
            })?;
        Ok(node
            .handle_registration_exchange(self.self_id, own_registration)
            .await)
    }
}

/// Deterministic test ledger: the artifact is the next key byte followed by
/// the event payloads in `(origin, ordinal)` order; every event is consumed.
#[derive(Default)]
pub struct TestLedger {
    pub consumed: Mutex<Vec<(u64, Vec<u8>)>>,
}

#[async_trait]
impl ConsensusFunctions<u64, Vec<u8>, u8> for TestLedger {
    async fn create_proposal_artifact(
        &self,
        last: (u64, Option<Signed<Vec<u8>>>),
        events: Vec<(PeerId, u64, u8)>,
    ) -> Result<(Vec<u8>, Vec<(PeerId, u64)>), ConsensusError> {
        let mut events = events;
        events.sort_by_key(|(peer, ordinal, _)| (*peer, *ordinal));

        let mut artifact = vec![(last.0 as u8).saturating_add(1)];
        let mut consumed = Vec::with_capacity(events.len());
        for (peer, ordinal, event) in events {
            artifact.push(event);
            consumed.push((peer, ordinal));
        }
        Ok((artifact, consumed))
    }

    async fn consume_signed_majority_artifact(
        &self,
        key: &u64,
        artifact: &Signed<Vec<u8>>,
    ) -> Result<(), ConsensusError> {
        let mut consumed = self.consumed.lock();
        // Idempotent: a key applied once stays applied.
        if !consumed.iter().any(|(k, _)| k == key) {
            consumed.push((*key, artifact.value.clone()));
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////
// Node assembly
////////////////////////////////////////////////////////////////////////////

pub type NodeGossip = GossipService<GossipWire, SharedPeers, LateBoundRouter>;
pub type NodeManager = ConsensusManager<
    u64,
    Vec<u8>,
    u8,
    TestLedger,
    GossipSubmitter,
    SharedCluster,
    RegistrationWire,
>;

/// A gossip-only node with a recording router.
pub struct GossipNode {
    pub id: PeerId,
    pub service: Arc<GossipService<GossipWire, SharedPeers, RecordingRouter>>,
    pub peers: Arc<SharedPeers>,
    pub router: Arc<RecordingRouter>,
}

pub fn build_gossip_node(
    seed: u8,
    network: &Arc<InMemoryGossipNetwork>,
    config: GossipConfig,
) -> GossipNode {
    let id = Keypair::from_seed([seed; 32]).peer_id();
    let peers = Arc::new(SharedPeers::default());
    let router = Arc::new(RecordingRouter::default());
    let service = Arc::new(
        GossipService::new(GossipDependencies {
            transport: Arc::new(GossipWire {
                network: Arc::clone(network),
                self_id: id,
            }),
            peers: Arc::clone(&peers),
            router: Arc::clone(&router),
            config,
            self_id: id,
        })
        .expect("valid gossip config"),
    );
    network.register(id, Arc::clone(&service) as Arc<dyn GossipApi>);
    GossipNode {
        id,
        service,
        peers,
        router,
    }
}

/// A node running both the gossip daemon and the consensus manager.
pub struct ConsensusNode {
    pub id: PeerId,
    pub gossip: Arc<NodeGossip>,
    pub manager: Arc<NodeManager>,
    pub cluster: Arc<SharedCluster>,
    pub peers: Arc<SharedPeers>,
    pub ledger: Arc<TestLedger>,
}

pub fn build_consensus_node(
    seed: u8,
    gossip_network: &Arc<InMemoryGossipNetwork>,
    registration_network: &Arc<InMemoryRegistrationNetwork>,
    phase: PeerPhase,
    gossip_config: GossipConfig,
    consensus_config: ConsensusConfig,
) -> ConsensusNode {
    let keypair = Keypair::from_seed([seed; 32]);
    let id = keypair.peer_id();

    let peers = Arc::new(SharedPeers::default());
    let late_router = Arc::new(LateBoundRouter::default());
    let gossip = Arc::new(
        GossipService::new(GossipDependencies {
            transport: Arc::new(GossipWire {
                network: Arc::clone(gossip_network),
                self_id: id,
            }),
            peers: Arc::clone(&peers),
            router: Arc::clone(&late_router),
            config: gossip_config,
            self_id: id,
        })
        .expect("valid gossip config"),
    );
    gossip_network.register(id, Arc::clone(&gossip) as Arc<dyn GossipApi>);

    let cluster = Arc::new(SharedCluster::new(phase));
    let ledger = Arc::new(TestLedger::default());
    let manager = ConsensusManager::new(ConsensusDependencies {
        functions: Arc::clone(&ledger),
        publisher: Arc::new(GossipSubmitter {
            api: Arc::clone(&gossip) as Arc<dyn GossipApi>,
        }),
        cluster: Arc::clone(&cluster),
        registration: Arc::new(RegistrationWire {
            network: Arc::clone(registration_network),
            self_id: id,
        }),
        keypair: Arc::new(keypair),
        config: consensus_config,
    })
    .expect("valid consensus config");
    registration_network.register(id, Arc::clone(&manager) as Arc<dyn RegistrationApi<u64>>);
    late_router.bind(Arc::new(ConsensusRumorRouter::new(Arc::clone(&manager))));

    ConsensusNode {
        id,
        gossip,
        manager,
        cluster,
        peers,
        ledger,
    }
}
