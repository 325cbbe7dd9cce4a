//! Outbound ports (SPI) for the consensus subsystem.

use crate::domain::{Artifact, ClusterPeer, ConsensusError, ConsensusEvent, EpochKey, PeerPhase};
use async_trait::async_trait;
use shared_types::{Hash, PeerId, Signed, SignedRumor};

/// The pluggable ledger boundary: how proposal artifacts are built from
/// events and how finished artifacts are applied.
#[async_trait]
pub trait ConsensusFunctions<K: EpochKey, A: Artifact, E: ConsensusEvent>: Send + Sync {
    /// Build the proposal artifact for the next epoch from the previous
    /// finalized artifact and the pulled events.
    ///
    /// Returns the artifact plus the `(peer, ordinal)` ids of the events it
    /// actually included; the engine re-buffers the rest for later epochs.
    async fn create_proposal_artifact(
        &self,
        last: (K, Option<Signed<A>>),
        events: Vec<(PeerId, u64, E)>,
    ) -> Result<(A, Vec<(PeerId, u64)>), ConsensusError>;

    /// Apply a fully signed majority artifact to the ledger.
    ///
    /// MUST be idempotent: the engine may re-invoke it for the same key
    /// after a race or a retried round.
    async fn consume_signed_majority_artifact(
        &self,
        key: &K,
        artifact: &Signed<A>,
    ) -> Result<(), ConsensusError>;
}

/// Sink for consensus rumors, wired to the gossip subsystem's submission
/// surface.
#[async_trait]
pub trait GossipPublisher: Send + Sync {
    /// Disseminate a signed rumor; returns the hash it is advertised under.
    async fn publish(&self, rumor: SignedRumor) -> Result<Hash, ConsensusError>;
}

/// Cluster membership as maintained by the peer/session layer.
pub trait ClusterView: Send + Sync {
    /// Every known peer with its lifecycle phase.
    fn current_peers(&self) -> Vec<ClusterPeer>;

    /// Our own lifecycle phase.
    fn own_phase(&self) -> PeerPhase;

    /// Advance our own lifecycle phase (Observing -> Ready on first locally
    /// finished round).
    fn set_own_phase(&self, phase: PeerPhase);
}

/// Transport for the registration exchange RPC.
#[async_trait]
pub trait RegistrationTransport<K: EpochKey>: Send + Sync {
    /// Send our registration to a peer; returns the peer's, if any.
    async fn exchange(
        &self,
        peer: &PeerId,
        own_registration: Option<K>,
    ) -> Result<Option<K>, ConsensusError>;
}
