//! Cluster membership as seen by the consensus subsystem.
//!
//! Peer lifecycle, handshakes, and liveness live outside this crate; all the
//! consensus engine needs is each peer's phase for facilitator eligibility.

use serde::{Deserialize, Serialize};
use shared_types::PeerId;

/// Lifecycle phase of a node in the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerPhase {
    /// Observing rounds, not yet eligible to facilitate.
    Observing,
    /// Fully caught up and eligible to facilitate.
    Ready,
    /// Participating in an in-flight round.
    InConsensus,
    /// Announced departure; releases facilitator slots.
    Leaving,
}

/// A peer plus its current phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterPeer {
    pub id: PeerId,
    pub phase: PeerPhase,
}

impl ClusterPeer {
    pub fn new(id: PeerId, phase: PeerPhase) -> Self {
        Self { id, phase }
    }
}
