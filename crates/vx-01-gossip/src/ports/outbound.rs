//! Outbound ports (SPI) for the gossip subsystem.

use crate::domain::GossipResult;
use crate::events::{
    EndGossipRoundRequest, EndGossipRoundResponse, StartGossipRoundRequest,
    StartGossipRoundResponse,
};
use async_trait::async_trait;
use shared_types::{Hash, PeerId, SignedRumor};

/// Transport for gossip round RPCs.
///
/// Implementations own per-peer timeouts; a timeout surfaces as an `Err`
/// and fails only that peer's round.
#[async_trait]
pub trait GossipTransport: Send + Sync {
    /// Execute the `start` exchange with a peer.
    async fn start_round(
        &self,
        peer: &PeerId,
        request: StartGossipRoundRequest,
    ) -> GossipResult<StartGossipRoundResponse>;

    /// Execute the `end` exchange with a peer.
    async fn end_round(
        &self,
        peer: &PeerId,
        request: EndGossipRoundRequest,
    ) -> GossipResult<EndGossipRoundResponse>;
}

/// Supplies the current peer set for fanout selection.
pub trait PeerProvider: Send + Sync {
    /// Peers currently eligible for gossip; may include our own id, which
    /// the daemon filters out.
    fn current_peers(&self) -> Vec<PeerId>;
}

/// Routes a validated rumor to the subsystem that owns its tag.
#[async_trait]
pub trait RumorRouter: Send + Sync {
    /// Handle one validated rumor. `None` means no subsystem claimed the
    /// tag; the daemon logs a warning and moves on.
    async fn route(&self, hash: Hash, rumor: SignedRumor) -> Option<()>;
}
