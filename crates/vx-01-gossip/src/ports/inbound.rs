//! Inbound ports (API) for the gossip subsystem.

use crate::domain::GossipResult;
use crate::events::{
    EndGossipRoundRequest, EndGossipRoundResponse, StartGossipRoundRequest,
    StartGossipRoundResponse,
};
use async_trait::async_trait;
use shared_types::{Hash, PeerId, RumorBatch, SignedRumor};

/// The surface the transport layer and sibling subsystems call into.
#[async_trait]
pub trait GossipApi: Send + Sync {
    /// Receiver side of a round's `start` exchange.
    async fn handle_round_start(
        &self,
        peer: PeerId,
        request: StartGossipRoundRequest,
    ) -> StartGossipRoundResponse;

    /// Receiver side of a round's `end` exchange. The pushed batch is
    /// enqueued for validation; the response carries content for the
    /// initiator's inquiry.
    async fn handle_round_end(
        &self,
        peer: PeerId,
        request: EndGossipRoundRequest,
    ) -> GossipResult<EndGossipRoundResponse>;

    /// Enqueue a batch produced locally or received out of band.
    async fn submit_rumors(&self, batch: RumorBatch) -> GossipResult<()>;

    /// Hash, enqueue, and thereby start disseminating a locally signed
    /// rumor. Returns the hash it will be advertised under.
    async fn submit_signed(&self, rumor: SignedRumor) -> GossipResult<Hash>;
}
