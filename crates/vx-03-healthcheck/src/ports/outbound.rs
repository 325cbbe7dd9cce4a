//! Outbound ports (SPI) for the health-check subsystem.

use crate::domain::{HealthCheckError, HealthCheckKey, HealthDecision};
use crate::events::PeerDeclarationRequest;
use async_trait::async_trait;
use shared_types::PeerId;
use std::collections::BTreeMap;

/// The pluggable outcome policy for a finished round.
///
/// The upstream policy is deliberately not baked in: implementations decide
/// how own and received statuses combine into a decision.
pub trait HealthOutcomeDriver<S>: Send + Sync {
    /// Resolve a decision from the proposals of the round's current
    /// participant set.
    fn calculate_consensus_outcome(
        &self,
        key: &HealthCheckKey,
        own_status: &S,
        self_id: &PeerId,
        received: &BTreeMap<PeerId, S>,
    ) -> HealthDecision<S>;
}

/// Transport for the peer-declaration RPC.
#[async_trait]
pub trait HealthCheckTransport<S>: Send + Sync {
    /// Send our declaration to a participant; returns its status for the
    /// matched round, if it has one.
    async fn send_peer_declaration(
        &self,
        peer: &PeerId,
        request: PeerDeclarationRequest<S>,
    ) -> Result<Option<S>, HealthCheckError>;
}
