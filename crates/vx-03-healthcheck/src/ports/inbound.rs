//! Inbound ports (API) for the health-check subsystem.

use crate::events::PeerDeclarationRequest;
use async_trait::async_trait;
use shared_types::PeerId;

/// Receiver side of the peer-declaration RPC.
#[async_trait]
pub trait HealthCheckApi<S>: Send + Sync {
    /// Record the sender's declaration against the matching round and
    /// return our own status for it, when we have one.
    async fn handle_peer_declaration(
        &self,
        peer: PeerId,
        request: PeerDeclarationRequest<S>,
    ) -> Option<S>;
}
