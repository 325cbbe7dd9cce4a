//! Inbound ports (API) for the consensus subsystem.

use crate::domain::EpochKey;
use async_trait::async_trait;
use shared_types::PeerId;

/// Receiver side of the registration exchange RPC, invoked by the transport
/// layer when a peer initiates.
#[async_trait]
pub trait RegistrationApi<K: EpochKey>: Send + Sync {
    /// Record the initiator's registration (when present) and return our
    /// own.
    async fn handle_registration_exchange(&self, peer: PeerId, maybe_key: Option<K>) -> Option<K>;
}
