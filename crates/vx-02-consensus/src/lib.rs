//! # VX-02 Consensus - Epoch Consensus Subsystem
//!
//! **Subsystem ID:** 2
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Drives a quorum of facilitators to agreement on the next signed artifact
//! extending the ledger, one epoch key at a time. Rounds are started by time
//! or event triggers, advance through a monotone status ladder as peer
//! declarations arrive over gossip, and finish when the majority artifact is
//! fully counter-signed and consumed.
//!
//! ## Status Ladder
//!
//! ```text
//! Facilitated → ProposalMade → MajoritySelected → MajoritySigned → Finished
//! ```
//!
//! | Step | Trigger | Emits |
//! |------|---------|-------|
//! | Facilitated | round start | facility rumor (own upper bound) |
//! | ProposalMade | all bounds declared | proposal + candidate artifact rumors |
//! | MajoritySelected | all proposals declared | majority signature rumor |
//! | MajoritySigned | all signatures + artifact | fully signed artifact rumor |
//! | Finished | consumption acknowledged | - |
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Per-key state transitions are serialized | `storage.rs` `cond_modify_state` |
//! | INVARIANT-2 | A declaration field, once set, never changes | `domain/resources.rs` `merge_from` |
//! | INVARIANT-3 | The status ladder never regresses | `service.rs` rank-guarded CAS |
//! | INVARIANT-4 | Majority selection is deterministic (ties to smallest hash) | `domain/resources.rs` `select_majority` |
//! | INVARIANT-5 | Last key advances only from the expected predecessor | `storage.rs` CAS + cleanup |
//!
//! ## Outbound Dependencies
//!
//! | Concern | Trait | Purpose |
//! |---------|-------|---------|
//! | Ledger | `ConsensusFunctions` | Build proposal artifacts, consume signed majorities |
//! | Gossip | `GossipPublisher` | Emit declaration rumors |
//! | Cluster | `ClusterView` | Peer phases for facilitator selection |
//! | Transport | `RegistrationTransport` | Registration exchange RPC |

pub mod adapters;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod storage;

// Re-export main types
pub use adapters::ConsensusRumorRouter;
pub use domain::{
    select_majority, Artifact, Bound, BufferedEvent, ClusterPeer, ConsensusConfig, ConsensusError,
    ConsensusEvent, ConsensusResources, ConsensusResult, ConsensusState, ConsensusStatus,
    ConsensusTrigger, EpochKey, PeerDeclaration, PeerPhase,
};
pub use ports::{ClusterView, ConsensusFunctions, GossipPublisher, RegistrationTransport};
pub use service::{ConsensusDependencies, ConsensusManager};
pub use storage::ConsensusStorage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consensus_config_default() {
        let config = ConsensusConfig::default();
        assert_eq!(config.time_trigger_interval.as_secs(), 5);
    }
}
