//! P2P message types for gossip rounds.
//!
//! One round is two request/response exchanges: `start` trades hash offers,
//! `end` trades content. The transport binding (HTTP POST in the reference
//! deployment) lives outside this crate.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, RumorBatch};

/// Opens a round: the initiator advertises its active hashes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StartGossipRoundRequest {
    /// Hashes the initiator is currently advertising.
    pub offer: Vec<Hash>,
}

/// Reply to `start`: the responder's own offer plus what it wants.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StartGossipRoundResponse {
    /// Hashes the responder is currently advertising.
    pub offer: Vec<Hash>,
    /// Subset of the initiator's offer the responder has not seen.
    pub inquiry: Vec<Hash>,
}

/// Closes a round: content for the responder's inquiry, plus the
/// initiator's own inquiry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndGossipRoundRequest {
    /// Full content for the hashes the responder asked for.
    pub answer: RumorBatch,
    /// Hashes the initiator wants content for.
    pub inquiry: Vec<Hash>,
}

/// Reply to `end`: content for the initiator's inquiry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EndGossipRoundResponse {
    /// Full content for the initiator's inquiry.
    pub answer: RumorBatch,
}
