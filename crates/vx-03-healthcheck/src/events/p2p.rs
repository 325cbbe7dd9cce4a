//! P2P message types for health-check rounds.

use crate::domain::RoundId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A participant's liveness declaration for a subject.
///
/// Carries every round id the sender knows for the subject so parallel
/// attempts collapse into one round on receipt. The response is the
/// receiver's own status for the matched round, when it has one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDeclarationRequest<S> {
    pub round_ids: BTreeSet<RoundId>,
    pub status: S,
}
