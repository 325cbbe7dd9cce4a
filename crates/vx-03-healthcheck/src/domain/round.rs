//! One liveness-consensus round over a single subject peer.

use serde::{Deserialize, Serialize};
use shared_types::PeerId;
use std::collections::{BTreeMap, BTreeSet};

/// Identifier of one health-check attempt; merged when parallel attempts
/// converge on the same subject.
pub type RoundId = u64;

/// The subject of a round: which peer's liveness, under which attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HealthCheckKey {
    /// The peer whose liveness is being decided.
    pub subject: PeerId,
    /// The attempt that opened this round.
    pub round_id: RoundId,
}

/// Outcome of a finished round, as computed by the pluggable driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HealthDecision<S> {
    /// The participants agreed on a status.
    Agreed(S),
    /// The driver could not resolve a status from the proposals.
    Unresolved,
}

/// Collects one status proposal per participant for a subject.
///
/// Proposals are insert-once per owner: the first proposal a participant
/// submits is the one counted, and submitting also merges the sender's
/// round ids (parallel attempts for the same subject collapse into one
/// round).
#[derive(Clone, Debug)]
pub struct HealthCheckRound<S> {
    key: HealthCheckKey,
    peers: BTreeSet<PeerId>,
    round_ids: BTreeSet<RoundId>,
    proposals: BTreeMap<PeerId, S>,
}

impl<S: Clone> HealthCheckRound<S> {
    /// Open a round over `key` with the given participant set.
    pub fn new(key: HealthCheckKey, participants: BTreeSet<PeerId>) -> Self {
        let mut round_ids = BTreeSet::new();
        round_ids.insert(key.round_id);
        Self {
            key,
            peers: participants,
            round_ids,
            proposals: BTreeMap::new(),
        }
    }

    /// The round's subject key.
    pub fn key(&self) -> &HealthCheckKey {
        &self.key
    }

    /// Current participants.
    pub fn peers(&self) -> &BTreeSet<PeerId> {
        &self.peers
    }

    /// All round ids merged into this round.
    pub fn round_ids(&self) -> &BTreeSet<RoundId> {
        &self.round_ids
    }

    /// Record a participant's proposal.
    ///
    /// Returns `false` when the owner already proposed (the original
    /// proposal stands). On first insert the owner joins the participant
    /// set and its round ids are merged.
    pub fn add_proposal(
        &mut self,
        owner: PeerId,
        round_ids: BTreeSet<RoundId>,
        proposal: S,
    ) -> bool {
        if self.proposals.contains_key(&owner) {
            return false;
        }
        self.round_ids.extend(round_ids);
        self.peers.insert(owner);
        self.proposals.insert(owner, proposal);
        true
    }

    /// Prune participants that left the cluster without proposing; anyone
    /// who already proposed is retained regardless.
    pub fn manage_peers(&mut self, current_cluster_peers: &BTreeSet<PeerId>) {
        let proposals = &self.proposals;
        self.peers
            .retain(|peer| current_cluster_peers.contains(peer) || proposals.contains_key(peer));
    }

    /// Whether every remaining participant has proposed.
    pub fn is_finished(&self) -> bool {
        !self.peers.is_empty() && self.peers.iter().all(|p| self.proposals.contains_key(p))
    }

    /// Proposals restricted to the current participant set.
    pub fn participant_proposals(&self) -> BTreeMap<PeerId, S> {
        self.proposals
            .iter()
            .filter(|(peer, _)| self.peers.contains(*peer))
            .map(|(peer, status)| (*peer, status.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(seed: u8) -> PeerId {
        PeerId::from_verifying_key_bytes([seed; 32])
    }

    fn key() -> HealthCheckKey {
        HealthCheckKey {
            subject: peer(9),
            round_id: 1,
        }
    }

    fn participants(seeds: &[u8]) -> BTreeSet<PeerId> {
        seeds.iter().map(|s| peer(*s)).collect()
    }

    #[test]
    fn test_first_proposal_per_owner_wins() {
        let mut round: HealthCheckRound<bool> = HealthCheckRound::new(key(), participants(&[1, 2]));
        assert!(round.add_proposal(peer(1), [1].into_iter().collect(), true));
        assert!(!round.add_proposal(peer(1), [1].into_iter().collect(), false));
        assert_eq!(round.participant_proposals()[&peer(1)], true);
    }

    #[test]
    fn test_proposal_merges_round_ids_and_joins_peers() {
        let mut round: HealthCheckRound<bool> = HealthCheckRound::new(key(), participants(&[1]));
        assert!(round.add_proposal(peer(3), [1, 7].into_iter().collect(), true));
        assert!(round.round_ids().contains(&7));
        assert!(round.peers().contains(&peer(3)));
    }

    #[test]
    fn test_manage_peers_prunes_silent_leavers_only() {
        let mut round: HealthCheckRound<bool> =
            HealthCheckRound::new(key(), participants(&[1, 2, 3]));
        round.add_proposal(peer(1), [1].into_iter().collect(), true);

        // Peers 1 and 2 left the cluster; only 2 (no proposal) is pruned.
        round.manage_peers(&participants(&[3]));
        assert!(round.peers().contains(&peer(1)));
        assert!(!round.peers().contains(&peer(2)));
        assert!(round.peers().contains(&peer(3)));
    }

    #[test]
    fn test_is_finished_requires_every_participant() {
        let mut round: HealthCheckRound<bool> = HealthCheckRound::new(key(), participants(&[1, 2]));
        assert!(!round.is_finished());
        round.add_proposal(peer(1), [1].into_iter().collect(), true);
        assert!(!round.is_finished());
        round.add_proposal(peer(2), [1].into_iter().collect(), false);
        assert!(round.is_finished());
    }

    #[test]
    fn test_pruning_can_finish_a_round() {
        let mut round: HealthCheckRound<bool> = HealthCheckRound::new(key(), participants(&[1, 2]));
        round.add_proposal(peer(1), [1].into_iter().collect(), true);
        round.manage_peers(&participants(&[1]));
        assert!(round.is_finished());
    }

    #[test]
    fn test_participant_proposals_excludes_pruned_owners() {
        let mut round: HealthCheckRound<bool> = HealthCheckRound::new(key(), participants(&[1, 2]));
        round.add_proposal(peer(1), [1].into_iter().collect(), true);
        round.add_proposal(peer(2), [1].into_iter().collect(), false);
        // Both proposed, so pruning retains both even if they left.
        round.manage_peers(&BTreeSet::new());
        assert_eq!(round.participant_proposals().len(), 2);
    }
}
