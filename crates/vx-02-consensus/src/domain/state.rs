//! Per-epoch consensus state and the monotone status ladder.

use shared_types::{Hash, PeerId, Signed};
use std::time::Instant;

/// Why a round was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsensusTrigger {
    /// Periodic time trigger.
    Time,
    /// A trigger-marked event entered the buffer.
    Event,
    /// Started without a trigger, only to install the next time trigger.
    None,
}

impl ConsensusTrigger {
    /// Stable label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ConsensusTrigger::Time => "time",
            ConsensusTrigger::Event => "event",
            ConsensusTrigger::None => "none",
        }
    }
}

/// Status of one epoch's round. Strictly monotone; never regresses.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsensusStatus<A> {
    /// Round installed; awaiting upper-bound declarations.
    Facilitated,
    /// Own proposal broadcast; awaiting the other proposals.
    ProposalMade { hash: Hash, artifact: A },
    /// Majority chosen; awaiting counter-signatures.
    MajoritySelected { hash: Hash },
    /// Fully signed; awaiting consumption acknowledgement.
    MajoritySigned { signed: Signed<A> },
    /// Terminal.
    Finished {
        signed: Signed<A>,
        trigger: ConsensusTrigger,
    },
}

impl<A> ConsensusStatus<A> {
    /// Position on the ladder; used to guard against regressions.
    pub fn rank(&self) -> u8 {
        match self {
            ConsensusStatus::Facilitated => 0,
            ConsensusStatus::ProposalMade { .. } => 1,
            ConsensusStatus::MajoritySelected { .. } => 2,
            ConsensusStatus::MajoritySigned { .. } => 3,
            ConsensusStatus::Finished { .. } => 4,
        }
    }

    /// Stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ConsensusStatus::Facilitated => "facilitated",
            ConsensusStatus::ProposalMade { .. } => "proposal_made",
            ConsensusStatus::MajoritySelected { .. } => "majority_selected",
            ConsensusStatus::MajoritySigned { .. } => "majority_signed",
            ConsensusStatus::Finished { .. } => "finished",
        }
    }
}

/// State of one epoch's round on this node.
#[derive(Clone, Debug)]
pub struct ConsensusState<K, A> {
    /// The epoch this round decides.
    pub key: K,
    /// The previous finalized epoch and its artifact (absent at genesis).
    pub last_key_and_artifact: (K, Option<Signed<A>>),
    /// Quorum members for this round, sorted ascending.
    pub facilitators: Vec<PeerId>,
    /// Ladder position.
    pub status: ConsensusStatus<A>,
    /// What started the round locally.
    pub started_by: ConsensusTrigger,
    /// When the round was installed.
    pub created_at: Instant,
    /// When the status last changed.
    pub status_updated_at: Instant,
}

impl<K, A> ConsensusState<K, A> {
    /// Whether the peer is a quorum member of this round.
    pub fn is_facilitator(&self, peer: &PeerId) -> bool {
        self.facilitators.binary_search(peer).is_ok()
    }

    /// Replace the status, stamping the update time.
    pub fn advanced(mut self, status: ConsensusStatus<A>, now: Instant) -> Self {
        self.status = status;
        self.status_updated_at = now;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranks_are_monotone() {
        let a: ConsensusStatus<u8> = ConsensusStatus::Facilitated;
        let b: ConsensusStatus<u8> = ConsensusStatus::ProposalMade {
            hash: [0; 32],
            artifact: 1,
        };
        let c: ConsensusStatus<u8> = ConsensusStatus::MajoritySelected { hash: [0; 32] };
        let d: ConsensusStatus<u8> = ConsensusStatus::MajoritySigned {
            signed: Signed::new(1, vec![]),
        };
        let e: ConsensusStatus<u8> = ConsensusStatus::Finished {
            signed: Signed::new(1, vec![]),
            trigger: ConsensusTrigger::Time,
        };
        assert!(a.rank() < b.rank());
        assert!(b.rank() < c.rank());
        assert!(c.rank() < d.rank());
        assert!(d.rank() < e.rank());
    }

    #[test]
    fn test_is_facilitator_uses_sorted_membership() {
        let p1 = PeerId::from_verifying_key_bytes([1; 32]);
        let p2 = PeerId::from_verifying_key_bytes([2; 32]);
        let p3 = PeerId::from_verifying_key_bytes([3; 32]);
        let mut facilitators = vec![p3, p1];
        facilitators.sort();
        let state: ConsensusState<u64, u8> = ConsensusState {
            key: 1,
            last_key_and_artifact: (0, None),
            facilitators,
            status: ConsensusStatus::Facilitated,
            started_by: ConsensusTrigger::Time,
            created_at: Instant::now(),
            status_updated_at: Instant::now(),
        };
        assert!(state.is_facilitator(&p1));
        assert!(!state.is_facilitator(&p2));
        assert!(state.is_facilitator(&p3));
    }
}
