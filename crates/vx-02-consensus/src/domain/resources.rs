//! Per-key resource aggregation: declarations, candidate artifacts, and
//! buffered events.

use serde::{Deserialize, Serialize};
use shared_types::{Hash, PeerId, Signature};
use std::collections::BTreeMap;

/// Per-peer cursor into event streams: the highest ordinal each peer
/// promises to include.
pub type Bound = BTreeMap<PeerId, u64>;

/// Pointwise maximum across bounds.
pub fn pointwise_max<'a, I>(bounds: I) -> Bound
where
    I: IntoIterator<Item = &'a Bound>,
{
    let mut merged = Bound::new();
    for bound in bounds {
        for (peer, ordinal) in bound {
            merged
                .entry(*peer)
                .and_modify(|o| *o = (*o).max(*ordinal))
                .or_insert(*ordinal);
        }
    }
    merged
}

/// An event buffered for inclusion in a future proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedEvent<E> {
    pub event: E,
    /// Trigger events start a round on arrival.
    pub is_trigger: bool,
}

/// What one facilitator has declared for a round so far.
///
/// Fields are set-monotonic: the first declaration of a field wins and later
/// contradictory declarations are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerDeclaration {
    pub upper_bound: Option<Bound>,
    pub proposal: Option<Hash>,
    pub signature: Option<Signature>,
}

impl PeerDeclaration {
    /// Fragment carrying only an upper bound.
    pub fn with_upper_bound(bound: Bound) -> Self {
        Self {
            upper_bound: Some(bound),
            ..Default::default()
        }
    }

    /// Fragment carrying only a proposal hash.
    pub fn with_proposal(hash: Hash) -> Self {
        Self {
            proposal: Some(hash),
            ..Default::default()
        }
    }

    /// Fragment carrying only a majority signature.
    pub fn with_signature(signature: Signature) -> Self {
        Self {
            signature: Some(signature),
            ..Default::default()
        }
    }

    /// Fill unset fields from a fragment; set fields are immutable.
    pub fn merge_from(&mut self, fragment: PeerDeclaration) {
        if self.upper_bound.is_none() {
            self.upper_bound = fragment.upper_bound;
        }
        if self.proposal.is_none() {
            self.proposal = fragment.proposal;
        }
        if self.signature.is_none() {
            self.signature = fragment.signature;
        }
    }
}

/// Everything collected for one epoch key as declarations arrive.
#[derive(Clone, Debug)]
pub struct ConsensusResources<A> {
    /// Declarations keyed by facilitator.
    pub peer_declarations: BTreeMap<PeerId, PeerDeclaration>,
    /// Candidate artifacts keyed by content hash.
    pub artifacts: BTreeMap<Hash, A>,
}

impl<A> Default for ConsensusResources<A> {
    fn default() -> Self {
        Self {
            peer_declarations: BTreeMap::new(),
            artifacts: BTreeMap::new(),
        }
    }
}

impl<A> ConsensusResources<A> {
    /// The pointwise-max bound, present only once every facilitator has
    /// declared one.
    pub fn declared_upper_bound(&self, facilitators: &[PeerId]) -> Option<Bound> {
        let mut bounds = Vec::with_capacity(facilitators.len());
        for peer in facilitators {
            bounds.push(self.peer_declarations.get(peer)?.upper_bound.as_ref()?);
        }
        Some(pointwise_max(bounds))
    }

    /// All proposal hashes, present only once every facilitator has
    /// declared one.
    pub fn declared_proposals(&self, facilitators: &[PeerId]) -> Option<Vec<Hash>> {
        facilitators
            .iter()
            .map(|peer| self.peer_declarations.get(peer)?.proposal)
            .collect()
    }

    /// All majority signatures in facilitator order, present only once
    /// every facilitator has declared one.
    pub fn declared_signatures(&self, facilitators: &[PeerId]) -> Option<Vec<(PeerId, Signature)>> {
        facilitators
            .iter()
            .map(|peer| {
                self.peer_declarations
                    .get(peer)?
                    .signature
                    .map(|s| (*peer, s))
            })
            .collect()
    }
}

/// Deterministic majority selection: the hash with the highest count; ties
/// broken by the lexicographically smallest hash. Identical inputs produce
/// identical output on every node.
pub fn select_majority(proposals: &[Hash]) -> Option<Hash> {
    let mut counts: BTreeMap<Hash, usize> = BTreeMap::new();
    for hash in proposals {
        *counts.entry(*hash).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(hash, _)| hash)
}
