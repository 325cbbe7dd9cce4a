//! Pure state-transition functions for the consensus ladder.
//!
//! Each function computes a new state plus the effects to run if the state
//! store accepts the transition. Nothing here touches the network, the
//! storage, or the clock; the manager owns sequencing and effect execution.
//! That split keeps every transition testable without a live node.

use super::cluster::{ClusterPeer, PeerPhase};
use super::key::{Artifact, EpochKey};
use super::resources::{select_majority, Bound, ConsensusResources};
use super::state::{ConsensusState, ConsensusStatus, ConsensusTrigger};
use shared_crypto::Keypair;
use shared_types::{Hash, PeerId, Signature, Signed, SignatureProof};
use std::collections::BTreeMap;
use std::time::Instant;

/// A side effect to run after a transition is accepted.
#[derive(Clone, Debug)]
pub enum ConsensusEffect<K, A> {
    /// Record our own upper-bound declaration in local resources.
    DeclareOwnUpperBound { key: K, bound: Bound },
    /// Record our own proposal declaration in local resources.
    DeclareOwnProposal { key: K, hash: Hash },
    /// Record our own majority signature in local resources.
    DeclareOwnSignature { key: K, signature: Signature },
    /// Store a candidate artifact in local resources.
    StoreArtifact { key: K, hash: Hash, artifact: A },
    /// Gossip our upper-bound declaration.
    PublishFacility { key: K, bound: Bound },
    /// Gossip our proposal hash.
    PublishProposal { key: K, hash: Hash },
    /// Gossip our signature over the majority hash.
    PublishSignature { key: K, signature: Signature },
    /// Gossip an artifact as a common rumor; `proofs` is empty for
    /// candidates and complete for the signed majority.
    PublishArtifact {
        key: K,
        artifact: A,
        proofs: Vec<SignatureProof>,
    },
}

/// A computed transition: the state to install and the effects to run once
/// it is installed.
#[derive(Clone, Debug)]
pub struct Transition<K, A> {
    pub state: ConsensusState<K, A>,
    pub effects: Vec<ConsensusEffect<K, A>>,
}

/// Inputs needed by the signature-producing advance step.
pub struct AdvanceContext<'a> {
    pub self_id: PeerId,
    pub keypair: &'a Keypair,
    pub now: Instant,
}

/// Remote peers eligible to facilitate `key`: phase Ready with a recorded
/// registration at or before the key.
pub fn eligible_facilitators<K: EpochKey>(
    key: &K,
    peers: &[ClusterPeer],
    registrations: &BTreeMap<PeerId, K>,
) -> Vec<PeerId> {
    let mut eligible: Vec<PeerId> = peers
        .iter()
        .filter(|p| p.phase == PeerPhase::Ready)
        .filter(|p| registrations.get(&p.id).is_some_and(|r| r <= key))
        .map(|p| p.id)
        .collect();
    eligible.sort();
    eligible.dedup();
    eligible
}

/// Install a round we facilitate: self joins the eligible peers, and our
/// current upper bound is declared and gossiped.
///
/// Only applicable when no state exists for the key; the caller enforces
/// that through the conditional store.
pub fn try_facilitate<K: EpochKey, A: Artifact>(
    key: K,
    last: (K, Option<Signed<A>>),
    eligible: Vec<PeerId>,
    self_id: PeerId,
    upper_bound: Bound,
    trigger: ConsensusTrigger,
    now: Instant,
) -> Transition<K, A> {
    let mut facilitators = eligible;
    facilitators.push(self_id);
    facilitators.sort();
    facilitators.dedup();

    let effects = vec![
        ConsensusEffect::DeclareOwnUpperBound {
            key: key.clone(),
            bound: upper_bound.clone(),
        },
        ConsensusEffect::PublishFacility {
            key: key.clone(),
            bound: upper_bound,
        },
    ];

    Transition {
        state: ConsensusState {
            key,
            last_key_and_artifact: last,
            facilitators,
            status: ConsensusStatus::Facilitated,
            started_by: trigger,
            created_at: now,
            status_updated_at: now,
        },
        effects,
    }
}

/// Install a round we only observe: no self in the quorum, nothing
/// declared, nothing gossiped.
pub fn try_observe<K: EpochKey, A: Artifact>(
    key: K,
    last: (K, Option<Signed<A>>),
    facilitators: Vec<PeerId>,
    now: Instant,
) -> ConsensusState<K, A> {
    let mut facilitators = facilitators;
    facilitators.sort();
    facilitators.dedup();
    ConsensusState {
        key,
        last_key_and_artifact: last,
        facilitators,
        status: ConsensusStatus::Facilitated,
        started_by: ConsensusTrigger::None,
        created_at: now,
        status_updated_at: now,
    }
}

/// The pointwise-max bound to propose against, available once the round is
/// `Facilitated`, we are in the quorum, and every facilitator has declared.
pub fn ready_to_propose<K: EpochKey, A: Artifact>(
    state: &ConsensusState<K, A>,
    resources: &ConsensusResources<A>,
    self_id: &PeerId,
) -> Option<Bound> {
    if !matches!(state.status, ConsensusStatus::Facilitated) {
        return None;
    }
    if !state.is_facilitator(self_id) {
        return None;
    }
    resources.declared_upper_bound(&state.facilitators)
}

/// `Facilitated -> ProposalMade` with the artifact the consensus functions
/// built from the pulled events.
pub fn make_proposal<K: EpochKey, A: Artifact>(
    state: &ConsensusState<K, A>,
    artifact: A,
    hash: Hash,
    now: Instant,
) -> Transition<K, A> {
    let key = state.key.clone();
    let effects = vec![
        ConsensusEffect::StoreArtifact {
            key: key.clone(),
            hash,
            artifact: artifact.clone(),
        },
        ConsensusEffect::DeclareOwnProposal {
            key: key.clone(),
            hash,
        },
        ConsensusEffect::PublishProposal {
            key: key.clone(),
            hash,
        },
        ConsensusEffect::PublishArtifact {
            key,
            artifact: artifact.clone(),
            proofs: vec![],
        },
    ];
    Transition {
        state: state
            .clone()
            .advanced(ConsensusStatus::ProposalMade { hash, artifact }, now),
        effects,
    }
}

/// Advance `ProposalMade -> MajoritySelected -> MajoritySigned` as
/// declarations allow. Idempotent: unchanged resources produce `None`.
///
/// Observers (self outside the quorum) never advance here; they finish by
/// receiving the fully signed artifact.
pub fn try_advance<K: EpochKey, A: Artifact>(
    state: &ConsensusState<K, A>,
    resources: &ConsensusResources<A>,
    ctx: &AdvanceContext<'_>,
) -> Option<Transition<K, A>> {
    if !state.is_facilitator(&ctx.self_id) {
        return None;
    }
    match &state.status {
        ConsensusStatus::ProposalMade {
            hash: own_hash,
            artifact,
        } => {
            let proposals = resources.declared_proposals(&state.facilitators)?;
            let majority = select_majority(&proposals)?;
            let signature = ctx.keypair.sign_digest(&majority);
            let key = state.key.clone();
            let mut effects = vec![
                ConsensusEffect::DeclareOwnSignature {
                    key: key.clone(),
                    signature,
                },
                ConsensusEffect::PublishSignature {
                    key: key.clone(),
                    signature,
                },
            ];
            // Our proposal won: we are a canonical source for the bytes, so
            // re-broadcast them.
            if majority == *own_hash {
                effects.push(ConsensusEffect::PublishArtifact {
                    key,
                    artifact: artifact.clone(),
                    proofs: vec![],
                });
            }
            Some(Transition {
                state: state
                    .clone()
                    .advanced(ConsensusStatus::MajoritySelected { hash: majority }, ctx.now),
                effects,
            })
        }
        ConsensusStatus::MajoritySelected { hash } => {
            let signatures = resources.declared_signatures(&state.facilitators)?;
            let artifact = resources.artifacts.get(hash)?;
            let proofs: Vec<SignatureProof> = signatures
                .into_iter()
                .map(|(signer, signature)| SignatureProof { signer, signature })
                .collect();
            let signed = Signed::new(artifact.clone(), proofs);
            let effects = vec![ConsensusEffect::PublishArtifact {
                key: state.key.clone(),
                artifact: artifact.clone(),
                proofs: signed.proofs.clone(),
            }];
            Some(Transition {
                state: state
                    .clone()
                    .advanced(ConsensusStatus::MajoritySigned { signed }, ctx.now),
                effects,
            })
        }
        _ => None,
    }
}

/// `MajoritySigned -> Finished`, applied by the manager only after the
/// consumption call acknowledged. Records the trigger that started the
/// round.
pub fn finish<K: EpochKey, A: Artifact>(
    state: &ConsensusState<K, A>,
    now: Instant,
) -> Option<Transition<K, A>> {
    match &state.status {
        ConsensusStatus::MajoritySigned { signed } => Some(Transition {
            state: state.clone().advanced(
                ConsensusStatus::Finished {
                    signed: signed.clone(),
                    trigger: state.started_by,
                },
                now,
            ),
            effects: vec![],
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::resources::PeerDeclaration;
    use super::*;
    use shared_types::content_hash;

    type TestArtifact = Vec<u8>;

    fn keypair(seed: u8) -> Keypair {
        Keypair::from_seed([seed; 32])
    }

    fn bound_of(entries: &[(PeerId, u64)]) -> Bound {
        entries.iter().copied().collect()
    }

    fn declare_bound<A>(resources: &mut ConsensusResources<A>, peer: PeerId, bound: Bound) {
        resources
            .peer_declarations
            .entry(peer)
            .or_default()
            .merge_from(PeerDeclaration::with_upper_bound(bound));
    }

    fn declare_proposal<A>(resources: &mut ConsensusResources<A>, peer: PeerId, hash: Hash) {
        resources
            .peer_declarations
            .entry(peer)
            .or_default()
            .merge_from(PeerDeclaration::with_proposal(hash));
    }

    fn declare_signature<A>(resources: &mut ConsensusResources<A>, peer: PeerId, sig: Signature) {
        resources
            .peer_declarations
            .entry(peer)
            .or_default()
            .merge_from(PeerDeclaration::with_signature(sig));
    }

    #[test]
    fn test_eligible_facilitators_filters_phase_and_registration() {
        let ready_registered = keypair(1).peer_id();
        let ready_late = keypair(2).peer_id();
        let observing = keypair(3).peer_id();
        let peers = vec![
            ClusterPeer::new(ready_registered, PeerPhase::Ready),
            ClusterPeer::new(ready_late, PeerPhase::Ready),
            ClusterPeer::new(observing, PeerPhase::Observing),
        ];
        let mut registrations = BTreeMap::new();
        registrations.insert(ready_registered, 5u64);
        registrations.insert(ready_late, 9u64);
        registrations.insert(observing, 1u64);

        let eligible = eligible_facilitators(&6u64, &peers, &registrations);
        assert_eq!(eligible, vec![ready_registered]);
    }

    #[test]
    fn test_facilitate_includes_self_sorted() {
        let me = keypair(7);
        let other = keypair(1).peer_id();
        let transition: Transition<u64, TestArtifact> = try_facilitate(
            6,
            (5, None),
            vec![other],
            me.peer_id(),
            Bound::new(),
            ConsensusTrigger::Time,
            Instant::now(),
        );
        let mut expected = vec![other, me.peer_id()];
        expected.sort();
        assert_eq!(transition.state.facilitators, expected);
        assert!(matches!(
            transition.state.status,
            ConsensusStatus::Facilitated
        ));
        assert_eq!(transition.effects.len(), 2);
    }

    #[test]
    fn test_observer_never_advances() {
        let me = keypair(7);
        let f1 = keypair(1).peer_id();
        let f2 = keypair(2).peer_id();
        let state: ConsensusState<u64, TestArtifact> =
            try_observe(6, (5, None), vec![f1, f2], Instant::now());
        assert!(!state.is_facilitator(&me.peer_id()));

        let mut resources = ConsensusResources::default();
        declare_bound(&mut resources, f1, Bound::new());
        declare_bound(&mut resources, f2, Bound::new());

        assert!(ready_to_propose(&state, &resources, &me.peer_id()).is_none());
        let ctx = AdvanceContext {
            self_id: me.peer_id(),
            keypair: &me,
            now: Instant::now(),
        };
        assert!(try_advance(&state, &resources, &ctx).is_none());
    }

    #[test]
    fn test_single_facilitator_ladder() {
        // A quorum of one walks every rung with only its own declarations.
        let me = keypair(7);
        let now = Instant::now();
        let transition: Transition<u64, TestArtifact> = try_facilitate(
            6,
            (5, None),
            vec![],
            me.peer_id(),
            Bound::new(),
            ConsensusTrigger::Time,
            now,
        );
        let state = transition.state;
        let mut resources: ConsensusResources<TestArtifact> = ConsensusResources::default();
        declare_bound(&mut resources, me.peer_id(), Bound::new());

        let bound = ready_to_propose(&state, &resources, &me.peer_id()).unwrap();
        assert!(bound.is_empty());

        let artifact = vec![1u8, 2, 3];
        let hash = content_hash(&artifact).unwrap();
        let state = make_proposal(&state, artifact.clone(), hash, now).state;
        declare_proposal(&mut resources, me.peer_id(), hash);
        resources.artifacts.insert(hash, artifact.clone());

        let ctx = AdvanceContext {
            self_id: me.peer_id(),
            keypair: &me,
            now,
        };
        let transition = try_advance(&state, &resources, &ctx).unwrap();
        let majority = match &transition.state.status {
            ConsensusStatus::MajoritySelected { hash } => *hash,
            other => panic!("expected majority selection, got {}", other.name()),
        };
        assert_eq!(majority, hash);
        declare_signature(&mut resources, me.peer_id(), me.sign_digest(&majority));

        let state = transition.state;
        let transition = try_advance(&state, &resources, &ctx).unwrap();
        let ConsensusStatus::MajoritySigned { ref signed } = transition.state.status else {
            panic!("expected majority signed");
        };
        assert_eq!(signed.proofs.len(), 1);
        assert_eq!(signed.proofs[0].signer, me.peer_id());

        let finished = finish(&transition.state, now).unwrap();
        let ConsensusStatus::Finished { trigger, .. } = finished.state.status else {
            panic!("expected finished");
        };
        assert_eq!(trigger, ConsensusTrigger::Time);
    }

    #[test]
    fn test_three_facilitator_round_with_ordered_proofs() {
        let me = keypair(1);
        let p2 = keypair(2);
        let p3 = keypair(3);
        let now = Instant::now();

        let transition: Transition<u64, TestArtifact> = try_facilitate(
            6,
            (5, None),
            vec![p2.peer_id(), p3.peer_id()],
            me.peer_id(),
            Bound::new(),
            ConsensusTrigger::Time,
            now,
        );
        let state = transition.state;
        let mut resources: ConsensusResources<TestArtifact> = ConsensusResources::default();

        // Everyone declares a bound covering both remote event streams.
        let declared = bound_of(&[(p2.peer_id(), 1), (p3.peer_id(), 1)]);
        for peer in [me.peer_id(), p2.peer_id(), p3.peer_id()] {
            declare_bound(&mut resources, peer, declared.clone());
        }
        let bound = ready_to_propose(&state, &resources, &me.peer_id()).unwrap();
        assert_eq!(bound, declared);

        // Everyone proposes the same artifact.
        let artifact = vec![0xAB];
        let hash = content_hash(&artifact).unwrap();
        let state = make_proposal(&state, artifact.clone(), hash, now).state;
        for peer in [me.peer_id(), p2.peer_id(), p3.peer_id()] {
            declare_proposal(&mut resources, peer, hash);
        }
        resources.artifacts.insert(hash, artifact);

        let ctx = AdvanceContext {
            self_id: me.peer_id(),
            keypair: &me,
            now,
        };
        let state = try_advance(&state, &resources, &ctx).unwrap().state;

        // Everyone signs the majority.
        for signer in [&me, &p2, &p3] {
            declare_signature(&mut resources, signer.peer_id(), signer.sign_digest(&hash));
        }
        let transition = try_advance(&state, &resources, &ctx).unwrap();
        let ConsensusStatus::MajoritySigned { signed } = transition.state.status else {
            panic!("expected majority signed");
        };

        // Proofs come out in facilitator (sorted peer id) order.
        let signers: Vec<PeerId> = signed.signers().copied().collect();
        assert_eq!(signers, state.facilitators);
        assert!(shared_crypto::verify_signed(&signed).is_ok());
    }

    #[test]
    fn test_divergent_proposals_pick_majority() {
        let me = keypair(1);
        let p2 = keypair(2);
        let p3 = keypair(3);
        let now = Instant::now();

        let state: ConsensusState<u64, TestArtifact> = try_facilitate(
            6,
            (5, None),
            vec![p2.peer_id(), p3.peer_id()],
            me.peer_id(),
            Bound::new(),
            ConsensusTrigger::Event,
            now,
        )
        .state;

        let ours = vec![0xAA];
        let ours_hash = content_hash(&ours).unwrap();
        let theirs_hash = content_hash(&vec![0xBB_u8]).unwrap();
        let state = make_proposal(&state, ours, ours_hash, now).state;

        let mut resources: ConsensusResources<TestArtifact> = ConsensusResources::default();
        declare_proposal(&mut resources, me.peer_id(), ours_hash);
        declare_proposal(&mut resources, p2.peer_id(), theirs_hash);
        declare_proposal(&mut resources, p3.peer_id(), ours_hash);

        let ctx = AdvanceContext {
            self_id: me.peer_id(),
            keypair: &me,
            now,
        };
        let transition = try_advance(&state, &resources, &ctx).unwrap();
        let ConsensusStatus::MajoritySelected { hash } = transition.state.status else {
            panic!("expected majority selection");
        };
        assert_eq!(hash, ours_hash);
        // We won, so the candidate artifact is re-broadcast.
        assert!(transition
            .effects
            .iter()
            .any(|e| matches!(e, ConsensusEffect::PublishArtifact { .. })));
    }

    #[test]
    fn test_advance_is_idempotent_on_missing_declarations() {
        let me = keypair(1);
        let p2 = keypair(2);
        let now = Instant::now();

        let state: ConsensusState<u64, TestArtifact> = try_facilitate(
            6,
            (5, None),
            vec![p2.peer_id()],
            me.peer_id(),
            Bound::new(),
            ConsensusTrigger::Time,
            now,
        )
        .state;

        let mut resources: ConsensusResources<TestArtifact> = ConsensusResources::default();
        declare_bound(&mut resources, me.peer_id(), Bound::new());
        // p2 has not declared yet: nothing to do.
        assert!(ready_to_propose(&state, &resources, &me.peer_id()).is_none());

        let ctx = AdvanceContext {
            self_id: me.peer_id(),
            keypair: &me,
            now,
        };
        assert!(try_advance(&state, &resources, &ctx).is_none());
        assert!(finish(&state, now).is_none());
    }
}
