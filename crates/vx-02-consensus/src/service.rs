//! Consensus manager - lifecycle, scheduling, and state pumping.
//!
//! # Architecture
//!
//! - Transitions are computed by the pure updater and installed through the
//!   storage's rank-guarded conditional modify; effects (declarations,
//!   rumor publications) run only after a transition is accepted.
//! - Rounds start on a time trigger, an event trigger, or (once) with no
//!   trigger just to install the next time trigger.
//! - The registration exchange runs as a background task over a peer queue;
//!   the lower peer id initiates so exactly one side does.
//! - Every background iteration swallows and logs its own errors; the next
//!   trigger or rumor arrival retries naturally.

use crate::domain::updater::{self, AdvanceContext, ConsensusEffect, Transition};
use crate::domain::{
    Artifact, Bound, BufferedEvent, ClusterPeer, ConsensusConfig, ConsensusError, ConsensusEvent,
    ConsensusResult, ConsensusState, ConsensusStatus, ConsensusStatusReport, ConsensusTrigger,
    EpochKey, PeerDeclaration, PeerPhase,
};
use crate::events::{
    encode_payload, ArtifactAnnouncement, DeregistrationAnnouncement, EventAnnouncement,
    FacilityAnnouncement, ProposalAnnouncement, SignatureAnnouncement, TAG_ARTIFACT,
    TAG_DEREGISTRATION, TAG_EVENT, TAG_FACILITY, TAG_PROPOSAL, TAG_SIGNATURE,
};
use crate::metrics;
use crate::ports::{
    ClusterView, ConsensusFunctions, GossipPublisher, RegistrationApi, RegistrationTransport,
};
use crate::storage::ConsensusStorage;
use async_trait::async_trait;
use serde::Serialize;
use shared_crypto::{verify_proof, Keypair};
use shared_types::{content_hash, Hash, PeerId, Rumor, Signed, SignatureProof};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Dependencies for [`ConsensusManager`].
pub struct ConsensusDependencies<CF, GP, CV, RT> {
    pub functions: Arc<CF>,
    pub publisher: Arc<GP>,
    pub cluster: Arc<CV>,
    pub registration: Arc<RT>,
    pub keypair: Arc<Keypair>,
    pub config: ConsensusConfig,
}

/// Consensus manager service.
pub struct ConsensusManager<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
{
    storage: Arc<ConsensusStorage<K, A, E>>,
    functions: Arc<CF>,
    publisher: Arc<GP>,
    cluster: Arc<CV>,
    registration: Arc<RT>,
    keypair: Arc<Keypair>,
    self_id: PeerId,
    config: ConsensusConfig,
    own_ordinal: AtomicU64,
    rounds_finished: AtomicU64,
    registration_tx: mpsc::UnboundedSender<PeerId>,
    registration_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<PeerId>>>,
    shutdown_tx: watch::Sender<bool>,
    weak_self: Weak<Self>,
}

impl<K, A, E, CF, GP, CV, RT> ConsensusManager<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
    CF: ConsensusFunctions<K, A, E> + 'static,
    GP: GossipPublisher + 'static,
    CV: ClusterView + 'static,
    RT: RegistrationTransport<K> + 'static,
{
    /// Create a new consensus manager. Fails on invalid configuration.
    ///
    /// Returned in an `Arc` because background tasks hold a handle back to
    /// the manager.
    pub fn new(deps: ConsensusDependencies<CF, GP, CV, RT>) -> ConsensusResult<Arc<Self>> {
        deps.config.validate()?;
        let (registration_tx, registration_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let self_id = deps.keypair.peer_id();
        Ok(Arc::new_cyclic(|weak_self| Self {
            storage: Arc::new(ConsensusStorage::new()),
            functions: deps.functions,
            publisher: deps.publisher,
            cluster: deps.cluster,
            registration: deps.registration,
            keypair: deps.keypair,
            self_id,
            config: deps.config,
            own_ordinal: AtomicU64::new(0),
            rounds_finished: AtomicU64::new(0),
            registration_tx,
            registration_rx: parking_lot::Mutex::new(Some(registration_rx)),
            shutdown_tx,
            weak_self: weak_self.clone(),
        }))
    }

    /// Spawn the registration exchange background task.
    pub fn start(&self) -> ConsensusResult<()> {
        let registration_rx = self
            .registration_rx
            .lock()
            .take()
            .ok_or(ConsensusError::AlreadyStarted)?;
        let shutdown = self.shutdown_tx.subscribe();
        if let Some(manager) = self.weak_self.upgrade() {
            tokio::spawn(async move {
                manager
                    .registration_exchange_loop(registration_rx, shutdown)
                    .await;
            });
        }
        Ok(())
    }

    /// Trigger graceful shutdown of all background tasks.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Our own peer id.
    pub fn self_id(&self) -> PeerId {
        self.self_id
    }

    /// The storage backing this manager.
    pub fn storage(&self) -> Arc<ConsensusStorage<K, A, E>> {
        Arc::clone(&self.storage)
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> ConsensusStatusReport {
        ConsensusStatusReport {
            in_flight_rounds: self.storage.in_flight_rounds(),
            buffered_events: self.storage.buffered_event_count(),
            registered_peers: self.storage.registrations_snapshot().len(),
            rounds_finished: self.rounds_finished.load(Ordering::Relaxed),
        }
    }

    ////////////////////////////////////////
    // Lifecycle entry points
    ////////////////////////////////////////

    /// Begin facilitating: persist the starting point, register from the
    /// next epoch, and arm the first time trigger.
    pub fn start_facilitating_after(
        &self,
        last_key: K,
        last_artifact: Option<Signed<A>>,
    ) {
        self.storage.set_own_registration(last_key.next());
        self.storage.set_last_key_and_artifact(last_key, last_artifact);
        self.schedule_time_trigger();
    }

    /// Begin observing after a join: register two epochs out (rounds
    /// already in flight fixed their facilitator sets without us), exchange
    /// registrations with the sponsor, and install an observer view of the
    /// in-flight epoch.
    pub async fn start_observing_after(&self, last_key: K, peer: PeerId) {
        let own_registration = last_key.next().next();
        self.storage.set_own_registration(own_registration.clone());
        self.exchange_with(peer).await;
        self.storage.set_last_key_and_artifact(last_key.clone(), None);

        let next = last_key.next();
        let eligible = updater::eligible_facilitators(
            &next,
            &self.cluster.current_peers(),
            &self.storage.registrations_snapshot(),
        );
        if !eligible.is_empty() {
            let state = updater::try_observe(next.clone(), (last_key, None), eligible, Instant::now());
            self.storage
                .cond_modify_state(&next, |existing| {
                    existing.is_none().then(|| (state.clone(), ()))
                });
            self.check_for_state_update(&next).await;
        }
    }

    /// Start a round because a trigger event arrived.
    pub async fn facilitate_on_event(&self) {
        self.internal_facilitate_with(ConsensusTrigger::Event).await;
    }

    /// Buffer and disseminate a locally produced event; trigger events
    /// start a round immediately.
    pub async fn publish_event(&self, event: E, is_trigger: bool) {
        let announcement = EventAnnouncement {
            event: event.clone(),
            is_trigger,
        };
        let ordinal = self.own_ordinal.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self
            .try_publish_tagged(TAG_EVENT, &announcement, Some(ordinal))
            .await
        {
            warn!(error = %e, "failed to publish event rumor");
        }
        self.storage
            .buffer_event(self.self_id, ordinal, BufferedEvent { event, is_trigger });
        if is_trigger {
            self.internal_facilitate_with(ConsensusTrigger::Event).await;
        }
    }

    /// Release our facilitator slot on departure.
    pub async fn notify_leaving(&self) {
        let release = match (
            self.storage.get_last_key_and_artifact(),
            self.storage.get_own_registration(),
        ) {
            (Some((last, _)), Some(own)) => last.next().max(own),
            (Some((last, _)), None) => last.next(),
            (None, Some(own)) => own,
            (None, None) => {
                debug!("leaving before any participation; nothing to release");
                return;
            }
        };
        self.publish_peer_rumor(TAG_DEREGISTRATION, &DeregistrationAnnouncement { key: release })
            .await;
    }

    /// Cluster event hook: enqueue a registration exchange when a peer
    /// enters an exchange-worthy phase and we are the canonical initiator
    /// (smaller id), so exactly one side starts the exchange.
    pub fn notify_peer_state_changed(&self, peer: ClusterPeer) {
        let wants_exchange = matches!(peer.phase, PeerPhase::Observing | PeerPhase::InConsensus);
        if wants_exchange && self.self_id < peer.id {
            let _ = self.registration_tx.send(peer.id);
        }
    }

    ////////////////////////////////////////
    // Rumor intake (called by the rumor router)
    ////////////////////////////////////////

    /// A facilitator opened a round by declaring its upper bound.
    pub async fn on_facility(
        &self,
        origin: PeerId,
        announcement: FacilityAnnouncement<K>,
    ) {
        let key = announcement.key.clone();
        self.storage.add_peer_declaration(
            &key,
            origin,
            PeerDeclaration::with_upper_bound(announcement.upper_bound),
        );
        self.maybe_install_observer(&key, origin);
        self.check_for_state_update(&key).await;
    }

    /// A facilitator declared its proposal hash.
    pub async fn on_proposal(
        &self,
        origin: PeerId,
        announcement: ProposalAnnouncement<K>,
    ) {
        let key = announcement.key.clone();
        self.storage.add_peer_declaration(
            &key,
            origin,
            PeerDeclaration::with_proposal(announcement.proposal),
        );
        self.check_for_state_update(&key).await;
    }

    /// A facilitator counter-signed the majority hash.
    pub async fn on_signature(
        &self,
        origin: PeerId,
        announcement: SignatureAnnouncement<K>,
    ) {
        let key = announcement.key.clone();
        self.storage.add_peer_declaration(
            &key,
            origin,
            PeerDeclaration::with_signature(announcement.signature),
        );
        self.check_for_state_update(&key).await;
    }

    /// Artifact bytes arrived (candidate or fully signed).
    pub async fn on_artifact(&self, announcement: ArtifactAnnouncement<K, A>) {
        let key = announcement.key.clone();
        let hash = match content_hash(&announcement.artifact) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, "received artifact could not be hashed");
                return;
            }
        };
        self.storage
            .add_artifact(&key, hash, announcement.artifact.clone());
        if !announcement.proofs.is_empty() {
            self.try_adopt_signed_artifact(&key, announcement.artifact, announcement.proofs, hash)
                .await;
        }
        self.check_for_state_update(&key).await;
    }

    /// A peer released its facilitator slot.
    pub fn on_deregistration(&self, origin: PeerId, announcement: DeregistrationAnnouncement<K>) {
        if self.storage.deregister_peer(&origin) {
            info!(peer = %origin, key = ?announcement.key, "peer deregistered");
        }
    }

    /// An application event arrived from a peer.
    pub async fn on_event(
        &self,
        origin: PeerId,
        ordinal: u64,
        announcement: EventAnnouncement<E>,
    ) {
        let is_trigger = announcement.is_trigger;
        self.storage.buffer_event(
            origin,
            ordinal,
            BufferedEvent {
                event: announcement.event,
                is_trigger,
            },
        );
        if is_trigger {
            self.internal_facilitate_with(ConsensusTrigger::Event).await;
        }
    }

    ////////////////////////////////////////
    // Scheduling
    ////////////////////////////////////////

    /// Arm the next time trigger and spawn its one-shot timer. The stored
    /// fire time guards against stale timers: a timer that wakes up after a
    /// re-arm finds the stored time in the future and does nothing.
    pub fn schedule_time_trigger(&self) {
        let interval = self.config.time_trigger_interval;
        self.storage.set_time_trigger(Instant::now() + interval);
        let Some(manager) = self.weak_self.upgrade() else {
            return;
        };
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let due = manager
                .storage
                .get_time_trigger()
                .is_some_and(|at| Instant::now() >= at);
            if due {
                manager
                    .internal_facilitate_with(ConsensusTrigger::Time)
                    .await;
            }
        });
    }

    fn spawn_facilitate(&self, trigger: ConsensusTrigger) {
        let Some(manager) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            manager.internal_facilitate_with(trigger).await;
        });
    }

    /// Post-finish scheduling rules.
    fn post_finish(&self, trigger: ConsensusTrigger) {
        match trigger {
            ConsensusTrigger::Time => {
                self.schedule_time_trigger();
                if self.storage.contains_trigger_event() {
                    self.spawn_facilitate(ConsensusTrigger::Event);
                }
            }
            ConsensusTrigger::Event => {
                let due = self
                    .storage
                    .get_time_trigger()
                    .is_some_and(|at| Instant::now() >= at);
                if due {
                    self.spawn_facilitate(ConsensusTrigger::Time);
                } else if self.storage.contains_trigger_event() {
                    self.spawn_facilitate(ConsensusTrigger::Event);
                } else if self.storage.get_time_trigger().is_none() {
                    self.spawn_facilitate(ConsensusTrigger::None);
                }
            }
            ConsensusTrigger::None => {
                if self.storage.get_time_trigger().is_none() {
                    self.schedule_time_trigger();
                }
            }
        }
    }

    ////////////////////////////////////////
    // Facilitation pipeline
    ////////////////////////////////////////

    async fn internal_facilitate_with(&self, trigger: ConsensusTrigger) {
        let Some((last_key, last_artifact)) = self.storage.get_last_key_and_artifact() else {
            debug!("facilitation requested before a starting point was set");
            return;
        };
        let next_key = last_key.next();
        let registered = self
            .storage
            .get_own_registration()
            .is_some_and(|own| own <= next_key);
        if !registered {
            debug!(key = ?next_key, "not registered for epoch; leaving the round to its facilitators");
            return;
        }
        let eligible = updater::eligible_facilitators(
            &next_key,
            &self.cluster.current_peers(),
            &self.storage.registrations_snapshot(),
        );
        let transition = updater::try_facilitate(
            next_key.clone(),
            (last_key, last_artifact),
            eligible,
            self.self_id,
            self.storage.get_upper_bound(),
            trigger,
            Instant::now(),
        );
        let installed = self
            .storage
            .cond_modify_state(&next_key, |existing| {
                existing.is_none().then(|| (transition.state.clone(), ()))
            })
            .is_some();
        if installed {
            debug!(key = ?next_key, trigger = trigger.label(), "facilitating consensus round");
            self.run_effects(transition.effects).await;
            self.check_for_state_update(&next_key).await;
        }
    }

    /// Pump the state machine until no further transition applies.
    pub async fn check_for_state_update(&self, key: &K) {
        loop {
            let Some(state) = self.storage.get_state(key) else {
                return;
            };
            let resources = self.storage.get_resources(key);

            if let Some(bound) = updater::ready_to_propose(&state, &resources, &self.self_id) {
                if self.run_proposal_step(&state, bound).await {
                    continue;
                }
                return;
            }

            if let ConsensusStatus::MajoritySigned { signed } = &state.status {
                if state.is_facilitator(&self.self_id)
                    && self.consume_and_finish(&state, signed.clone()).await
                {
                    continue;
                }
                return;
            }

            let ctx = AdvanceContext {
                self_id: self.self_id,
                keypair: &self.keypair,
                now: Instant::now(),
            };
            let Some(transition) = updater::try_advance(&state, &resources, &ctx) else {
                return;
            };
            let new_status = transition.state.status.name();
            if self
                .apply_transition(key, state.status.rank(), transition)
                .await
            {
                debug!(key = ?key, status = new_status, "consensus state advanced");
                continue;
            }
            return;
        }
    }

    /// `Facilitated -> ProposalMade`: pull events up to the agreed bound,
    /// build the artifact, re-buffer what it left out.
    async fn run_proposal_step(&self, state: &ConsensusState<K, A>, bound: Bound) -> bool {
        let pulled = self.storage.pull_events(&bound);
        let events: Vec<(PeerId, u64, E)> = pulled
            .iter()
            .flat_map(|(peer, entries)| {
                entries
                    .iter()
                    .map(|(ordinal, buffered)| (*peer, *ordinal, buffered.event.clone()))
            })
            .collect();

        let created = self
            .functions
            .create_proposal_artifact(state.last_key_and_artifact.clone(), events)
            .await;
        let (artifact, consumed) = match created {
            Ok(result) => result,
            Err(e) => {
                warn!(key = ?state.key, error = %e, "proposal creation failed; re-buffering events");
                self.storage.add_events(pulled);
                return false;
            }
        };

        let consumed: HashSet<(PeerId, u64)> = consumed.into_iter().collect();
        let mut leftover: BTreeMap<PeerId, Vec<(u64, BufferedEvent<E>)>> = BTreeMap::new();
        for (peer, entries) in pulled {
            let rest: Vec<(u64, BufferedEvent<E>)> = entries
                .into_iter()
                .filter(|(ordinal, _)| !consumed.contains(&(peer, *ordinal)))
                .collect();
            if !rest.is_empty() {
                leftover.insert(peer, rest);
            }
        }
        if !leftover.is_empty() {
            self.storage.add_events(leftover);
        }

        let hash = match content_hash(&artifact) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(key = ?state.key, error = %e, "own proposal artifact could not be hashed");
                return false;
            }
        };
        let transition = updater::make_proposal(state, artifact, hash, Instant::now());
        self.apply_transition(&state.key, state.status.rank(), transition)
            .await
    }

    /// `MajoritySigned -> Finished` once consumption acknowledges.
    async fn consume_and_finish(
        &self,
        state: &ConsensusState<K, A>,
        signed: Signed<A>,
    ) -> bool {
        if let Err(e) = self
            .functions
            .consume_signed_majority_artifact(&state.key, &signed)
            .await
        {
            warn!(key = ?state.key, error = %e, "majority artifact consumption failed; will retry");
            return false;
        }
        let Some(transition) = updater::finish(state, Instant::now()) else {
            return false;
        };
        if !self
            .apply_transition(&state.key, state.status.rank(), transition)
            .await
        {
            return false;
        }
        self.finalize_round(state, &signed);
        true
    }

    /// Observer path: adopt a fully signed artifact received over gossip.
    async fn try_adopt_signed_artifact(
        &self,
        key: &K,
        artifact: A,
        proofs: Vec<SignatureProof>,
        hash: Hash,
    ) {
        let Some(state) = self.storage.get_state(key) else {
            return;
        };
        if state.is_facilitator(&self.self_id) {
            // Facilitators finish through the ladder.
            return;
        }
        if matches!(state.status, ConsensusStatus::Finished { .. }) {
            return;
        }

        let valid = proofs
            .iter()
            .filter(|proof| {
                state.is_facilitator(&proof.signer) && verify_proof(&hash, proof).is_ok()
            })
            .count();
        if valid <= state.facilitators.len() / 2 {
            debug!(key = ?key, valid, quorum = state.facilitators.len(), "signed artifact lacks a majority");
            return;
        }

        let signed = Signed::new(artifact, proofs);
        if let Err(e) = self
            .functions
            .consume_signed_majority_artifact(key, &signed)
            .await
        {
            warn!(key = ?key, error = %e, "observed artifact consumption failed; will retry");
            return;
        }
        let now = Instant::now();
        let finished = state.clone().advanced(
            ConsensusStatus::Finished {
                signed: signed.clone(),
                trigger: state.started_by,
            },
            now,
        );
        let applied = self
            .storage
            .cond_modify_state(key, |existing| match existing {
                Some(current) if !matches!(current.status, ConsensusStatus::Finished { .. }) => {
                    Some((finished.clone(), ()))
                }
                _ => None,
            })
            .is_some();
        if applied {
            self.finalize_round(&state, &signed);
        }
    }

    /// Bookkeeping after a round reaches `Finished` locally.
    fn finalize_round(&self, state: &ConsensusState<K, A>, signed: &Signed<A>) {
        metrics::record_round_duration(state.created_at.elapsed().as_secs_f64());
        metrics::record_round_finished(state.started_by.label());
        self.rounds_finished.fetch_add(1, Ordering::Relaxed);

        let expected = state.last_key_and_artifact.0.clone();
        let advanced = self.storage.try_update_last_key_and_artifact_with_cleanup(
            &expected,
            state.key.clone(),
            signed.clone(),
        );
        if !advanced {
            debug!(key = ?state.key, "finish raced with a newer last key");
            return;
        }
        info!(key = ?state.key, trigger = state.started_by.label(), "consensus round finished");

        if self.cluster.own_phase() == PeerPhase::Observing {
            self.cluster.set_own_phase(PeerPhase::Ready);
        }
        self.post_finish(state.started_by);
    }

    /// Install a transition iff the slot still holds the expected rung, then
    /// run its effects.
    async fn apply_transition(
        &self,
        key: &K,
        expected_rank: u8,
        transition: Transition<K, A>,
    ) -> bool {
        let applied = self
            .storage
            .cond_modify_state(key, |existing| match existing {
                Some(current) if current.status.rank() == expected_rank => {
                    Some((transition.state.clone(), ()))
                }
                _ => None,
            })
            .is_some();
        if applied {
            self.run_effects(transition.effects).await;
        }
        applied
    }

    async fn run_effects(&self, effects: Vec<ConsensusEffect<K, A>>) {
        for effect in effects {
            match effect {
                ConsensusEffect::DeclareOwnUpperBound { key, bound } => {
                    self.storage.add_peer_declaration(
                        &key,
                        self.self_id,
                        PeerDeclaration::with_upper_bound(bound),
                    );
                }
                ConsensusEffect::DeclareOwnProposal { key, hash } => {
                    self.storage.add_peer_declaration(
                        &key,
                        self.self_id,
                        PeerDeclaration::with_proposal(hash),
                    );
                }
                ConsensusEffect::DeclareOwnSignature { key, signature } => {
                    self.storage.add_peer_declaration(
                        &key,
                        self.self_id,
                        PeerDeclaration::with_signature(signature),
                    );
                }
                ConsensusEffect::StoreArtifact {
                    key,
                    hash,
                    artifact,
                } => {
                    self.storage.add_artifact(&key, hash, artifact);
                }
                ConsensusEffect::PublishFacility { key, bound } => {
                    self.publish_peer_rumor(
                        TAG_FACILITY,
                        &FacilityAnnouncement {
                            key,
                            upper_bound: bound,
                        },
                    )
                    .await;
                }
                ConsensusEffect::PublishProposal { key, hash } => {
                    self.publish_peer_rumor(TAG_PROPOSAL, &ProposalAnnouncement { key, proposal: hash })
                        .await;
                }
                ConsensusEffect::PublishSignature { key, signature } => {
                    self.publish_peer_rumor(TAG_SIGNATURE, &SignatureAnnouncement { key, signature })
                        .await;
                }
                ConsensusEffect::PublishArtifact {
                    key,
                    artifact,
                    proofs,
                } => {
                    self.publish_common_rumor(
                        TAG_ARTIFACT,
                        &ArtifactAnnouncement {
                            key,
                            artifact,
                            proofs,
                        },
                    )
                    .await;
                }
            }
        }
    }

    ////////////////////////////////////////
    // Rumor publication
    ////////////////////////////////////////

    async fn publish_peer_rumor<T: Serialize>(&self, tag: &str, payload: &T) {
        let ordinal = self.own_ordinal.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.try_publish_tagged(tag, payload, Some(ordinal)).await {
            warn!(%tag, error = %e, "failed to publish rumor");
        }
    }

    async fn publish_common_rumor<T: Serialize>(&self, tag: &str, payload: &T) {
        if let Err(e) = self.try_publish_tagged(tag, payload, None).await {
            warn!(%tag, error = %e, "failed to publish rumor");
        }
    }

    /// Build, sign, and submit one rumor. `ordinal` selects the peer-rumor
    /// form; `None` produces a common rumor.
    async fn try_publish_tagged<T: Serialize>(
        &self,
        tag: &str,
        payload: &T,
        ordinal: Option<u64>,
    ) -> ConsensusResult<Hash> {
        let payload = encode_payload(payload)?;
        let rumor = match ordinal {
            Some(ordinal) => Rumor::Peer {
                origin: self.self_id,
                ordinal,
                tag: tag.to_string(),
                payload,
            },
            None => Rumor::Common {
                tag: tag.to_string(),
                payload,
            },
        };
        let signed = self.keypair.sign_value(rumor)?;
        self.publisher.publish(signed).await
    }

    ////////////////////////////////////////
    // Registration exchange
    ////////////////////////////////////////

    async fn registration_exchange_loop(
        self: Arc<Self>,
        mut registration_rx: mpsc::UnboundedReceiver<PeerId>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("registration exchange shutting down");
                        break;
                    }
                }
                maybe_peer = registration_rx.recv() => {
                    let Some(peer) = maybe_peer else { break };
                    self.exchange_with(peer).await;
                }
            }
        }
    }

    async fn exchange_with(&self, peer: PeerId) {
        let own = self.storage.get_own_registration();
        match self.registration.exchange(&peer, own).await {
            Ok(Some(key)) => {
                if self.storage.register_peer(peer, key.clone()) {
                    metrics::record_registration();
                    info!(%peer, key = ?key, "peer registration recorded");
                } else {
                    debug!(%peer, "registration already recorded");
                }
            }
            Ok(None) => debug!(%peer, "peer has no registration yet"),
            Err(e) => {
                warn!(%peer, error = %e, "registration exchange failed; will retry on next cluster event");
            }
        }
    }

    /// Observer installation when a facility arrives for a round we are not
    /// registered for. The facility's origin is by definition part of the
    /// quorum even when our registration view lags.
    fn maybe_install_observer(&self, key: &K, origin: PeerId) {
        if self.storage.get_state(key).is_some() {
            return;
        }
        let Some((last_key, last_artifact)) = self.storage.get_last_key_and_artifact() else {
            return;
        };
        if *key != last_key.next() {
            return;
        }
        if self
            .storage
            .get_own_registration()
            .is_some_and(|own| own <= *key)
        {
            // We are a participant; our own trigger will facilitate.
            return;
        }
        let mut facilitators = updater::eligible_facilitators(
            key,
            &self.cluster.current_peers(),
            &self.storage.registrations_snapshot(),
        );
        facilitators.push(origin);
        let state = updater::try_observe(
            key.clone(),
            (last_key, last_artifact),
            facilitators,
            Instant::now(),
        );
        self.storage.cond_modify_state(key, |existing| {
            existing.is_none().then(|| (state.clone(), ()))
        });
        debug!(key = ?key, "installed observer state");
    }
}

#[async_trait]
impl<K, A, E, CF, GP, CV, RT> RegistrationApi<K> for ConsensusManager<K, A, E, CF, GP, CV, RT>
where
    K: EpochKey,
    A: Artifact,
    E: ConsensusEvent,
    CF: ConsensusFunctions<K, A, E> + 'static,
    GP: GossipPublisher + 'static,
    CV: ClusterView + 'static,
    RT: RegistrationTransport<K> + 'static,
{
    async fn handle_registration_exchange(&self, peer: PeerId, maybe_key: Option<K>) -> Option<K> {
        if let Some(key) = maybe_key {
            if self.storage.register_peer(peer, key) {
                metrics::record_registration();
            }
        }
        self.storage.get_own_registration()
    }
}
