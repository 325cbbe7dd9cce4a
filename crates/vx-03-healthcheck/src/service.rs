//! Health-check service - round bookkeeping and declaration exchange.

use crate::domain::{HealthCheckKey, HealthCheckRound, HealthDecision};
use crate::events::PeerDeclarationRequest;
use crate::ports::{HealthCheckApi, HealthCheckTransport, HealthOutcomeDriver};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::PeerId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Health-check service.
///
/// Tracks one round per subject key, exchanges declarations with the other
/// participants, and resolves outcomes through the pluggable driver.
pub struct HealthCheckService<S, D, T>
where
    S: Clone + Send + Sync + 'static,
    D: HealthOutcomeDriver<S>,
    T: HealthCheckTransport<S>,
{
    self_id: PeerId,
    driver: Arc<D>,
    transport: Arc<T>,
    rounds: RwLock<BTreeMap<HealthCheckKey, HealthCheckRound<S>>>,
    own_statuses: RwLock<BTreeMap<HealthCheckKey, S>>,
}

impl<S, D, T> HealthCheckService<S, D, T>
where
    S: Clone + Send + Sync + 'static,
    D: HealthOutcomeDriver<S>,
    T: HealthCheckTransport<S>,
{
    pub fn new(self_id: PeerId, driver: Arc<D>, transport: Arc<T>) -> Self {
        Self {
            self_id,
            driver,
            transport,
            rounds: RwLock::new(BTreeMap::new()),
            own_statuses: RwLock::new(BTreeMap::new()),
        }
    }

    /// Open a round over a subject with our own status as the first
    /// proposal.
    pub fn start_round(
        &self,
        key: HealthCheckKey,
        own_status: S,
        participants: BTreeSet<PeerId>,
    ) {
        let mut round = HealthCheckRound::new(key, participants);
        round.add_proposal(
            self.self_id,
            [key.round_id].into_iter().collect(),
            own_status.clone(),
        );
        self.own_statuses.write().insert(key, own_status);
        self.rounds.write().insert(key, round);
    }

    /// Push our declaration to every other participant, folding their
    /// replies back into the round. Per-peer failures are logged and skip
    /// only that peer.
    pub async fn broadcast_declarations(&self, key: &HealthCheckKey) {
        let Some((participants, round_ids, own_status)) = ({
            let rounds = self.rounds.read();
            rounds.get(key).and_then(|round| {
                self.own_statuses.read().get(key).map(|status| {
                    (
                        round.peers().clone(),
                        round.round_ids().clone(),
                        status.clone(),
                    )
                })
            })
        }) else {
            debug!("no round for declaration broadcast");
            return;
        };

        for peer in participants {
            if peer == self.self_id {
                continue;
            }
            let request = PeerDeclarationRequest {
                round_ids: round_ids.clone(),
                status: own_status.clone(),
            };
            match self.transport.send_peer_declaration(&peer, request).await {
                Ok(Some(status)) => {
                    let mut rounds = self.rounds.write();
                    if let Some(round) = rounds.get_mut(key) {
                        round.add_proposal(peer, round_ids.clone(), status);
                    }
                }
                Ok(None) => debug!(%peer, "participant has no status yet"),
                Err(e) => warn!(%peer, error = %e, "peer declaration failed"),
            }
        }
    }

    /// Prune participants that left the cluster without proposing.
    pub fn manage_peers(&self, key: &HealthCheckKey, current_cluster_peers: &BTreeSet<PeerId>) {
        if let Some(round) = self.rounds.write().get_mut(key) {
            round.manage_peers(current_cluster_peers);
        }
    }

    /// Whether every remaining participant of the round has proposed.
    pub fn is_finished(&self, key: &HealthCheckKey) -> bool {
        self.rounds
            .read()
            .get(key)
            .is_some_and(|round| round.is_finished())
    }

    /// Resolve a finished round through the driver; `None` while the round
    /// is missing or unfinished.
    pub fn calculate_outcome(&self, key: &HealthCheckKey) -> Option<HealthDecision<S>> {
        let rounds = self.rounds.read();
        let round = rounds.get(key)?;
        if !round.is_finished() {
            return None;
        }
        let own_statuses = self.own_statuses.read();
        let own_status = own_statuses.get(key)?;
        let received = round.participant_proposals();
        Some(self.driver.calculate_consensus_outcome(
            key,
            own_status,
            &self.self_id,
            &received,
        ))
    }

    /// Drop a resolved round.
    pub fn close_round(&self, key: &HealthCheckKey) {
        self.rounds.write().remove(key);
        self.own_statuses.write().remove(key);
    }
}

#[async_trait]
impl<S, D, T> HealthCheckApi<S> for HealthCheckService<S, D, T>
where
    S: Clone + Send + Sync + 'static,
    D: HealthOutcomeDriver<S> + 'static,
    T: HealthCheckTransport<S> + 'static,
{
    async fn handle_peer_declaration(
        &self,
        peer: PeerId,
        request: PeerDeclarationRequest<S>,
    ) -> Option<S> {
        // Declarations carry round ids rather than the subject key; match
        // the round whose merged ids intersect the sender's.
        let mut rounds = self.rounds.write();
        let key = rounds
            .iter()
            .find(|(_, round)| !round.round_ids().is_disjoint(&request.round_ids))
            .map(|(key, _)| *key)?;
        if let Some(round) = rounds.get_mut(&key) {
            round.add_proposal(peer, request.round_ids, request.status);
        }
        drop(rounds);
        self.own_statuses.read().get(&key).cloned()
    }
}
