//! Keyed consensus state registry with per-key serialized updates.
//!
//! # Concurrency
//!
//! - Per-key state lives in a `DashMap`; `cond_modify_state` runs its
//!   closure under the entry lock, so updates to one key are serialized
//!   while different keys proceed in parallel.
//! - Declarations are set-monotonic (first writer wins per field per peer).
//! - The last key/artifact cell advances only through a compare-and-set
//!   that also evicts every tracked key at or before the replaced one.
//!
//! No lock is held across an await point; every method is synchronous.

use crate::domain::{
    pointwise_max, Artifact, Bound, BufferedEvent, ConsensusEvent, ConsensusResources,
    ConsensusState, EpochKey, PeerDeclaration,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::{Hash, PeerId, Signed};
use std::collections::BTreeMap;
use std::time::Instant;

/// In-memory consensus storage. All state is rebuilt by observation on
/// rejoin; nothing here persists.
pub struct ConsensusStorage<K: EpochKey, A: Artifact, E: ConsensusEvent> {
    states: DashMap<K, ConsensusState<K, A>>,
    resources: DashMap<K, ConsensusResources<A>>,
    event_buffers: RwLock<BTreeMap<PeerId, BTreeMap<u64, BufferedEvent<E>>>>,
    registrations: RwLock<BTreeMap<PeerId, K>>,
    own_registration: RwLock<Option<K>>,
    last: RwLock<Option<(K, Option<Signed<A>>)>>,
    time_trigger: RwLock<Option<Instant>>,
}

impl<K: EpochKey, A: Artifact, E: ConsensusEvent> Default for ConsensusStorage<K, A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EpochKey, A: Artifact, E: ConsensusEvent> ConsensusStorage<K, A, E> {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            resources: DashMap::new(),
            event_buffers: RwLock::new(BTreeMap::new()),
            registrations: RwLock::new(BTreeMap::new()),
            own_registration: RwLock::new(None),
            last: RwLock::new(None),
            time_trigger: RwLock::new(None),
        }
    }

    ////////////////////////////////////////
    // Keyed state
    ////////////////////////////////////////

    /// Atomic conditional modify of the per-key state slot.
    ///
    /// `f` sees the current state (if any) and returns the replacement plus
    /// a caller result, or `None` to leave the slot untouched. Concurrent
    /// callers for the same key are serialized.
    pub fn cond_modify_state<R>(
        &self,
        key: &K,
        f: impl FnOnce(Option<&ConsensusState<K, A>>) -> Option<(ConsensusState<K, A>, R)>,
    ) -> Option<R> {
        match self.states.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                f(Some(occupied.get())).map(|(state, result)| {
                    occupied.insert(state);
                    result
                })
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => f(None).map(|(state, result)| {
                vacant.insert(state);
                result
            }),
        }
    }

    /// Clone of the per-key state, if present.
    pub fn get_state(&self, key: &K) -> Option<ConsensusState<K, A>> {
        self.states.get(key).map(|s| s.clone())
    }

    /// Number of rounds currently tracked.
    pub fn in_flight_rounds(&self) -> usize {
        self.states.len()
    }

    ////////////////////////////////////////
    // Resources
    ////////////////////////////////////////

    /// Clone of the per-key resources; empty resources if nothing arrived.
    pub fn get_resources(&self, key: &K) -> ConsensusResources<A> {
        self.resources
            .get(key)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Merge a declaration fragment; fields already set are kept.
    pub fn add_peer_declaration(&self, key: &K, peer: PeerId, fragment: PeerDeclaration) {
        self.resources
            .entry(key.clone())
            .or_default()
            .peer_declarations
            .entry(peer)
            .or_default()
            .merge_from(fragment);
    }

    /// Record a candidate artifact under its content hash.
    pub fn add_artifact(&self, key: &K, hash: Hash, artifact: A) {
        self.resources
            .entry(key.clone())
            .or_default()
            .artifacts
            .entry(hash)
            .or_insert(artifact);
    }

    ////////////////////////////////////////
    // Event buffers
    ////////////////////////////////////////

    /// Buffer one event under its origin's ordinal; an ordinal already
    /// buffered for the peer is kept.
    pub fn buffer_event(&self, peer: PeerId, ordinal: u64, event: BufferedEvent<E>) {
        self.event_buffers
            .write()
            .entry(peer)
            .or_default()
            .entry(ordinal)
            .or_insert(event);
    }

    /// Remove and return every buffered event at or below the bound, per
    /// peer. Peers absent from the bound keep their events.
    pub fn pull_events(&self, bound: &Bound) -> BTreeMap<PeerId, Vec<(u64, BufferedEvent<E>)>> {
        let mut buffers = self.event_buffers.write();
        let mut pulled: BTreeMap<PeerId, Vec<(u64, BufferedEvent<E>)>> = BTreeMap::new();
        for (peer, cutoff) in bound {
            let Some(per_peer) = buffers.get_mut(peer) else {
                continue;
            };
            let retained = per_peer.split_off(&(cutoff.saturating_add(1)));
            let taken = std::mem::replace(per_peer, retained);
            if !taken.is_empty() {
                pulled.insert(*peer, taken.into_iter().collect());
            }
            if buffers.get(peer).is_some_and(|b| b.is_empty()) {
                buffers.remove(peer);
            }
        }
        pulled
    }

    /// Re-insert events the consensus functions did not consume.
    pub fn add_events(&self, events: BTreeMap<PeerId, Vec<(u64, BufferedEvent<E>)>>) {
        let mut buffers = self.event_buffers.write();
        for (peer, entries) in events {
            let per_peer = buffers.entry(peer).or_default();
            for (ordinal, event) in entries {
                per_peer.entry(ordinal).or_insert(event);
            }
        }
    }

    /// Highest buffered ordinal per peer across all buffers.
    pub fn get_upper_bound(&self) -> Bound {
        let buffers = self.event_buffers.read();
        let per_peer: Vec<Bound> = buffers
            .iter()
            .filter_map(|(peer, events)| {
                events
                    .keys()
                    .next_back()
                    .map(|max| [(*peer, *max)].into_iter().collect())
            })
            .collect();
        pointwise_max(per_peer.iter())
    }

    /// Whether any buffered event is marked as a trigger.
    pub fn contains_trigger_event(&self) -> bool {
        self.event_buffers
            .read()
            .values()
            .flat_map(|events| events.values())
            .any(|event| event.is_trigger)
    }

    /// Total events buffered across all peers.
    pub fn buffered_event_count(&self) -> usize {
        self.event_buffers.read().values().map(|e| e.len()).sum()
    }

    ////////////////////////////////////////
    // Last key and artifact
    ////////////////////////////////////////

    pub fn get_last_key_and_artifact(&self) -> Option<(K, Option<Signed<A>>)> {
        self.last.read().clone()
    }

    /// Install the starting point (used by the facilitating/observing entry
    /// points, not by round finishes).
    pub fn set_last_key_and_artifact(&self, key: K, artifact: Option<Signed<A>>) {
        *self.last.write() = Some((key, artifact));
    }

    /// Compare-and-set advance of the last key/artifact. On success, every
    /// tracked state and resource with `key <= expected` is evicted.
    pub fn try_update_last_key_and_artifact_with_cleanup(
        &self,
        expected: &K,
        new_key: K,
        new_artifact: Signed<A>,
    ) -> bool {
        {
            let mut last = self.last.write();
            match last.as_ref() {
                Some((current, _)) if current == expected => {}
                _ => return false,
            }
            *last = Some((new_key, Some(new_artifact)));
        }
        self.states.retain(|key, _| key > expected);
        self.resources.retain(|key, _| key > expected);
        true
    }

    ////////////////////////////////////////
    // Time trigger
    ////////////////////////////////////////

    pub fn set_time_trigger(&self, at: Instant) {
        *self.time_trigger.write() = Some(at);
    }

    pub fn get_time_trigger(&self) -> Option<Instant> {
        *self.time_trigger.read()
    }

    ////////////////////////////////////////
    // Registrations
    ////////////////////////////////////////

    /// Record a remote peer's registration key. Monotonic: a key at or
    /// below the recorded one is ignored.
    pub fn register_peer(&self, peer: PeerId, key: K) -> bool {
        let mut registrations = self.registrations.write();
        match registrations.get(&peer) {
            Some(existing) if *existing >= key => false,
            _ => {
                registrations.insert(peer, key);
                true
            }
        }
    }

    /// Drop a departing peer's registration.
    pub fn deregister_peer(&self, peer: &PeerId) -> bool {
        self.registrations.write().remove(peer).is_some()
    }

    /// Snapshot of all recorded registrations.
    pub fn registrations_snapshot(&self) -> BTreeMap<PeerId, K> {
        self.registrations.read().clone()
    }

    pub fn set_own_registration(&self, key: K) {
        *self.own_registration.write() = Some(key);
    }

    pub fn get_own_registration(&self) -> Option<K> {
        self.own_registration.read().clone()
    }
}
