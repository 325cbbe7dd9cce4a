//! # Rumor Storage - Two-Tier Dedup Store
//!
//! Rumors live in two tiers:
//!
//! - `active`: still advertised in gossip offers; short retention.
//! - `seen`: remembered for deduplication; long retention.
//!
//! On add a rumor enters both tiers. The sweep demotes actives past their
//! retention (the hash stays seen) and evicts seens past theirs. Content
//! bytes are kept while either tier references the hash, so the answer phase
//! of a gossip round can serve anything still advertised or remembered.

use parking_lot::RwLock;
use shared_types::{Hash, RumorBatch, SignedRumor};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcome of one expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Hashes demoted from `active` (still seen).
    pub demoted: usize,
    /// Hashes evicted from `seen` (content dropped unless still active).
    pub evicted: usize,
}

/// Snapshot of storage internals for invariant auditing.
#[derive(Clone, Debug)]
pub struct StorageAudit {
    pub active: Vec<Hash>,
    pub seen: Vec<Hash>,
    pub content: Vec<Hash>,
}

struct StorageInner {
    /// Hash -> insertion time; advertised in offers.
    active: HashMap<Hash, Instant>,
    /// Hash -> insertion time; dedup memory.
    seen: HashMap<Hash, Instant>,
    /// Backing content for every hash in either tier.
    by_hash: HashMap<Hash, SignedRumor>,
}

/// Concurrency-safe two-tier rumor store.
pub struct RumorStorage {
    inner: RwLock<StorageInner>,
    active_retention: Duration,
    seen_retention: Duration,
}

impl RumorStorage {
    /// Create a store with the given tier retentions.
    ///
    /// `active_retention` must be shorter than `seen_retention`; config
    /// validation enforces this before construction.
    pub fn new(active_retention: Duration, seen_retention: Duration) -> Self {
        Self {
            inner: RwLock::new(StorageInner {
                active: HashMap::new(),
                seen: HashMap::new(),
                by_hash: HashMap::new(),
            }),
            active_retention,
            seen_retention,
        }
    }

    /// Insert-or-ignore a batch; returns the subset that was actually new,
    /// preserving input order for deterministic handler dispatch.
    pub fn add_rumors(&self, batch: RumorBatch) -> RumorBatch {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let mut fresh = Vec::new();
        for (hash, rumor) in batch {
            if inner.seen.contains_key(&hash) {
                continue;
            }
            inner.active.insert(hash, now);
            inner.seen.insert(hash, now);
            inner.by_hash.insert(hash, rumor.clone());
            fresh.push((hash, rumor));
        }
        fresh
    }

    /// Hashes currently advertised in gossip offers.
    pub fn get_active_hashes(&self) -> Vec<Hash> {
        self.inner.read().active.keys().copied().collect()
    }

    /// Hashes remembered for deduplication.
    pub fn get_seen_hashes(&self) -> Vec<Hash> {
        self.inner.read().seen.keys().copied().collect()
    }

    /// Whether the hash is already known.
    pub fn contains_seen(&self, hash: &Hash) -> bool {
        self.inner.read().seen.contains_key(hash)
    }

    /// Fetch content for the requested hashes; absent hashes are skipped and
    /// request order is preserved.
    pub fn get_rumors(&self, hashes: &[Hash]) -> RumorBatch {
        let inner = self.inner.read();
        hashes
            .iter()
            .filter_map(|h| inner.by_hash.get(h).map(|r| (*h, r.clone())))
            .collect()
    }

    /// Enforce tier retentions as of `now`.
    ///
    /// Actives are demoted first, then seens are evicted, so a hash always
    /// leaves `active` no later than it leaves `seen`. Content is dropped
    /// only once neither tier references the hash.
    pub fn sweep_expired_at(&self, now: Instant) -> SweepStats {
        let mut inner = self.inner.write();
        let mut stats = SweepStats::default();

        let active_retention = self.active_retention;
        inner.active.retain(|_, inserted| {
            let keep = now.duration_since(*inserted) < active_retention;
            if !keep {
                stats.demoted += 1;
            }
            keep
        });

        let seen_retention = self.seen_retention;
        let mut evicted = Vec::new();
        inner.seen.retain(|hash, inserted| {
            let keep = now.duration_since(*inserted) < seen_retention;
            if !keep {
                evicted.push(*hash);
            }
            keep
        });
        stats.evicted = evicted.len();
        for hash in evicted {
            if !inner.active.contains_key(&hash) {
                inner.by_hash.remove(&hash);
            }
        }

        stats
    }

    /// Convenience sweep at the current instant.
    pub fn sweep_expired(&self) -> SweepStats {
        self.sweep_expired_at(Instant::now())
    }

    /// Number of active rumors.
    pub fn len_active(&self) -> usize {
        self.inner.read().active.len()
    }

    /// Number of seen rumor hashes.
    pub fn len_seen(&self) -> usize {
        self.inner.read().seen.len()
    }

    /// Snapshot for invariant auditing.
    pub fn audit(&self) -> StorageAudit {
        let inner = self.inner.read();
        StorageAudit {
            active: inner.active.keys().copied().collect(),
            seen: inner.seen.keys().copied().collect(),
            content: inner.by_hash.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Rumor, Signed};

    fn rumor(tag: &str, seed: u8) -> (Hash, SignedRumor) {
        let rumor = Rumor::Common {
            tag: tag.into(),
            payload: vec![seed],
        };
        let hash = shared_types::content_hash(&rumor).unwrap();
        (hash, Signed::new(rumor, vec![]))
    }

    fn storage() -> RumorStorage {
        RumorStorage::new(Duration::from_secs(2), Duration::from_secs(120))
    }

    #[test]
    fn test_add_returns_new_only_in_order() {
        let storage = storage();
        let (h1, r1) = rumor("a", 1);
        let (h2, r2) = rumor("a", 2);
        let (h3, r3) = rumor("a", 3);

        let fresh = storage.add_rumors(vec![(h1, r1.clone()), (h2, r2.clone())]);
        assert_eq!(fresh.len(), 2);

        let fresh = storage.add_rumors(vec![(h2, r2), (h3, r3), (h1, r1)]);
        let hashes: Vec<Hash> = fresh.iter().map(|(h, _)| *h).collect();
        assert_eq!(hashes, vec![h3]);
    }

    #[test]
    fn test_active_subset_of_seen() {
        let storage = storage();
        let (h1, r1) = rumor("a", 1);
        storage.add_rumors(vec![(h1, r1)]);
        assert_eq!(storage.get_active_hashes(), vec![h1]);
        assert_eq!(storage.get_seen_hashes(), vec![h1]);
    }

    #[test]
    fn test_sweep_demotes_then_evicts() {
        let storage = storage();
        let start = Instant::now();
        let (h1, r1) = rumor("a", 1);
        storage.add_rumors(vec![(h1, r1)]);

        // After the active retention the hash is demoted but still seen,
        // and content is still servable.
        let stats = storage.sweep_expired_at(start + Duration::from_secs(3));
        assert_eq!(stats, SweepStats { demoted: 1, evicted: 0 });
        assert!(storage.get_active_hashes().is_empty());
        assert!(storage.contains_seen(&h1));
        assert_eq!(storage.get_rumors(&[h1]).len(), 1);

        // After the seen retention the hash and its content are gone.
        let stats = storage.sweep_expired_at(start + Duration::from_secs(121));
        assert_eq!(stats, SweepStats { demoted: 0, evicted: 1 });
        assert!(!storage.contains_seen(&h1));
        assert!(storage.get_rumors(&[h1]).is_empty());
    }

    #[test]
    fn test_reinsertion_after_seen_eviction() {
        let storage = storage();
        let start = Instant::now();
        let (h1, r1) = rumor("a", 1);
        storage.add_rumors(vec![(h1, r1.clone())]);
        storage.sweep_expired_at(start + Duration::from_secs(121));

        // Dedup memory expired, so the rumor is new again.
        let fresh = storage.add_rumors(vec![(h1, r1)]);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_get_rumors_skips_absent_and_keeps_order() {
        let storage = storage();
        let (h1, r1) = rumor("a", 1);
        let (h2, r2) = rumor("a", 2);
        let (h3, _) = rumor("a", 3);
        storage.add_rumors(vec![(h1, r1), (h2, r2)]);

        let got = storage.get_rumors(&[h2, h3, h1]);
        let hashes: Vec<Hash> = got.iter().map(|(h, _)| *h).collect();
        assert_eq!(hashes, vec![h2, h1]);
    }
}
