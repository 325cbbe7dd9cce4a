//! Domain services for gossip: canonical ordering, fanout selection, and
//! offer/inquiry set arithmetic.

use rand::seq::SliceRandom;
use rand::Rng;
use shared_types::{Hash, PeerId, RumorBatch, SignedRumor};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Canonical total order on `(hash, signed rumor)` pairs.
///
/// Lexicographic on `(origin, ordinal, hash)` with absent origin/ordinal
/// ordering first. Identical on every node, which makes handler dispatch
/// order deterministic across the fleet.
pub fn canonical_rumor_order(a: &(Hash, SignedRumor), b: &(Hash, SignedRumor)) -> Ordering {
    let key_a = (a.1.value.origin().copied(), a.1.value.ordinal(), a.0);
    let key_b = (b.1.value.origin().copied(), b.1.value.ordinal(), b.0);
    key_a.cmp(&key_b)
}

/// Sort a batch into canonical order in place.
pub fn sort_canonical(batch: &mut RumorBatch) {
    batch.sort_by(canonical_rumor_order);
}

/// Uniformly select up to `fanout` peers for one spreader round.
pub fn select_gossip_peers<R: Rng>(peers: &[PeerId], fanout: usize, rng: &mut R) -> Vec<PeerId> {
    let mut shuffled = peers.to_vec();
    shuffled.shuffle(rng);
    shuffled.truncate(fanout);
    shuffled
}

/// Hashes from `offer` that are not in `seen`: the inquiry side of a round.
pub fn hashes_missing_from(offer: &[Hash], seen: &HashSet<Hash>) -> Vec<Hash> {
    offer.iter().filter(|h| !seen.contains(*h)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Rumor, Signed};

    fn peer_rumor(origin_seed: u8, ordinal: u64) -> (Hash, SignedRumor) {
        let rumor = Rumor::Peer {
            origin: PeerId::from_verifying_key_bytes([origin_seed; 32]),
            ordinal,
            tag: "t".into(),
            payload: vec![],
        };
        let hash = shared_types::content_hash(&rumor).unwrap();
        (hash, Signed::new(rumor, vec![]))
    }

    fn common_rumor(seed: u8) -> (Hash, SignedRumor) {
        let rumor = Rumor::Common {
            tag: "t".into(),
            payload: vec![seed],
        };
        let hash = shared_types::content_hash(&rumor).unwrap();
        (hash, Signed::new(rumor, vec![]))
    }

    #[test]
    fn test_canonical_order_common_before_peer() {
        let mut batch = vec![peer_rumor(1, 0), common_rumor(9)];
        sort_canonical(&mut batch);
        assert!(batch[0].1.value.origin().is_none());
        assert!(batch[1].1.value.origin().is_some());
    }

    #[test]
    fn test_canonical_order_by_origin_then_ordinal() {
        let mut batch = vec![peer_rumor(2, 0), peer_rumor(1, 5), peer_rumor(1, 2)];
        sort_canonical(&mut batch);
        assert_eq!(batch[0].1.value.ordinal(), Some(2));
        assert_eq!(batch[1].1.value.ordinal(), Some(5));
        assert_eq!(
            batch[2].1.value.origin(),
            Some(&PeerId::from_verifying_key_bytes([2; 32]))
        );
    }

    #[test]
    fn test_canonical_order_is_deterministic() {
        let mut a = vec![peer_rumor(3, 1), common_rumor(1), peer_rumor(2, 9)];
        let mut b = a.clone();
        b.reverse();
        sort_canonical(&mut a);
        sort_canonical(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_peers_respects_fanout() {
        let peers: Vec<PeerId> = (0..10u8)
            .map(|i| PeerId::from_verifying_key_bytes([i; 32]))
            .collect();
        let mut rng = rand::thread_rng();
        let selected = select_gossip_peers(&peers, 2, &mut rng);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|p| peers.contains(p)));
    }

    #[test]
    fn test_select_peers_short_list() {
        let peers = vec![PeerId::from_verifying_key_bytes([1; 32])];
        let mut rng = rand::thread_rng();
        assert_eq!(select_gossip_peers(&peers, 4, &mut rng).len(), 1);
    }

    #[test]
    fn test_hashes_missing_from() {
        let offer = vec![[1u8; 32], [2u8; 32], [3u8; 32]];
        let seen: HashSet<Hash> = [[2u8; 32]].into_iter().collect();
        assert_eq!(
            hashes_missing_from(&offer, &seen),
            vec![[1u8; 32], [3u8; 32]]
        );
    }
}
