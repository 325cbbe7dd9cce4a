//! Shared fixtures for benchmarks.

use shared_crypto::Keypair;
use shared_types::{content_hash, Rumor, RumorBatch};

/// A batch of validly signed peer rumors from one origin.
pub fn signed_batch(origin_seed: u8, count: usize, payload_len: usize) -> RumorBatch {
    let keypair = Keypair::from_seed([origin_seed; 32]);
    (0..count)
        .map(|ordinal| {
            let rumor = Rumor::Peer {
                origin: keypair.peer_id(),
                ordinal: ordinal as u64,
                tag: "bench.payload".into(),
                payload: vec![ordinal as u8; payload_len],
            };
            let signed = keypair.sign_value(rumor).expect("signable rumor");
            let hash = content_hash(&signed.value).expect("hashable rumor");
            (hash, signed)
        })
        .collect()
}
