//! # Core Domain Entities
//!
//! Identity and digest primitives shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Digests**: [`Hash`] - 32-byte SHA-256 content hash
//! - **Signatures**: [`Signature`] - 64-byte Ed25519 signature
//! - **Identity**: [`PeerId`] - 64-byte node identity derived from a
//!   verifying key

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// A 32-byte SHA-256 content hash.
pub type Hash = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// Unique identifier for a node in the network.
///
/// Layout: `verifying_key (32 bytes) || SHA-256(verifying_key) (32 bytes)`.
/// Embedding the key means a signature attributed to a peer can be checked
/// against the id alone; the trailing digest lets receivers detect ids that
/// were never derived from a real key.
///
/// Ordering is byte-lexicographic over the full 64 bytes, which gives the
/// total order used for facilitator sorting and exchange tie-breaking.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(#[serde_as(as = "Bytes")] pub [u8; 64]);

impl PeerId {
    /// Derive a peer id from raw Ed25519 verifying-key bytes.
    pub fn from_verifying_key_bytes(key: [u8; 32]) -> Self {
        let digest: [u8; 32] = Sha256::digest(key).into();
        let mut id = [0u8; 64];
        id[..32].copy_from_slice(&key);
        id[32..].copy_from_slice(&digest);
        Self(id)
    }

    /// The embedded verifying-key bytes (first half of the id).
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        let mut key = [0u8; 32];
        key.copy_from_slice(&self.0[..32]);
        key
    }

    /// Whether the trailing digest matches the embedded key.
    ///
    /// Ids that fail this check were not produced by
    /// [`PeerId::from_verifying_key_bytes`] and must be rejected during
    /// envelope validation.
    pub fn is_well_formed(&self) -> bool {
        let digest: [u8; 32] = Sha256::digest(&self.0[..32]).into();
        self.0[32..] == digest
    }

    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_derivation_well_formed() {
        let id = PeerId::from_verifying_key_bytes([7u8; 32]);
        assert!(id.is_well_formed());
        assert_eq!(id.verifying_key_bytes(), [7u8; 32]);
    }

    #[test]
    fn test_peer_id_tampered_digest_rejected() {
        let mut id = PeerId::from_verifying_key_bytes([7u8; 32]);
        id.0[40] ^= 0xFF;
        assert!(!id.is_well_formed());
    }

    #[test]
    fn test_peer_id_ordering_is_byte_lexicographic() {
        let a = PeerId([1u8; 64]);
        let b = PeerId([2u8; 64]);
        assert!(a < b);
    }

    #[test]
    fn test_peer_id_display_is_short_hex() {
        let id = PeerId([0xABu8; 64]);
        assert_eq!(id.to_string(), "abababababababab");
    }
}
