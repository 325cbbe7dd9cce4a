//! # The `Signed<T>` Proof Envelope
//!
//! Wraps a value with one or more `(signer, signature)` proofs. A signed
//! value is validly signed iff the proof list is non-empty and every proof's
//! signature verifies over the SHA-256 digest of the value's canonical
//! encoding under the signer's embedded verifying key.
//!
//! Signing the digest rather than the raw encoding keeps the signing message
//! fixed-width and lets a facilitator counter-sign a content hash it has not
//! yet fetched the bytes for.

use crate::entities::{PeerId, Signature};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A single `(signer, signature)` attribution.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureProof {
    /// The peer the signature is attributed to.
    pub signer: PeerId,
    /// Ed25519 signature over the value's content hash.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl std::fmt::Debug for SignatureProof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureProof")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

/// A value plus its signature proofs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signed<T> {
    /// The signed value.
    pub value: T,
    /// Attribution proofs; must be non-empty for the value to be valid.
    pub proofs: Vec<SignatureProof>,
}

impl<T> Signed<T> {
    /// Wrap a value with an initial set of proofs.
    pub fn new(value: T, proofs: Vec<SignatureProof>) -> Self {
        Self { value, proofs }
    }

    /// All peers that contributed a proof, in proof order.
    pub fn signers(&self) -> impl Iterator<Item = &PeerId> {
        self.proofs.iter().map(|p| &p.signer)
    }

    /// Whether the given peer contributed a proof.
    pub fn is_signed_by(&self, peer: &PeerId) -> bool {
        self.proofs.iter().any(|p| p.signer == *peer)
    }

    /// Append a proof unless the signer already contributed one.
    ///
    /// First writer wins: a second proof from the same signer is ignored,
    /// matching the set-monotonic rule for declarations.
    pub fn add_proof(&mut self, proof: SignatureProof) -> bool {
        if self.is_signed_by(&proof.signer) {
            return false;
        }
        self.proofs.push(proof);
        true
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof(seed: u8) -> SignatureProof {
        SignatureProof {
            signer: PeerId::from_verifying_key_bytes([seed; 32]),
            signature: [seed; 64],
        }
    }

    #[test]
    fn test_signers_in_proof_order() {
        let signed = Signed::new(5u64, vec![proof(2), proof(1)]);
        let order: Vec<_> = signed.signers().copied().collect();
        assert_eq!(order[0], PeerId::from_verifying_key_bytes([2; 32]));
        assert_eq!(order[1], PeerId::from_verifying_key_bytes([1; 32]));
    }

    #[test]
    fn test_add_proof_first_writer_wins() {
        let mut signed = Signed::new(5u64, vec![proof(1)]);
        assert!(!signed.add_proof(SignatureProof {
            signer: PeerId::from_verifying_key_bytes([1; 32]),
            signature: [99; 64],
        }));
        assert_eq!(signed.proofs.len(), 1);
        assert_eq!(signed.proofs[0].signature, [1; 64]);

        assert!(signed.add_proof(proof(2)));
        assert_eq!(signed.proofs.len(), 2);
    }

    #[test]
    fn test_is_signed_by() {
        let signed = Signed::new((), vec![proof(3)]);
        assert!(signed.is_signed_by(&PeerId::from_verifying_key_bytes([3; 32])));
        assert!(!signed.is_signed_by(&PeerId::from_verifying_key_bytes([4; 32])));
    }
}
